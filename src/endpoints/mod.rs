//! The Hostel Manager API's endpoints.

mod auth;
mod health;
mod rooms;
mod staff;
mod users;

pub use auth::{
    login, logout, register, verify_token, LoginError, Registration,
    Verification,
};
pub use health::{check_health, HealthStatus};
pub use rooms::{
    delete_all_rooms, delete_room, get_rooms, save_rooms, update_room,
    RoomsSnapshot,
};
pub use staff::{
    create_staff, delete_staff, get_staff, update_staff, CreatedEmployee,
    Employee,
};
pub use users::{delete_user, get_users, update_user, UserRecord, UserUpdate};

use crate::{client::ApiClient, errors::ApiError};
use serde_derive::Deserialize;

/// Fail early if there's no session to authenticate with.
fn require_session(client: &ApiClient) -> Result<(), ApiError> {
    if client.session().is_logged_in() {
        Ok(())
    } else {
        Err(ApiError::NotLoggedIn)
    }
}

/// The `{"message": "..."}` body most mutating endpoints send back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Acknowledgement {
    #[serde(default)]
    message: String,
}

async fn acknowledge(
    client: &ApiClient,
    endpoint: &crate::Endpoint,
) -> Result<(), ApiError> {
    let ack: Option<Acknowledgement> = client.fetch(endpoint).await?;

    if let Some(ack) = ack {
        log::debug!(
            "{} {} {:?}: {}",
            endpoint.method,
            endpoint.path,
            endpoint.segments,
            ack.message
        );
    }

    Ok(())
}
