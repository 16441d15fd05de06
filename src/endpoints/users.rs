use super::{acknowledge, require_session};
use crate::{
    client::ApiClient,
    endpoint::Endpoint,
    errors::ApiError,
    session::{AccountStatus, Role},
};
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An account as seen by an administrator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub role: Role,
    pub status: AccountStatus,
    /// When the account stops working, if ever.
    #[serde(default)]
    pub access_expires: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub residents_count: u32,
}

/// The fields an administrator may change. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AccountStatus>,
    /// `Some(None)` removes the expiry date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_expires: Option<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    users: BTreeMap<String, UserRecord>,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    user: UserRecord,
}

/// List every account, keyed by username. Requires an administrator.
pub async fn get_users(
    client: &ApiClient,
) -> Result<BTreeMap<String, UserRecord>, ApiError> {
    require_session(client)?;

    let response: UsersResponse =
        client.fetch(&Endpoint::get("/auth/users")).await?;
    log::debug!("Fetched {} users", response.users.len());

    Ok(response.users)
}

pub async fn update_user(
    client: &ApiClient,
    username: &str,
    changes: &UserUpdate,
) -> Result<UserRecord, ApiError> {
    require_session(client)?;
    client.connectivity().ensure_online()?;

    let endpoint = Endpoint::put("/auth/users")
        .with_segment(username)
        .with_body(serde_json::to_value(changes)?);
    let response: UpdateResponse = client.fetch(&endpoint).await?;

    Ok(response.user)
}

pub async fn delete_user(
    client: &ApiClient,
    username: &str,
) -> Result<(), ApiError> {
    require_session(client)?;
    client.connectivity().ensure_online()?;

    let endpoint = Endpoint::delete("/auth/users").with_segment(username);
    acknowledge(client, &endpoint).await
}
