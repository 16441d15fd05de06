use crate::{client::ApiClient, endpoint::Endpoint, errors::ApiError};
use serde_derive::Deserialize;

/// What `/health` says about the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
    /// When the server answered, in its own local time.
    pub timestamp: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool { self.status == "ok" }
}

/// Ask the backend whether it is up. No session is required.
pub async fn check_health(
    client: &ApiClient,
    max_retries: u32,
) -> Result<HealthStatus, ApiError> {
    let value = client.request(&Endpoint::get("/health"), max_retries).await?;
    serde_json::from_value(value).map_err(Into::into)
}
