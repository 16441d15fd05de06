use crate::{
    client::ApiClient,
    endpoint::Endpoint,
    errors::ApiError,
    session::{Session, Token, User},
    storage::StorageError,
};
use serde_derive::{Deserialize, Serialize};

/// Authenticate with the backend and remember the resulting [`Session`].
pub async fn login(
    client: &ApiClient,
    username: &str,
    password: &str,
) -> Result<Session, LoginError> {
    let data = Credentials { username, password };
    let endpoint = Endpoint::post("/auth/login").with_body(serde_json::to_value(&data)?);

    let response: LoginResponse = client.fetch(&endpoint).await?;
    log::trace!("Parsed response: {:#?}", response);

    let session = interpret_response(response)?;
    client.session().set(session.clone())?;

    Ok(session)
}

fn interpret_response(response: LoginResponse) -> Result<Session, LoginError> {
    match response {
        LoginResponse {
            token: Some(token),
            user: Some(user),
            ..
        } => {
            log::info!("Logged in as {} ({:?})", user.username, user.role);
            Ok(Session::new(Token::new(token), user))
        },
        LoginResponse { message, .. } => {
            log::error!("The login response was missing a token or user: {}", message);
            Err(LoginError::IncompleteResponse)
        },
    }
}

/// Create a new account. New accounts have to be approved by an
/// administrator before they can log in.
pub async fn register(
    client: &ApiClient,
    username: &str,
    password: &str,
) -> Result<Registration, ApiError> {
    let data = Credentials { username, password };
    let endpoint = Endpoint::post("/auth/register").with_body(serde_json::to_value(&data)?);

    client.fetch(&endpoint).await
}

/// Ask the server whether the cached token is still any good.
pub async fn verify_token(
    client: &ApiClient,
    max_retries: u32,
) -> Result<Verification, ApiError> {
    super::require_session(client)?;

    let value = client.request(&Endpoint::get("/auth/verify"), max_retries).await?;
    serde_json::from_value(value).map_err(Into::into)
}

/// Forget the current session. The backend has no logout endpoint, tokens
/// just stop being used.
pub fn logout(client: &ApiClient) -> Result<(), StorageError> {
    log::info!("Logging out");
    client.session().clear()
}

#[derive(Debug, Copy, Clone, Serialize)]
struct Credentials<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    message: String,
    token: Option<String>,
    user: Option<User>,
}

/// The server's reply to [`register()`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Registration {
    pub message: String,
    pub username: String,
}

/// The server's verdict on a token.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Verification {
    pub valid: bool,
    #[serde(default)]
    pub user: Option<User>,
}

/// Possible errors that may be returned by [`login()`].
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// The request failed or the server rejected the credentials.
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("The server accepted the login but didn't send back a token and user")]
    IncompleteResponse,
    #[error("Unable to save the session")]
    Storage(#[from] StorageError),
}

impl From<serde_json::Error> for LoginError {
    fn from(err: serde_json::Error) -> LoginError {
        LoginError::Api(ApiError::from(err))
    }
}
