//! The cached credentials and the process-wide session manager.

use crate::storage::{Storage, StorageError};
use serde_derive::{Deserialize, Serialize};
use std::{
    fmt::{self, Debug, Formatter},
    sync::{Arc, Mutex, MutexGuard},
};

/// The storage key for the session token.
pub const TOKEN_KEY: &str = "auth_token";
/// The storage key for the serialized [`User`].
pub const USER_KEY: &str = "current_user";

/// An opaque credential handed out by the server when logging in.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    pub fn new<S: Into<String>>(token: S) -> Self { Token(token.into()) }

    pub fn as_str(&self) -> &str { &self.0 }

    /// The value for an `Authorization` header.
    pub fn bearer(&self) -> String { format!("Bearer {}", self.0) }
}

impl Debug for Token {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("Token(<redacted>)")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Pending,
    Expired,
    Suspended,
}

/// The logged in user, as last reported by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AccountStatus>,
}

impl User {
    pub fn is_admin(&self) -> bool { self.role == Role::Admin }
}

/// A token and the user it belongs to. You never get one without the other.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub struct Session {
    pub token: Token,
    pub user: User,
}

impl Session {
    pub fn new(token: Token, user: User) -> Self { Session { token, user } }
}

/// Owns the cached [`Session`] and keeps it in sync with a [`Storage`].
///
/// Callers never touch the storage directly, which is what guarantees the
/// token and user are always written and removed as a pair.
pub struct SessionManager {
    current: Mutex<Option<Session>>,
    storage: Box<dyn Storage>,
}

impl SessionManager {
    /// Restore whatever session was persisted previously.
    pub fn load(storage: Box<dyn Storage>) -> Result<Self, StorageError> {
        let current = read_session(&*storage)?;

        match current {
            Some(ref session) => {
                log::debug!("Restored the session for {}", session.user.username)
            },
            None => log::debug!("No saved session"),
        }

        Ok(SessionManager {
            current: Mutex::new(current),
            storage,
        })
    }

    /// A manager with nothing saved anywhere.
    pub fn in_memory() -> Self {
        SessionManager {
            current: Mutex::new(None),
            storage: Box::new(crate::storage::MemoryStorage::default()),
        }
    }

    pub fn into_shared(self) -> Arc<Self> { Arc::new(self) }

    pub fn get(&self) -> Option<Session> { self.lock().clone() }

    pub fn token(&self) -> Option<Token> {
        self.lock().as_ref().map(|s| s.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.lock().as_ref().map(|s| s.user.clone())
    }

    pub fn is_logged_in(&self) -> bool { self.lock().is_some() }

    /// Replace the current session.
    pub fn set(&self, session: Session) -> Result<(), StorageError> {
        let mut current = self.lock();

        let user = serde_json::to_string(&session.user)?;
        self.storage.set_many(&[
            (TOKEN_KEY, session.token.as_str()),
            (USER_KEY, user.as_str()),
        ])?;

        log::info!("Saved the session for {}", session.user.username);
        *current = Some(session);

        Ok(())
    }

    /// Swap in fresh user details from the server, keeping the token.
    ///
    /// Does nothing if there is no session to update.
    pub fn update_user(&self, user: User) -> Result<(), StorageError> {
        let mut current = self.lock();

        let session = match current.as_mut() {
            Some(session) => session,
            None => return Ok(()),
        };

        let serialized = serde_json::to_string(&user)?;
        self.storage.set_many(&[(USER_KEY, serialized.as_str())])?;
        session.user = user;

        Ok(())
    }

    /// Forget the token and user.
    ///
    /// The in-memory session is dropped even when removing the saved copy
    /// fails, so no further requests carry the token.
    pub fn clear(&self) -> Result<(), StorageError> {
        let mut current = self.lock();

        if let Some(previous) = current.take() {
            log::info!("Cleared the session for {}", previous.user.username);
        }

        self.storage.remove_many(&[TOKEN_KEY, USER_KEY])
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        // writers never leave the session half-updated
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Debug for SessionManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("current", &*self.lock())
            .finish()
    }
}

fn read_session(storage: &dyn Storage) -> Result<Option<Session>, StorageError> {
    let token = storage.get(TOKEN_KEY)?;
    let user = storage.get(USER_KEY)?;

    match (token, user) {
        (Some(token), Some(user)) => {
            let user: User = serde_json::from_str(&user)?;
            Ok(Some(Session::new(Token::new(token), user)))
        },
        (None, None) => Ok(None),
        _ => {
            log::warn!("Ignoring a half-saved session");
            Ok(None)
        },
    }
}
