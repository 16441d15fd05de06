//! A resilient client for the Hostel Manager REST API.
//!
//! Requests which never reach the server (the backend is usually asleep and
//! takes a while to boot) are retried, while anything the server actually
//! answers is reported straight back. The [`SessionVerifier`] keeps a cached
//! login honest without logging people out just because the network is
//! flaky.

#![forbid(unsafe_code)]

mod client;
pub mod config;
mod connectivity;
mod endpoint;
pub mod endpoints;
mod errors;
mod session;
pub mod storage;
mod timer;
pub mod transport;
mod verification;

#[cfg(test)]
mod test_support;

pub use client::ApiClient;
pub use config::{Config, ConfigError};
pub use connectivity::{Connectivity, HealthMonitor};
pub use endpoint::{Endpoint, Method};
pub use errors::{ApiError, BuildError};
pub use session::{
    AccountStatus, Role, Session, SessionManager, Token, User, TOKEN_KEY,
    USER_KEY,
};
pub use verification::{
    SessionVerifier, VerificationState, VerificationStatus, VerifyOutcome,
};

/// The default user agent to use when communicating with the backend.
pub const DEFAULT_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "-", env!("CARGO_PKG_VERSION"));
