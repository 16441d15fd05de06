//! Client configuration and backend discovery.

use std::{path::PathBuf, time::Duration};
use url::Url;

/// The backend used during local development.
pub const LOCAL_BASE_URL: &str = "http://localhost:5000/api";

/// The hosted backend used by every deployed copy of the frontend.
pub const REMOTE_BASE_URL: &str = "https://hostel-manager-api.onrender.com/api";

/// Long enough for a suspended backend instance to boot and answer.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_VERIFICATION_INTERVAL: Duration =
    Duration::from_secs(12 * 60 * 60);
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(30);

/// Pick a backend based on where the frontend is being served from.
///
/// A page opened from disk, or served from `localhost`/`127.0.0.1` without an
/// explicit port, talks to the local development backend. Anything else
/// (a dev server on some port, a static host, an unknown domain) goes to the
/// hosted backend.
pub fn resolve_base_url(origin: Option<&Url>) -> &'static str {
    let local = match origin {
        None => true,
        Some(origin) if origin.scheme() == "file" => true,
        Some(origin) => match origin.host_str() {
            None | Some("") => true,
            Some("localhost") | Some("127.0.0.1") => origin.port().is_none(),
            Some(_) => false,
        },
    };

    let raw = if local { LOCAL_BASE_URL } else { REMOTE_BASE_URL };
    log::debug!("Resolved the API base URL to {}", raw);

    raw
}

/// Reasons a [`Config`] can't be created.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unable to parse the base URL")]
    BadUrl(#[from] url::ParseError),
    #[error("\"{0}\" can't have endpoint paths appended to it")]
    NotABase(Url),
}

/// Everything needed to construct an [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    base_url: Url,
    /// How long a single attempt may take before it is abandoned.
    pub timeout: Duration,
    /// The fixed delay between consecutive attempts.
    pub retry_backoff: Duration,
    pub max_retries: u32,
    pub verification_interval: Duration,
    pub health_interval: Duration,
    /// Where the session gets persisted. `None` keeps it in memory.
    pub storage_path: Option<PathBuf>,
    pub user_agent: String,
}

impl Config {
    /// Create a config whose base URL is discovered from the frontend's
    /// origin.
    pub fn for_origin(origin: Option<&Url>) -> Result<Self, ConfigError> {
        let base_url = Url::parse(resolve_base_url(origin))?;
        Config::with_base_url(base_url)
    }

    /// Create a config which talks to an explicit backend, bypassing the
    /// hostname heuristics.
    pub fn with_base_url(base_url: Url) -> Result<Self, ConfigError> {
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::NotABase(base_url));
        }

        Ok(Config {
            base_url,
            timeout: DEFAULT_TIMEOUT,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            max_retries: DEFAULT_MAX_RETRIES,
            verification_interval: DEFAULT_VERIFICATION_INTERVAL,
            health_interval: DEFAULT_HEALTH_INTERVAL,
            storage_path: None,
            user_agent: String::from(crate::DEFAULT_USER_AGENT),
        })
    }

    /// The backend's base URL, endpoint paths get appended to this.
    pub fn base_url(&self) -> &Url { &self.base_url }

    /// The full URL for a route like `/auth/users` followed by `segments`.
    ///
    /// Each segment is percent-encoded as a single path component, so a `/`
    /// inside a username can't reach a different route. [`Url::join()`] isn't
    /// used because it would discard the `/api` prefix.
    pub fn endpoint_url<'a, I>(&self, route: &str, segments: I) -> Url
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base_url.clone();

        // with_base_url() rejects cannot-be-a-base URLs
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(route.split('/').filter(|s| !s.is_empty()))
                .extend(segments);
        }

        url
    }
}
