use crate::{storage::StorageError, transport::TransportError};

/// Everything that can go wrong while talking to the backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Every attempt failed before the server could answer.
    #[error(
        "Unable to reach the server after {} attempts. It may still be waking \
         up, try again in a minute",
        attempts
    )]
    NetworkUnavailable { attempts: u32 },
    /// The last attempt was abandoned because it took too long.
    #[error("The request timed out after {} attempts", attempts)]
    Timeout { attempts: u32 },
    /// The request couldn't be put on the wire (e.g. an illegal header
    /// value). It was never sent and won't be retried.
    #[error("Unable to build the request: {}", message)]
    InvalidRequest { message: String },
    /// The server answered with a non-2xx status.
    #[error("{}", message)]
    Application { status: u16, message: String },
    /// The server said everything was fine, but sent back garbage.
    #[error("Unable to parse the response")]
    MalformedResponse(#[from] serde_json::Error),
    /// A write was refused because the last health probe failed.
    #[error("The server is unavailable, changes were not saved")]
    ServerOffline,
    /// The endpoint requires a session and there isn't one.
    #[error("Not logged in")]
    NotLoggedIn,
}

impl ApiError {
    /// Was this caused by the network rather than by the server's answer?
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ApiError::NetworkUnavailable { .. } | ApiError::Timeout { .. }
        )
    }

    /// The HTTP status code, if the server sent one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Application { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn exhausted(last: TransportError, attempts: u32) -> Self {
        match last {
            TransportError::TimedOut => ApiError::Timeout { attempts },
            TransportError::Connect(_) => {
                ApiError::NetworkUnavailable { attempts }
            },
            TransportError::InvalidRequest(message) => {
                ApiError::InvalidRequest { message }
            },
        }
    }
}

/// Errors that may occur while setting up an [`ApiClient`](crate::ApiClient).
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Unable to create the HTTP client")]
    HttpClient(#[from] reqwest::Error),
    #[error("Unable to load the saved session")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_and_connection_failures_are_distinguishable() {
        let timeout = ApiError::exhausted(TransportError::TimedOut, 3);
        let refused = ApiError::exhausted(
            TransportError::Connect(String::from("connection refused")),
            3,
        );

        assert!(matches!(timeout, ApiError::Timeout { attempts: 3 }));
        assert!(matches!(refused, ApiError::NetworkUnavailable { attempts: 3 }));
        assert!(timeout.to_string().contains("timed out"));
        assert!(refused.to_string().contains("waking up"));
        assert!(timeout.is_transport() && refused.is_transport());
    }

    #[test]
    fn malformed_requests_are_not_network_errors() {
        let err = ApiError::exhausted(
            TransportError::InvalidRequest(String::from("bad header")),
            1,
        );

        assert!(matches!(err, ApiError::InvalidRequest { .. }));
        assert!(err.to_string().contains("bad header"));
        assert!(!err.is_transport());
    }

    #[test]
    fn application_errors_show_the_server_message() {
        let err = ApiError::Application {
            status: 404,
            message: String::from("User not found"),
        };

        assert_eq!(err.to_string(), "User not found");
        assert_eq!(err.status(), Some(404));
        assert!(!err.is_transport());
    }
}
