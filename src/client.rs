use crate::{
    config::Config,
    connectivity::Connectivity,
    endpoint::Endpoint,
    errors::{ApiError, BuildError},
    session::SessionManager,
    storage::{FileStorage, Storage},
    transport::{
        HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError,
    },
};
use serde::de::DeserializeOwned;
use serde_derive::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// A client for the Hostel Manager backend which retries requests that never
/// reached the server.
#[derive(Clone)]
pub struct ApiClient {
    config: Config,
    transport: Arc<dyn Transport>,
    session: Arc<SessionManager>,
    connectivity: Arc<Connectivity>,
}

impl ApiClient {
    /// Create a client which talks HTTP using [`reqwest`], restoring any
    /// session saved at [`Config::storage_path`].
    pub fn from_config(config: Config) -> Result<Self, BuildError> {
        let transport = ReqwestTransport::with_user_agent(&config.user_agent)?;

        let session = match config.storage_path {
            Some(ref path) => {
                let storage: Box<dyn Storage> =
                    Box::new(FileStorage::new(path.clone()));
                SessionManager::load(storage)?
            },
            None => SessionManager::in_memory(),
        };

        Ok(ApiClient::with_transport(
            config,
            Arc::new(transport),
            session.into_shared(),
        ))
    }

    pub fn with_transport(
        config: Config,
        transport: Arc<dyn Transport>,
        session: Arc<SessionManager>,
    ) -> Self {
        log::debug!("Using the backend at {}", config.base_url());

        ApiClient {
            config,
            transport,
            session,
            connectivity: Arc::new(Connectivity::default()),
        }
    }

    pub fn config(&self) -> &Config { &self.config }

    pub fn session(&self) -> &Arc<SessionManager> { &self.session }

    pub fn connectivity(&self) -> &Arc<Connectivity> { &self.connectivity }

    /// Send a request using the configured retry budget and deserialize the
    /// response.
    pub async fn fetch<T>(&self, endpoint: &Endpoint) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
    {
        let value = self.request(endpoint, self.config.max_retries).await?;
        serde_json::from_value(value).map_err(ApiError::from)
    }

    /// Send a request, retrying up to `max_retries` times if it can't reach
    /// the server.
    ///
    /// An error response from the server is never retried, and neither is a
    /// request the transport refuses to send.
    pub async fn request(
        &self,
        endpoint: &Endpoint,
        max_retries: u32,
    ) -> Result<Value, ApiError> {
        let request = self.prepare(endpoint);
        let mut state = RetryState::Idle;

        loop {
            state = match state {
                RetryState::Idle => RetryState::Attempting { attempt: 0 },
                RetryState::Attempting { attempt } => {
                    log::debug!(
                        "Sending {} {} (attempt {}/{})",
                        request.method,
                        request.url,
                        attempt + 1,
                        max_retries + 1
                    );

                    match self.attempt(request.clone()).await {
                        Ok(response) => RetryState::Succeeded(response),
                        Err(error)
                            if error.is_retryable() && attempt < max_retries =>
                        {
                            log::warn!(
                                "{} {} failed ({}), retrying in {:?}",
                                request.method,
                                request.url,
                                error,
                                self.config.retry_backoff
                            );
                            RetryState::Backoff { attempt }
                        },
                        Err(error) => RetryState::Exhausted {
                            attempts: attempt + 1,
                            error,
                        },
                    }
                },
                RetryState::Backoff { attempt } => {
                    tokio::time::sleep(self.config.retry_backoff).await;
                    RetryState::Attempting {
                        attempt: attempt + 1,
                    }
                },
                RetryState::Exhausted { attempts, error } => {
                    log::error!(
                        "Giving up on {} {} after {} attempts: {}",
                        request.method,
                        request.url,
                        attempts,
                        error
                    );
                    return Err(ApiError::exhausted(error, attempts));
                },
                RetryState::Succeeded(response) => {
                    return interpret_response(response)
                },
            };
        }
    }

    async fn attempt(
        &self,
        request: HttpRequest,
    ) -> Result<HttpResponse, TransportError> {
        let pending = self.transport.send(request);

        match tokio::time::timeout(self.config.timeout, pending).await {
            Ok(outcome) => outcome,
            Err(_) => Err(TransportError::TimedOut),
        }
    }

    fn prepare(&self, endpoint: &Endpoint) -> HttpRequest {
        let mut headers = vec![(
            String::from("Content-Type"),
            String::from("application/json"),
        )];

        if let Some(token) = self.session.token() {
            headers.push((String::from("Authorization"), token.bearer()));
        }

        for (name, value) in &endpoint.headers {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
            headers.push((name.clone(), value.clone()));
        }

        let request = HttpRequest {
            method: endpoint.method,
            url: self.config.endpoint_url(
                &endpoint.path,
                endpoint.segments.iter().map(String::as_str),
            ),
            headers,
            body: endpoint.body.clone(),
        };
        log::trace!("Payload: {:#?}", request.body);

        request
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("connectivity", &self.connectivity)
            .finish()
    }
}

/// Where a single logical request is in its lifecycle.
#[derive(Debug)]
enum RetryState {
    Idle,
    Attempting { attempt: u32 },
    Backoff { attempt: u32 },
    Exhausted { attempts: u32, error: TransportError },
    Succeeded(HttpResponse),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

fn interpret_response(response: HttpResponse) -> Result<Value, ApiError> {
    log::trace!("Response: {}", String::from_utf8_lossy(&response.body));

    if response.is_success() {
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        return serde_json::from_slice(&response.body).map_err(ApiError::from);
    }

    let message = serde_json::from_slice::<ErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.error)
        .unwrap_or_else(|| format!("HTTP {}", response.status));

    log::error!("The server rejected the request with {}: {}", response.status, message);

    Err(ApiError::Application {
        status: response.status,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        endpoint::Method,
        test_support::{alice, client_with, Scripted},
    };
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn successful_requests_return_the_parsed_body() {
        let (client, transport) =
            client_with(vec![Scripted::json(200, json!({ "status": "ok" }))]);

        let got = client.request(&Endpoint::get("/health"), 2).await.unwrap();

        assert_eq!(got, json!({ "status": "ok" }));
        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url.as_str(), "http://localhost:5000/api/health");
        assert_eq!(sent[0].method, Method::Get);
        assert_eq!(sent[0].header("content-type"), Some("application/json"));
        assert_eq!(sent[0].header("Authorization"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn the_token_is_sent_as_a_bearer_header() {
        let (client, transport) =
            client_with(vec![Scripted::json(200, json!({}))]);
        client.session().set(alice()).unwrap();

        client.request(&Endpoint::get("/rooms"), 0).await.unwrap();

        assert_eq!(
            transport.requests()[0].header("authorization"),
            Some("Bearer alice")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn endpoint_headers_override_the_defaults() {
        let (client, transport) =
            client_with(vec![Scripted::json(200, json!({}))]);
        let endpoint =
            Endpoint::post("/rooms").with_header("content-type", "text/plain");

        client.request(&endpoint, 0).await.unwrap();

        let sent = &transport.requests()[0];
        assert_eq!(sent.header("Content-Type"), Some("text/plain"));
        assert_eq!(sent.headers.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failures_are_retried_with_a_fixed_backoff() {
        let (client, transport) = client_with(vec![
            Scripted::refused(),
            Scripted::refused(),
            Scripted::json(200, json!({ "ok": true })),
        ]);

        let got = client.request(&Endpoint::get("/staff"), 2).await.unwrap();

        assert_eq!(got, json!({ "ok": true }));
        let times = transport.times();
        assert_eq!(times.len(), 3);
        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(2));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn never_more_than_max_retries_plus_one_attempts() {
        let (client, transport) = client_with(vec![Scripted::refused(); 10]);

        let got = client.request(&Endpoint::get("/staff"), 3).await;

        assert!(matches!(got, Err(ApiError::NetworkUnavailable { attempts: 4 })));
        assert_eq!(transport.requests().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_means_one_attempt() {
        let (client, transport) = client_with(vec![Scripted::refused(); 2]);

        let got = client.request(&Endpoint::get("/health"), 0).await;

        assert!(matches!(got, Err(ApiError::NetworkUnavailable { attempts: 1 })));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unusable_requests_are_not_retried() {
        let (client, transport) = client_with(vec![
            Scripted::Fail(TransportError::InvalidRequest(String::from(
                "invalid header value",
            ))),
            Scripted::json(200, json!({})),
        ]);

        let got = client.request(&Endpoint::get("/rooms"), 2).await;

        match got {
            Err(err @ ApiError::InvalidRequest { .. }) => {
                assert!(!err.is_transport())
            },
            other => panic!("Unexpected result: {:?}", other),
        }
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn segments_are_escaped_into_the_url() {
        let (client, transport) =
            client_with(vec![Scripted::json(200, json!({}))]);
        let endpoint = Endpoint::delete("/auth/users").with_segment("../rooms/all");

        client.request(&endpoint, 0).await.unwrap();

        assert_eq!(
            transport.requests()[0].url.as_str(),
            "http://localhost:5000/api/auth/users/..%2Frooms%2Fall"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn error_responses_are_never_retried() {
        let (client, transport) = client_with(vec![
            Scripted::json(404, json!({ "error": "User not found" })),
            Scripted::json(200, json!({})),
        ]);

        let got = client.request(&Endpoint::get("/auth/users").with_segment("bob"), 5).await;

        match got {
            Err(ApiError::Application { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "User not found");
            },
            other => panic!("Unexpected result: {:?}", other),
        }
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn error_responses_without_a_message_use_the_status_code() {
        let (client, _) =
            client_with(vec![Scripted::raw(502, "<html>Bad Gateway</html>")]);

        let got = client.request(&Endpoint::get("/rooms"), 0).await;

        match got {
            Err(err) => assert_eq!(err.to_string(), "HTTP 502"),
            Ok(value) => panic!("Unexpected success: {}", value),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_attempts_time_out_and_are_retried() {
        let (client, transport) = client_with(vec![
            Scripted::Hang,
            Scripted::json(200, json!({ "ok": true })),
        ]);

        let got = client.request(&Endpoint::get("/health"), 1).await.unwrap();

        assert_eq!(got, json!({ "ok": true }));
        let times = transport.times();
        assert!(times[1] - times[0] >= Duration::from_secs(62));
    }

    #[tokio::test(start_paused = true)]
    async fn a_final_timeout_is_reported_as_a_timeout() {
        let (client, _) = client_with(vec![Scripted::Hang, Scripted::Hang]);

        let got = client.request(&Endpoint::get("/health"), 1).await;

        assert!(matches!(got, Err(ApiError::Timeout { attempts: 2 })));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_success_bodies_are_null() {
        let (client, _) = client_with(vec![Scripted::raw(204, "")]);

        let got = client.request(&Endpoint::delete("/rooms").with_segment("1"), 0).await;

        assert_eq!(got.unwrap(), Value::Null);
    }

    #[tokio::test(start_paused = true)]
    async fn garbage_success_bodies_are_not_retried() {
        let (client, transport) =
            client_with(vec![Scripted::raw(200, "definitely not json")]);

        let got = client.request(&Endpoint::get("/health"), 2).await;

        assert!(matches!(got, Err(ApiError::MalformedResponse(_))));
        assert_eq!(transport.requests().len(), 1);
    }
}
