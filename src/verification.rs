//! Keeping the cached session honest.
//!
//! Only an explicit answer from the server can end a session. If the server
//! can't be reached the session is assumed to still be valid and the check is
//! tried again on the next tick, so a flaky connection never logs anyone out.

use crate::{
    client::ApiClient,
    endpoints::{self, Verification},
    errors::ApiError,
    session::User,
    timer::TaskSlot,
};
use std::sync::Arc;
use tokio::{
    sync::watch,
    time::{Instant, MissedTickBehavior},
};

/// What we currently believe about the cached session.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VerificationState {
    /// Nobody has asked the server yet.
    Unverified,
    Verified,
    /// The server rejected the token and the session has been cleared.
    Expired,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct VerificationStatus {
    pub state: VerificationState,
    /// The last check couldn't reach the server, so `state` is a guess.
    pub degraded: bool,
}

impl VerificationStatus {
    const fn new(state: VerificationState, degraded: bool) -> Self {
        VerificationStatus { state, degraded }
    }
}

/// The result of [`SessionVerifier::verify_on_load()`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// The server confirmed the token.
    Verified,
    /// There was nothing to verify, so no request was made.
    NoToken,
    /// The server rejected the token and the session was cleared.
    InvalidToken,
    /// The server couldn't be reached. The session is kept.
    NetworkError,
}

impl VerifyOutcome {
    /// Should the session still be treated as logged in?
    pub fn is_valid(self) -> bool {
        matches!(self, VerifyOutcome::Verified | VerifyOutcome::NetworkError)
    }

    pub fn reason(self) -> Option<&'static str> {
        match self {
            VerifyOutcome::Verified => None,
            VerifyOutcome::NoToken => Some("no_token"),
            VerifyOutcome::InvalidToken => Some("invalid_token"),
            VerifyOutcome::NetworkError => Some("network_error"),
        }
    }
}

/// Checks the cached session on start-up and then periodically.
#[derive(Debug)]
pub struct SessionVerifier {
    inner: Arc<Inner>,
    timer: TaskSlot,
}

#[derive(Debug)]
struct Inner {
    client: ApiClient,
    status: watch::Sender<VerificationStatus>,
}

enum Check {
    Valid(Option<User>),
    Invalid,
    Unknown(ApiError),
}

impl SessionVerifier {
    pub fn new(client: ApiClient) -> Self {
        let (status, _) = watch::channel(VerificationStatus::new(
            VerificationState::Unverified,
            false,
        ));

        SessionVerifier {
            inner: Arc::new(Inner { client, status }),
            timer: TaskSlot::default(),
        }
    }

    pub fn status(&self) -> VerificationStatus { *self.inner.status.borrow() }

    /// Get notified whenever the [`VerificationStatus`] changes, e.g. so the
    /// UI can return to the login screen once a session expires.
    pub fn subscribe(&self) -> watch::Receiver<VerificationStatus> {
        self.inner.status.subscribe()
    }

    /// Check the cached session against the server, starting the periodic
    /// check if it is (or might be) valid.
    pub async fn verify_on_load(&self) -> VerifyOutcome {
        if !self.inner.client.session().is_logged_in() {
            log::debug!("No cached session to verify");
            return VerifyOutcome::NoToken;
        }

        log::debug!("Verifying the cached session");

        match self.inner.check().await {
            Check::Valid(user) => {
                self.inner.confirm(user);
                self.start_timer();
                VerifyOutcome::Verified
            },
            Check::Invalid => {
                self.stop_timer();
                self.inner.expire();
                VerifyOutcome::InvalidToken
            },
            Check::Unknown(e) => {
                log::warn!("Unable to verify the session, assuming it is still valid: {}", e);
                self.inner.publish(VerificationState::Verified, true);
                self.start_timer();
                VerifyOutcome::NetworkError
            },
        }
    }

    /// Re-check the session every
    /// [`Config::verification_interval`](crate::Config::verification_interval),
    /// replacing any timer that's already running.
    pub fn start_timer(&self) {
        let inner = Arc::clone(&self.inner);
        let period = inner.client.config().verification_interval;
        log::debug!("Re-verifying the session every {:?}", period);

        self.timer.replace(async move {
            let mut ticks = tokio::time::interval_at(Instant::now() + period, period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticks.tick().await;

                if !inner.tick().await {
                    break;
                }
            }
        });
    }

    pub fn stop_timer(&self) {
        if self.timer.stop() {
            log::debug!("Stopped the session verification timer");
        }
    }

    pub fn is_running(&self) -> bool { self.timer.is_running() }
}

impl Inner {
    async fn check(&self) -> Check {
        let max_retries = self.client.config().max_retries;

        match endpoints::verify_token(&self.client, max_retries).await {
            Ok(Verification { valid: true, user }) => Check::Valid(user),
            Ok(Verification { valid: false, .. }) => Check::Invalid,
            Err(ApiError::Application { status: 401, .. }) => Check::Invalid,
            Err(e) => Check::Unknown(e),
        }
    }

    /// One periodic check. Returns `false` once there is nothing left to
    /// verify.
    async fn tick(&self) -> bool {
        log::debug!("Periodic session check");

        match self.check().await {
            Check::Valid(user) => {
                self.confirm(user);
                true
            },
            Check::Invalid => {
                self.expire();
                false
            },
            Check::Unknown(ApiError::NotLoggedIn) => {
                log::debug!("The session is gone, nothing left to verify");
                false
            },
            Check::Unknown(e) => {
                // the next tick will try again
                log::warn!("Periodic session check failed: {}", e);
                self.publish(VerificationState::Verified, true);
                true
            },
        }
    }

    fn confirm(&self, user: Option<User>) {
        log::info!("The session is still valid");

        if let Some(user) = user {
            if let Err(e) = self.client.session().update_user(user) {
                log::warn!("Unable to save the refreshed user details: {}", e);
            }
        }

        self.publish(VerificationState::Verified, false);
    }

    fn expire(&self) {
        log::info!("The server rejected the session, logging out");

        // the in-memory session is gone even if the saved copy lingers
        if let Err(e) = self.client.session().clear() {
            log::error!("Unable to remove the saved session: {}", e);
        }

        self.publish(VerificationState::Expired, false);
    }

    fn publish(&self, state: VerificationState, degraded: bool) {
        self.status
            .send_replace(VerificationStatus::new(state, degraded));
    }
}
