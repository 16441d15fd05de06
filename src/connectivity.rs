//! Tracking whether the backend is reachable.

use crate::{client::ApiClient, endpoints, errors::ApiError, timer::TaskSlot};
use std::{
    fmt::{self, Debug, Formatter},
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};
use tokio::time::{Instant, MissedTickBehavior};

/// The process-wide belief about whether the server is up.
///
/// Anything which writes data should consult this first, so changes aren't
/// silently lost while the backend is unreachable.
pub struct Connectivity {
    online: AtomicBool,
    last_check: Mutex<Option<Instant>>,
}

impl Connectivity {
    pub fn is_online(&self) -> bool { self.online.load(Ordering::SeqCst) }

    /// When the last health probe finished, if there has been one.
    pub fn last_check(&self) -> Option<Instant> {
        *self.last_check.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn record(&self, online: bool) {
        let mut last_check =
            self.last_check.lock().unwrap_or_else(|e| e.into_inner());

        let was_online = self.online.swap(online, Ordering::SeqCst);
        *last_check = Some(Instant::now());

        match (was_online, online) {
            (true, false) => log::warn!("The server is unavailable"),
            (false, true) => log::info!("The server is reachable again"),
            _ => {},
        }
    }

    /// Fail with [`ApiError::ServerOffline`] if the last probe said the
    /// server was down.
    pub fn ensure_online(&self) -> Result<(), ApiError> {
        if self.is_online() {
            Ok(())
        } else {
            log::warn!("Refusing to save while the server is unavailable");
            Err(ApiError::ServerOffline)
        }
    }
}

impl Default for Connectivity {
    fn default() -> Connectivity {
        Connectivity {
            online: AtomicBool::new(true),
            last_check: Mutex::new(None),
        }
    }
}

impl Debug for Connectivity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connectivity")
            .field("online", &self.is_online())
            .field("last_check", &self.last_check())
            .finish()
    }
}

/// Periodically pings `/health` and updates the client's [`Connectivity`].
#[derive(Debug)]
pub struct HealthMonitor {
    client: ApiClient,
    task: TaskSlot,
}

impl HealthMonitor {
    pub fn new(client: ApiClient) -> Self {
        HealthMonitor {
            client,
            task: TaskSlot::default(),
        }
    }

    /// Ping the server once, without retrying, and record the result.
    pub async fn probe(&self) -> bool { probe(&self.client).await }

    /// Probe straight away and then every
    /// [`Config::health_interval`](crate::Config::health_interval).
    ///
    /// Calling this while the monitor is already running restarts it.
    pub fn start(&self) {
        let client = self.client.clone();
        let period = client.config().health_interval;
        log::debug!("Checking the server's health every {:?}", period);

        self.task.replace(async move {
            let mut ticks = tokio::time::interval(period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticks.tick().await;
                probe(&client).await;
            }
        });
    }

    pub fn stop(&self) {
        if self.task.stop() {
            log::debug!("Stopped the health monitor");
        }
    }

    pub fn is_running(&self) -> bool { self.task.is_running() }
}

async fn probe(client: &ApiClient) -> bool {
    let online = match endpoints::check_health(client, 0).await {
        Ok(health) => {
            log::trace!("Health: {:?}", health);
            true
        },
        Err(e) => {
            log::debug!("Health check failed: {}", e);
            false
        },
    };

    client.connectivity().record(online);
    online
}
