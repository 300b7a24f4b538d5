use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration as StdDuration,
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use serde::Serialize;

use super::cache::OffsetCache;
use crate::db::models::TimeSource;
use crate::settings::ReferenceTimeSettings;

pub trait DeviceClock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl DeviceClock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<T: DeviceClock + ?Sized> DeviceClock for Arc<T> {
    fn now(&self) -> DateTime<Utc> {
        self.as_ref().now()
    }
}

/// Client for a network time server. Implementations should give up on
/// their own after `timeout`; the service also enforces it.
pub trait NetworkClock: Send + Sync {
    /// False when there is no client to ask, so no server is tried at all.
    fn is_available(&self) -> bool {
        true
    }

    fn fetch(
        &self,
        server: &str,
        timeout: StdDuration,
    ) -> impl Future<Output = Result<DateTime<Utc>>> + Send;
}

/// Network client that never answers, leaving the device clock in charge.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNetwork;

impl NetworkClock for NoNetwork {
    fn is_available(&self) -> bool {
        false
    }

    async fn fetch(&self, server: &str, _timeout: StdDuration) -> Result<DateTime<Utc>> {
        Err(anyhow!("network time is not available (asked {server})"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceTime {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    pub source: TimeSource,
    /// Only set when a server answered for this call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
}

pub struct ReferenceTimeService<N = NoNetwork, D = SystemClock> {
    network: N,
    device: D,
    settings: ReferenceTimeSettings,
    cache: Mutex<OffsetCache>,
}

impl ReferenceTimeService {
    pub fn device_only(settings: ReferenceTimeSettings) -> Self {
        Self::new(NoNetwork, SystemClock, settings)
    }
}

impl<N: NetworkClock, D: DeviceClock> ReferenceTimeService<N, D> {
    pub fn new(network: N, device: D, settings: ReferenceTimeSettings) -> Self {
        let ttl = Duration::milliseconds(settings.cache_ttl_ms.try_into().unwrap_or(i64::MAX));
        Self {
            network,
            device,
            settings,
            cache: Mutex::new(OffsetCache::new(ttl)),
        }
    }

    /// Best available "true" time.
    ///
    /// A fresh cached offset is applied to the device clock without touching
    /// the network. Otherwise servers are asked in order and the first answer
    /// is used and cached. If every server fails the device clock is used.
    pub async fn reference_time(&self) -> ReferenceTime {
        if !self.network_enabled() {
            return self.device_time();
        }

        let now = self.device.now();
        let cached = self.cache().get(now);
        if let Some(offset_ms) = cached {
            return ReferenceTime {
                timestamp: now + Duration::milliseconds(offset_ms),
                source: TimeSource::Ntp,
                server: None,
            };
        }

        let timeout = StdDuration::from_millis(self.settings.timeout_ms);
        for server in &self.settings.servers {
            match tokio::time::timeout(timeout, self.network.fetch(server, timeout)).await {
                Ok(Ok(network_time)) => {
                    let device_now = self.device.now();
                    let offset_ms = (network_time - device_now).num_milliseconds();
                    self.cache().store(offset_ms, device_now);
                    debug!("Synced with {server}, offset {offset_ms}ms");
                    return ReferenceTime {
                        timestamp: network_time,
                        source: TimeSource::Ntp,
                        server: Some(server.clone()),
                    };
                }
                Ok(Err(err)) => warn!("Time server {server} failed: {err:#}"),
                Err(_) => warn!(
                    "Time server {server} timed out after {}ms",
                    self.settings.timeout_ms
                ),
            }
        }

        debug!("No time server answered, using device clock");
        self.device_time()
    }

    /// Whether captures can ask a time server at all.
    pub fn network_enabled(&self) -> bool {
        self.settings.prefer_network && self.network.is_available()
    }

    pub fn device_time(&self) -> ReferenceTime {
        ReferenceTime {
            timestamp: self.device.now(),
            source: TimeSource::Device,
            server: None,
        }
    }

    pub fn clear_cache(&self) {
        self.cache().invalidate();
    }

    fn cache(&self) -> MutexGuard<'_, OffsetCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
