use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::RadarError;

/// Configuration for the radar.
///
/// Serializes with human-readable durations (`"10s"`, `"250ms"`), so a
/// config file only needs the fields it changes:
///
/// ```rust
/// use radar_protocol::RadarConfig;
///
/// let config: RadarConfig = serde_json::from_str(r#"{ "max_neigh": 8, "max_wait_time": "2s" }"#).unwrap();
/// assert_eq!(config.max_neigh, 8);
/// assert!(!config.multipath);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    /// Aggregate latency across all devices instead of pinning the best one.
    pub multipath: bool,
    /// Probes dispatched per cycle.
    pub bouquet_size: u32,
    /// Neighbor table capacity, and size of the ID space.
    pub max_neigh: usize,
    /// How long replies are collected after the bouquet goes out.
    #[serde(with = "humantime_serde")]
    pub max_wait_time: Duration,
    /// Relative RTT change above which `RttChanged` is emitted.
    pub rtt_variation_threshold: f64,
    /// Pause between two cycles.
    #[serde(with = "humantime_serde")]
    pub cycle_interval: Duration,
    /// Events buffered per subscriber before slow ones start losing them.
    pub event_buffer: usize,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            multipath: false,
            bouquet_size: 16,
            max_neigh: 16,
            max_wait_time: Duration::from_secs(10),
            rtt_variation_threshold: 0.1,
            cycle_interval: Duration::ZERO,
            event_buffer: 256,
        }
    }
}

impl RadarConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multipath(mut self, enabled: bool) -> Self {
        self.multipath = enabled;
        self
    }

    pub fn bouquet_size(mut self, probes: u32) -> Self {
        self.bouquet_size = probes;
        self
    }

    pub fn max_neigh(mut self, capacity: usize) -> Self {
        self.max_neigh = capacity;
        self
    }

    pub fn max_wait_time(mut self, wait: Duration) -> Self {
        self.max_wait_time = wait;
        self
    }

    pub fn rtt_variation_threshold(mut self, threshold: f64) -> Self {
        self.rtt_variation_threshold = threshold;
        self
    }

    pub fn cycle_interval(mut self, interval: Duration) -> Self {
        self.cycle_interval = interval;
        self
    }

    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity;
        self
    }

    /// Check every option is inside its allowed range.
    pub fn validate(&self) -> Result<(), RadarError> {
        if self.bouquet_size == 0 {
            return Err(RadarError::Config("bouquet_size must be at least 1".into()));
        }
        if self.max_neigh == 0 {
            return Err(RadarError::Config("max_neigh must be at least 1".into()));
        }
        if self.max_wait_time.is_zero() {
            return Err(RadarError::Config("max_wait_time must be positive".into()));
        }
        let t = self.rtt_variation_threshold;
        if !(t > 0.0 && t < 1.0) {
            return Err(RadarError::Config(format!(
                "rtt_variation_threshold must be in (0, 1), got {t}"
            )));
        }
        if self.event_buffer == 0 {
            return Err(RadarError::Config("event_buffer must be at least 1".into()));
        }
        Ok(())
    }
}
