use std::{env, fmt::Display, str::FromStr, time::Duration};

use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_ROUTE_URL: &str = "https://apis.openapi.sk.com/tmap/routes/pedestrian";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Options passed to the platform location service on every poll.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached reading the platform may return.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_millis(15_000),
            maximum_age: Duration::from_millis(30_000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingConfig {
    pub interval: Duration,
    pub min_distance_m: f64,
    pub position: PositionOptions,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(5_000),
            min_distance_m: 10.0,
            position: PositionOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowConfig {
    pub window_size: usize,
    pub arrival_threshold_m: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_size: 4,
            arrival_threshold_m: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutingConfig {
    pub url: String,
    pub app_key: String,
    pub min_interval: Duration,
    pub cooldown: Duration,
    pub start_name: String,
    pub end_name: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_ROUTE_URL.to_string(),
            app_key: String::new(),
            min_interval: Duration::from_millis(2_000),
            cooldown: Duration::from_millis(60_000),
            start_name: "출발지".to_string(),
            end_name: "도착지".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NavigationConfig {
    pub tracking: TrackingConfig,
    pub window: WindowConfig,
    pub routing: RoutingConfig,
}

impl NavigationConfig {
    /// Defaults overlaid with whatever `TMAP_*` / `NAV_*` variables are set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(key) = var("TMAP_APP_KEY") {
            config.routing.app_key = key;
        } else {
            warn!("TMAP_APP_KEY not set, pedestrian routing requests will be rejected");
        }
        if let Some(url) = var("TMAP_ROUTE_URL") {
            config.routing.url = url;
        }
        if let Some(ms) = parse_var::<u64>("NAV_POLL_INTERVAL_MS")? {
            config.tracking.interval = poll_interval("NAV_POLL_INTERVAL_MS", ms)?;
        }
        if let Some(m) = parse_var("NAV_MIN_DISTANCE_M")? {
            config.tracking.min_distance_m = m;
        }
        if let Some(size) = parse_var("NAV_WINDOW_SIZE")? {
            config.window.window_size = size;
        }
        if let Some(m) = parse_var("NAV_ARRIVAL_THRESHOLD_M")? {
            config.window.arrival_threshold_m = m;
        }

        Ok(config)
    }
}

/// A zero period would stall the poller, so it is rejected.
pub fn poll_interval(key: &'static str, ms: u64) -> Result<Duration, ConfigError> {
    if ms == 0 {
        return Err(ConfigError::Invalid {
            key,
            message: "polling interval must be at least 1ms".to_string(),
        });
    }
    Ok(Duration::from_millis(ms))
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T::Err: Display,
{
    match var(key) {
        None => Ok(None),
        Some(raw) => {
            debug!("{key}={raw}");
            raw.trim()
                .parse()
                .map(Some)
                .map_err(|e: T::Err| ConfigError::Invalid {
                    key,
                    message: e.to_string(),
                })
        }
    }
}
