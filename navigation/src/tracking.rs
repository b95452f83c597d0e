//! Geolocation polling.
//!
//! [`LocationPoller`] asks a [`LocationSource`] for the device position on a
//! fixed interval and publishes a de-noised [`TrackingState`] through a
//! `watch` channel. Readings closer than `min_distance_m` to the last
//! published location are dropped without touching the published state, so
//! GPS jitter does not trigger downstream route refetches.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use thiserror::Error;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    config::{PositionOptions, TrackingConfig},
    geo::haversine_m,
    Coordinate,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("location request timed out")]
    Timeout,
    #[error("location service not supported")]
    Unsupported,
}

impl LocationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            LocationError::PermissionDenied => {
                "위치 권한이 거부되었습니다. 브라우저 설정에서 위치 권한을 허용해주세요."
            }
            LocationError::PositionUnavailable => "위치 정보를 사용할 수 없습니다.",
            LocationError::Timeout => "위치 요청 시간이 초과되었습니다.",
            LocationError::Unsupported => "위치 서비스가 지원되지 않습니다.",
        }
    }
}

/// Platform location service.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_position(&self, options: &PositionOptions)
        -> Result<Coordinate, LocationError>;
}

/// Keeps the last accepted reading and rejects readings that moved less than
/// the threshold away from it.
#[derive(Debug, Clone)]
pub struct LocationFilter {
    min_distance_m: f64,
    last: Option<Coordinate>,
}

impl LocationFilter {
    pub fn new(min_distance_m: f64) -> Self {
        Self {
            min_distance_m,
            last: None,
        }
    }

    pub fn last(&self) -> Option<Coordinate> {
        self.last
    }

    /// Returns `true` and records the reading as the new reference point when
    /// it should be published.
    pub fn accept(&mut self, reading: Coordinate) -> bool {
        if let Some(prev) = self.last {
            let moved = haversine_m(prev, reading);
            if moved < self.min_distance_m {
                tracing::debug!(
                    "location moved {moved:.1}m, below {}m threshold",
                    self.min_distance_m
                );
                return false;
            }
            tracing::debug!("location moved {moved:.1}m");
        }
        self.last = Some(reading);
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackingState {
    pub current: Option<Coordinate>,
    pub error: Option<String>,
    pub tracking: bool,
}

/// `time::interval` panics on a zero period.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

pub struct LocationPoller {
    state: watch::Receiver<TrackingState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl LocationPoller {
    /// Spawns the polling task. The first fetch happens immediately.
    pub fn start(source: Arc<dyn LocationSource>, config: TrackingConfig) -> Self {
        let (tx, rx) = watch::channel(TrackingState {
            tracking: true,
            ..Default::default()
        });
        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll_loop(source, config, tx, cancel.clone()));

        tracing::info!(
            "location tracking started, polling every {}ms",
            config.interval.as_millis()
        );

        Self {
            state: rx,
            cancel,
            task,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<TrackingState> {
        self.state.clone()
    }

    pub fn state(&self) -> TrackingState {
        self.state.borrow().clone()
    }

    pub fn is_tracking(&self) -> bool {
        !self.cancel.is_cancelled() && !self.task.is_finished()
    }

    /// Cancels the polling loop. Calling it again is a no-op.
    pub fn stop(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        tracing::info!("location tracking stopped");
    }
}

impl Drop for LocationPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll_loop(
    source: Arc<dyn LocationSource>,
    config: TrackingConfig,
    tx: watch::Sender<TrackingState>,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(config.interval.max(MIN_POLL_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut filter = LocationFilter::new(config.min_distance_m);
    let mut in_flight = FuturesUnordered::new();
    let mut next_tick: u64 = 0;
    let mut newest_seen: Option<u64> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                in_flight.push(fetch_position(next_tick, source.clone(), config.position));
                next_tick += 1;
            }
            Some((tick, result)) = in_flight.next(), if !in_flight.is_empty() => {
                // A slow fetch from an earlier tick must not overwrite a newer one.
                if newest_seen.is_some_and(|newest| tick < newest) {
                    tracing::debug!("dropping stale reading from tick {tick}");
                    continue;
                }
                newest_seen = Some(tick);
                publish(&tx, &mut filter, result);
            }
        }
    }

    // Pending fetches are dropped with `in_flight`.
    tx.send_modify(|state| state.tracking = false);
}

async fn fetch_position(
    tick: u64,
    source: Arc<dyn LocationSource>,
    options: PositionOptions,
) -> (u64, Result<Coordinate, LocationError>) {
    let result = match time::timeout(options.timeout, source.current_position(&options)).await {
        Ok(result) => result,
        Err(_) => Err(LocationError::Timeout),
    };
    (tick, result)
}

fn publish(
    tx: &watch::Sender<TrackingState>,
    filter: &mut LocationFilter,
    result: Result<Coordinate, LocationError>,
) {
    match result {
        Ok(reading) if !reading.is_valid() => {
            tracing::warn!("discarding invalid location reading {reading:?}");
        }
        Ok(reading) => {
            if filter.accept(reading) {
                tracing::debug!("current location {:.6}, {:.6}", reading.lat, reading.lon);
                tx.send_modify(|state| {
                    state.current = Some(reading);
                    state.error = None;
                });
            }
        }
        Err(err) => {
            tracing::warn!("location fetch failed: {err}");
            let message = Some(err.user_message().to_string());
            tx.send_if_modified(|state| {
                if state.error == message {
                    false
                } else {
                    state.error = message;
                    true
                }
            });
        }
    }
}
