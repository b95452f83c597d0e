//! A walk in progress: location updates drive the waypoint window, the
//! window drives route legs, and the stopwatch times the whole thing.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{sync::watch, time::Instant};
use tokio_util::sync::CancellationToken;

use crate::{
    config::WindowConfig,
    error::RouteError,
    geo::haversine_m,
    pedestrian::{Leg, PedestrianClient, RouteNavigation, RouteStep},
    stopwatch::Stopwatch,
    tracking::TrackingState,
    window::WaypointWindow,
    Coordinate, RoutePlan, TripSummary, Waypoint,
};

/// What a map renderer needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapFrame {
    pub current: Option<Coordinate>,
    pub start: Coordinate,
    pub active_waypoints: Vec<Waypoint>,
    pub destination: Coordinate,
    pub path: Vec<Coordinate>,
    pub steps: Vec<RouteStep>,
    pub status: String,
    pub loading: bool,
    pub is_return_leg: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub advanced: bool,
    pub refetched: bool,
    pub route_error: Option<RouteError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// All waypoints visited and the walker is back at the start.
    Arrived,
    Cancelled,
    TrackingStopped,
}

pub struct NavigationSession {
    window: WaypointWindow,
    route: RouteNavigation,
    stopwatch: Stopwatch,
    current_location: Option<Coordinate>,
    /// The current leg has not been fetched successfully yet.
    pending_leg: bool,
}

impl NavigationSession {
    pub fn new(plan: &RoutePlan, client: Arc<PedestrianClient>, config: WindowConfig) -> Self {
        let window = WaypointWindow::new(plan.start, plan.waypoints.clone(), config);
        let leg = Leg {
            start: plan.start,
            end: window.destination(),
            waypoints: window.active_coords(),
        };

        Self {
            route: RouteNavigation::new(client, leg),
            window,
            stopwatch: Stopwatch::new(),
            current_location: None,
            pending_leg: true,
        }
    }

    pub fn window(&self) -> &WaypointWindow {
        &self.window
    }

    pub fn route(&self) -> &RouteNavigation {
        &self.route
    }

    pub fn current_location(&self) -> Option<Coordinate> {
        self.current_location
    }

    /// Fetches the first leg from the route start.
    pub async fn begin(&mut self) -> Result<(), RouteError> {
        tracing::info!(
            "navigation started with {} waypoints",
            self.window.waypoints().len()
        );
        let result = self.route.ensure_initial_route().await;
        self.pending_leg = result.is_err();
        result
    }

    pub async fn on_location(&mut self, location: Coordinate) -> SessionUpdate {
        self.current_location = Some(location);

        let advanced = self.window.observe(location);
        if advanced {
            self.route.set_leg(self.leg_from(location));
            self.pending_leg = true;
        }

        let mut update = SessionUpdate {
            advanced,
            ..Default::default()
        };
        if !self.pending_leg {
            return update;
        }

        // A leg that could not be fetched earlier starts from where the
        // walker is now.
        if !advanced {
            self.route.set_leg(self.leg_from(location));
        }
        match self.route.refetch().await {
            Ok(()) => {
                self.pending_leg = false;
                update.refetched = true;
            }
            Err(err) => update.route_error = Some(err),
        }
        update
    }

    /// Re-fetches the current leg on request.
    pub async fn refetch(&mut self) -> Result<(), RouteError> {
        let result = self.route.refetch().await;
        if result.is_ok() {
            self.pending_leg = false;
        }
        result
    }

    fn leg_from(&self, location: Coordinate) -> Leg {
        Leg {
            start: location,
            end: self.window.destination(),
            waypoints: self.window.active_coords(),
        }
    }

    pub fn map_frame(&self) -> MapFrame {
        MapFrame {
            current: self.current_location,
            start: self.window.start(),
            active_waypoints: self.window.active().to_vec(),
            destination: self.window.destination(),
            path: self.route.path().to_vec(),
            steps: self
                .route
                .route()
                .map(|route| route.steps.clone())
                .unwrap_or_default(),
            status: self.route.status().to_string(),
            loading: self.route.is_loading(),
            is_return_leg: self.window.is_return_leg(),
        }
    }

    /// On the return leg and within the arrival threshold of the start.
    pub fn is_complete(&self) -> bool {
        self.window.is_return_leg()
            && self.current_location.is_some_and(|here| {
                haversine_m(here, self.window.start()) < self.window.arrival_threshold_m()
            })
    }

    pub fn start_timer(&mut self, now: Instant) {
        self.stopwatch.start(now);
    }

    pub fn pause_timer(&mut self, now: Instant) {
        self.stopwatch.pause(now);
    }

    pub fn toggle_timer(&mut self, now: Instant) {
        self.stopwatch.toggle(now);
    }

    pub fn reset_timer(&mut self) {
        self.stopwatch.reset();
    }

    pub fn stopwatch(&self) -> &Stopwatch {
        &self.stopwatch
    }

    pub fn end_navigation(&self, now: Instant, wall_now: DateTime<Utc>) -> TripSummary {
        let summary = TripSummary {
            timer: self.stopwatch.snapshot(now, wall_now),
            visited_waypoints: self.window.index(),
            total_waypoints: self.window.waypoints().len(),
            waypoints: self.window.waypoints().to_vec(),
        };
        tracing::info!(
            "navigation ended: {}/{} waypoints in {}s",
            summary.visited_waypoints,
            summary.total_waypoints,
            summary.timer.duration
        );
        summary
    }

    pub fn reset(&mut self) {
        self.window.reset();
        self.stopwatch.reset();
        self.current_location = None;
        self.pending_leg = true;
        self.route.reset(Leg {
            start: self.window.start(),
            end: self.window.destination(),
            waypoints: self.window.active_coords(),
        });
    }
}

/// Feeds published locations into `session` until the walk is complete,
/// tracking stops or `shutdown` fires.
pub async fn drive(
    session: &mut NavigationSession,
    mut tracking: watch::Receiver<TrackingState>,
    shutdown: CancellationToken,
) -> DriveOutcome {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return DriveOutcome::Cancelled,
            changed = tracking.changed() => {
                if changed.is_err() {
                    return DriveOutcome::TrackingStopped;
                }
                let state = tracking.borrow_and_update().clone();
                if let Some(error) = &state.error {
                    tracing::warn!("location unavailable: {error}");
                }
                if !state.tracking {
                    return DriveOutcome::TrackingStopped;
                }
                let Some(location) = state.current else {
                    continue;
                };
                if session.current_location() == Some(location) {
                    continue;
                }

                let update = session.on_location(location).await;
                if let Some(err) = &update.route_error {
                    tracing::debug!("leg not updated: {err}");
                }
                if session.is_complete() {
                    tracing::info!("back at the start");
                    return DriveOutcome::Arrived;
                }
            }
        }
    }
}
