//! Client-side walking navigation: location polling, a rate-limited
//! pedestrian routing client, the waypoint window and the navigation session
//! that ties them together.

pub mod config;
pub mod error;
pub mod geo;
pub mod gpx_export;
pub mod pedestrian;
pub mod replay;
pub mod session;
pub mod stopwatch;
pub mod throttle;
pub mod tracking;
pub mod window;

pub use shared::{Coordinate, RoutePlan, TimerSnapshot, TripSummary, Waypoint};
