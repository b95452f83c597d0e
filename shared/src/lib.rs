use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod api;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("coordinate out of range: lat={lat}, lon={lon}")]
pub struct InvalidCoordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn try_new(lat: f64, lon: f64) -> Result<Self, InvalidCoordinate> {
        let coord = Self { lat, lon };
        if coord.is_valid() {
            Ok(coord)
        } else {
            Err(InvalidCoordinate { lat, lon })
        }
    }

    /// Finite, latitude in [-90, 90] and longitude in [-180, 180].
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// A coordinate with its ordinal position in the route it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub position: usize,
    pub coord: Coordinate,
}

/// A generated walking route: the start point plus the ordered waypoints to
/// visit before returning to the start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePlan {
    pub start: Coordinate,
    pub waypoints: Vec<Waypoint>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub distance_km: f64,
}

impl RoutePlan {
    pub fn new(start: Coordinate, points: impl IntoIterator<Item = Coordinate>) -> Self {
        let waypoints = points
            .into_iter()
            .filter(Coordinate::is_valid)
            .enumerate()
            .map(|(position, coord)| Waypoint { position, coord })
            .collect();

        Self {
            start,
            waypoints,
            title: String::new(),
            summary: String::new(),
            distance_km: 0.0,
        }
    }
}

impl TryFrom<api::RouteGenerationResponse> for RoutePlan {
    type Error = InvalidCoordinate;

    /// The backend sends `X` as longitude and `Y` as latitude. Points outside
    /// the valid range are dropped; an invalid start rejects the whole plan.
    fn try_from(res: api::RouteGenerationResponse) -> Result<Self, Self::Error> {
        let start = Coordinate::try_new(res.route_start_y, res.route_start_x)?;
        let points = res.points.iter().map(|p| Coordinate {
            lat: p.point_y,
            lon: p.point_x,
        });

        Ok(Self {
            title: res.title,
            summary: res.summary,
            distance_km: res.distance_in_km,
            ..Self::new(start, points)
        })
    }
}

/// Stopwatch state handed to the feedback step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub start_time: Option<DateTime<Utc>>,
    pub duration: u64,
    pub is_running: bool,
}

/// Everything the feedback step receives when a navigation ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSummary {
    pub timer: TimerSnapshot,
    pub visited_waypoints: usize,
    pub total_waypoints: usize,
    pub waypoints: Vec<Waypoint>,
}
