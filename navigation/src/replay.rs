//! Location source that replays a recorded GPX file.

use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;

use crate::{
    config::PositionOptions,
    error::GpxError,
    tracking::{LocationError, LocationSource},
    Coordinate,
};

/// Hands out one recorded point per fetch, then keeps reporting the last one.
pub struct GpxReplaySource {
    points: Vec<Coordinate>,
    cursor: AtomicUsize,
}

impl GpxReplaySource {
    pub fn from_points(points: Vec<Coordinate>) -> Result<Self, GpxError> {
        if points.is_empty() {
            return Err(GpxError::Empty);
        }
        Ok(Self {
            points,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, GpxError> {
        let gpx = gpx::read(reader)?;

        // Track points first; fall back to route points, then plain waypoints.
        let mut points: Vec<Coordinate> = gpx
            .tracks
            .iter()
            .flat_map(|track| &track.segments)
            .flat_map(|segment| &segment.points)
            .map(to_coordinate)
            .collect();
        if points.is_empty() {
            points = gpx
                .routes
                .iter()
                .flat_map(|route| &route.points)
                .map(to_coordinate)
                .collect();
        }
        if points.is_empty() {
            points = gpx.waypoints.iter().map(to_coordinate).collect();
        }

        points.retain(Coordinate::is_valid);
        tracing::info!("loaded {} replay points", points.len());
        Self::from_points(points)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, GpxError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor.load(Ordering::SeqCst) >= self.points.len()
    }
}

fn to_coordinate(point: &gpx::Waypoint) -> Coordinate {
    let p = point.point();
    Coordinate {
        lat: p.y(),
        lon: p.x(),
    }
}

#[async_trait]
impl LocationSource for GpxReplaySource {
    async fn current_position(
        &self,
        _options: &PositionOptions,
    ) -> Result<Coordinate, LocationError> {
        let i = self.cursor.fetch_add(1, Ordering::SeqCst);
        let point = self
            .points
            .get(i)
            .or_else(|| self.points.last())
            .copied()
            .ok_or(LocationError::PositionUnavailable)?;
        Ok(point)
    }
}
