use std::io::Write;

use geo_types::Point;
use gpx::{Gpx, GpxVersion, Track, TrackSegment, Waypoint as GpxPoint};

use crate::error::GpxError;
use crate::{Coordinate, Waypoint};

const CREATOR: &str = "walkingcity";

/// Builds a GPX 1.1 document with the route polyline as a single track and
/// the route waypoints as named `wpt` entries.
pub fn route_to_gpx(name: &str, path: &[Coordinate], waypoints: &[Waypoint]) -> Gpx {
    let mut gpx = Gpx {
        version: GpxVersion::Gpx11,
        creator: Some(CREATOR.into()),
        ..Default::default()
    };

    for wp in waypoints {
        let mut point = to_point(&wp.coord);
        point.name = Some(format!("waypoint {}", wp.position + 1));
        gpx.waypoints.push(point);
    }

    let mut track = Track {
        name: Some(name.to_string()),
        ..Default::default()
    };
    let mut segment = TrackSegment::new();
    segment.points.extend(path.iter().map(to_point));
    track.segments.push(segment);
    gpx.tracks.push(track);

    gpx
}

pub fn write_route<W: Write>(
    writer: W,
    name: &str,
    path: &[Coordinate],
    waypoints: &[Waypoint],
) -> Result<(), GpxError> {
    gpx::write(&route_to_gpx(name, path, waypoints), writer)?;
    Ok(())
}

fn to_point(coord: &Coordinate) -> GpxPoint {
    GpxPoint::new(Point::new(coord.lon, coord.lat))
}
