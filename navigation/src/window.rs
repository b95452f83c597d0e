use crate::{config::WindowConfig, geo::haversine_m, Coordinate, Waypoint};

/// Sliding view over the route's waypoints.
///
/// The walker is routed through at most `window_size` waypoints at a time,
/// towards the waypoint right after the window, or back to the start once
/// the window reaches the end of the list. The index only moves forward, one
/// waypoint per observed location.
#[derive(Debug, Clone)]
pub struct WaypointWindow {
    start: Coordinate,
    waypoints: Vec<Waypoint>,
    index: usize,
    window_size: usize,
    arrival_threshold_m: f64,
}

impl WaypointWindow {
    pub fn new(start: Coordinate, waypoints: Vec<Waypoint>, config: WindowConfig) -> Self {
        Self {
            start,
            waypoints,
            index: 0,
            window_size: config.window_size.max(1),
            arrival_threshold_m: config.arrival_threshold_m,
        }
    }

    pub fn start(&self) -> Coordinate {
        self.start
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn arrival_threshold_m(&self) -> f64 {
        self.arrival_threshold_m
    }

    pub fn active(&self) -> &[Waypoint] {
        let end = (self.index + self.window_size).min(self.waypoints.len());
        &self.waypoints[self.index..end]
    }

    pub fn active_coords(&self) -> Vec<Coordinate> {
        self.active().iter().map(|wp| wp.coord).collect()
    }

    pub fn destination(&self) -> Coordinate {
        self.waypoints
            .get(self.index + self.window_size)
            .map(|wp| wp.coord)
            .unwrap_or(self.start)
    }

    /// Every waypoint has been reached and the walker heads back to start.
    pub fn is_return_leg(&self) -> bool {
        self.index >= self.waypoints.len()
    }

    /// Advances past the next waypoint if `location` is within the arrival
    /// threshold of it. Returns whether the window moved.
    pub fn observe(&mut self, location: Coordinate) -> bool {
        let Some(next) = self.waypoints.get(self.index) else {
            return false;
        };
        let distance = haversine_m(location, next.coord);
        if distance < self.arrival_threshold_m {
            tracing::info!(
                "arrived at waypoint {} ({distance:.1}m), {} remaining",
                next.position,
                self.waypoints.len() - self.index - 1
            );
            self.index += 1;
            true
        } else {
            false
        }
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: Coordinate = Coordinate {
        lat: 37.50,
        lon: 127.00,
    };

    /// Waypoints spaced ~1.1km apart going north.
    fn waypoints(n: usize) -> Vec<Waypoint> {
        (0..n)
            .map(|i| Waypoint {
                position: i,
                coord: Coordinate {
                    lat: 37.51 + 0.01 * i as f64,
                    lon: 127.00,
                },
            })
            .collect()
    }

    fn window(n: usize) -> WaypointWindow {
        WaypointWindow::new(START, waypoints(n), WindowConfig::default())
    }

    #[test]
    fn test_initial_window_and_destination() {
        let window = window(6);
        assert_eq!(window.index(), 0);
        assert_eq!(window.active().len(), 4);
        assert_eq!(window.active()[0].position, 0);
        assert_eq!(window.destination(), waypoints(6)[4].coord);
        assert!(!window.is_return_leg());
    }

    #[test]
    fn test_short_route_heads_back_to_start() {
        let window = window(3);
        assert_eq!(window.active().len(), 3);
        assert_eq!(window.destination(), START);
    }

    #[test]
    fn test_arrival_advances_one_step() {
        let mut window = window(6);
        let first = window.waypoints()[0].coord;
        assert!(window.observe(first));
        assert_eq!(window.index(), 1);
        assert_eq!(window.active()[0].position, 1);
        assert_eq!(window.destination(), window.waypoints()[5].coord);
    }

    #[test]
    fn test_far_location_does_not_advance() {
        let mut window = window(6);
        assert!(!window.observe(START));
        assert_eq!(window.index(), 0);
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut window = WaypointWindow::new(
            START,
            waypoints(2),
            WindowConfig {
                window_size: 4,
                arrival_threshold_m: 0.0,
            },
        );
        assert!(!window.observe(window.waypoints()[0].coord));
    }

    #[test]
    fn test_overlapping_waypoints_advance_once_per_observation() {
        let stacked: Vec<Waypoint> = (0..3)
            .map(|position| Waypoint {
                position,
                coord: START,
            })
            .collect();
        let mut window = WaypointWindow::new(START, stacked, WindowConfig::default());

        assert!(window.observe(START));
        assert_eq!(window.index(), 1);
        assert!(window.observe(START));
        assert!(window.observe(START));
        assert_eq!(window.index(), 3);
        assert!(!window.observe(START));
        assert_eq!(window.index(), 3);
    }

    #[test]
    fn test_terminal_state() {
        let mut window = window(2);
        for wp in waypoints(2) {
            window.observe(wp.coord);
        }
        assert!(window.is_return_leg());
        assert!(window.active().is_empty());
        assert_eq!(window.destination(), START);

        window.reset();
        assert_eq!(window.index(), 0);
    }

    #[test]
    fn test_empty_route_is_immediately_terminal() {
        let mut window = window(0);
        assert!(window.is_return_leg());
        assert!(!window.observe(START));
        assert_eq!(window.destination(), START);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn near_route() -> impl Strategy<Value = Coordinate> {
            (37.50..37.60f64, 126.99..127.01f64).prop_map(|(lat, lon)| Coordinate { lat, lon })
        }

        proptest! {
            #[test]
            fn prop_index_is_monotonic_and_single_step(
                n in 0usize..12,
                path in prop::collection::vec(near_route(), 0..60)
            ) {
                let mut window = window(n);
                for location in path {
                    let before = window.index();
                    let advanced = window.observe(location);
                    let after = window.index();
                    prop_assert!(after == before || after == before + 1);
                    prop_assert_eq!(advanced, after == before + 1);
                    prop_assert!(after <= n);
                    prop_assert!(window.active().len() <= 4);
                }
            }
        }
    }
}
