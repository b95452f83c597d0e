//! Pedestrian routing through the T map HTTP API.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{sync::Mutex, time::Instant};

use crate::{
    config::RoutingConfig,
    error::{RouteError, TransportError},
    geo::path_length_m,
    throttle::RateLimiter,
    Coordinate,
};

const COORD_TYPE: &str = "WGS84GEO";
const MAX_PASS_POINTS: usize = 5;
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub const SEARCHING_MESSAGE: &str = "경로를 검색하는 중...";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PedestrianRequest {
    pub start_x: String,
    pub start_y: String,
    pub end_x: String,
    pub end_y: String,
    pub req_coord_type: &'static str,
    pub res_coord_type: &'static str,
    pub start_name: String,
    pub end_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pass_list: Option<String>,
}

impl PedestrianRequest {
    pub fn new(
        start: Coordinate,
        end: Coordinate,
        waypoints: &[Coordinate],
        start_name: &str,
        end_name: &str,
    ) -> Self {
        Self {
            start_x: start.lon.to_string(),
            start_y: start.lat.to_string(),
            end_x: end.lon.to_string(),
            end_y: end.lat.to_string(),
            req_coord_type: COORD_TYPE,
            res_coord_type: COORD_TYPE,
            start_name: encode_name(start_name),
            end_name: encode_name(end_name),
            pass_list: pass_list(waypoints),
        }
    }
}

fn encode_name(name: &str) -> String {
    url::form_urlencoded::byte_serialize(name.as_bytes()).collect()
}

/// `lon,lat` pairs joined by `_`, at most five of them.
pub fn pass_list(waypoints: &[Coordinate]) -> Option<String> {
    if waypoints.is_empty() {
        return None;
    }
    if waypoints.len() > MAX_PASS_POINTS {
        tracing::warn!(
            "{} waypoints given, only the first {MAX_PASS_POINTS} are sent",
            waypoints.len()
        );
    }
    let pairs: Vec<String> = waypoints
        .iter()
        .take(MAX_PASS_POINTS)
        .map(|wp| format!("{},{}", wp.lon, wp.lat))
        .collect();
    Some(pairs.join("_"))
}

/// A turn-by-turn instruction taken from a described `Point` feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStep {
    pub description: String,
    /// Meters to the next instruction.
    pub distance_m: Option<f64>,
    pub time_s: Option<f64>,
    pub turn_type: Option<i64>,
    pub facility_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteSummary {
    pub path: Vec<Coordinate>,
    pub total_distance_m: f64,
    pub total_time_s: f64,
    pub steps: Vec<RouteStep>,
}

impl RouteSummary {
    pub fn distance_km(&self) -> f64 {
        self.total_distance_m / 1000.0
    }

    /// Whole minutes, rounded up.
    pub fn minutes(&self) -> u64 {
        (self.total_time_s / 60.0).ceil().max(0.0) as u64
    }

    pub fn describe(&self) -> String {
        format!(
            "총 거리: {:.2}km, 예상 시간: {}분",
            self.distance_km(),
            self.minutes()
        )
    }
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    geometry: Option<Geometry>,
    #[serde(default)]
    properties: Option<Properties>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Properties {
    total_distance: Option<f64>,
    total_time: Option<f64>,
    description: Option<String>,
    distance: Option<f64>,
    time: Option<f64>,
    turn_type: Option<i64>,
    /// Sent as a string code, occasionally as a number.
    facility_type: Option<Value>,
}

impl Properties {
    fn step(&self) -> Option<RouteStep> {
        let description = self.description.as_deref()?.trim();
        if description.is_empty() {
            return None;
        }
        Some(RouteStep {
            description: description.to_string(),
            distance_m: self.distance,
            time_s: self.time,
            turn_type: self.turn_type,
            facility_type: self.facility_type.as_ref().and_then(|value| match value {
                Value::String(code) => Some(code.clone()),
                Value::Number(code) => Some(code.to_string()),
                _ => None,
            }),
        })
    }
}

/// Drops points that are not finite or fall outside the lat/lon ranges.
pub fn sanitize_path(raw: impl IntoIterator<Item = Coordinate>) -> Vec<Coordinate> {
    raw.into_iter().filter(Coordinate::is_valid).collect()
}

pub fn parse_route(body: &str) -> Result<RouteSummary, RouteError> {
    let collection: FeatureCollection = serde_json::from_str(body).map_err(|err| {
        tracing::warn!("unparseable routing response: {err}");
        RouteError::NoRoute
    })?;
    if collection.features.is_empty() {
        return Err(RouteError::NoRoute);
    }

    let mut raw = Vec::new();
    let mut steps = Vec::new();
    let mut reported_distance_m: Option<f64> = None;
    let mut total_time_s = 0.0;

    for feature in &collection.features {
        let kind = feature.geometry.as_ref().map(|g| g.kind.as_str());
        if let Some(geometry) = feature.geometry.as_ref().filter(|g| g.kind == "LineString") {
            raw.extend(line_coordinates(&geometry.coordinates));
        }
        if let Some(props) = &feature.properties {
            if let Some(distance) = props.total_distance {
                *reported_distance_m.get_or_insert(0.0) += distance;
            }
            total_time_s += props.total_time.unwrap_or(0.0);
            if kind == Some("Point") {
                steps.extend(props.step());
            }
        }
    }

    let path = sanitize_path(raw);
    let total_distance_m = match reported_distance_m {
        Some(distance) => distance,
        None => {
            let measured = path_length_m(&path);
            tracing::debug!("no totalDistance in response, measured path at {measured:.0}m");
            measured
        }
    };
    tracing::debug!(
        "route parsed: {} features, {} points, {} steps, {total_distance_m}m",
        collection.features.len(),
        path.len(),
        steps.len()
    );

    Ok(RouteSummary {
        path,
        total_distance_m,
        total_time_s,
        steps,
    })
}

/// GeoJSON positions are `[lon, lat, ...]`.
fn line_coordinates(coordinates: &Value) -> impl Iterator<Item = Coordinate> + '_ {
    coordinates
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|position| {
            let pair = position.as_array()?;
            let lon = pair.first()?.as_f64()?;
            let lat = pair.get(1)?.as_f64()?;
            Some(Coordinate { lat, lon })
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends a route request and returns whatever the server answered.
#[async_trait]
pub trait RouteTransport: Send + Sync {
    async fn post(&self, request: &PedestrianRequest) -> Result<TransportResponse, TransportError>;
}

pub struct HttpTransport {
    http: reqwest::Client,
    url: String,
    app_key: String,
}

impl HttpTransport {
    pub fn new(config: &RoutingConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            http,
            url: config.url.clone(),
            app_key: config.app_key.clone(),
        })
    }
}

#[async_trait]
impl RouteTransport for HttpTransport {
    async fn post(&self, request: &PedestrianRequest) -> Result<TransportResponse, TransportError> {
        let response = self
            .http
            .post(&self.url)
            .header("appKey", &self.app_key)
            .json(request)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(TransportResponse { status, body })
    }
}

pub struct PedestrianClient {
    transport: Arc<dyn RouteTransport>,
    limiter: Mutex<RateLimiter>,
    start_name: String,
    end_name: String,
}

impl PedestrianClient {
    pub fn new(transport: Arc<dyn RouteTransport>, config: &RoutingConfig) -> Self {
        Self {
            transport,
            limiter: Mutex::new(RateLimiter::new(config.min_interval, config.cooldown)),
            start_name: config.start_name.clone(),
            end_name: config.end_name.clone(),
        }
    }

    /// Client backed by [`HttpTransport`].
    pub fn from_config(config: &RoutingConfig) -> Result<Self, TransportError> {
        let transport = HttpTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), config))
    }

    pub async fn fetch_route(
        &self,
        start: Coordinate,
        end: Coordinate,
        waypoints: &[Coordinate],
    ) -> Result<RouteSummary, RouteError> {
        if let Err(rejection) = self.limiter.lock().await.try_acquire(Instant::now()) {
            tracing::debug!("route request not sent: {rejection:?}");
            return Err(RouteError::Throttled);
        }

        let request =
            PedestrianRequest::new(start, end, waypoints, &self.start_name, &self.end_name);
        tracing::debug!(
            "requesting route {},{} -> {},{} via {} waypoints",
            request.start_y,
            request.start_x,
            request.end_y,
            request.end_x,
            waypoints.len().min(MAX_PASS_POINTS)
        );

        let response = self.transport.post(&request).await.map_err(|err| {
            tracing::warn!("routing request failed: {err}");
            RouteError::from(err)
        })?;

        match response.status {
            429 => {
                self.limiter.lock().await.on_rate_limited(Instant::now());
                Err(RouteError::RateLimited)
            }
            status if !(200..300).contains(&status) => {
                tracing::warn!("routing API error {status}: {}", response.body);
                Err(RouteError::Http {
                    status,
                    body: response.body,
                })
            }
            _ => parse_route(&response.body),
        }
    }
}

/// One leg of the walk: from `start` through `waypoints` to `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub start: Coordinate,
    pub end: Coordinate,
    pub waypoints: Vec<Coordinate>,
}

/// Route state for one leg: the last fetched route and the status line shown
/// to the walker.
pub struct RouteNavigation {
    client: Arc<PedestrianClient>,
    leg: Leg,
    route: Option<RouteSummary>,
    status: String,
    /// Set until a request for the current leg has come back, either way.
    loading: bool,
    has_initial_route: bool,
}

impl RouteNavigation {
    pub fn new(client: Arc<PedestrianClient>, leg: Leg) -> Self {
        Self {
            client,
            leg,
            route: None,
            status: SEARCHING_MESSAGE.to_string(),
            loading: true,
            has_initial_route: false,
        }
    }

    pub fn leg(&self) -> &Leg {
        &self.leg
    }

    pub fn set_leg(&mut self, leg: Leg) {
        self.leg = leg;
    }

    pub fn path(&self) -> &[Coordinate] {
        self.route.as_ref().map(|r| r.path.as_slice()).unwrap_or(&[])
    }

    pub fn route(&self) -> Option<&RouteSummary> {
        self.route.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn has_initial_route(&self) -> bool {
        self.has_initial_route
    }

    /// Fetches the leg unless a route was already obtained once.
    pub async fn ensure_initial_route(&mut self) -> Result<(), RouteError> {
        if self.has_initial_route {
            return Ok(());
        }
        self.refetch().await
    }

    /// Fetches the current leg. A locally throttled call leaves the status
    /// and path untouched; any other failure replaces the status only.
    pub async fn refetch(&mut self) -> Result<(), RouteError> {
        let result = self
            .client
            .fetch_route(self.leg.start, self.leg.end, &self.leg.waypoints)
            .await;

        match result {
            Ok(summary) => {
                self.status = summary.describe();
                self.route = Some(summary);
                self.loading = false;
                self.has_initial_route = true;
                Ok(())
            }
            Err(RouteError::Throttled) => Err(RouteError::Throttled),
            Err(err) => {
                self.status = err.user_message();
                self.loading = false;
                Err(err)
            }
        }
    }

    pub fn reset(&mut self, leg: Leg) {
        self.leg = leg;
        self.route = None;
        self.status = SEARCHING_MESSAGE.to_string();
        self.loading = true;
        self.has_initial_route = false;
    }
}
