use std::sync::{Arc, Mutex};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use navigation::{
    config::RoutingConfig, error::RouteError, pedestrian::PedestrianClient, Coordinate,
};
use serde_json::{json, Value};

#[derive(Clone)]
struct StubTmap {
    status: StatusCode,
    body: String,
    seen: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn pedestrian_route(
    State(stub): State<StubTmap>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, String) {
    let app_key = headers
        .get("appKey")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    stub.seen.lock().unwrap().push((app_key, body));
    (stub.status, stub.body.clone())
}

async fn serve(stub: StubTmap) -> String {
    let app = Router::new()
        .route("/tmap/routes/pedestrian", post(pedestrian_route))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}/tmap/routes/pedestrian")
}

fn stub(status: StatusCode, body: Value) -> StubTmap {
    StubTmap {
        status,
        body: body.to_string(),
        seen: Arc::new(Mutex::new(Vec::new())),
    }
}

fn routing(url: String) -> RoutingConfig {
    RoutingConfig {
        url,
        app_key: "test-key".into(),
        ..Default::default()
    }
}

const START: Coordinate = Coordinate {
    lat: 37.50,
    lon: 127.00,
};
const WAYPOINT: Coordinate = Coordinate {
    lat: 37.51,
    lon: 127.01,
};

#[tokio::test]
async fn fetches_route_over_http() {
    let stub = stub(
        StatusCode::OK,
        json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {
                    "type": "LineString",
                    "coordinates": [[127.00, 37.50], [127.01, 37.51]]
                },
                "properties": {"totalDistance": 1000, "totalTime": 600}
            }]
        }),
    );
    let seen = stub.seen.clone();
    let client = PedestrianClient::from_config(&routing(serve(stub).await)).unwrap();

    let summary = client.fetch_route(START, START, &[WAYPOINT]).await.unwrap();

    assert_eq!(summary.describe(), "총 거리: 1.00km, 예상 시간: 10분");
    assert_eq!(summary.path, vec![START, WAYPOINT]);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let (app_key, body) = &seen[0];
    assert_eq!(app_key.as_deref(), Some("test-key"));
    assert_eq!(body["startX"], "127");
    assert_eq!(body["endY"], "37.5");
    assert_eq!(body["passList"], "127.01,37.51");
    assert_eq!(body["reqCoordType"], "WGS84GEO");
}

#[tokio::test]
async fn rate_limit_response_blocks_further_calls() {
    let stub = stub(StatusCode::TOO_MANY_REQUESTS, json!({"error": "quota"}));
    let seen = stub.seen.clone();
    let client = PedestrianClient::from_config(&routing(serve(stub).await)).unwrap();

    let first = client.fetch_route(START, WAYPOINT, &[]).await;
    assert_eq!(first, Err(RouteError::RateLimited));

    let second = client.fetch_route(START, WAYPOINT, &[]).await;
    assert_eq!(second, Err(RouteError::Throttled));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn server_error_carries_status_and_body() {
    let stub = stub(StatusCode::BAD_REQUEST, json!({"error": {"code": "3002"}}));
    let client = PedestrianClient::from_config(&routing(serve(stub).await)).unwrap();

    let err = client.fetch_route(START, WAYPOINT, &[]).await.unwrap_err();
    match &err {
        RouteError::Http { status, body } => {
            assert_eq!(*status, 400);
            assert!(body.contains("3002"));
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(err.user_message().starts_with("API 오류: 400 - "));
}

#[tokio::test]
async fn unreachable_server_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client =
        PedestrianClient::from_config(&routing(format!("http://{addr}/route"))).unwrap();
    let err = client.fetch_route(START, WAYPOINT, &[]).await.unwrap_err();

    assert!(matches!(err, RouteError::Network(_)));
    assert_eq!(err.user_message(), "네트워크 오류가 발생했습니다.");
}
