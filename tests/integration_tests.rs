/// HTTP-level tests for the pit strategy service.
///
/// The router is driven in-process against a fake telemetry provider, so no
/// network is needed.
/// Run with: cargo test --test integration_tests -- --nocapture

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use pit_strategy_api::{
    model::LinearModel,
    router,
    telemetry::{ProviderError, Row, Session, TelemetryProvider},
    AppState,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const RACE: &str = "Australian Grand Prix";

#[derive(Default)]
struct FakeTelemetry {
    laps: HashMap<&'static str, Vec<Row>>,
    car: HashMap<&'static str, Vec<Row>>,
    broken: bool,
}

#[async_trait]
impl TelemetryProvider for FakeTelemetry {
    async fn load_session(&self, year: i32, race_name: &str) -> Result<Session, ProviderError> {
        if self.broken {
            return Err(ProviderError::Upstream("HTTP 503 from meetings".into()));
        }
        if year != 2024 || !race_name.eq_ignore_ascii_case(RACE) {
            return Err(ProviderError::SessionNotFound {
                year,
                race_name: race_name.to_string(),
            });
        }
        Ok(Session {
            key: 9472,
            year,
            race_name: RACE.to_string(),
        })
    }

    async fn laps(&self, _: &Session, driver_code: &str) -> Result<Vec<Row>, ProviderError> {
        Ok(self.laps.get(driver_code).cloned().unwrap_or_default())
    }

    async fn car_data(&self, _: &Session, driver_code: &str) -> Result<Vec<Row>, ProviderError> {
        Ok(self.car.get(driver_code).cloned().unwrap_or_default())
    }
}

fn row(v: Value) -> Row {
    v.as_object().cloned().expect("row fixtures are objects")
}

fn grid() -> FakeTelemetry {
    let laps = (1..=3)
        .map(|n| {
            row(json!({
                "driver_number": 63,
                "lap_number": n,
                "lap_duration": 80.0 + n as f64,
                "is_pit_out_lap": false,
            }))
        })
        .collect();
    let car = vec![
        row(json!({ "driver_number": 63, "speed": 287, "throttle": 100, "n_gear": 7 })),
        row(json!({ "driver_number": 63, "speed": 291, "throttle": 100, "n_gear": 8 })),
    ];

    FakeTelemetry {
        laps: HashMap::from([("RUS", laps)]),
        car: HashMap::from([("RUS", car), ("SAI", Vec::new())]),
        broken: false,
    }
}

fn app_with(telemetry: FakeTelemetry) -> Router {
    router(AppState {
        mdl: Arc::new(LinearModel::train().unwrap()),
        telemetry: Arc::new(telemetry),
    })
}

async fn call(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_pit_decision_golden_value() {
    println!("\n=== Test: Pit Decision Golden Value ===");
    let (status, body) = call(
        app_with(grid()),
        post_json(
            "/api/get_pit_decision",
            r#"{"race_position": 1, "track_length": 5000, "current_lap": 12}"#,
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let t = body["predicted_lap_time"].as_f64().unwrap();
    assert!((t - 85.571_428_571_428_57).abs() < 1e-9, "got {}", t);
    assert_eq!(body["pit_decision"], "No Pit");
    println!("✓ predicted {:.6}s -> {}", t, body["pit_decision"]);
}

#[tokio::test]
async fn test_current_lap_is_echoed() {
    println!("\n=== Test: Current Lap Echo ===");
    for lap in [0u32, 1, 57, 4_000_000] {
        let (status, body) = call(
            app_with(grid()),
            post_json(
                "/api/get_pit_decision",
                &json!({ "race_position": 3, "track_length": 5300, "current_lap": lap }).to_string(),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current_lap"], json!(lap));
    }
    println!("✓ current_lap returned unchanged");
}

#[tokio::test]
async fn test_current_lap_of_any_json_type_is_echoed() {
    println!("\n=== Test: Current Lap Passthrough ===");
    for lap in [json!("12"), json!(12.5), json!(-1), Value::Null, json!({ "lap": 3, "sector": 2 })] {
        let (status, body) = call(
            app_with(grid()),
            post_json(
                "/api/get_pit_decision",
                &json!({ "race_position": 1, "track_length": 5000, "current_lap": lap.clone() }).to_string(),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "current_lap={} body={}", lap, body);
        assert_eq!(body["current_lap"], lap);
        assert_eq!(body["pit_decision"], "No Pit");
    }
    println!("✓ string, float, negative, null and object all returned as sent");
}

#[tokio::test]
async fn test_missing_current_lap_is_invalid_input() {
    let (status, body) = call(
        app_with(grid()),
        post_json("/api/get_pit_decision", r#"{"race_position": 1, "track_length": 5000}"#),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("current_lap"));
}

#[tokio::test]
async fn test_missing_race_position_is_invalid_input() {
    println!("\n=== Test: Missing race_position ===");
    let (status, body) = call(
        app_with(grid()),
        post_json("/api/get_pit_decision", r#"{"track_length": 5000, "current_lap": 3}"#),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let msg = body["error"].as_str().unwrap();
    assert!(msg.contains("race_position"), "message was: {}", msg);
    println!("✓ rejected: {}", msg);
}

#[tokio::test]
async fn test_malformed_json_is_invalid_input() {
    let (status, body) = call(app_with(grid()), post_json("/api/get_pit_decision", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_pick_lap_returns_flat_row() {
    println!("\n=== Test: Pick Lap ===");
    let (status, body) = call(
        app_with(grid()),
        get("/api/pick_lap?year=2024&race_name=Australian%20Grand%20Prix&driver_code=RUS&lap_number=2"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["lap_number"], 2);
    assert_eq!(body["lap_duration"], 82.0);
    assert_eq!(body["driver_number"], 63);
    assert!(body.as_object().unwrap().values().all(|v| !v.is_object() && !v.is_array()));
    println!("✓ lap 2: {}", body);
}

#[tokio::test]
async fn test_pick_lap_absent_lap_is_404() {
    println!("\n=== Test: Absent Lap ===");
    let (status, body) = call(
        app_with(grid()),
        get("/api/pick_lap?year=2024&race_name=Australian+Grand+Prix&driver_code=RUS&lap_number=99"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let msg = body["error"].as_str().unwrap();
    assert!(msg.contains("99") && msg.contains("RUS"), "message was: {}", msg);
    println!("✓ {}", msg);
}

#[tokio::test]
async fn test_pick_lap_unknown_driver_is_404() {
    let (status, _) = call(
        app_with(grid()),
        get("/api/pick_lap?year=2024&race_name=Australian+Grand+Prix&driver_code=XXX&lap_number=1"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_pick_lap_missing_param_is_invalid_input() {
    let (status, body) = call(
        app_with(grid()),
        get("/api/pick_lap?year=2024&race_name=Australian+Grand+Prix&driver_code=RUS"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("lap_number"));
}

#[tokio::test]
async fn test_car_data_rows() {
    println!("\n=== Test: Car Data ===");
    let (status, body) = call(
        app_with(grid()),
        get("/api/get_car_data?year=2024&race_name=Australian+Grand+Prix&driver_code=RUS"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["speed"], 291);
    println!("✓ {} rows", rows.len());
}

#[tokio::test]
async fn test_car_data_empty_is_404() {
    println!("\n=== Test: Empty Car Data ===");
    let (status, body) = call(
        app_with(grid()),
        get("/api/get_car_data?year=2024&race_name=Australian+Grand+Prix&driver_code=SAI"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "No car data found for driver SAI.");
    println!("✓ {}", body["error"]);
}

#[tokio::test]
async fn test_unknown_session_is_404() {
    let (status, body) = call(
        app_with(grid()),
        get("/api/get_car_data?year=2024&race_name=Atlantis+Grand+Prix&driver_code=RUS"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("Atlantis Grand Prix"));
}

#[tokio::test]
async fn test_provider_failure_is_bad_gateway() {
    println!("\n=== Test: Provider Failure ===");
    let broken = FakeTelemetry {
        broken: true,
        ..FakeTelemetry::default()
    };
    let (status, body) = call(
        app_with(broken),
        get("/api/pick_lap?year=2024&race_name=Australian+Grand+Prix&driver_code=RUS&lap_number=1"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"].as_str().unwrap().contains("503"));
    println!("✓ {}", body["error"]);
}

#[tokio::test]
async fn test_health() {
    let (status, body) = call(app_with(FakeTelemetry::default()), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}
