//! ==============================================================================
//! server.rs - the node's http responder
//! ==============================================================================
//!
//! purpose:
//!     two read-only endpoints on top of the sensor reader:
//!
//!         GET /      -> self-refreshing html page (status 200, even on failure)
//!         GET /data  -> {"temp": 23.5, "hum": 55.2}   (200)
//!                       {"error": true}               (500)
//!
//!     every request triggers exactly one sensor read. nothing is cached.
//!     unknown paths get axum's default 404.
//!
//! relationships:
//!     - used by: main.rs (`node` role)
//!     - uses: sensor.rs (SensorReader), domain.rs (Payload)
//!
//! ==============================================================================

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Json},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::domain::{Payload, SensorSample};
use crate::error::SensorError;
use crate::sensor::SensorReader;

// ==============================================================================
// shared state
// ==============================================================================
// the sensor handle is the only shared resource. it sits behind a std mutex
// and is only touched from a blocking task, so reads never overlap.

#[derive(Clone)]
pub struct NodeState {
    sensor: Arc<Mutex<Box<dyn SensorReader>>>,
    refresh_seconds: u32,
    show_sensor_data: bool,
}

impl NodeState {
    pub fn new(sensor: Box<dyn SensorReader>, refresh_seconds: u32, show_sensor_data: bool) -> Self {
        Self {
            sensor: Arc::new(Mutex::new(sensor)),
            refresh_seconds,
            show_sensor_data,
        }
    }

    async fn read_sensor(&self) -> Result<SensorSample, SensorError> {
        let sensor = self.sensor.clone();

        // offload blocking io to dedicated thread
        let result = tokio::task::spawn_blocking(move || {
            let mut sensor = sensor
                .lock()
                .map_err(|_| SensorError::Driver("sensor lock poisoned".to_string()))?;
            sensor.read()
        })
        .await
        .map_err(|e| SensorError::Driver(format!("task join error: {}", e)))?;

        match &result {
            Ok(sample) if self.show_sensor_data => {
                tracing::info!("[SENSOR] Temp: {:.1}°C | Humidity: {:.1}%", sample.temperature, sample.humidity);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("[SENSOR] ⚠ Read error: {}", e),
        }
        result
    }
}

// ==============================================================================
// web server
// ==============================================================================

pub fn router(state: NodeState) -> Router {
    Router::new()
        .route("/", get(page_handler))
        .route("/data", get(data_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(state: NodeState, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("node live at http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(crate::shutdown_signal())
        .await?;
    Ok(())
}

/// human-readable page
async fn page_handler(State(state): State<NodeState>) -> Html<String> {
    let reading = state.read_sensor().await;
    Html(render_page(reading.ok(), state.refresh_seconds))
}

/// machine-readable reading for the monitor
async fn data_handler(State(state): State<NodeState>) -> (StatusCode, Json<Payload>) {
    match state.read_sensor().await {
        Ok(sample) => (StatusCode::OK, Json(Payload::from(sample))),
        Err(_) => (StatusCode::INTERNAL_SERVER_ERROR, Json(Payload::sensor_failure())),
    }
}

/// the failure branch never shows a number, only the message
pub fn render_page(sample: Option<SensorSample>, refresh_seconds: u32) -> String {
    let body = match sample.map(|s| s.rounded()) {
        Some(sample) => format!(
            r#"    <p>Temperature: <strong>{:.1} &deg;C</strong></p>
    <p>Humidity: <strong>{:.1} %</strong></p>"#,
            sample.temperature, sample.humidity
        ),
        None => r#"    <p class="error">Failed to read from the sensor</p>"#.to_string(),
    };

    format!(
        r#"<!doctype html>
<html>
<head>
    <meta charset="utf-8">
    <meta http-equiv="refresh" content="{refresh_seconds}">
    <title>Temperature &amp; Humidity</title>
</head>
<body style="font-family: system-ui; padding: 2rem;">
    <h1>Temperature &amp; Humidity</h1>
{body}
</body>
</html>
"#
    )
}

// ==============================================================================
// tests
// ==============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensor::SimulatedSensor;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn state(values: Vec<(f64, f64)>) -> NodeState {
        NodeState::new(Box::new(SimulatedSensor::scripted(values)), 5, false)
    }

    async fn fetch(state: NodeState, uri: &str) -> (StatusCode, Option<String>, String) {
        let response = router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_data_rounds_to_one_decimal() {
        let (status, content_type, body) = fetch(state(vec![(23.456, 55.21)]), "/data").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(body, r#"{"temp":23.5,"hum":55.2}"#);
    }

    #[tokio::test]
    async fn test_data_sensor_failure() {
        let (status, content_type, body) = fetch(state(vec![(f64::NAN, 55.21)]), "/data").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(body, r#"{"error":true}"#);
    }

    #[tokio::test]
    async fn test_page_shows_values() {
        let (status, content_type, body) = fetch(state(vec![(23.456, 55.21)]), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/html"));
        assert!(body.contains(r#"<meta http-equiv="refresh" content="5">"#));
        assert!(body.contains("23.5 &deg;C"));
        assert!(body.contains("55.2 %"));
    }

    #[tokio::test]
    async fn test_page_and_data_round_alike() {
        let state = state(vec![(0.25, 40.25)]);
        let (_, _, page) = fetch(state.clone(), "/").await;
        assert!(page.contains("0.3 &deg;C"));
        assert!(page.contains("40.3 %"));

        let (_, _, data) = fetch(state, "/data").await;
        assert_eq!(data, r#"{"temp":0.3,"hum":40.3}"#);
    }

    #[tokio::test]
    async fn test_page_sensor_failure_is_inline() {
        let (status, _, body) = fetch(state(vec![(21.0, f64::NAN)]), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Failed to read from the sensor"));
        assert!(!body.contains("&deg;C</strong>"));
        assert!(!body.contains("21.0"));
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let (status, _, _) = fetch(state(vec![(20.0, 40.0)]), "/api").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_one_read_per_request() {
        let state = state(vec![(20.0, 40.0), (f64::NAN, 40.0), (22.0, 42.0)]);
        assert_eq!(fetch(state.clone(), "/data").await.0, StatusCode::OK);
        assert_eq!(fetch(state.clone(), "/data").await.0, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(fetch(state, "/data").await.2, r#"{"temp":22.0,"hum":42.0}"#);
    }
}
