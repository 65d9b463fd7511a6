//! Integration tests for the actuator router.
//!
//! Requests go through the axum router with `tower::ServiceExt::oneshot`, the
//! same way the host application would serve them.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};
use tower::ServiceExt;

use actuator::metric::{CpuTimes, MemoryUsage, StaticRuntimeStats};
use actuator::{Actuator, ActuatorConfig, BuildIdSource, Component, Metric, Strategy};

fn runtime() -> Arc<StaticRuntimeStats> {
    Arc::new(StaticRuntimeStats {
        cpu: CpuTimes {
            user_micros: 100,
            system_micros: 50,
        },
        memory: MemoryUsage {
            anonymous: 2048,
            file: 1024,
            shared: 0,
        },
        uptime_seconds: 30.0,
    })
}

fn builder() -> actuator::config::ActuatorBuilder {
    ActuatorConfig::builder()
        .runtime_stats(runtime())
        .build_id(BuildIdSource::Fixed("build-7".to_string()))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Option<Value>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        None
    } else {
        Some(serde_json::from_slice(&bytes).unwrap())
    };
    (status, body)
}

#[tokio::test]
async fn health_is_up_without_components() {
    let app = Actuator::new(builder().build()).router();

    let (status, body) = get(&app, "/api/actuator/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Some(json!({ "status": "UP" })));
}

#[tokio::test]
async fn health_down_is_still_200() {
    let config = builder()
        .component(
            "db",
            Component::from_fn(|_| async { Ok(503u16) }).with_detail("engine", "postgres"),
        )
        .build();
    let app = Actuator::new(config).router();

    let (status, body) = get(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        Some(json!({
            "status": "DOWN",
            "components": { "db": { "status": "DOWN", "details": { "engine": "postgres" } } }
        }))
    );
}

#[tokio::test]
async fn degraded_components_only_degrade() {
    let config = builder()
        .component("api", Component::from_fn(|_| async { Ok(true) }))
        .component(
            "search",
            Component::from_fn(|_| async { Err::<bool, _>(anyhow::anyhow!("timeout")) })
                .with_strategy(Strategy::Degraded),
        )
        .build();
    let app = Actuator::new(config).router();

    let (_, body) = get(&app, "/health").await;
    let body = body.unwrap();
    assert_eq!(body["status"], "DEGRADED");
    assert_eq!(body["components"]["api"]["status"], "UP");
    assert_eq!(body["components"]["search"]["status"], "DOWN");
}

#[tokio::test]
async fn health_checks_run_on_every_request() {
    let healthy = Arc::new(AtomicBool::new(true));
    let flag = healthy.clone();
    let config = builder()
        .component(
            "toggle",
            Component::from_fn(move |_| {
                let flag = flag.clone();
                async move { Ok(flag.load(Ordering::SeqCst)) }
            }),
        )
        .build();
    let app = Actuator::new(config).router();

    let (_, body) = get(&app, "/health").await;
    assert_eq!(body.unwrap()["status"], "UP");

    healthy.store(false, Ordering::SeqCst);
    let (_, body) = get(&app, "/health").await;
    assert_eq!(body.unwrap()["status"], "DOWN");
}

#[tokio::test]
async fn metrics_lists_exactly_the_configured_names() {
    let config = builder()
        .metric("orders.pending", Metric::singular("Pending orders", "orders", || async { 4.0 }))
        .build();
    let app = Actuator::new(config).router();

    let (status, body) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        Some(json!({ "names": ["memory.used", "cpu.used", "uptime", "orders.pending"] }))
    );
}

#[tokio::test]
async fn cpu_metric_aggregates_and_selects_dimensions() {
    let app = Actuator::new(builder().build()).router();

    let (status, body) = get(&app, "/metrics/cpu.used").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        Some(json!({
            "name": "cpu.used",
            "description": "Total CPU usage",
            "baseUnit": "microseconds",
            "measurements": [{ "statistic": "VALUE", "value": 150.0 }],
            "availableDimensions": ["user", "system"]
        }))
    );

    let (status, body) = get(&app, "/metrics/cpu.used?dimension=user").await;
    assert_eq!(status, StatusCode::OK);
    let body = body.unwrap();
    assert_eq!(body["measurements"][0]["value"], 100.0);
    assert_eq!(body["description"], "CPU time spent in user mode");
    assert_eq!(body["availableDimensions"], json!([]));
}

#[tokio::test]
async fn unknown_dimension_is_404_without_body() {
    let app = Actuator::new(builder().build()).router();

    let (status, body) = get(&app, "/metrics/cpu.used?dimension=idle").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, None);
}

#[tokio::test]
async fn unknown_metric_is_404() {
    let app = Actuator::new(builder().build()).router();

    let (status, _) = get(&app, "/metrics/disk.used").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uptime_is_singular() {
    let app = Actuator::new(builder().build()).router();

    let (_, body) = get(&app, "/metrics/uptime?dimension=user").await;
    let body = body.unwrap();
    assert_eq!(body["measurements"][0]["value"], 30.0);
    assert_eq!(body["baseUnit"], "seconds");
    assert_eq!(body["availableDimensions"], json!([]));
}

#[tokio::test]
async fn disabling_metrics_removes_all_metric_routes() {
    let app = Actuator::new(builder().disable_metrics().build()).router();

    assert_eq!(get(&app, "/metrics").await.0, StatusCode::NOT_FOUND);
    assert_eq!(get(&app, "/metrics/cpu.used").await.0, StatusCode::NOT_FOUND);
    assert_eq!(get(&app, "/metrics/uptime").await.0, StatusCode::NOT_FOUND);
    assert_eq!(get(&app, "/health").await.0, StatusCode::OK);
}

#[tokio::test]
async fn disabled_actuator_serves_nothing() {
    let app = Actuator::new(builder().disabled(true).build()).router();

    for path in ["/health", "/info", "/metrics", "/metrics/uptime"] {
        assert_eq!(get(&app, path).await.0, StatusCode::NOT_FOUND, "{}", path);
    }
}

#[tokio::test]
async fn custom_paths_are_served() {
    let app = Actuator::new(builder().health_path("/status").metrics_path("/stats").build()).router();

    assert_eq!(get(&app, "/status").await.0, StatusCode::OK);
    assert_eq!(get(&app, "/stats/uptime").await.0, StatusCode::OK);
    assert_eq!(get(&app, "/health").await.0, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn info_merges_build_and_custom_fields() {
    let config = builder()
        .info(|| async {
            let mut fields = Map::new();
            fields.insert("application".to_string(), json!({ "name": "shop", "version": "1.2.0" }));
            Ok(fields)
        })
        .build();
    let app = Actuator::new(config).router();

    let (status, body) = get(&app, "/info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        Some(json!({
            "build": "build-7",
            "application": { "name": "shop", "version": "1.2.0" }
        }))
    );
}

#[tokio::test]
async fn info_without_build_or_producer_is_empty() {
    let app = Actuator::new(builder().build_id(BuildIdSource::Absent).build()).router();

    let (status, body) = get(&app, "/info").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Some(json!({})));
}
