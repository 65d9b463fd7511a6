//! HTTP API handlers.

use std::panic::AssertUnwindSafe;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::config::{ActuatorConfig, BuildIdSource};
use crate::error::{ActuatorError, Result};
use crate::health::{self, HealthReport};
use crate::metric::Metric;
use crate::request::ActuatorRequest;

/// Query parameter selecting a metric dimension.
pub const DIMENSION_PARAM: &str = "dimension";

/// JSON response produced by a handler.
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorResponse {
    /// Transport status.
    pub status: StatusCode,
    /// JSON body.
    pub body: Value,
}

impl ActuatorResponse {
    /// A 200 response with the given body.
    pub fn ok(body: impl Serialize) -> Result<Self> {
        Ok(Self {
            status: StatusCode::OK,
            body: serde_json::to_value(body)?,
        })
    }
}

impl IntoResponse for ActuatorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Metrics index response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsIndex {
    /// Configured metric names, in registration order.
    pub names: Vec<String>,
}

/// Statistic reported by a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Statistic {
    /// The current value.
    Value,
}

/// A single measurement of a metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    /// Statistic kind.
    pub statistic: Statistic,
    /// Measured value.
    pub value: f64,
}

/// Metric detail response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricResponse {
    /// Metric name.
    pub name: String,
    /// Metric or dimension description.
    pub description: String,
    /// Unit of the value.
    pub base_unit: String,
    /// Measurements; always one `VALUE`.
    pub measurements: Vec<Measurement>,
    /// Dimensions that can be requested; empty for singular metrics and single-dimension views.
    pub available_dimensions: Vec<String>,
}

impl MetricResponse {
    fn new(
        name: &str,
        description: &str,
        base_unit: &str,
        value: f64,
        available_dimensions: Vec<String>,
    ) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            base_unit: base_unit.to_string(),
            measurements: vec![Measurement {
                statistic: Statistic::Value,
                value,
            }],
            available_dimensions,
        }
    }
}

/// Health handler - always 200, status is carried in the body.
pub async fn health(config: &ActuatorConfig, request: &ActuatorRequest) -> HealthReport {
    health::evaluate(&config.components, request).await
}

/// Metrics index handler - lists names without reading values.
pub fn metrics_index(config: &ActuatorConfig) -> MetricsIndex {
    MetricsIndex {
        names: config.metrics.keys().cloned().collect(),
    }
}

/// Metric detail handler.
///
/// An unknown `dimension` on a dimensional metric is not found; singular
/// metrics ignore the parameter.
#[instrument(skip(metric, request), fields(dimension = tracing::field::Empty))]
pub async fn metric_detail(
    name: &str,
    metric: &Metric,
    request: &ActuatorRequest,
) -> Result<MetricResponse> {
    if !metric.is_dimensional() {
        let value = metric.value().await;
        return Ok(MetricResponse::new(
            name,
            &metric.description,
            &metric.base_unit,
            value,
            Vec::new(),
        ));
    }

    let dimension = request
        .query_param(DIMENSION_PARAM)
        .filter(|d| !d.is_empty());
    tracing::Span::current().record("dimension", dimension);

    let Some(dimension) = dimension else {
        let value = metric.value().await;
        return Ok(MetricResponse::new(
            name,
            &metric.description,
            &metric.base_unit,
            value,
            metric.dimension_names(),
        ));
    };

    match metric.dimension(dimension) {
        Some(found) => {
            let value = found.reading.read().await;
            Ok(MetricResponse::new(
                name,
                &found.description,
                &metric.base_unit,
                value,
                Vec::new(),
            ))
        }
        None => {
            debug!("Unknown dimension");
            Err(ActuatorError::not_found(request.path.clone()))
        }
    }
}

/// Info handler - build identifier merged with the custom producer's fields.
pub async fn info(config: &ActuatorConfig) -> Map<String, Value> {
    let mut body = Map::new();

    if let Some(build) = read_build_id(&config.build_id).await {
        body.insert("build".to_string(), Value::String(build));
    }

    if let Some(producer) = &config.info {
        match AssertUnwindSafe(producer.produce()).catch_unwind().await {
            Ok(Ok(fields)) => body.extend(fields),
            Ok(Err(e)) => warn!(error = %e, "Info producer failed"),
            Err(_) => warn!("Info producer panicked"),
        }
    }

    body
}

/// Read the build identifier; failures yield `None`.
pub async fn read_build_id(source: &BuildIdSource) -> Option<String> {
    match source {
        BuildIdSource::Fixed(id) => Some(id.clone()),
        BuildIdSource::Absent => None,
        BuildIdSource::File(path) => match tokio::fs::read_to_string(path).await {
            Ok(contents) => Some(contents.trim().to_string()),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Build id unavailable");
                None
            }
        },
    }
}
