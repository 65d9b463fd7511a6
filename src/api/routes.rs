//! Route table construction, suffix dispatch and the axum adapter.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use tracing::{debug, instrument};

use super::handlers::{self, ActuatorResponse};
use crate::config::{ActuatorConfig, RouteMatch};
use crate::error::{ActuatorError, Result};
use crate::request::ActuatorRequest;
use crate::telemetry::{self, RequestTimer};

/// What a route serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Component health rollup.
    Health,
    /// Metric names.
    MetricsIndex,
    /// A single metric, bound by name.
    Metric(String),
    /// Build and custom info.
    Info,
}

impl Endpoint {
    /// Short label used in logs and telemetry.
    pub fn label(&self) -> &'static str {
        match self {
            Endpoint::Health => "health",
            Endpoint::MetricsIndex => "metrics",
            Endpoint::Metric(_) => "metric",
            Endpoint::Info => "info",
        }
    }
}

/// A path suffix and the endpoint it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Trailing path segment matched against request paths.
    pub suffix: String,
    /// Endpoint served on match.
    pub endpoint: Endpoint,
}

/// Ordered, immutable route table.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    rule: RouteMatch,
}

impl RouteTable {
    /// Build the table for a configuration.
    ///
    /// Order: health, metrics index, one detail route per metric, info.
    /// Overlapping suffixes are not rejected; `rule` decides at dispatch.
    pub fn build(config: &ActuatorConfig) -> Self {
        let mut routes = Vec::new();

        if !config.disabled {
            if let Some(path) = &config.endpoints.health {
                routes.push(Route {
                    suffix: path.clone(),
                    endpoint: Endpoint::Health,
                });
            }

            if let Some(path) = &config.endpoints.metrics {
                routes.push(Route {
                    suffix: path.clone(),
                    endpoint: Endpoint::MetricsIndex,
                });
                for name in config.metrics.keys() {
                    routes.push(Route {
                        suffix: format!("{}/{}", path, name),
                        endpoint: Endpoint::Metric(name.clone()),
                    });
                }
            }

            if let Some(path) = &config.endpoints.info {
                routes.push(Route {
                    suffix: path.clone(),
                    endpoint: Endpoint::Info,
                });
            }
        }

        Self {
            routes,
            rule: config.route_match,
        }
    }

    /// Registered routes, in order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Whether no routes are registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Find the route serving `path`.
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        let mut matches = self.routes.iter().filter(|r| path.ends_with(&r.suffix));

        match self.rule {
            RouteMatch::FirstRegistered => matches.next(),
            // max_by_key keeps the last maximum, so compare in reverse to keep the first.
            RouteMatch::LongestSuffix => matches.rev().max_by_key(|r| r.suffix.len()),
        }
    }
}

/// The actuator: configuration plus its route table.
#[derive(Debug, Clone)]
pub struct Actuator {
    config: Arc<ActuatorConfig>,
    routes: Arc<RouteTable>,
}

impl Actuator {
    /// Build the route table once for `config`.
    pub fn new(config: ActuatorConfig) -> Self {
        let routes = RouteTable::build(&config);
        debug!(routes = routes.routes().len(), "Actuator routes built");
        Self {
            config: Arc::new(config),
            routes: Arc::new(routes),
        }
    }

    /// The configuration in effect.
    pub fn config(&self) -> &ActuatorConfig {
        &self.config
    }

    /// The route table in effect.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Route a request to its handler.
    #[instrument(skip(self, request), fields(path = %request.path))]
    pub async fn dispatch(&self, request: &ActuatorRequest) -> Result<ActuatorResponse> {
        let Some(route) = self.routes.resolve(&request.path) else {
            debug!("No actuator route matched");
            telemetry::inc_not_found();
            return Err(ActuatorError::not_found(request.path.clone()));
        };

        let _timer = RequestTimer::new(route.endpoint.label());

        match &route.endpoint {
            Endpoint::Health => ActuatorResponse::ok(handlers::health(&self.config, request).await),
            Endpoint::MetricsIndex => ActuatorResponse::ok(handlers::metrics_index(&self.config)),
            Endpoint::Metric(name) => {
                let metric = self
                    .config
                    .metrics
                    .get(name)
                    .ok_or_else(|| ActuatorError::not_found(request.path.clone()))?;
                ActuatorResponse::ok(handlers::metric_detail(name, metric, request).await?)
            }
            Endpoint::Info => ActuatorResponse::ok(handlers::info(&self.config).await),
        }
    }

    /// Wrap the actuator in an axum router.
    ///
    /// Every path is offered to the dispatcher, so the router can be merged
    /// or nested anywhere; the suffix match finds the endpoint.
    pub fn router(self) -> Router {
        create_router(self)
    }
}

/// Create the API router.
pub fn create_router(actuator: Actuator) -> Router {
    Router::new().fallback(serve).with_state(actuator)
}

async fn serve(
    State(actuator): State<Actuator>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    if method != Method::GET && method != Method::HEAD {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    let request = ActuatorRequest::from_uri(&uri, headers);
    match actuator.dispatch(&request).await {
        Ok(response) => response.into_response(),
        Err(e) => e.into_response(),
    }
}
