//! Concurrent component evaluation and status rollup.

use std::panic::AssertUnwindSafe;

use futures::future::join_all;
use futures::FutureExt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::Display;
use tracing::{debug, instrument, warn};

use super::component::{Component, Strategy};
use crate::request::ActuatorRequest;
use crate::telemetry;

/// Health status of a component or of the whole system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum HealthStatus {
    /// Everything is working.
    Up,
    /// A degraded-strategy component is down.
    Degraded,
    /// A component that fails the system is down.
    Down,
}

/// Evaluated status of one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentHealth {
    /// `UP` or `DOWN`.
    pub status: HealthStatus,
    /// Static details configured for the component.
    pub details: Map<String, Value>,
}

/// Health report for the whole system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    /// Aggregate status.
    pub status: HealthStatus,
    /// Per-component status, omitted when no components are configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<IndexMap<String, ComponentHealth>>,
}

/// Run one component check; errors and panics count as down.
#[instrument(skip_all, fields(component = %name))]
async fn evaluate_component(
    name: &str,
    component: &Component,
    request: &ActuatorRequest,
) -> HealthStatus {
    let result = AssertUnwindSafe(component.check().check(request))
        .catch_unwind()
        .await;

    match result {
        Ok(Ok(outcome)) if outcome.is_up() => HealthStatus::Up,
        Ok(Ok(outcome)) => {
            debug!(?outcome, "Component reported down");
            HealthStatus::Down
        }
        Ok(Err(e)) => {
            warn!(error = %e, "Component check failed");
            telemetry::inc_component_checks_failed(name);
            HealthStatus::Down
        }
        Err(_) => {
            warn!("Component check panicked");
            telemetry::inc_component_checks_failed(name);
            HealthStatus::Down
        }
    }
}

/// Roll per-component results up into an overall status.
///
/// Any down component with [`Strategy::Down`] makes the system `DOWN`;
/// otherwise any down [`Strategy::Degraded`] component makes it `DEGRADED`.
pub fn rollup(results: impl IntoIterator<Item = (Strategy, HealthStatus)>) -> HealthStatus {
    let mut degraded = false;

    for (strategy, status) in results {
        if status != HealthStatus::Down {
            continue;
        }
        match strategy {
            Strategy::Down => return HealthStatus::Down,
            Strategy::Degraded => degraded = true,
        }
    }

    if degraded {
        HealthStatus::Degraded
    } else {
        HealthStatus::Up
    }
}

/// Check every component concurrently and build the health report.
pub async fn evaluate(
    components: &IndexMap<String, Component>,
    request: &ActuatorRequest,
) -> HealthReport {
    let statuses = join_all(
        components
            .iter()
            .map(|(name, component)| evaluate_component(name, component, request)),
    )
    .await;

    let status = rollup(
        components
            .values()
            .zip(&statuses)
            .map(|(component, status)| (component.strategy(), *status)),
    );

    let components = if components.is_empty() {
        None
    } else {
        Some(
            components
                .iter()
                .zip(statuses)
                .map(|((name, component), status)| {
                    (
                        name.clone(),
                        ComponentHealth {
                            status,
                            details: component.details().clone(),
                        },
                    )
                })
                .collect(),
        )
    };

    HealthReport { status, components }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Barrier;

    fn up() -> Component {
        Component::from_fn(|_| async { Ok(true) })
    }

    fn down() -> Component {
        Component::from_fn(|_| async { Ok(false) })
    }

    fn components(entries: Vec<(&str, Component)>) -> IndexMap<String, Component> {
        entries
            .into_iter()
            .map(|(name, c)| (name.to_string(), c))
            .collect()
    }

    #[test]
    fn rollup_of_nothing_is_up() {
        assert_eq!(rollup(std::iter::empty()), HealthStatus::Up);
    }

    #[test]
    fn rollup_prefers_down_over_degraded() {
        let status = rollup(vec![
            (Strategy::Degraded, HealthStatus::Down),
            (Strategy::Down, HealthStatus::Down),
        ]);
        assert_eq!(status, HealthStatus::Down);
    }

    #[test]
    fn rollup_with_only_degraded_down_is_degraded() {
        let status = rollup(vec![
            (Strategy::Degraded, HealthStatus::Down),
            (Strategy::Down, HealthStatus::Up),
        ]);
        assert_eq!(status, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn all_up_reports_up() {
        let report = evaluate(
            &components(vec![("a", up()), ("b", up())]),
            &ActuatorRequest::new("/health"),
        )
        .await;

        assert_eq!(report.status, HealthStatus::Up);
        let members = report.components.unwrap();
        assert!(members.values().all(|c| c.status == HealthStatus::Up));
    }

    #[tokio::test]
    async fn no_components_omits_the_map() {
        let report = evaluate(&IndexMap::new(), &ActuatorRequest::new("/health")).await;
        assert_eq!(report.status, HealthStatus::Up);
        assert!(report.components.is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "UP" }));
    }

    #[tokio::test]
    async fn errors_and_panics_count_as_down() {
        let failing = Component::from_fn(|_| async { Err::<bool, _>(anyhow::anyhow!("refused")) })
            .with_strategy(Strategy::Degraded);
        let panicking = Component::from_fn(|_| async {
            if true {
                panic!("boom");
            }
            Ok(true)
        })
        .with_strategy(Strategy::Degraded);

        let report = evaluate(
            &components(vec![("failing", failing), ("panicking", panicking), ("ok", up())]),
            &ActuatorRequest::new("/health"),
        )
        .await;

        assert_eq!(report.status, HealthStatus::Degraded);
        let members = report.components.unwrap();
        assert_eq!(members["failing"].status, HealthStatus::Down);
        assert_eq!(members["panicking"].status, HealthStatus::Down);
        assert_eq!(members["ok"].status, HealthStatus::Up);
    }

    #[tokio::test]
    async fn status_code_503_with_default_strategy_is_down() {
        let db = Component::from_fn(|_| async { Ok(503u16) }).with_detail("engine", "postgres");

        let report = evaluate(
            &components(vec![("db", db), ("cache", down().with_strategy(Strategy::Degraded))]),
            &ActuatorRequest::new("/health"),
        )
        .await;

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "status": "DOWN",
                "components": {
                    "db": { "status": "DOWN", "details": { "engine": "postgres" } },
                    "cache": { "status": "DOWN", "details": {} }
                }
            })
        );
    }

    #[tokio::test]
    async fn checks_receive_the_request() {
        let header_check = Component::from_fn(|req: ActuatorRequest| async move {
            Ok(if req.headers.contains_key("x-probe") {
                StatusCode::OK
            } else {
                StatusCode::UNAUTHORIZED
            })
        });

        let mut request = ActuatorRequest::new("/health");
        request.headers.insert("x-probe", "1".parse().unwrap());

        let report = evaluate(&components(vec![("probe", header_check)]), &request).await;
        assert_eq!(report.status, HealthStatus::Up);
    }

    #[tokio::test]
    async fn checks_run_concurrently() {
        // Each check waits for the other; awaiting them in turn never finishes.
        let barrier = Arc::new(Barrier::new(2));
        let rendezvous = |barrier: Arc<Barrier>| {
            Component::from_fn(move |_| {
                let barrier = barrier.clone();
                async move {
                    barrier.wait().await;
                    Ok(true)
                }
            })
        };
        let members = components(vec![
            ("db", rendezvous(barrier.clone())),
            ("cache", rendezvous(barrier)),
        ]);

        let report = tokio::time::timeout(
            Duration::from_secs(5),
            evaluate(&members, &ActuatorRequest::new("/health")),
        )
        .await
        .expect("component checks were not run concurrently");

        assert_eq!(report.status, HealthStatus::Up);
    }
}
