//! Health-checkable components.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::request::ActuatorRequest;

/// Raw result of a component check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Explicit up (`true`) or down (`false`).
    Flag(bool),
    /// HTTP-status-like code; anything below 400 is up.
    Status(u16),
}

impl CheckOutcome {
    /// Whether this outcome counts as up.
    pub fn is_up(&self) -> bool {
        match *self {
            CheckOutcome::Flag(up) => up,
            CheckOutcome::Status(code) => code < 400,
        }
    }
}

impl From<bool> for CheckOutcome {
    fn from(up: bool) -> Self {
        CheckOutcome::Flag(up)
    }
}

impl From<u16> for CheckOutcome {
    fn from(code: u16) -> Self {
        CheckOutcome::Status(code)
    }
}

impl From<StatusCode> for CheckOutcome {
    fn from(code: StatusCode) -> Self {
        CheckOutcome::Status(code.as_u16())
    }
}

/// How a down component affects the overall status.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(ascii_case_insensitive)]
pub enum Strategy {
    /// A down component fails the whole system.
    #[default]
    #[strum(serialize = "DOWN")]
    Down,
    /// A down component only degrades the system.
    #[strum(serialize = "DEGRADED")]
    Degraded,
}

/// Async up/down check for a component.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// Check the component against the incoming request.
    async fn check(&self, request: &ActuatorRequest) -> anyhow::Result<CheckOutcome>;
}

/// Adapts an async closure into a [`HealthCheck`].
struct FnCheck<F>(F);

#[async_trait]
impl<F, Fut, O> HealthCheck for FnCheck<F>
where
    F: Fn(ActuatorRequest) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
    O: Into<CheckOutcome> + Send + 'static,
{
    async fn check(&self, request: &ActuatorRequest) -> anyhow::Result<CheckOutcome> {
        (self.0)(request.clone()).await.map(Into::into)
    }
}

/// A named dependency or subsystem reported by the health endpoint.
#[derive(Clone)]
pub struct Component {
    check: Arc<dyn HealthCheck>,
    strategy: Strategy,
    details: Map<String, Value>,
}

impl Component {
    /// Create a component from a [`HealthCheck`] implementation.
    pub fn new(check: impl HealthCheck + 'static) -> Self {
        Self {
            check: Arc::new(check),
            strategy: Strategy::default(),
            details: Map::new(),
        }
    }

    /// Create a component from an async closure.
    ///
    /// The closure may return anything convertible into a [`CheckOutcome`]:
    /// a `bool`, a `u16` status code, or an [`axum::http::StatusCode`].
    pub fn from_fn<F, Fut, O>(check: F) -> Self
    where
        F: Fn(ActuatorRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        O: Into<CheckOutcome> + Send + 'static,
    {
        Self::new(FnCheck(check))
    }

    /// Set the aggregation strategy.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Add a detail entry reported alongside the status.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Replace all details.
    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details = details;
        self
    }

    /// Aggregation strategy.
    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Static details.
    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    /// The underlying check.
    pub fn check(&self) -> &Arc<dyn HealthCheck> {
        &self.check
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("strategy", &self.strategy)
            .field("details", &self.details)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_codes_below_400_are_up() {
        assert!(CheckOutcome::Status(200).is_up());
        assert!(CheckOutcome::Status(399).is_up());
        assert!(!CheckOutcome::Status(400).is_up());
        assert!(!CheckOutcome::Status(503).is_up());
    }

    #[test]
    fn flags_are_used_directly() {
        assert!(CheckOutcome::from(true).is_up());
        assert!(!CheckOutcome::from(false).is_up());
    }

    #[test]
    fn strategy_parses_case_insensitively() {
        assert_eq!(Strategy::from_str("degraded").unwrap(), Strategy::Degraded);
        assert_eq!(Strategy::from_str("DOWN").unwrap(), Strategy::Down);
        assert_eq!(Strategy::default(), Strategy::Down);
    }

    #[tokio::test]
    async fn closure_checks_convert_outcomes() {
        let component = Component::from_fn(|_| async { Ok(StatusCode::SERVICE_UNAVAILABLE) })
            .with_detail("kind", "database");

        let outcome = component
            .check()
            .check(&ActuatorRequest::new("/health"))
            .await
            .unwrap();

        assert_eq!(outcome, CheckOutcome::Status(503));
        assert_eq!(component.details()["kind"], "database");
    }
}
