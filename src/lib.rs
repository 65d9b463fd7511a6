//! Health, info and metrics endpoints for axum applications.
//!
//! The actuator mounts four endpoints, matched by path suffix so they work
//! under any prefix:
//!
//! ```text
//! GET /health          {"status":"UP","components":{...}}
//! GET /info            {"build":"...", ...custom fields}
//! GET /metrics         {"names":["memory.used","cpu.used","uptime"]}
//! GET /metrics/{name}  {"name":..., "measurements":[{"statistic":"VALUE","value":...}], ...}
//! ```
//!
//! ```no_run
//! use actuator::{Actuator, ActuatorConfig, Component, Strategy};
//!
//! let config = ActuatorConfig::builder()
//!     .component(
//!         "cache",
//!         Component::from_fn(|_| async { Ok(true) }).with_strategy(Strategy::Degraded),
//!     )
//!     .build();
//!
//! let app: axum::Router = Actuator::new(config).router();
//! ```
//!
//! # Modules
//!
//! - [`config`]: Typed configuration, builder and environment settings
//! - [`error`]: Unified error types
//! - [`health`]: Components and health aggregation
//! - [`metric`]: Metric definitions and runtime introspection
//! - [`api`]: Route table, dispatcher, handlers and axum adapter
//! - [`request`]: Framework-agnostic request view
//! - [`telemetry`]: Instrumentation of the actuator itself
//! - [`utils`]: Utility functions

pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod metric;
pub mod request;
pub mod telemetry;
pub mod utils;

pub use api::{Actuator, ActuatorResponse};
pub use config::{ActuatorConfig, BuildIdSource, Endpoints, RouteMatch, Settings};
pub use error::{ActuatorError, Result};
pub use health::{CheckOutcome, Component, HealthCheck, HealthStatus, Strategy};
pub use metric::{Metric, RuntimeStats};
pub use request::ActuatorRequest;
