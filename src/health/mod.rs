//! Component health checks and status aggregation.
//!
//! This module handles:
//! - Component definitions and their async checks
//! - Concurrent evaluation with fail-closed error handling
//! - Rolling component results up into `UP`, `DEGRADED` or `DOWN`

pub mod aggregate;
pub mod component;

pub use aggregate::{evaluate, rollup, ComponentHealth, HealthReport, HealthStatus};
pub use component::{CheckOutcome, Component, HealthCheck, Strategy};
