//! HTTP API module for the health, info and metrics endpoints.

pub mod handlers;
pub mod routes;

pub use handlers::ActuatorResponse;
pub use routes::{create_router, Actuator, Endpoint, Route, RouteTable};
