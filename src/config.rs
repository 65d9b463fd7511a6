//! Actuator configuration: typed defaults, builder overrides and the
//! environment settings layer.

use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::error::ActuatorError;
use crate::health::Component;
use crate::metric::{default_metrics, Metric, ProcessRuntimeStats, RuntimeStats};

/// Default health endpoint path.
pub const DEFAULT_HEALTH_PATH: &str = "/health";
/// Default metrics endpoint path.
pub const DEFAULT_METRICS_PATH: &str = "/metrics";
/// Default info endpoint path.
pub const DEFAULT_INFO_PATH: &str = "/info";
/// Default build identifier file, relative to the working directory.
pub const DEFAULT_BUILD_ID_FILE: &str = "BUILD_ID";

/// Endpoint paths; `None` disables the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Health endpoint path.
    pub health: Option<String>,
    /// Metrics endpoint path; detail routes hang below it.
    pub metrics: Option<String>,
    /// Info endpoint path.
    pub info: Option<String>,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            health: Some(DEFAULT_HEALTH_PATH.to_string()),
            metrics: Some(DEFAULT_METRICS_PATH.to_string()),
            info: Some(DEFAULT_INFO_PATH.to_string()),
        }
    }
}

/// Where the info endpoint reads the build identifier from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildIdSource {
    /// Read the file on every request; a missing file omits the field.
    File(PathBuf),
    /// A fixed identifier.
    Fixed(String),
    /// Never report a build identifier.
    Absent,
}

impl Default for BuildIdSource {
    fn default() -> Self {
        BuildIdSource::File(PathBuf::from(DEFAULT_BUILD_ID_FILE))
    }
}

/// Tie-break rule when several route suffixes match a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RouteMatch {
    /// The first route in registration order wins.
    #[default]
    FirstRegistered,
    /// The longest matching suffix wins; ties keep registration order.
    LongestSuffix,
}

type InfoFn = dyn Fn() -> BoxFuture<'static, anyhow::Result<Map<String, Value>>> + Send + Sync;

/// Async producer of custom info fields.
#[derive(Clone)]
pub struct InfoProducer(Arc<InfoFn>);

impl InfoProducer {
    /// Wrap an async closure.
    pub fn new<F, Fut>(produce: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Map<String, Value>>> + Send + 'static,
    {
        Self(Arc::new(move || produce().boxed()))
    }

    /// Produce the custom fields.
    pub async fn produce(&self) -> anyhow::Result<Map<String, Value>> {
        (self.0)().await
    }
}

impl fmt::Debug for InfoProducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("InfoProducer(..)")
    }
}

/// Complete actuator configuration.
#[derive(Debug, Clone)]
pub struct ActuatorConfig {
    /// Disable every endpoint.
    pub disabled: bool,
    /// Endpoint paths.
    pub endpoints: Endpoints,
    /// Health-checked components, in registration order.
    pub components: IndexMap<String, Component>,
    /// Exposed metrics, in registration order.
    pub metrics: IndexMap<String, Metric>,
    /// Custom info producer.
    pub info: Option<InfoProducer>,
    /// Build identifier source for the info endpoint.
    pub build_id: BuildIdSource,
    /// Route tie-break rule.
    pub route_match: RouteMatch,
}

impl ActuatorConfig {
    /// Start from the defaults.
    pub fn builder() -> ActuatorBuilder {
        ActuatorBuilder::default()
    }
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder layering caller overrides over the defaults.
pub struct ActuatorBuilder {
    disabled: bool,
    endpoints: Endpoints,
    components: IndexMap<String, Component>,
    metrics: Vec<(String, Metric)>,
    default_metrics: bool,
    runtime: Arc<dyn RuntimeStats>,
    info: Option<InfoProducer>,
    build_id: BuildIdSource,
    route_match: RouteMatch,
}

impl Default for ActuatorBuilder {
    fn default() -> Self {
        Self {
            disabled: false,
            endpoints: Endpoints::default(),
            components: IndexMap::new(),
            metrics: Vec::new(),
            default_metrics: true,
            runtime: Arc::new(ProcessRuntimeStats::new()),
            info: None,
            build_id: BuildIdSource::default(),
            route_match: RouteMatch::default(),
        }
    }
}

impl ActuatorBuilder {
    /// Disable (or re-enable) every endpoint.
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Serve health at `path`.
    pub fn health_path(mut self, path: impl Into<String>) -> Self {
        self.endpoints.health = Some(path.into());
        self
    }

    /// Remove the health endpoint.
    pub fn disable_health(mut self) -> Self {
        self.endpoints.health = None;
        self
    }

    /// Serve the metrics index at `path` and metric details below it.
    pub fn metrics_path(mut self, path: impl Into<String>) -> Self {
        self.endpoints.metrics = Some(path.into());
        self
    }

    /// Remove the metrics index and every metric detail route.
    pub fn disable_metrics(mut self) -> Self {
        self.endpoints.metrics = None;
        self
    }

    /// Serve info at `path`.
    pub fn info_path(mut self, path: impl Into<String>) -> Self {
        self.endpoints.info = Some(path.into());
        self
    }

    /// Remove the info endpoint.
    pub fn disable_info(mut self) -> Self {
        self.endpoints.info = None;
        self
    }

    /// Replace all endpoint paths at once.
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Add or replace a component.
    pub fn component(mut self, name: impl Into<String>, component: Component) -> Self {
        self.components.insert(name.into(), component);
        self
    }

    /// Add a metric, or replace a default metric of the same name in place.
    pub fn metric(mut self, name: impl Into<String>, metric: Metric) -> Self {
        let name = name.into();
        match self.metrics.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = metric,
            None => self.metrics.push((name, metric)),
        }
        self
    }

    /// Do not register `memory.used`, `cpu.used` and `uptime`.
    pub fn without_default_metrics(mut self) -> Self {
        self.default_metrics = false;
        self
    }

    /// Provider behind the default metrics.
    pub fn runtime_stats(mut self, stats: Arc<dyn RuntimeStats>) -> Self {
        self.runtime = stats;
        self
    }

    /// Set the custom info producer.
    pub fn info<F, Fut>(mut self, produce: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<Map<String, Value>>> + Send + 'static,
    {
        self.info = Some(InfoProducer::new(produce));
        self
    }

    /// Set where the build identifier comes from.
    pub fn build_id(mut self, source: BuildIdSource) -> Self {
        self.build_id = source;
        self
    }

    /// Set the route tie-break rule.
    pub fn route_match(mut self, rule: RouteMatch) -> Self {
        self.route_match = rule;
        self
    }

    /// Produce the final configuration.
    pub fn build(self) -> ActuatorConfig {
        let mut metrics = IndexMap::new();
        if self.default_metrics {
            metrics.extend(default_metrics(self.runtime));
        }
        // IndexMap::insert keeps the original position for existing keys.
        for (name, metric) in self.metrics {
            metrics.insert(name, metric);
        }

        ActuatorConfig {
            disabled: self.disabled,
            endpoints: self.endpoints,
            components: self.components,
            metrics,
            info: self.info,
            build_id: self.build_id,
            route_match: self.route_match,
        }
    }
}

/// Actuator settings loaded from `ACTUATOR_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Disable every endpoint.
    #[serde(default)]
    pub disabled: bool,

    /// Health path; `false` or empty disables it.
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Metrics path; `false` or empty disables it.
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,

    /// Info path; `false` or empty disables it.
    #[serde(default = "default_info_path")]
    pub info_path: String,

    /// Build identifier file; `false` or empty disables it.
    #[serde(default = "default_build_id_path")]
    pub build_id_path: String,

    /// Route tie-break rule.
    #[serde(default)]
    pub route_match: RouteMatch,

    /// HTTP server port for the demo binary.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_health_path() -> String {
    DEFAULT_HEALTH_PATH.to_string()
}

fn default_metrics_path() -> String {
    DEFAULT_METRICS_PATH.to_string()
}

fn default_info_path() -> String {
    DEFAULT_INFO_PATH.to_string()
}

fn default_build_id_path() -> String {
    DEFAULT_BUILD_ID_FILE.to_string()
}

fn default_port() -> u16 {
    3000
}

/// `false` and empty values turn a path setting off.
fn enabled(value: &str) -> Option<String> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("false") {
        None
    } else {
        Some(value.to_string())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            disabled: false,
            health_path: default_health_path(),
            metrics_path: default_metrics_path(),
            info_path: default_info_path(),
            build_id_path: default_build_id_path(),
            route_match: RouteMatch::default(),
            port: default_port(),
        }
    }
}

impl Settings {
    /// Environment variable prefix.
    pub const PREFIX: &'static str = "ACTUATOR_";

    /// Load settings from environment, reading .env file first.
    pub fn load() -> Result<Self, ActuatorError> {
        dotenvy::dotenv().ok();
        Ok(envy::prefixed(Self::PREFIX).from_env()?)
    }

    /// Load settings from explicit key/value pairs (unprefixed keys).
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ActuatorError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Ok(envy::from_iter(vars)?)
    }

    /// Check that enabled paths are absolute.
    pub fn validate(&self) -> Result<(), ActuatorError> {
        for (key, value) in [
            ("HEALTH_PATH", &self.health_path),
            ("METRICS_PATH", &self.metrics_path),
            ("INFO_PATH", &self.info_path),
        ] {
            if let Some(path) = enabled(value) {
                if !path.starts_with('/') {
                    return Err(ActuatorError::InvalidSettings(format!(
                        "{}{} must start with '/', got {:?}",
                        Self::PREFIX,
                        key,
                        path
                    )));
                }
            }
        }
        Ok(())
    }

    /// Endpoint paths described by these settings.
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            health: enabled(&self.health_path),
            metrics: enabled(&self.metrics_path),
            info: enabled(&self.info_path),
        }
    }

    /// Build identifier source described by these settings.
    pub fn build_id_source(&self) -> BuildIdSource {
        match enabled(&self.build_id_path) {
            Some(path) => BuildIdSource::File(PathBuf::from(path)),
            None => BuildIdSource::Absent,
        }
    }

    /// Layer these settings over a builder.
    pub fn apply(&self, builder: ActuatorBuilder) -> ActuatorBuilder {
        builder
            .disabled(self.disabled)
            .endpoints(self.endpoints())
            .build_id(self.build_id_source())
            .route_match(self.route_match)
    }
}
