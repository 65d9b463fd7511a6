//! Metric definitions: singular or dimensional.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use indexmap::IndexMap;

type ReadFn = dyn Fn() -> BoxFuture<'static, f64> + Send + Sync;

/// Shared async producer of a numeric value.
#[derive(Clone)]
pub struct Reading(Arc<ReadFn>);

impl Reading {
    /// Wrap an async closure.
    pub fn new<F, Fut>(read: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = f64> + Send + 'static,
    {
        Self(Arc::new(move || read().boxed()))
    }

    /// A reading that always yields the same value.
    pub fn constant(value: f64) -> Self {
        Self::new(move || async move { value })
    }

    /// Take the current value.
    pub async fn read(&self) -> f64 {
        (self.0)().await
    }
}

impl fmt::Debug for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Reading(..)")
    }
}

/// Named sub-value of a dimensional metric.
#[derive(Debug, Clone)]
pub struct Dimension {
    /// Human-readable description.
    pub description: String,
    /// Value producer.
    pub reading: Reading,
}

/// The two shapes a metric can take.
#[derive(Debug, Clone)]
pub enum MetricKind {
    /// A single value.
    Singular(Reading),
    /// A value broken into named dimensions; the aggregate is their sum.
    Dimensional(IndexMap<String, Dimension>),
}

/// A named numeric measurement.
#[derive(Debug, Clone)]
pub struct Metric {
    /// Human-readable description.
    pub description: String,
    /// Unit the value is expressed in (e.g. `bytes`).
    pub base_unit: String,
    /// Singular or dimensional shape.
    pub kind: MetricKind,
}

impl Metric {
    /// Create a singular metric.
    pub fn singular<F, Fut>(description: impl Into<String>, base_unit: impl Into<String>, read: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = f64> + Send + 'static,
    {
        Self {
            description: description.into(),
            base_unit: base_unit.into(),
            kind: MetricKind::Singular(Reading::new(read)),
        }
    }

    /// Create a dimensional metric with no dimensions yet.
    pub fn dimensional(description: impl Into<String>, base_unit: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            base_unit: base_unit.into(),
            kind: MetricKind::Dimensional(IndexMap::new()),
        }
    }

    /// Add a dimension, turning a singular metric into a dimensional one.
    pub fn with_dimension<F, Fut>(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        read: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = f64> + Send + 'static,
    {
        let dimension = Dimension {
            description: description.into(),
            reading: Reading::new(read),
        };

        match &mut self.kind {
            MetricKind::Dimensional(dimensions) => {
                dimensions.insert(name.into(), dimension);
            }
            MetricKind::Singular(_) => {
                let mut dimensions = IndexMap::new();
                dimensions.insert(name.into(), dimension);
                self.kind = MetricKind::Dimensional(dimensions);
            }
        }
        self
    }

    /// Whether the metric is broken into dimensions.
    pub fn is_dimensional(&self) -> bool {
        matches!(self.kind, MetricKind::Dimensional(_))
    }

    /// Names of the dimensions, empty for singular metrics.
    pub fn dimension_names(&self) -> Vec<String> {
        match &self.kind {
            MetricKind::Singular(_) => Vec::new(),
            MetricKind::Dimensional(dimensions) => dimensions.keys().cloned().collect(),
        }
    }

    /// Look up a dimension by name.
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        match &self.kind {
            MetricKind::Singular(_) => None,
            MetricKind::Dimensional(dimensions) => dimensions.get(name),
        }
    }

    /// Current value: the reading itself, or the sum of all dimensions read concurrently.
    pub async fn value(&self) -> f64 {
        match &self.kind {
            MetricKind::Singular(reading) => reading.read().await,
            MetricKind::Dimensional(dimensions) => {
                join_all(dimensions.values().map(|d| d.reading.read()))
                    .await
                    .into_iter()
                    .sum()
            }
        }
    }
}
