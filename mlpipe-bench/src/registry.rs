//! Process-wide registry of scalar metrics published by benchmark setups
//!
//! A setup publishes a quality metric of the model it trained (for example
//! the held-out `rms`), and the report reads it back when rendering
//! [`crate::MetricsColumn`]s. Values are written rarely and read often.

use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

static REGISTRY: OnceLock<RwLock<HashMap<String, f64>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<String, f64>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Publish a metric and return the value it replaced
///
/// Each setup is expected to publish once between [`clear`] calls; a
/// republished name keeps the newest value and logs a warning.
pub fn publish_metric(name: &str, value: f64) -> Option<f64> {
    let previous = registry()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name.to_string(), value);

    match previous {
        Some(previous) => tracing::warn!(metric = name, previous, value, "Metric republished before clear"),
        None => tracing::debug!(metric = name, value, "Published metric"),
    }
    previous
}

/// Last value published under `name`
pub fn metric(name: &str) -> Option<f64> {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(name)
        .copied()
}

/// Forget every published metric
pub fn clear() {
    registry().write().unwrap_or_else(PoisonError::into_inner).clear();
}
