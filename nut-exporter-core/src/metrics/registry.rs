//! Series registry with an explicit upsert/remove state table
//!
//! Every series id maps to at most one registered Prometheus collector.
//! Each call reports the [`SeriesTransition`] it performed so callers can
//! tell a first registration from a plain value update, and repeated
//! removals are no-ops instead of registry errors.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use prometheus::{Encoder, Gauge, GaugeVec, Opts, Registry, TextEncoder};

use crate::error::{NutError, NutResult};

/// Namespace prefixed to every series id
pub const NAMESPACE: &str = "nut";

/// Content type of [`SeriesRegistry::encode`] output
pub const EXPOSITION_CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// State change performed by one registry call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesTransition {
    /// Series did not exist and was registered
    Registered,
    /// Existing series got a different value
    Updated,
    /// Existing series already had this value
    Unchanged,
    /// Labeled series switched to a new label value
    Relabeled,
    /// Series existed and was unregistered
    Removed,
    /// Removal requested for a series that does not exist
    Absent,
}

impl SeriesTransition {
    /// Whether the set of exported series (or label combinations) changed
    #[must_use]
    pub const fn is_structural(self) -> bool {
        matches!(self, Self::Registered | Self::Relabeled | Self::Removed)
    }
}

enum SeriesCollector {
    Scalar(Gauge),
    Labeled { vec: GaugeVec, label_value: String },
}

struct RegistryEntry {
    collector: SeriesCollector,
    last_value: f64,
}

/// Thread-safe registry shared by the poll loop and the scrape endpoint
pub struct SeriesRegistry {
    registry: Registry,
    entries: Mutex<HashMap<String, RegistryEntry>>,
}

impl SeriesRegistry {
    /// Creates an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, RegistryEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers a scalar gauge if needed and sets its value.
    ///
    /// # Errors
    ///
    /// Returns [`NutError::MetricUpdate`] if the id is already used by a
    /// labeled series or the collector cannot be registered.
    pub fn upsert_scalar(
        &self,
        series: &str,
        help: &str,
        value: f64,
    ) -> NutResult<SeriesTransition> {
        let mut entries = self.lock();

        if let Some(entry) = entries.get_mut(series) {
            let SeriesCollector::Scalar(gauge) = &entry.collector else {
                return Err(kind_mismatch(series, "scalar"));
            };
            gauge.set(value);
            let changed = entry.last_value.to_bits() != value.to_bits();
            entry.last_value = value;
            return Ok(if changed {
                SeriesTransition::Updated
            } else {
                SeriesTransition::Unchanged
            });
        }

        let gauge = Gauge::with_opts(Opts::new(series, help).namespace(NAMESPACE))
            .map_err(|e| update_error(series, &e))?;
        self.registry
            .register(Box::new(gauge.clone()))
            .map_err(|e| update_error(series, &e))?;
        gauge.set(value);
        entries.insert(
            series.to_string(),
            RegistryEntry {
                collector: SeriesCollector::Scalar(gauge),
                last_value: value,
            },
        );
        Ok(SeriesTransition::Registered)
    }

    /// Registers a one-label presence gauge if needed and points it at
    /// `label_value`, dropping any previous label combination.
    ///
    /// # Errors
    ///
    /// Returns [`NutError::MetricUpdate`] if the id is already used by a
    /// scalar series or the collector cannot be registered.
    pub fn upsert_labeled(
        &self,
        series: &str,
        help: &str,
        label_name: &str,
        label_value: &str,
    ) -> NutResult<SeriesTransition> {
        let mut entries = self.lock();

        if let Some(entry) = entries.get_mut(series) {
            let SeriesCollector::Labeled {
                vec,
                label_value: current,
            } = &mut entry.collector
            else {
                return Err(kind_mismatch(series, "labeled"));
            };

            if current == label_value {
                vec.with_label_values(&[label_value]).set(1.0);
                return Ok(SeriesTransition::Unchanged);
            }

            // Old combination must go before the new one appears
            if let Err(e) = vec.remove_label_values(&[current.as_str()]) {
                tracing::debug!(series, error = %e, "Previous label set already gone");
            }
            vec.with_label_values(&[label_value]).set(1.0);
            *current = label_value.to_string();
            return Ok(SeriesTransition::Relabeled);
        }

        let vec = GaugeVec::new(Opts::new(series, help).namespace(NAMESPACE), &[label_name])
            .map_err(|e| update_error(series, &e))?;
        self.registry
            .register(Box::new(vec.clone()))
            .map_err(|e| update_error(series, &e))?;
        vec.with_label_values(&[label_value]).set(1.0);
        entries.insert(
            series.to_string(),
            RegistryEntry {
                collector: SeriesCollector::Labeled {
                    vec,
                    label_value: label_value.to_string(),
                },
                last_value: 1.0,
            },
        );
        Ok(SeriesTransition::Registered)
    }

    /// Unregisters a series. Removing an unknown id is a no-op.
    pub fn remove(&self, series: &str) -> SeriesTransition {
        let Some(entry) = self.lock().remove(series) else {
            return SeriesTransition::Absent;
        };

        let result = match entry.collector {
            SeriesCollector::Scalar(gauge) => self.registry.unregister(Box::new(gauge)),
            SeriesCollector::Labeled { vec, .. } => self.registry.unregister(Box::new(vec)),
        };
        if let Err(e) = result {
            // The state table was the only thing still tracking it
            tracing::warn!(series, error = %e, "Series was not registered");
        }
        SeriesTransition::Removed
    }

    /// Current value of a series, if registered
    #[must_use]
    pub fn value(&self, series: &str) -> Option<f64> {
        self.lock().get(series).map(|e| e.last_value)
    }

    /// Current label value of a labeled series
    #[must_use]
    pub fn label(&self, series: &str) -> Option<String> {
        match &self.lock().get(series)?.collector {
            SeriesCollector::Labeled { label_value, .. } => Some(label_value.clone()),
            SeriesCollector::Scalar(_) => None,
        }
    }

    /// Whether a series is registered
    #[must_use]
    pub fn contains(&self, series: &str) -> bool {
        self.lock().contains_key(series)
    }

    /// Registered series ids, sorted
    #[must_use]
    pub fn series_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered series
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Renders all registered series in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns [`NutError::Exposition`] if encoding fails.
    pub fn encode(&self) -> NutResult<String> {
        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| NutError::Exposition(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| NutError::Exposition(e.to_string()))
    }
}

impl Default for SeriesRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SeriesRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesRegistry")
            .field("series", &self.series_ids())
            .finish_non_exhaustive()
    }
}

fn update_error(series: &str, err: &prometheus::Error) -> NutError {
    NutError::MetricUpdate {
        series: series.to_string(),
        reason: err.to_string(),
    }
}

fn kind_mismatch(series: &str, wanted: &str) -> NutError {
    NutError::MetricUpdate {
        series: series.to_string(),
        reason: format!("series is registered with a different kind, not {wanted}"),
    }
}
