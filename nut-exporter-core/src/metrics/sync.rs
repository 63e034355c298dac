//! Applies one poll's variables to the series registry
//!
//! Every catalog entry is evaluated exactly once per poll and independently
//! of the others: a bad value in one field never blocks the rest.

use std::sync::Arc;

use super::catalog::{MetricCatalog, MetricDefinition, MetricKind};
use super::registry::{SeriesRegistry, SeriesTransition};
use super::status::UpsStatus;
use crate::error::{NutError, NutResult};
use crate::parser::VariableMap;

/// Outcome of one [`MetricSynchronizer::apply`] call
#[derive(Debug, Default)]
pub struct SyncReport {
    transitions: Vec<(&'static str, SeriesTransition)>,
    errors: Vec<NutError>,
}

impl SyncReport {
    /// Transition per series, in catalog order. Series whose update failed
    /// are not listed here but in [`errors`](Self::errors).
    #[must_use]
    pub fn transitions(&self) -> &[(&'static str, SeriesTransition)] {
        &self.transitions
    }

    /// Transition recorded for one series
    #[must_use]
    pub fn transition(&self, series: &str) -> Option<SeriesTransition> {
        self.transitions
            .iter()
            .find(|(id, _)| *id == series)
            .map(|(_, t)| *t)
    }

    /// Per-field failures
    #[must_use]
    pub fn errors(&self) -> &[NutError] {
        &self.errors
    }

    /// Number of series whose transition was `t`
    #[must_use]
    pub fn count(&self, t: SeriesTransition) -> usize {
        self.transitions.iter().filter(|(_, x)| *x == t).count()
    }

    /// Number of registrations, relabels and removals
    #[must_use]
    pub fn structural_changes(&self) -> usize {
        self.transitions
            .iter()
            .filter(|(_, t)| t.is_structural())
            .count()
    }

    /// Whether every field was applied without error
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Adds errors raised before synchronization, e.g. skipped list lines
    pub(crate) fn record_errors(&mut self, errors: impl IntoIterator<Item = NutError>) {
        self.errors.extend(errors);
    }
}

/// Drives the registry from a [`MetricCatalog`]
#[derive(Debug)]
pub struct MetricSynchronizer {
    catalog: MetricCatalog,
    registry: Arc<SeriesRegistry>,
}

impl MetricSynchronizer {
    /// Creates a synchronizer writing into `registry`
    #[must_use]
    pub const fn new(catalog: MetricCatalog, registry: Arc<SeriesRegistry>) -> Self {
        Self { catalog, registry }
    }

    /// Registry this synchronizer writes to
    #[must_use]
    pub fn registry(&self) -> &Arc<SeriesRegistry> {
        &self.registry
    }

    /// Catalog in use
    #[must_use]
    pub const fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    /// Applies one poll's variables.
    ///
    /// Present and convertible values are upserted, absent variables remove
    /// their series, and values that fail to convert leave the series as it
    /// was and are reported in [`SyncReport::errors`].
    pub fn apply(&self, variables: &VariableMap) -> SyncReport {
        self.apply_partial(variables, &[])
    }

    /// Like [`apply`](Self::apply), but variables named in `unreadable` were
    /// listed by the server with a value that could not be read. Their series
    /// keep the previous value and get no transition.
    pub fn apply_partial(&self, variables: &VariableMap, unreadable: &[String]) -> SyncReport {
        let mut report = SyncReport::default();

        for def in self.catalog.iter() {
            let result = match variables.get(def.variable) {
                Some(raw) => self.upsert(def, raw),
                None if unreadable.iter().any(|name| name == def.variable) => {
                    tracing::debug!(
                        series = def.series,
                        variable = def.variable,
                        "Series kept, value unreadable this cycle"
                    );
                    continue;
                }
                None => Ok(self.registry.remove(def.series)),
            };

            match result {
                Ok(transition) => {
                    if transition == SeriesTransition::Removed {
                        tracing::debug!(series = def.series, variable = def.variable, "Series removed");
                    }
                    report.transitions.push((def.series, transition));
                }
                Err(err) => {
                    tracing::warn!(
                        series = def.series,
                        variable = def.variable,
                        error = %err,
                        "Failed to update series"
                    );
                    report.errors.push(err);
                }
            }
        }

        report
    }

    fn upsert(&self, def: &MetricDefinition, raw: &str) -> NutResult<SeriesTransition> {
        match def.kind {
            MetricKind::Scalar => {
                let value = parse_float(def.series, raw)?;
                self.registry.upsert_scalar(def.series, def.help, value)
            }
            MetricKind::Labeled(label) => {
                self.registry
                    .upsert_labeled(def.series, def.help, label, raw)
            }
            MetricKind::Status => {
                let status =
                    UpsStatus::from_status_value(raw).ok_or_else(|| NutError::MetricUpdate {
                        series: def.series.to_string(),
                        reason: format!("unknown status '{raw}'"),
                    })?;
                self.registry
                    .upsert_scalar(def.series, def.help, f64::from(status.code()))
            }
        }
    }
}

fn parse_float(series: &str, raw: &str) -> NutResult<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| NutError::MetricUpdate {
            series: series.to_string(),
            reason: format!("'{raw}' is not a number: {e}"),
        })
}
