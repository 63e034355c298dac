//! Metric catalog, series registry and synchronizer
//!
//! The [`MetricCatalog`] says which NUT variables are exported and how.
//! [`MetricSynchronizer`] applies each poll to a shared [`SeriesRegistry`],
//! which the HTTP endpoint encodes on scrape.

mod catalog;
mod registry;
mod status;
mod sync;

pub use catalog::{MetricCatalog, MetricDefinition, MetricKind};
pub use registry::{EXPOSITION_CONTENT_TYPE, NAMESPACE, SeriesRegistry, SeriesTransition};
pub use status::UpsStatus;
pub use sync::{MetricSynchronizer, SyncReport};
