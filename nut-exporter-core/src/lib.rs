//! NUT exporter core library
//!
//! This crate talks to a Network UPS Tools `upsd` server and mirrors one
//! device's variables into Prometheus series.
//!
//! # Crate Structure
//!
//! - [`protocol`] - Line protocol session (handshake, `GET VAR`, `LIST`) and tokenizer
//! - [`parser`] - Normalized `name: value` blob parsing
//! - [`metrics`] - Metric catalog, UPS status codes, series registry, synchronizer
//! - [`poller`] - Periodic poll loop
//! - [`config`] - Config file loading, overrides and validation
//! - [`tracing`] - Structured logging setup
//! - [`error`] - Error types

// Enable missing_docs warning for public API documentation
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod metrics;
pub mod parser;
pub mod poller;
pub mod protocol;
pub mod tracing;

pub use config::{ConfigFile, ConfigFormat, ConfigOverrides, DEFAULT_CONFIG_FILE, ExporterConfig};
pub use error::{ConfigError, ConfigResult, NutError, NutResult};
pub use metrics::{
    EXPOSITION_CONTENT_TYPE, MetricCatalog, MetricDefinition, MetricKind, MetricSynchronizer,
    SeriesRegistry, SeriesTransition, SyncReport, UpsStatus,
};
pub use parser::{ResponseParser, VariableMap, VariableRecord};
pub use poller::{CycleOutcome, DEFAULT_REFRESH, MIN_REFRESH, PollScheduler, PollerHandle};
pub use protocol::{Credentials, DEFAULT_NUT_PORT, ListResponse, NutSession, SessionState};
pub use tracing::{
    TracingConfig, TracingError, TracingLevel, TracingOutput, TracingResult, get_tracing_config,
    init_tracing, is_tracing_initialized, span_names,
};
