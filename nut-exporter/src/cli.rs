//! CLI argument parsing types using `clap`.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use nut_exporter_core::config::DEFAULT_CONFIG_FILE;
use nut_exporter_core::{ConfigOverrides, TracingConfig, TracingLevel, TracingOutput};
use secrecy::SecretString;

/// Default address for the metrics endpoint
pub const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:8100";

/// Exports the variables of one UPS on a NUT server as Prometheus metrics
// Dotted aliases keep the flag names of earlier releases working
#[derive(Debug, Parser)]
#[command(name = "nut-exporter")]
#[command(author, version, about = "Prometheus exporter for UPS devices served by a NUT upsd")]
pub struct Cli {
    /// Configuration file (YAML, JSON or TOML by extension); ignored if missing
    #[arg(
        short,
        long,
        alias = "config.file",
        env = "NUT_EXPORTER_CONFIG",
        default_value = DEFAULT_CONFIG_FILE
    )]
    pub config: PathBuf,

    /// NUT server host name or IPv4 address
    #[arg(long, alias = "nut.server", env = "NUT_SERVER")]
    pub server: Option<String>,

    /// NUT user allowed to read variables
    #[arg(long, alias = "nut.user", env = "NUT_USER")]
    pub user: Option<String>,

    /// Password of the NUT user
    #[arg(long, alias = "nut.pwd", env = "NUT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Name of the UPS on the NUT server
    #[arg(long = "ups", alias = "nut.ups", env = "NUT_UPS")]
    pub ups_name: Option<String>,

    /// Address on which to expose /metrics and /health
    #[arg(
        long,
        alias = "web.listen-address",
        env = "NUT_EXPORTER_LISTEN_ADDRESS",
        default_value = DEFAULT_LISTEN_ADDRESS
    )]
    pub listen_address: SocketAddr,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "NUT_EXPORTER_LOG_LEVEL", default_value = "info")]
    pub log_level: TracingLevel,

    /// Write logs to this file instead of stderr
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long, alias = "config.show")]
    pub show_config: bool,
}

impl Cli {
    /// Command line values that replace config file values
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            server: self.server.clone(),
            user: self.user.clone(),
            password: self.password.clone().map(SecretString::from),
            ups_name: self.ups_name.clone(),
        }
    }

    /// Logging setup derived from `--log-level` and `--log-file`
    pub fn tracing_config(&self) -> TracingConfig {
        let output = self
            .log_file
            .clone()
            .map_or(TracingOutput::Stderr, |path| TracingOutput::File { path });
        TracingConfig::new()
            .with_level(self.log_level)
            .with_output(output)
    }
}
