//! Effective exporter settings
//!
//! Built from an optional config file plus command line overrides, then
//! validated before the poller starts.

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

use super::ConfigFile;
use crate::error::{ConfigError, ConfigResult};
use crate::protocol::{Credentials, DEFAULT_NUT_PORT, NutSession};

/// Device name used when none is configured
pub const DEFAULT_UPS_NAME: &str = "ups";

/// Default poll interval in seconds
pub const DEFAULT_REFRESH_SECS: u64 = 10;

/// Default per-command deadline in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const PORT_RANGE: (u64, u64) = (1024, 65535);
const REFRESH_RANGE: (u64, u64) = (5, 300);
const TIMEOUT_RANGE: (u64, u64) = (1, 120);

static IPV4_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])\.){3}([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])$",
    )
    .expect("IPV4_REGEX is a valid regex pattern")
});

static HOSTNAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(([a-zA-Z0-9]|[a-zA-Z0-9][a-zA-Z0-9\-]*[a-zA-Z0-9])\.)*([A-Za-z0-9]|[A-Za-z0-9][A-Za-z0-9\-]*[A-Za-z0-9])$",
    )
    .expect("HOSTNAME_REGEX is a valid regex pattern")
});

/// Values given on the command line. Non-empty values replace the file's.
#[derive(Debug, Default)]
pub struct ConfigOverrides {
    /// `--server`
    pub server: Option<String>,
    /// `--user`
    pub user: Option<String>,
    /// `--password`
    pub password: Option<SecretString>,
    /// `--ups`
    pub ups_name: Option<String>,
}

/// Effective configuration
#[derive(Debug)]
pub struct ExporterConfig {
    /// NUT server host name or IPv4 address
    pub server: String,
    /// NUT server port
    pub port: u16,
    /// Device name on the server
    pub ups_name: String,
    /// Login user
    pub user: String,
    /// Login password
    pub password: SecretString,
    /// Poll interval in seconds
    pub refresh_secs: u64,
    /// Per-command deadline in seconds
    pub timeout_secs: u64,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            port: DEFAULT_NUT_PORT,
            ups_name: DEFAULT_UPS_NAME.to_string(),
            user: String::new(),
            password: SecretString::from(String::new()),
            refresh_secs: DEFAULT_REFRESH_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ExporterConfig {
    /// Merges defaults, file values and overrides, in that order of
    /// increasing precedence. Nothing is validated here.
    #[must_use]
    pub fn merge(file: ConfigFile, overrides: ConfigOverrides) -> Self {
        let mut config = Self::default();

        if let Some(server) = file.server {
            config.server = server;
        }
        if let Some(port) = file.port {
            config.port = port;
        }
        if let Some(ups_name) = file.ups_name {
            config.ups_name = ups_name;
        }
        if let Some(user) = file.user {
            config.user = user;
        }
        if let Some(password) = file.password {
            config.password = SecretString::from(password);
        }
        if let Some(refresh) = file.refresh {
            config.refresh_secs = refresh;
        }
        if let Some(timeout) = file.timeout {
            config.timeout_secs = timeout;
        }

        if let Some(server) = non_empty(overrides.server) {
            config.server = server;
        }
        if let Some(user) = non_empty(overrides.user) {
            config.user = user;
        }
        if let Some(password) = overrides
            .password
            .filter(|p| !p.expose_secret().is_empty())
        {
            config.password = password;
        }
        if let Some(ups_name) = non_empty(overrides.ups_name) {
            config.ups_name = ups_name;
        }

        config
    }

    /// Checks every field, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the [`ConfigError`] for the first invalid field, checked in
    /// the order server, user, password, UPS name, port, refresh, timeout.
    pub fn validate(&self) -> ConfigResult<()> {
        if !is_valid_server(&self.server) {
            return Err(ConfigError::InvalidServer(self.server.clone()));
        }
        if self.user.is_empty() {
            return Err(ConfigError::Missing("NUT user"));
        }
        if self.password.expose_secret().is_empty() {
            return Err(ConfigError::Missing("NUT user password"));
        }
        if self.ups_name.is_empty() {
            return Err(ConfigError::Missing("UPS name"));
        }
        check_range("port", u64::from(self.port), PORT_RANGE)?;
        check_range("refresh", self.refresh_secs, REFRESH_RANGE)?;
        check_range("timeout", self.timeout_secs, TIMEOUT_RANGE)
    }

    /// `server:port`
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }

    /// Poll interval
    #[must_use]
    pub const fn refresh(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }

    /// Per-command deadline
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Login credentials for the session
    #[must_use]
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.user.as_str(), self.password.expose_secret())
    }

    /// A closed session configured from these settings
    #[must_use]
    pub fn session(&self) -> NutSession {
        NutSession::new(
            self.server.as_str(),
            self.port,
            self.credentials(),
            self.ups_name.as_str(),
        )
        .with_timeout(self.timeout())
    }
}

/// Human-readable dump with the password masked
impl fmt::Display for ExporterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let password = if self.password.expose_secret().is_empty() {
            "Not set!"
        } else {
            "****"
        };
        writeln!(f, "Actual configuration:")?;
        writeln!(f, "UPS name:     [{}]", self.ups_name)?;
        writeln!(f, "NUT Server:   [{}]", self.address())?;
        writeln!(f, "User:         [{}]", self.user)?;
        writeln!(f, "Password:     [{password}]")?;
        writeln!(f, "Refresh:      [{}s]", self.refresh_secs)?;
        write!(f, "Timeout:      [{}s]", self.timeout_secs)
    }
}

/// Whether `server` is a dotted IPv4 address or an RFC 1123 host name
#[must_use]
pub fn is_valid_server(server: &str) -> bool {
    IPV4_REGEX.is_match(server) || HOSTNAME_REGEX.is_match(server)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

const fn check_range(field: &'static str, value: u64, (min, max): (u64, u64)) -> ConfigResult<()> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
