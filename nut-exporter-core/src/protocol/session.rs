//! upsd protocol session
//!
//! One [`NutSession`] owns at most one TCP connection. It performs the
//! `USERNAME`/`PASSWORD`/`LOGIN` handshake and exchanges single commands.
//! Protocol details: <https://networkupstools.org/docs/developer-guide.chunked/net-protocol.html>

use std::borrow::Cow;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tracing::Instrument;

use super::tokenizer::{first_token, tokenize};
use crate::error::{NutError, NutResult};
use crate::tracing::span_names;

/// Default upsd TCP port
pub const DEFAULT_NUT_PORT: u16 = 3493;

/// Default deadline for dialing and for each command round trip
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Login credentials for upsd
pub struct Credentials {
    /// upsd user (from `upsd.users`)
    pub username: String,
    /// Password for that user
    pub password: SecretString,
}

impl Credentials {
    /// Creates credentials from a user name and password
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"****")
            .finish()
    }
}

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No socket
    #[default]
    Closed,
    /// Socket open, handshake in progress
    Authenticating,
    /// Logged in; data commands allowed
    Ready,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Authenticating => write!(f, "authenticating"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// Result of a `LIST` command
#[derive(Debug, Default)]
pub struct ListResponse {
    /// Normalized `name: value` lines joined by `\n`
    pub blob: String,
    /// Lines that were skipped because they had too few tokens
    pub malformed: Vec<NutError>,
    /// Variable names carried by skipped lines; their values are unknown
    /// this time, not gone
    pub unreadable: Vec<String>,
}

/// A session with one upsd for one device
#[derive(Debug)]
pub struct NutSession {
    host: String,
    port: u16,
    credentials: Credentials,
    device: String,
    timeout: Duration,
    stream: Option<BufStream<TcpStream>>,
    state: SessionState,
}

impl NutSession {
    /// Creates a closed session
    pub fn new(
        host: impl Into<String>,
        port: u16,
        credentials: Credentials,
        device: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            credentials,
            device: device.into(),
            timeout: DEFAULT_COMMAND_TIMEOUT,
            stream: None,
            state: SessionState::Closed,
        }
    }

    /// Sets the per-command deadline
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Current lifecycle state
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether data commands may be issued
    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Server host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Server port
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Device name on the server
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Dials the server and logs in.
    ///
    /// An already open socket is dropped first. On any failure the session
    /// ends up `Closed`.
    ///
    /// # Errors
    ///
    /// Returns [`NutError::Connection`] or [`NutError::Timeout`] on transport
    /// failure and [`NutError::Authentication`] when a handshake reply is not
    /// exactly `OK`.
    pub async fn open(&mut self) -> NutResult<()> {
        self.disconnect();

        let dial = TcpStream::connect((self.host.as_str(), self.port));
        let dialed = tokio::time::timeout(self.timeout, dial).await;
        let tcp = match dialed {
            Ok(Ok(tcp)) => tcp,
            Ok(Err(e)) => {
                tracing::error!(
                    host = %self.host,
                    port = self.port,
                    error = %e,
                    "Problem connecting to NUT server"
                );
                return Err(self.connection_error(e.to_string()));
            }
            Err(_) => {
                let reason = format!("connect timed out after {}s", self.timeout.as_secs());
                tracing::error!(
                    host = %self.host,
                    port = self.port,
                    %reason,
                    "Problem connecting to NUT server"
                );
                return Err(self.connection_error(reason));
            }
        };

        self.stream = Some(BufStream::new(tcp));
        self.state = SessionState::Authenticating;

        let span = tracing::debug_span!(span_names::SESSION_OPEN, device = %self.device);
        if let Err(err) = self.handshake().instrument(span).await {
            tracing::error!(device = %self.device, error = %err, "NUT login failed");
            self.disconnect();
            return Err(err);
        }

        self.state = SessionState::Ready;
        tracing::debug!(
            host = %self.host,
            device = %self.device,
            "Logged in to NUT server"
        );
        Ok(())
    }

    async fn handshake(&mut self) -> NutResult<()> {
        let user = format!("USERNAME {}", self.credentials.username);
        self.expect_ok(&user, "USERNAME").await?;

        let pass = format!("PASSWORD {}", self.credentials.password.expose_secret());
        self.expect_ok(&pass, "PASSWORD").await?;

        let login = format!("LOGIN {}", self.device);
        self.expect_ok(&login, "LOGIN").await
    }

    /// Logs out and drops the socket. Safe to call on a closed session.
    pub async fn close(&mut self) {
        if self.stream.is_some() {
            // Reply ignored; the socket goes away either way
            if self.send("LOGOUT", "LOGOUT").await.is_ok() {
                let _ = self.read_line("LOGOUT").await;
            }
            tracing::debug!(device = %self.device, "Logged out from NUT server");
        }
        self.disconnect();
    }

    /// Reads one variable with `GET VAR`.
    ///
    /// # Errors
    ///
    /// Returns [`NutError::NotConnected`] outside `Ready`, [`NutError::Server`]
    /// for an `ERR` reply, [`NutError::ProtocolParse`] if the reply has fewer
    /// than four tokens, or a transport error.
    pub async fn fetch_variable(&mut self, name: &str) -> NutResult<String> {
        self.ensure_ready("GET VAR")?;
        let command = format!("GET VAR {} {name}", self.device);
        let reply = self.command(&command, "GET VAR").await?;

        if first_token(&reply) == "ERR" {
            tracing::error!(
                variable = name,
                device = %self.device,
                reply = %reply,
                "Problem reading VAR"
            );
            return Err(server_error("GET VAR", &reply));
        }

        let mut tokens = tokenize(&reply);
        if tokens.len() < 4 {
            return Err(NutError::ProtocolParse {
                command: "GET VAR".to_string(),
                line: reply,
                reason: format!("expected 4 tokens, got {}", tokens.len()),
            });
        }

        tracing::debug!(variable = name, "Read VAR");
        Ok(tokens.swap_remove(3))
    }

    /// Reads a whole list with `LIST <kind>`.
    ///
    /// Lines with fewer than four tokens are skipped and reported in
    /// [`ListResponse::malformed`], with the variable name in
    /// [`ListResponse::unreadable`] when the line still has one. The rest of
    /// the list is still returned.
    ///
    /// # Errors
    ///
    /// Returns [`NutError::NotConnected`] outside `Ready`, [`NutError::Server`]
    /// when the server refuses the list, or a transport error if the stream
    /// ends before the `END` line.
    pub async fn fetch_list(&mut self, kind: &str) -> NutResult<ListResponse> {
        self.ensure_ready("LIST")?;
        let command = format!("LIST {kind} {}", self.device);
        self.send(&command, "LIST").await?;

        let mut lines = Vec::new();
        let mut malformed = Vec::new();
        let mut unreadable = Vec::new();
        let mut first = true;

        loop {
            let line = self.read_line("LIST").await?;
            let head = first_token(&line);

            if head == "END" {
                break;
            }
            if first && head == "ERR" {
                tracing::error!(
                    kind,
                    device = %self.device,
                    reply = %line,
                    "Problem reading LIST"
                );
                return Err(server_error("LIST", &line));
            }
            first = false;
            if head == "BEGIN" {
                continue;
            }

            let tokens = tokenize(&line);
            if tokens.len() < 4 {
                let err = NutError::ProtocolParse {
                    command: format!("LIST {kind}"),
                    line: line.clone(),
                    reason: format!("expected at least 4 tokens, got {}", tokens.len()),
                };
                tracing::warn!(device = %self.device, error = %err, "Skipping list line");
                malformed.push(err);
                if let Some(name) = tokens.into_iter().nth(2) {
                    unreadable.push(name);
                }
                continue;
            }
            lines.push(format!("{}: {}", tokens[2], tokens[3]));
        }

        tracing::debug!(
            kind,
            lines = lines.len(),
            skipped = malformed.len(),
            "Read LIST"
        );
        Ok(ListResponse {
            blob: lines.join("\n"),
            malformed,
            unreadable,
        })
    }

    fn ensure_ready(&self, label: &str) -> NutResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(NutError::NotConnected {
                command: label.to_string(),
            })
        }
    }

    async fn expect_ok(&mut self, line: &str, label: &str) -> NutResult<()> {
        let reply = self.command(line, label).await?;
        if reply == "OK" {
            Ok(())
        } else {
            Err(NutError::Authentication {
                command: label.to_string(),
                reply,
            })
        }
    }

    async fn command(&mut self, line: &str, label: &str) -> NutResult<String> {
        self.send(line, label).await?;
        self.read_line(label).await
    }

    async fn send(&mut self, line: &str, label: &str) -> NutResult<()> {
        let timeout = self.timeout;
        let Some(stream) = self.stream.as_mut() else {
            return Err(NutError::NotConnected {
                command: label.to_string(),
            });
        };

        let write = async {
            stream.write_all(line.as_bytes()).await?;
            stream.write_all(b"\r\n").await?;
            stream.flush().await
        };
        let result = tokio::time::timeout(timeout, write).await;
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(self.transport_failed(e.to_string())),
            Err(_) => Err(self.timed_out(label)),
        }
    }

    async fn read_line(&mut self, label: &str) -> NutResult<String> {
        let timeout = self.timeout;
        let Some(stream) = self.stream.as_mut() else {
            return Err(NutError::NotConnected {
                command: label.to_string(),
            });
        };

        let mut buf = Vec::new();
        let result = tokio::time::timeout(timeout, stream.read_until(b'\n', &mut buf)).await;
        match result {
            Ok(Ok(0)) => Err(self.transport_failed("connection closed by server".to_string())),
            Ok(Ok(_)) => Ok(self.decode_line(&buf)),
            Ok(Err(e)) => Err(self.transport_failed(e.to_string())),
            Err(_) => Err(self.timed_out(label)),
        }
    }

    /// Invalid UTF-8 (e.g. Latin-1 descriptions) is replaced, not fatal
    fn decode_line(&self, buf: &[u8]) -> String {
        let text = String::from_utf8_lossy(buf);
        if let Cow::Owned(_) = text {
            tracing::warn!(
                device = %self.device,
                "Reply line is not valid UTF-8, invalid bytes replaced"
            );
        }
        text.trim_end_matches(['\r', '\n']).to_string()
    }

    fn transport_failed(&mut self, reason: String) -> NutError {
        self.disconnect();
        self.connection_error(reason)
    }

    fn timed_out(&mut self, label: &str) -> NutError {
        self.disconnect();
        NutError::Timeout {
            command: label.to_string(),
            secs: self.timeout.as_secs(),
        }
    }

    fn connection_error(&self, reason: String) -> NutError {
        NutError::Connection {
            host: self.host.clone(),
            port: self.port,
            reason,
        }
    }

    fn disconnect(&mut self) {
        self.stream = None;
        self.state = SessionState::Closed;
    }
}

fn server_error(command: &str, reply: &str) -> NutError {
    NutError::Server {
        command: command.to_string(),
        message: reply
            .strip_prefix("ERR")
            .map_or(reply, str::trim)
            .to_string(),
    }
}
