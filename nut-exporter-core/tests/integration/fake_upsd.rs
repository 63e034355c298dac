//! In-process stand-in for a NUT `upsd`
//!
//! Accepts any number of connections on an ephemeral localhost port,
//! records every command line and answers from a variable table. Replies
//! for individual commands can be overridden by prefix.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use nut_exporter_core::{Credentials, NutSession};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

pub const TEST_USER: &str = "monuser";
pub const TEST_PASSWORD: &str = "secret";
pub const TEST_DEVICE: &str = "ups";

/// Canned answer for a command
#[derive(Debug, Clone)]
pub enum Reply {
    /// Send these lines (CRLF appended)
    Lines(Vec<String>),
    /// Send these bytes unchanged
    Raw(Vec<u8>),
    /// Close the connection without answering
    Hangup,
    /// Keep the connection open and never answer
    Silent,
}

impl Reply {
    pub fn lines(lines: &[&str]) -> Self {
        Self::Lines(lines.iter().map(|l| (*l).to_string()).collect())
    }
}

#[derive(Default)]
struct ServerState {
    commands: Mutex<Vec<String>>,
    variables: Mutex<Vec<(String, String)>>,
    overrides: Mutex<HashMap<String, Reply>>,
}

pub struct FakeUpsd {
    port: u16,
    state: Arc<ServerState>,
    task: JoinHandle<()>,
}

impl FakeUpsd {
    pub async fn start(variables: &[(&str, &str)]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(ServerState::default());
        *state.variables.lock().unwrap() = to_owned_pairs(variables);

        let shared = Arc::clone(&state);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, Arc::clone(&shared)));
            }
        });

        Self { port, state, task }
    }

    /// Every command line received so far, across connections
    pub fn commands(&self) -> Vec<String> {
        self.state.commands.lock().unwrap().clone()
    }

    pub fn set_variables(&self, variables: &[(&str, &str)]) {
        *self.state.variables.lock().unwrap() = to_owned_pairs(variables);
    }

    /// Answers any command starting with `prefix` with `reply`
    pub fn override_reply(&self, prefix: &str, reply: Reply) {
        self.state
            .overrides
            .lock()
            .unwrap()
            .insert(prefix.to_string(), reply);
    }

    /// Closed session pointed at this server with the test credentials
    pub fn session(&self) -> NutSession {
        NutSession::new(
            "127.0.0.1",
            self.port,
            Credentials::new(TEST_USER, TEST_PASSWORD),
            TEST_DEVICE,
        )
    }
}

impl Drop for FakeUpsd {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A localhost port with nothing listening on it
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

fn to_owned_pairs(variables: &[(&str, &str)]) -> Vec<(String, String)> {
    variables
        .iter()
        .map(|(n, v)| ((*n).to_string(), (*v).to_string()))
        .collect()
}

async fn serve(stream: TcpStream, state: Arc<ServerState>) {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        state.commands.lock().unwrap().push(line.clone());

        let reply = override_for(&state, &line).unwrap_or_else(|| standard_reply(&state, &line));
        match reply {
            Reply::Hangup => return,
            Reply::Silent => {
                tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
                return;
            }
            Reply::Raw(bytes) => {
                if write.write_all(&bytes).await.is_err() {
                    return;
                }
            }
            Reply::Lines(out) => {
                for l in out {
                    if write.write_all(format!("{l}\r\n").as_bytes()).await.is_err() {
                        return;
                    }
                }
            }
        }

        if line == "LOGOUT" {
            return;
        }
    }
}

fn override_for(state: &ServerState, line: &str) -> Option<Reply> {
    state
        .overrides
        .lock()
        .unwrap()
        .iter()
        .find(|(prefix, _)| line.starts_with(prefix.as_str()))
        .map(|(_, reply)| reply.clone())
}

fn standard_reply(state: &ServerState, line: &str) -> Reply {
    let words: Vec<&str> = line.split(' ').collect();
    match words.as_slice() {
        ["USERNAME", ..] | ["PASSWORD", ..] | ["LOGIN", ..] => Reply::lines(&["OK"]),
        ["LOGOUT"] => Reply::lines(&["OK Goodbye"]),
        ["GET", "VAR", device, name] => {
            let variables = state.variables.lock().unwrap();
            match variables.iter().find(|(n, _)| n == name) {
                Some((_, value)) => Reply::Lines(vec![format!(
                    "VAR {device} {name} \"{}\"",
                    escape(value)
                )]),
                None => Reply::lines(&["ERR VAR-NOT-SUPPORTED"]),
            }
        }
        ["LIST", "VAR", device] => {
            let variables = state.variables.lock().unwrap();
            let mut out = vec![format!("BEGIN LIST VAR {device}")];
            out.extend(
                variables
                    .iter()
                    .map(|(n, v)| format!("VAR {device} {n} \"{}\"", escape(v))),
            );
            out.push(format!("END LIST VAR {device}"));
            Reply::Lines(out)
        }
        _ => Reply::lines(&["ERR UNKNOWN-COMMAND"]),
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
