//! upsd network protocol client
//!
//! [`NutSession`] implements the login handshake and the `GET VAR` / `LIST`
//! commands; [`tokenize`] splits reply lines honouring quoted values.

mod session;
mod tokenizer;

pub use session::{
    Credentials, DEFAULT_COMMAND_TIMEOUT, DEFAULT_NUT_PORT, ListResponse, NutSession, SessionState,
};
pub use tokenizer::{first_token, tokenize};
