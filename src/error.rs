use std::io;
use thiserror::Error;

/// Startup errors. All of these are fatal: the server must not start
/// serving after any of them.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("could not load TLS material: {0}")]
    Tls(String),

    #[error("could not bind {addr}: {source}")]
    Bind { addr: String, source: io::Error },
}

impl ServerError {
    pub fn is_config(&self) -> bool {
        matches!(self, ServerError::Config(_))
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, ServerError::Tls(_))
    }

    pub fn is_bind(&self) -> bool {
        matches!(self, ServerError::Bind { .. })
    }
}
