//! Error types for tsbeacon

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("connection failed: {service} - {message}")]
    Connection { service: String, message: String },

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("apply failed: {0}")]
    Apply(String),

    #[error("rename failed: {0}")]
    Mutation(String),

    #[error("shutdown failed: {service} - {message}")]
    Shutdown { service: String, message: String },

    #[error("not connected: {0}")]
    NotConnected(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn connection(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn shutdown(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Shutdown {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Only start-time connection failures abort a run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}
