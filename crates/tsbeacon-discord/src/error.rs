use thiserror::Error;

#[derive(Error, Debug)]
pub enum DiscordError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("not connected")]
    NotConnected,

    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

pub type DiscordResult<T> = std::result::Result<T, DiscordError>;

impl DiscordError {
    pub fn from_status(status: u16, body: String, retry_after_ms: u64) -> Self {
        match status {
            401 | 403 => Self::AuthFailed(body),
            404 => Self::NotFound(body),
            429 => Self::RateLimited { retry_after_ms },
            _ => Self::RequestFailed(format!("{}: {}", status, body)),
        }
    }

    /// Map onto the bridge's error kinds; `wrap` picks the kind for
    /// everything except a missing session.
    pub(crate) fn into_core(
        self,
        wrap: fn(String) -> tsbeacon_core::Error,
    ) -> tsbeacon_core::Error {
        match self {
            Self::NotConnected => tsbeacon_core::Error::NotConnected("discord".into()),
            other => wrap(other.to_string()),
        }
    }
}
