use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("connection closed by server")]
    Closed,

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server error {id}: {msg}")]
    Server { id: u32, msg: String },

    #[error("not connected")]
    NotConnected,
}

pub type QueryResult<T> = std::result::Result<T, QueryError>;

impl QueryError {
    /// The socket can no longer be trusted; drop it and reconnect.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Timeout(_) | Self::Closed | Self::Protocol(_)
        )
    }
}

impl From<QueryError> for tsbeacon_core::Error {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::NotConnected => tsbeacon_core::Error::NotConnected("teamspeak".into()),
            other => tsbeacon_core::Error::Fetch(other.to_string()),
        }
    }
}
