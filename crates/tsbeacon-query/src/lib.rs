//! tsbeacon query - TeamSpeak 3 ServerQuery client and `StateSource`

pub mod client;
pub mod codec;
pub mod error;
pub mod source;

pub use client::{QueryClient, COMMAND_TIMEOUT, CONNECT_TIMEOUT};
pub use codec::{Record, Status};
pub use error::{QueryError, QueryResult};
pub use source::{build_snapshot, TeamSpeakConfig, TeamSpeakSource};
