//! tsbeacon discord - Discord REST client implementing `MessageSink`

pub mod embed;
pub mod error;
pub mod sink;

pub use embed::{Embed, EmbedField, MessagePayload};
pub use error::{DiscordError, DiscordResult};
pub use sink::{DiscordConfig, DiscordSink, DEFAULT_API_BASE};
