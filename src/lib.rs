//! tsbeacon - mirrors a TeamSpeak server's occupancy into one Discord message
//!
//! The binary wires `tsbeacon_query::TeamSpeakSource` and
//! `tsbeacon_discord::DiscordSink` into a `tsbeacon_bridge::Bridge`. This
//! library half holds what the binary needs around that: configuration,
//! logging setup and the dry-run console view.

pub mod config;
pub mod logging;
pub mod render;
