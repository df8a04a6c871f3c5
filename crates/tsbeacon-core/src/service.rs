//! Collaborator traits driven by the bridge
//!
//! `StateSource` reads the voice server, `MessageSink` owns the connection
//! to the messaging surface. Both are started and stopped by the bridge and
//! must tolerate `stop` without a prior successful `start`.

use crate::error::Result;
use crate::representation::Representation;
use crate::types::{AuthorId, MessageId, RemoteMessage, ServerSnapshot};

#[async_trait::async_trait]
pub trait StateSource: Send + Sync {
    /// Short name used in logs and errors (e.g. "teamspeak").
    fn name(&self) -> &str;

    /// Connect. A failed start leaves nothing half-open.
    async fn start(&self) -> Result<()>;

    /// Disconnect. Safe to call when never started.
    async fn stop(&self) -> Result<()>;

    /// Read the current server state. Fails when not connected.
    async fn fetch_snapshot(&self) -> Result<ServerSnapshot>;
}

#[async_trait::async_trait]
pub trait MessageSink: Send + Sync {
    fn name(&self) -> &str;

    async fn start(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Author id this process posts as. Available after `start`.
    async fn self_id(&self) -> Result<AuthorId>;

    /// Most recent messages in `channel_id`, newest first.
    async fn list_recent_messages(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<RemoteMessage>>;

    async fn create_message(
        &self,
        channel_id: &str,
        representation: &Representation,
    ) -> Result<MessageId>;

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &MessageId,
        representation: &Representation,
    ) -> Result<()>;

    /// Rename the channel the artifact lives in.
    async fn rename_container(&self, channel_id: &str, name: &str) -> Result<()>;
}
