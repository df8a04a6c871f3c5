//! The single status message this process owns
//!
//! On first use the registry scans recent channel history for a message this
//! process authored earlier and adopts it, so restarts keep editing the same
//! message. Only when none exists is a placeholder posted. Every later apply
//! is an edit of that one message.

use tracing::info;
use tsbeacon_core::{
    AuthorId, Error, MessageId, MessageSink, RemoteMessage, Representation, Result,
};

use crate::projector;

/// How far back discovery looks in channel history.
pub const DISCOVERY_LOOKBACK: usize = 50;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactHandle {
    pub channel_id: String,
    pub message_id: MessageId,
    /// True when found in history rather than freshly created.
    pub adopted: bool,
}

#[derive(Debug)]
pub struct ArtifactRegistry {
    channel_id: String,
    lookback: usize,
    handle: Option<ArtifactHandle>,
}

impl ArtifactRegistry {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            lookback: DISCOVERY_LOOKBACK,
            handle: None,
        }
    }

    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn channel_id(&self) -> &str { &self.channel_id }

    pub fn handle(&self) -> Option<&ArtifactHandle> { self.handle.as_ref() }

    /// Resolve the artifact: the current handle, an adopted prior message,
    /// or a newly created placeholder, in that order.
    pub async fn adopt_or_create(&mut self, sink: &dyn MessageSink) -> Result<ArtifactHandle> {
        if let Some(handle) = &self.handle {
            return Ok(handle.clone());
        }

        let self_id = sink.self_id().await?;
        let messages = sink
            .list_recent_messages(&self.channel_id, self.lookback)
            .await?;

        let handle = match find_adoptable(&messages, &self_id) {
            Some(msg) => {
                info!(message_id = %msg.id, "Found existing status message");
                ArtifactHandle {
                    channel_id: self.channel_id.clone(),
                    message_id: msg.id.clone(),
                    adopted: true,
                }
            }
            None => {
                let placeholder = projector::connecting();
                let message_id = sink.create_message(&self.channel_id, &placeholder).await?;
                info!(message_id = %message_id, "Created new status message");
                ArtifactHandle {
                    channel_id: self.channel_id.clone(),
                    message_id,
                    adopted: false,
                }
            }
        };

        self.handle = Some(handle.clone());
        Ok(handle)
    }

    /// Edit the artifact in place. Never reposts; an externally deleted
    /// message keeps failing until the process restarts and rediscovers.
    pub async fn apply(
        &mut self,
        sink: &dyn MessageSink,
        representation: &Representation,
    ) -> Result<()> {
        let handle = self
            .adopt_or_create(sink)
            .await
            .map_err(|e| Error::Apply(format!("artifact discovery: {}", e)))?;

        sink.edit_message(&handle.channel_id, &handle.message_id, representation)
            .await
            .map_err(|e| Error::Apply(format!("edit {}: {}", handle.message_id, e)))
    }

    /// Forget the handle without touching the message.
    pub fn release(&mut self) -> Option<ArtifactHandle> {
        self.handle.take()
    }
}

/// Most recent message authored by `self_id` that carries an embed.
/// `messages` is newest first.
pub fn find_adoptable<'a>(
    messages: &'a [RemoteMessage],
    self_id: &AuthorId,
) -> Option<&'a RemoteMessage> {
    messages
        .iter()
        .find(|m| &m.author_id == self_id && m.has_structured_content)
}
