//! Core types for tsbeacon

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub type ChannelId = u64;
pub type UserId = u64;

/// One point-in-time read of the voice server.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerSnapshot {
    pub name: String,
    pub uptime: Duration,
    /// Channels in the server's declared order.
    pub channels: Vec<Channel>,
    /// Every connected user, including users whose channel did not resolve.
    pub total_users: usize,
    pub capacity: usize,
}

impl ServerSnapshot {
    /// Build a snapshot by resolving each user's channel reference.
    ///
    /// Users pointing at a channel absent from `channels` still count toward
    /// `total_users` but are not attached to any channel.
    pub fn assemble(
        name: impl Into<String>,
        uptime: Duration,
        capacity: usize,
        mut channels: Vec<Channel>,
        users: impl IntoIterator<Item = User>,
    ) -> Self {
        let index: HashMap<ChannelId, usize> = channels
            .iter()
            .enumerate()
            .map(|(i, ch)| (ch.id, i))
            .collect();

        let mut total_users = 0;
        for user in users {
            total_users += 1;
            if let Some(&i) = index.get(&user.channel_id) {
                channels[i].users.push(user);
            }
        }

        Self {
            name: name.into(),
            uptime,
            channels,
            total_users,
            capacity,
        }
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.iter().find(|ch| ch.id == id)
    }

    /// Users attached to some channel of this snapshot.
    pub fn assigned_users(&self) -> usize {
        self.channels.iter().map(|ch| ch.users.len()).sum()
    }

    /// Users counted in the total whose channel reference did not resolve.
    pub fn orphaned_users(&self) -> usize {
        self.total_users.saturating_sub(self.assigned_users())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    pub parent_id: ChannelId,
    pub order: u64,
    pub users: Vec<User>,
}

impl Channel {
    pub fn new(id: ChannelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Decorative separator channels, e.g. `[cspacer]----`.
    pub fn is_spacer(&self) -> bool {
        self.name.to_lowercase().contains("spacer")
    }
}

/// A connected client. `channel_id` is a plain reference that may not resolve.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub nickname: String,
    pub channel_id: ChannelId,
    /// Microphone muted.
    pub input_muted: bool,
    /// Speakers muted (deafened).
    pub output_muted: bool,
    pub away: bool,
    pub away_message: Option<String>,
    pub idle: Duration,
    pub recording: bool,
}

impl User {
    pub fn new(id: UserId, nickname: impl Into<String>, channel_id: ChannelId) -> Self {
        Self {
            id,
            nickname: nickname.into(),
            channel_id,
            ..Default::default()
        }
    }
}

/// Identity of a message in the target surface - cheaply cloneable
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct MessageId(Arc<str>);

impl MessageId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Identity of a message author in the target surface.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct AuthorId(Arc<str>);

impl AuthorId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(Arc::from(s.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AuthorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AuthorId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A message as listed by the sink, reduced to what adoption needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteMessage {
    pub id: MessageId,
    pub author_id: AuthorId,
    pub has_structured_content: bool,
}
