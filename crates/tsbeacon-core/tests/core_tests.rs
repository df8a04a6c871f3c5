//! Tests for tsbeacon-core: snapshot assembly, ids, content model, errors

use std::time::Duration;
use tsbeacon_core::*;

// ===========================================================================
// ServerSnapshot::assemble
// ===========================================================================

fn channels() -> Vec<Channel> {
    vec![Channel::new(1, "Lobby"), Channel::new(2, "Gaming")]
}

#[test]
fn assemble_attaches_users_in_arrival_order() {
    let users = vec![
        User::new(10, "alice", 1),
        User::new(11, "bob", 2),
        User::new(12, "carol", 1),
    ];
    let snap = ServerSnapshot::assemble("Test", Duration::from_secs(60), 32, channels(), users);

    assert_eq!(snap.total_users, 3);
    let lobby = snap.channel(1).unwrap();
    let names: Vec<_> = lobby.users.iter().map(|u| u.nickname.as_str()).collect();
    assert_eq!(names, vec!["alice", "carol"]);
    assert_eq!(snap.channel(2).unwrap().users.len(), 1);
}

#[test]
fn assemble_counts_orphans_without_attaching_them() {
    let users = vec![User::new(10, "alice", 1), User::new(11, "ghost", 99)];
    let snap = ServerSnapshot::assemble("Test", Duration::ZERO, 32, channels(), users);

    assert_eq!(snap.total_users, 2);
    assert_eq!(snap.assigned_users(), 1);
    assert_eq!(snap.orphaned_users(), 1);
    assert!(snap
        .channels
        .iter()
        .all(|ch| ch.users.iter().all(|u| u.nickname != "ghost")));
}

#[test]
fn assemble_keeps_declared_channel_order() {
    let chans = vec![
        Channel::new(5, "Zeta"),
        Channel::new(1, "Alpha"),
        Channel::new(3, "Mid"),
    ];
    let snap = ServerSnapshot::assemble("Test", Duration::ZERO, 8, chans, Vec::new());
    let names: Vec<_> = snap.channels.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Zeta", "Alpha", "Mid"]);
    assert_eq!(snap.total_users, 0);
}

#[test]
fn channel_lookup_misses_unknown_id() {
    let snap = ServerSnapshot::assemble("Test", Duration::ZERO, 8, channels(), Vec::new());
    assert!(snap.channel(42).is_none());
}

// ===========================================================================
// Channel
// ===========================================================================

#[test]
fn spacer_detection_is_case_insensitive() {
    assert!(Channel::new(1, "[cspacer]---").is_spacer());
    assert!(Channel::new(1, "*SPACER*").is_spacer());
    assert!(Channel::new(1, "My Spacer 2").is_spacer());
    assert!(!Channel::new(1, "Lobby").is_spacer());
    assert!(!Channel::new(1, "space station").is_spacer());
}

// ===========================================================================
// Ids
// ===========================================================================

#[test]
fn message_id_display_and_equality() {
    let a = MessageId::new("123");
    let b: MessageId = "123".into();
    assert_eq!(a, b);
    assert_eq!(format!("{}", a), "123");
    assert_eq!(a.as_str(), "123");
}

#[test]
fn author_id_equality() {
    assert_eq!(AuthorId::new("bot"), AuthorId::from("bot"));
    assert_ne!(AuthorId::new("bot"), AuthorId::from("human"));
}

// ===========================================================================
// Representation
// ===========================================================================

#[test]
fn urgency_colors_are_distinct() {
    use std::collections::HashSet;
    let all = [
        Urgency::Pending,
        Urgency::Empty,
        Urgency::Nominal,
        Urgency::Busy,
        Urgency::Critical,
    ];
    let colors: HashSet<u32> = all.iter().map(|u| u.color()).collect();
    assert_eq!(colors.len(), all.len());
    assert_eq!(Urgency::Critical.color(), 0xE74C3C);
}

#[test]
fn urgency_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Urgency::Busy).unwrap(), r#""busy""#);
    assert_eq!(Urgency::Pending.to_string(), "pending");
}

#[test]
fn content_prefers_channels_field() {
    let rep = Representation {
        title: Some("srv".into()),
        urgency: Urgency::Nominal,
        description: Some("desc".into()),
        fields: vec![
            Field::inline("👥 Online", "1"),
            Field::block(CHANNELS_FIELD, "**#Lobby** `1`"),
        ],
        footer: None,
        thumbnail_url: None,
        container_name: None,
    };
    assert_eq!(rep.content(), Some("**#Lobby** `1`"));
    assert!(rep.field("👥 Online").unwrap().inline);
}

#[test]
fn content_falls_back_to_description() {
    let rep = Representation {
        title: None,
        urgency: Urgency::Pending,
        description: Some("connecting".into()),
        fields: Vec::new(),
        footer: None,
        thumbnail_url: None,
        container_name: None,
    };
    assert_eq!(rep.content(), Some("connecting"));
}

// ===========================================================================
// Error
// ===========================================================================

#[test]
fn only_connection_errors_are_fatal() {
    assert!(Error::connection("teamspeak", "refused").is_fatal());
    assert!(!Error::NotConnected("teamspeak".into()).is_fatal());
    assert!(!Error::Fetch("timeout".into()).is_fatal());
    assert!(!Error::Apply("gone".into()).is_fatal());
    assert!(!Error::Mutation("429".into()).is_fatal());
    assert!(!Error::shutdown("discord", "closed").is_fatal());
}

#[test]
fn error_display_includes_service() {
    let e = Error::connection("discord", "401 unauthorized");
    assert_eq!(e.to_string(), "connection failed: discord - 401 unauthorized");
}
