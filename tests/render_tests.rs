//! Tests for the dry-run console rendering

use std::time::Duration;

use tsbeacon::render::{render, truncate, INNER_WIDTH};
use tsbeacon_bridge::DisplayOptions;
use tsbeacon_core::{Channel, ServerSnapshot, User};

fn snapshot() -> ServerSnapshot {
    let channels = vec![
        Channel::new(1, "Lobby"),
        Channel::new(2, "[cspacer]---"),
        Channel::new(3, "Gaming"),
        Channel::new(4, "AFK"),
    ];
    let users = vec![
        User::new(1, "alice", 1),
        User {
            away: true,
            away_message: Some("lunch".into()),
            ..User::new(2, "bob", 3)
        },
    ];
    ServerSnapshot::assemble("Test Server", Duration::from_secs(90_000), 32, channels, users)
}

fn lines(text: &str) -> Vec<&str> {
    text.lines().collect()
}

#[test]
fn every_line_has_the_same_width() {
    let opts = DisplayOptions {
        server_address: Some("ts.example.com".into()),
        custom_footer: Some("x".repeat(200)),
        ..Default::default()
    };
    let text = render(&snapshot(), &opts);
    for line in lines(&text) {
        assert_eq!(line.chars().count(), INNER_WIDTH + 2, "{line:?}");
    }
}

#[test]
fn lists_visible_channels_and_users() {
    let text = render(&snapshot(), &DisplayOptions::default());
    let rows = lines(&text);

    assert!(rows[1].contains("TeamSpeak Status (Test Server)"));
    assert!(rows.iter().any(|l| l.contains("📁 Lobby (1)")));
    assert!(rows.iter().any(|l| l.contains("    • alice ")));
    assert!(rows.iter().any(|l| l.contains("    • bob 💤(lunch)")));
    assert!(!text.contains("spacer"));
    assert!(!text.contains("AFK"));
    assert!(text.contains("2/32 online • Uptime: 1d 1h"));
    assert!(!text.contains("Address:"));
}

#[test]
fn show_empty_includes_idle_channels() {
    let opts = DisplayOptions {
        show_empty_channels: true,
        ..Default::default()
    };
    let text = render(&snapshot(), &opts);
    assert!(text.contains("📁 AFK (0)"));
    assert!(!text.contains("spacer"));
}

#[test]
fn connect_block_when_configured() {
    let opts = DisplayOptions {
        server_password: Some("guest".into()),
        ..Default::default()
    };
    let text = render(&snapshot(), &opts);
    assert!(text.contains("Password: guest"));
    assert!(!text.contains("Address:"));
    assert_eq!(text.matches('╠').count(), 3);
}

#[test]
fn empty_server_says_no_users() {
    let snap = ServerSnapshot::assemble(
        "Quiet",
        Duration::ZERO,
        8,
        vec![Channel::new(1, "Lobby")],
        Vec::new(),
    );
    let text = render(&snap, &DisplayOptions::default());
    assert!(text.contains("No users online"));
    assert!(text.contains("0/8 online • Uptime: 0m"));
}

#[test]
fn truncate_is_char_safe() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("ääääääääää", 6), "äää...");
    assert_eq!(truncate("abcdefgh", 5), "ab...");
}
