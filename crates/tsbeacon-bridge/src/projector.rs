//! Snapshot → representation projection
//!
//! Pure and deterministic: the same snapshot and options always produce a
//! byte-identical `Representation`. No clock reads, no I/O.

use std::time::Duration;
use tsbeacon_core::{Channel, Field, Representation, ServerSnapshot, Urgency, User, CHANNELS_FIELD};

/// Users idle longer than this get an idle marker.
pub const IDLE_THRESHOLD: Duration = Duration::from_secs(5 * 60);

/// Longest value an embed field may carry.
pub const FIELD_VALUE_LIMIT: usize = 1024;

pub const CONNECTING_TEXT: &str = "```\n⏳ Connecting to server...\n```";
pub const NO_ACTIVITY_TEXT: &str = "*No active channels*";
pub const DEFAULT_FOOTER: &str = "Last updated";

/// Hangul filler keeps the bullet indented; chat clients strip leading spaces.
const USER_PREFIX: &str = "ㅤ• ";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DisplayOptions {
    pub show_empty_channels: bool,
    pub server_address: Option<String>,
    pub server_password: Option<String>,
    pub custom_footer: Option<String>,
    /// Template with `{online}`, `{max}` and `{server}` placeholders.
    pub channel_name_format: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Project a snapshot, or its absence before the first successful fetch.
pub fn project(snapshot: Option<&ServerSnapshot>, opts: &DisplayOptions) -> Representation {
    let Some(snap) = snapshot else {
        return connecting();
    };

    let mut fields = vec![
        Field::inline(
            "👥 Online",
            format!("**{}** / {}", snap.total_users, snap.capacity),
        ),
        Field::inline("⏱️ Uptime", format_uptime(snap.uptime)),
    ];

    if let Some(address) = non_empty(&opts.server_address) {
        let mut connect = format!("`{}`", address);
        if let Some(password) = non_empty(&opts.server_password) {
            connect.push_str(&format!("\nPass: `{}`", password));
        }
        fields.push(Field::inline("🔗 Connect", connect));
    }

    fields.push(Field::block(
        CHANNELS_FIELD,
        cap_lines(&channel_list(snap, opts), FIELD_VALUE_LIMIT),
    ));

    Representation {
        title: Some(snap.name.clone()),
        urgency: urgency(snap.total_users, snap.capacity),
        description: None,
        fields,
        footer: Some(
            non_empty(&opts.custom_footer)
                .unwrap_or(DEFAULT_FOOTER)
                .to_string(),
        ),
        thumbnail_url: non_empty(&opts.thumbnail_url).map(str::to_string),
        container_name: non_empty(&opts.channel_name_format)
            .map(|template| container_name(template, snap)),
    }
}

/// Placeholder shown until the first snapshot arrives.
pub fn connecting() -> Representation {
    Representation {
        title: None,
        urgency: Urgency::Pending,
        description: Some(CONNECTING_TEXT.to_string()),
        fields: Vec::new(),
        footer: None,
        thumbnail_url: None,
        container_name: None,
    }
}

/// Occupancy class. A zero capacity with users online counts as saturated.
pub fn urgency(occupied: usize, capacity: usize) -> Urgency {
    if occupied == 0 {
        return Urgency::Empty;
    }
    if capacity == 0 {
        return Urgency::Critical;
    }
    // Integer form of ratio >= 0.8 and ratio >= 0.5.
    if occupied * 5 >= capacity * 4 {
        Urgency::Critical
    } else if occupied * 2 >= capacity {
        Urgency::Busy
    } else {
        Urgency::Nominal
    }
}

/// Channels that survive spacer and emptiness filtering, in declared order.
pub fn visible_channels<'a>(
    snapshot: &'a ServerSnapshot,
    opts: &'a DisplayOptions,
) -> impl Iterator<Item = &'a Channel> + 'a {
    snapshot
        .channels
        .iter()
        .filter(|ch| !ch.is_spacer())
        .filter(|ch| opts.show_empty_channels || !ch.users.is_empty())
}

/// The per-channel listing, or the no-activity placeholder.
pub fn channel_list(snapshot: &ServerSnapshot, opts: &DisplayOptions) -> String {
    let mut groups = Vec::new();

    for ch in visible_channels(snapshot, opts) {
        let mut group = format!("**#{}** `{}`", ch.name, ch.users.len());
        for user in &ch.users {
            group.push('\n');
            group.push_str(USER_PREFIX);
            group.push_str(&user_line(user));
        }
        groups.push(group);
    }

    if groups.is_empty() {
        return NO_ACTIVITY_TEXT.to_string();
    }
    groups.join("\n\n")
}

/// Nickname followed by the status suffix, if any.
pub fn user_line(user: &User) -> String {
    let status = status_suffix(user);
    if status.is_empty() {
        user.nickname.clone()
    } else {
        format!("{} {}", user.nickname, status)
    }
}

/// Status markers in fixed order: recording, output/input mute, away, idle.
pub fn status_suffix(user: &User) -> String {
    let mut parts: Vec<String> = Vec::new();

    if user.recording {
        parts.push("🔴".into());
    }

    if user.output_muted {
        parts.push("🔇".into());
    } else if user.input_muted {
        parts.push("🎙️".into());
    }

    if user.away {
        match user.away_message.as_deref().filter(|m| !m.is_empty()) {
            Some(msg) => parts.push(format!("💤({})", msg)),
            None => parts.push("💤".into()),
        }
    }

    if user.idle > IDLE_THRESHOLD {
        parts.push(format!("idle {}", format_idle(user.idle)));
    }

    parts.join(" ")
}

/// `{h}h{m}m`, or `{m}m` under an hour.
pub fn format_idle(d: Duration) -> String {
    let secs = d.as_secs();
    let hours = secs / 3600;
    let minutes = (secs / 60) % 60;
    if hours > 0 {
        format!("{}h{}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// `{d}d {h}h`, `{h}h {m}m` or `{m}m`.
pub fn format_uptime(d: Duration) -> String {
    let secs = d.as_secs();
    let days = secs / 86_400;
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

pub fn container_name(template: &str, snapshot: &ServerSnapshot) -> String {
    template
        .replace("{online}", &snapshot.total_users.to_string())
        .replace("{max}", &snapshot.capacity.to_string())
        .replace("{server}", &snapshot.name)
}

/// Keep whole lines while they fit in `limit` chars, then note what was cut.
fn cap_lines(content: &str, limit: usize) -> String {
    if content.chars().count() <= limit {
        return content.to_string();
    }

    let lines: Vec<&str> = content.lines().collect();
    let mut keep = lines.len().saturating_sub(1);
    loop {
        let joined = lines[..keep].join("\n");
        let kept = joined.trim_end();
        let omitted = lines[keep..].iter().filter(|l| !l.trim().is_empty()).count();
        let note = format!("…and {} more", omitted);
        let candidate = if kept.is_empty() {
            note
        } else {
            format!("{}\n{}", kept, note)
        };
        if keep == 0 || candidate.chars().count() <= limit {
            return candidate;
        }
        keep -= 1;
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_lines_passes_short_content_through() {
        assert_eq!(cap_lines("a\nb", 10), "a\nb");
    }

    #[test]
    fn cap_lines_keeps_whole_lines_and_counts_the_rest() {
        let content = (0..10)
            .map(|i| format!("line-{}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let capped = cap_lines(&content, 40);
        assert!(capped.chars().count() <= 40, "{capped}");
        assert!(capped.starts_with("line-0\nline-1"));
        let last = capped.lines().last().unwrap();
        let kept = capped.lines().count() - 1;
        assert_eq!(last, format!("…and {} more", 10 - kept));
    }

    #[test]
    fn cap_lines_skips_blank_separators_in_count() {
        let content = "aaaa\n\nbbbb\n\ncccc\n\ndddd";
        let capped = cap_lines(content, 16);
        assert_eq!(capped, "aaaa\n…and 3 more");
    }

    #[test]
    fn non_empty_filters_blank_strings() {
        assert_eq!(non_empty(&Some(String::new())), None);
        assert_eq!(non_empty(&Some("x".into())), Some("x"));
        assert_eq!(non_empty(&None), None);
    }
}
