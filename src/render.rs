//! Console rendering for `--dry-run`
//!
//! A 64-column box, drawn with the same channel filtering and status
//! suffixes as the posted message. Widths count chars, not terminal cells.

use tsbeacon_bridge::projector::{self, DisplayOptions};
use tsbeacon_core::ServerSnapshot;

/// Columns between the two border glyphs.
pub const INNER_WIDTH: usize = 62;

/// Room for text in a row: inner width less the two-space indent and the
/// space before the right border.
const ROW_WIDTH: usize = INNER_WIDTH - 3;

/// Longest channel name or user line before truncation.
const ITEM_WIDTH: usize = 50;

pub fn render(snapshot: &ServerSnapshot, opts: &DisplayOptions) -> String {
    let mut out = Vec::new();
    let rule = "═".repeat(INNER_WIDTH);

    out.push(format!("╔{}╗", rule));
    out.push(format!("║{}║", center(&format!("TeamSpeak Status ({})", snapshot.name))));
    out.push(format!("╠{}╣", rule));

    let address = opts.server_address.as_deref().filter(|s| !s.is_empty());
    let password = opts.server_password.as_deref().filter(|s| !s.is_empty());
    if address.is_some() || password.is_some() {
        if let Some(address) = address {
            out.push(row(&format!("Address: {}", address)));
        }
        if let Some(password) = password {
            out.push(row(&format!("Password: {}", password)));
        }
        out.push(format!("╠{}╣", rule));
    }

    let mut any = false;
    for ch in projector::visible_channels(snapshot, opts) {
        any = true;
        out.push(row(&format!(
            "📁 {} ({})",
            truncate(&ch.name, ITEM_WIDTH),
            ch.users.len()
        )));
        for user in &ch.users {
            out.push(row(&format!(
                "    • {}",
                truncate(&projector::user_line(user), ITEM_WIDTH)
            )));
        }
    }
    if !any {
        out.push(row("No users online"));
    }

    out.push(format!("╠{}╣", rule));
    out.push(row(&format!(
        "{}/{} online • Uptime: {}",
        snapshot.total_users,
        snapshot.capacity,
        projector::format_uptime(snapshot.uptime)
    )));
    if let Some(footer) = opts.custom_footer.as_deref().filter(|s| !s.is_empty()) {
        out.push(row(footer));
    }
    out.push(format!("╚{}╝", rule));

    out.join("\n")
}

/// Cut to `max` chars, ending in `...` when anything was dropped.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

fn row(text: &str) -> String {
    format!("║  {:<width$} ║", truncate(text, ROW_WIDTH), width = ROW_WIDTH)
}

fn center(text: &str) -> String {
    let text = truncate(text, INNER_WIDTH);
    let len = text.chars().count();
    let left = (INNER_WIDTH - len) / 2;
    format!("{}{}{}", " ".repeat(left), text, " ".repeat(INNER_WIDTH - len - left))
}
