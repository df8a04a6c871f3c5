//! Rate limit for container renames
//!
//! Chat surfaces allow only a couple of channel renames per ten minutes, so
//! a rename fires only when the occupied count changed since the last applied
//! rename and the cooldown has elapsed. State lives for the process lifetime.

use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use tsbeacon_core::MessageSink;

pub const RENAME_COOLDOWN: Duration = Duration::from_secs(5 * 60);

/// Bookkeeping for the last successful rename.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenameState {
    /// Occupied count the container name was last set for.
    pub count: Option<usize>,
    pub at: Option<Instant>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    /// Count matches the last applied rename.
    Unchanged,
    CoolingDown { next_allowed: Instant },
    Allowed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenameOutcome {
    Skipped(GateDecision),
    Renamed { name: String },
    Failed { name: String, error: String },
}

#[derive(Debug)]
pub struct RenameGate {
    state: RenameState,
    cooldown: Duration,
}

impl Default for RenameGate {
    fn default() -> Self { Self::new() }
}

impl RenameGate {
    pub fn new() -> Self {
        Self::with_state(RenameState::default(), RENAME_COOLDOWN)
    }

    pub fn with_state(state: RenameState, cooldown: Duration) -> Self {
        Self { state, cooldown }
    }

    pub fn state(&self) -> RenameState { self.state }

    pub fn check(&self, count: usize, now: Instant) -> GateDecision {
        if self.state.count == Some(count) {
            return GateDecision::Unchanged;
        }
        if let Some(at) = self.state.at {
            if now.saturating_duration_since(at) < self.cooldown {
                return GateDecision::CoolingDown {
                    next_allowed: at + self.cooldown,
                };
            }
        }
        GateDecision::Allowed
    }

    pub fn record(&mut self, count: usize, now: Instant) {
        self.state = RenameState {
            count: Some(count),
            at: Some(now),
        };
    }

    /// Rename the container if the gate allows it. Failures are logged and
    /// leave the state untouched so the next eligible tick retries.
    pub async fn apply(
        &mut self,
        sink: &dyn MessageSink,
        channel_id: &str,
        name: &str,
        count: usize,
        now: Instant,
    ) -> RenameOutcome {
        let decision = self.check(count, now);
        match decision {
            GateDecision::Allowed => {}
            GateDecision::Unchanged => return RenameOutcome::Skipped(decision),
            GateDecision::CoolingDown { next_allowed } => {
                debug!(
                    wait_secs = next_allowed.saturating_duration_since(now).as_secs(),
                    "Skipping channel rename due to rate limit"
                );
                return RenameOutcome::Skipped(decision);
            }
        }

        match sink.rename_container(channel_id, name).await {
            Ok(()) => {
                self.record(count, now);
                info!(name, "Updated channel name");
                RenameOutcome::Renamed { name: name.to_string() }
            }
            Err(e) => {
                warn!(error = %e, name, "Failed to update channel name");
                RenameOutcome::Failed {
                    name: name.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }
}
