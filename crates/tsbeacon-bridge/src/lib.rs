//! tsbeacon bridge - keeps one status message in sync with the voice server
//!
//! Flow per tick: `StateSource::fetch_snapshot` → `projector::project` →
//! `ArtifactRegistry::apply` → (optionally) `RenameGate::apply`.

pub mod bridge;
pub mod gate;
pub mod projector;
pub mod registry;

pub use bridge::{Bridge, BridgeConfig, BridgeHandle, Reconciler, SyncReport, MIN_UPDATE_INTERVAL};
pub use gate::{GateDecision, RenameGate, RenameOutcome, RenameState, RENAME_COOLDOWN};
pub use projector::{project, DisplayOptions};
pub use registry::{find_adoptable, ArtifactHandle, ArtifactRegistry, DISCOVERY_LOOKBACK};
pub use tokio_util::sync::CancellationToken;
