//! Reconciliation loop: fetch → project → apply on a fixed interval
//!
//! `Bridge::start` brings up both collaborators, resolves the artifact, runs
//! one sync right away and then hands the tick state to a background task.
//! Ticks never overlap: the timer is only polled again after a sync returns.
//! Stop and external cancellation are both observed between ticks; an
//! in-flight sync always runs to completion.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};
use tsbeacon_core::{Error, MessageSink, Result, StateSource, Urgency};

use crate::gate::{RenameGate, RenameOutcome};
use crate::projector::{self, DisplayOptions};
use crate::registry::ArtifactRegistry;

pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct BridgeConfig {
    pub update_interval: Duration,
    /// Target channel holding the status message.
    pub channel_id: String,
    pub display: DisplayOptions,
}

impl BridgeConfig {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            update_interval: DEFAULT_UPDATE_INTERVAL,
            channel_id: channel_id.into(),
            display: DisplayOptions::default(),
        }
    }
}

/// What one sync did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyncReport {
    pub users: usize,
    pub urgency: Urgency,
    pub rename: Option<RenameOutcome>,
}

/// State owned by the tick: collaborators, artifact identity, rename bookkeeping.
pub struct Reconciler {
    source: Arc<dyn StateSource>,
    sink: Arc<dyn MessageSink>,
    display: DisplayOptions,
    registry: ArtifactRegistry,
    gate: RenameGate,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn StateSource>,
        sink: Arc<dyn MessageSink>,
        channel_id: impl Into<String>,
        display: DisplayOptions,
    ) -> Self {
        Self {
            source,
            sink,
            display,
            registry: ArtifactRegistry::new(channel_id),
            gate: RenameGate::new(),
        }
    }

    pub fn with_gate(mut self, gate: RenameGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn registry(&self) -> &ArtifactRegistry { &self.registry }

    pub fn gate(&self) -> &RenameGate { &self.gate }

    /// Resolve the artifact ahead of the first sync.
    pub async fn discover(&mut self) -> Result<()> {
        self.registry.adopt_or_create(self.sink.as_ref()).await?;
        Ok(())
    }

    /// One synchronization attempt. No retries; the next tick is the retry.
    pub async fn sync(&mut self) -> Result<SyncReport> {
        let snapshot = self.source.fetch_snapshot().await.map_err(|e| match e {
            Error::Fetch(_) => e,
            other => Error::Fetch(other.to_string()),
        })?;

        debug!(
            users = snapshot.total_users,
            orphans = snapshot.orphaned_users(),
            "Fetched server state"
        );

        let representation = projector::project(Some(&snapshot), &self.display);
        self.registry
            .apply(self.sink.as_ref(), &representation)
            .await?;

        let rename = match &representation.container_name {
            Some(name) => Some(
                self.gate
                    .apply(
                        self.sink.as_ref(),
                        self.registry.channel_id(),
                        name,
                        snapshot.total_users,
                        Instant::now().into_std(),
                    )
                    .await,
            ),
            None => None,
        };

        Ok(SyncReport {
            users: snapshot.total_users,
            urgency: representation.urgency,
            rename,
        })
    }
}

pub struct Bridge {
    config: BridgeConfig,
    source: Arc<dyn StateSource>,
    sink: Arc<dyn MessageSink>,
}

impl Bridge {
    pub fn new(
        mut config: BridgeConfig,
        source: Arc<dyn StateSource>,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        if config.update_interval < MIN_UPDATE_INTERVAL {
            warn!(
                requested = ?config.update_interval,
                minimum = ?MIN_UPDATE_INTERVAL,
                "Update interval below minimum, clamping"
            );
            config.update_interval = MIN_UPDATE_INTERVAL;
        }
        Self { config, source, sink }
    }

    pub fn config(&self) -> &BridgeConfig { &self.config }

    /// Connect both collaborators, resolve the artifact, sync once and start
    /// the periodic loop. Only connection failures are returned.
    pub async fn start(self, cancel: CancellationToken) -> Result<BridgeHandle> {
        let Bridge { config, source, sink } = self;

        source
            .start()
            .await
            .map_err(|e| as_connection(source.name(), e))?;

        if let Err(e) = sink.start().await {
            stop_source(source.as_ref()).await.ok();
            return Err(as_connection(sink.name(), e));
        }

        let mut reconciler = Reconciler::new(
            source.clone(),
            sink.clone(),
            config.channel_id.clone(),
            config.display.clone(),
        );

        if let Err(e) = reconciler.discover().await {
            stop_sink(sink.as_ref()).await.ok();
            stop_source(source.as_ref()).await.ok();
            return Err(as_connection(sink.name(), e));
        }

        if let Err(e) = reconciler.sync().await {
            warn!(error = %e, "Initial update failed");
        }

        let stop = CancellationToken::new();
        let task = tokio::spawn(
            run_loop(reconciler, config.update_interval, stop.clone(), cancel)
                .instrument(tracing::info_span!("bridge", component = "bridge")),
        );

        info!(component = "bridge", interval = ?config.update_interval, "Bridge started");

        Ok(BridgeHandle {
            stop,
            task,
            source,
            sink,
        })
    }
}

/// Running bridge. Dropping it without `stop` leaves the loop running
/// until external cancellation.
pub struct BridgeHandle {
    stop: CancellationToken,
    task: JoinHandle<Reconciler>,
    source: Arc<dyn StateSource>,
    sink: Arc<dyn MessageSink>,
}

impl BridgeHandle {
    /// True once the loop has exited (stop or external cancellation).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Signal the loop, wait for the in-flight tick, then stop the sink and
    /// the source in that order. Both are always stopped; the first failure
    /// is returned as `Error::Shutdown` after teardown completes.
    pub async fn stop(self) -> Result<()> {
        self.stop.cancel();

        match self.task.await {
            Ok(mut reconciler) => {
                if let Some(handle) = reconciler.registry.release() {
                    debug!(message_id = %handle.message_id, "Released status message");
                }
            }
            Err(e) => error!(error = %e, "Bridge loop terminated abnormally"),
        }

        let sink_result = stop_sink(self.sink.as_ref()).await;
        let source_result = stop_source(self.source.as_ref()).await;

        info!(component = "bridge", "Bridge stopped");
        sink_result.and(source_result)
    }
}

async fn run_loop(
    mut reconciler: Reconciler,
    interval: Duration,
    stop: CancellationToken,
    cancel: CancellationToken,
) -> Reconciler {
    // The initial sync already ran, so the first tick is one interval out.
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = stop.cancelled() => {
                debug!("Stop requested");
                break;
            }
            _ = cancel.cancelled() => {
                debug!("Cancelled");
                break;
            }
            _ = ticker.tick() => {}
        }

        if let Err(e) = reconciler.sync().await {
            warn!(error = %e, "Update failed");
        }
    }

    reconciler
}

fn as_connection(service: &str, e: Error) -> Error {
    match e {
        Error::Connection { .. } => e,
        other => Error::connection(service, other.to_string()),
    }
}

async fn stop_source(source: &dyn StateSource) -> Result<()> {
    let result = source.stop().await;
    result.map_err(|e| as_shutdown(source.name(), e))
}

async fn stop_sink(sink: &dyn MessageSink) -> Result<()> {
    let result = sink.stop().await;
    result.map_err(|e| as_shutdown(sink.name(), e))
}

fn as_shutdown(service: &str, e: Error) -> Error {
    warn!(component = "bridge", error = %e, service, "Failed to stop service");
    match e {
        Error::Shutdown { .. } => e,
        other => Error::shutdown(service, other.to_string()),
    }
}
