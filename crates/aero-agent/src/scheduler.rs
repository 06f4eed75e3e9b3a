//! The sync loop: initial rule sync, heartbeats, and resync triggers.
//!
//! One task runs every step in sequence, so there is never more than one
//! apply in flight and rule sets are applied in the order they were
//! fetched. Every failure is logged at the cycle boundary; nothing short
//! of shutdown ends the loop.

use aero_client::ControlPlane;
use aero_core::HeartbeatPayload;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::applier::RuleApplier;
use crate::compiler::RuleCompiler;
use crate::error::SyncError;
use crate::stats::{StatsCollector, SystemProbe};

/// Timing knobs of the loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Sleep between cycles until the panel requests another value
    pub default_interval: Duration,
    /// Resync when the last successful one is older than this
    pub resync_ceiling: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            default_interval: Duration::from_secs(30),
            resync_ceiling: Duration::from_secs(60),
        }
    }
}

/// Lifecycle of the scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Initial sync not yet attempted
    Starting,
    /// Heartbeat loop
    Running {
        /// Sleep before the next cycle
        interval: Duration,
        /// Time of the last successful resync, `None` if none succeeded yet
        last_sync: Option<Instant>,
    },
}

/// Owns every component and drives the sync loop.
pub struct SyncScheduler<C, A, P> {
    plane: C,
    applier: A,
    compiler: RuleCompiler,
    stats: StatsCollector<P>,
    node_id: String,
    token: String,
    settings: SchedulerSettings,
    state: SchedulerState,
}

impl<C, A, P> SyncScheduler<C, A, P>
where
    C: ControlPlane,
    A: RuleApplier,
    P: SystemProbe,
{
    /// Assemble a scheduler. Nothing runs until [`start`](Self::start) or
    /// [`run_until`](Self::run_until).
    pub fn new(
        plane: C,
        applier: A,
        compiler: RuleCompiler,
        stats: StatsCollector<P>,
        node_id: impl Into<String>,
        token: impl Into<String>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            plane,
            applier,
            compiler,
            stats,
            node_id: node_id.into(),
            token: token.into(),
            settings,
            state: SchedulerState::Starting,
        }
    }

    /// Current lifecycle state
    pub const fn state(&self) -> SchedulerState {
        self.state
    }

    /// Sleep that follows the current cycle
    pub const fn interval(&self) -> Duration {
        match self.state {
            SchedulerState::Starting => self.settings.default_interval,
            SchedulerState::Running { interval, .. } => interval,
        }
    }

    /// Run the initial sync and enter the running state. The outcome of
    /// the sync does not matter; the loop starts either way.
    pub async fn start(&mut self) {
        let last_sync = match self.resync().await {
            Ok(()) => Some(Instant::now()),
            Err(e) => {
                warn!(error = %e, "initial rule sync failed");
                None
            }
        };

        self.state = SchedulerState::Running {
            interval: self.settings.default_interval,
            last_sync,
        };
    }

    /// Run one heartbeat cycle and return the sleep before the next one.
    pub async fn run_cycle(&mut self) -> Duration {
        if self.state == SchedulerState::Starting {
            self.start().await;
        }
        let SchedulerState::Running {
            mut interval,
            mut last_sync,
        } = self.state
        else {
            return self.settings.default_interval;
        };

        let payload = HeartbeatPayload {
            node_id: self.node_id.clone(),
            token: self.token.clone(),
            stats: self.stats.sample(),
        };

        match self.plane.send_heartbeat(&payload).await {
            Ok(response) => {
                debug!(?response, "heartbeat accepted");

                if let Some(requested) = response.requested_interval() {
                    if requested != interval {
                        info!(secs = requested.as_secs(), "heartbeat interval changed");
                    }
                    interval = requested;
                }

                let overdue = last_sync.map_or(true, |at| {
                    Instant::now().saturating_duration_since(at) > self.settings.resync_ceiling
                });

                if response.wants_resync() || overdue {
                    debug!(
                        requested = response.wants_resync(),
                        overdue, "resyncing rules"
                    );
                    match self.resync().await {
                        Ok(()) => last_sync = Some(Instant::now()),
                        Err(e) => warn!(error = %e, "rule resync failed"),
                    }
                }
            }
            Err(e) => warn!(error = %e, "heartbeat failed"),
        }

        self.state = SchedulerState::Running {
            interval,
            last_sync,
        };
        interval
    }

    /// Run the loop until `shutdown` resolves.
    pub async fn run_until<F: Future<Output = ()>>(mut self, shutdown: F) {
        tokio::pin!(shutdown);

        info!(node = %self.node_id, table = %self.compiler.table(), "agent started");

        tokio::select! {
            () = self.start() => {}
            () = &mut shutdown => {
                info!("shutdown requested during initial sync");
                return;
            }
        }

        loop {
            let sleep = self.run_cycle().await;
            tokio::select! {
                () = tokio::time::sleep(sleep) => {}
                () = &mut shutdown => {
                    info!("shutdown requested, leaving firewall rules in place");
                    return;
                }
            }
        }
    }

    /// Fetch, compile, and apply the full rule set.
    async fn resync(&mut self) -> Result<(), SyncError> {
        let rules = self.plane.fetch_rule_set().await?;
        let document = self.compiler.compile(&rules);
        info!(
            rules = rules.len(),
            dnat = document.dnat_entries(),
            masquerade = document.masquerade_entries(),
            "syncing rules"
        );

        self.applier.apply(&document).await?;
        info!("rules applied");
        Ok(())
    }
}
