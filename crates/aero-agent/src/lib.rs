//! # aero-agent
//!
//! Node agent for the aero port-forwarding panel.
//!
//! On start the agent downloads the node's forwarding rules, compiles them
//! into an nftables NAT table, and loads it. It then heartbeats with host
//! telemetry; the panel answers with the next interval and whether rules
//! changed. Rules are also resynced whenever the last successful sync is
//! older than the configured ceiling.
//!
//! Every rule load replaces the managed table in a single `nft -f`
//! transaction, so a failed load leaves the previous rules active.

pub mod applier;
pub mod cli;
pub mod compiler;
pub mod config;
pub mod error;
pub mod scheduler;
pub mod stats;
pub mod sysctl;

pub use applier::{NftApplier, RuleApplier};
pub use cli::run;
pub use compiler::{ConfigDocument, RuleCompiler};
pub use config::AgentConfig;
pub use error::{ConfigError, SyncError};
pub use scheduler::{SchedulerSettings, SchedulerState, SyncScheduler};
pub use stats::{MemoryInfo, ProcfsProbe, StatsCollector, SystemProbe};
