//! System telemetry for heartbeats.
//!
//! Sampling never fails: anything that cannot be read is logged at debug
//! level and reported as a default value.

use aero_core::{SystemStats, TelemetryReadError, TrafficCounters};
use procfs::prelude::*;
use tokio::time::Instant;
use tracing::debug;

/// Loopback interface, excluded from traffic totals.
const LOOPBACK: &str = "lo";

/// Memory figures in bytes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryInfo {
    /// Total usable memory
    pub total: u64,
    /// Memory available to new workloads without swapping
    pub available: u64,
}

/// Source of raw system readings.
pub trait SystemProbe: Send {
    /// One-minute load average
    fn load_average(&self) -> Result<f64, TelemetryReadError>;

    /// Total and available memory
    fn memory(&self) -> Result<MemoryInfo, TelemetryReadError>;

    /// Cumulative byte counters over all non-loopback interfaces
    fn traffic(&self) -> Result<TrafficCounters, TelemetryReadError>;
}

/// Reads `/proc/loadavg`, `/proc/meminfo`, and `/proc/net/dev`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcfsProbe;

impl SystemProbe for ProcfsProbe {
    fn load_average(&self) -> Result<f64, TelemetryReadError> {
        procfs::LoadAverage::current()
            .map(|load| f64::from(load.one))
            .map_err(|e| TelemetryReadError::LoadAverage(e.to_string()))
    }

    fn memory(&self) -> Result<MemoryInfo, TelemetryReadError> {
        let info = procfs::Meminfo::current().map_err(|e| TelemetryReadError::Memory(e.to_string()))?;
        Ok(MemoryInfo {
            total: info.mem_total,
            // Kernels before 3.14 lack MemAvailable.
            available: info.mem_available.unwrap_or(info.mem_free),
        })
    }

    fn traffic(&self) -> Result<TrafficCounters, TelemetryReadError> {
        let devices =
            procfs::net::dev_status().map_err(|e| TelemetryReadError::Network(e.to_string()))?;

        Ok(devices
            .values()
            .filter(|dev| dev.name != LOOPBACK)
            .fold(TrafficCounters::default(), |acc, dev| TrafficCounters {
                rx_bytes: acc.rx_bytes.saturating_add(dev.recv_bytes),
                tx_bytes: acc.tx_bytes.saturating_add(dev.sent_bytes),
            }))
    }
}

/// Counters and time of the previous sample
#[derive(Debug, Clone, Copy)]
struct TrafficState {
    counters: TrafficCounters,
    taken_at: Instant,
}

/// Samples system stats and derives throughput between samples.
pub struct StatsCollector<P> {
    probe: P,
    last: TrafficState,
}

impl<P: SystemProbe> StatsCollector<P> {
    /// Create a collector, taking the baseline traffic reading now.
    pub fn new(probe: P) -> Self {
        Self::starting_at(probe, Instant::now())
    }

    /// Create a collector whose baseline reading is stamped `at`.
    pub fn starting_at(probe: P, at: Instant) -> Self {
        let counters = probe.traffic().unwrap_or_else(|e| {
            debug!(error = %e, "no baseline traffic reading");
            TrafficCounters::default()
        });

        Self {
            probe,
            last: TrafficState {
                counters,
                taken_at: at,
            },
        }
    }

    /// Take a sample now.
    pub fn sample(&mut self) -> SystemStats {
        self.sample_at(Instant::now())
    }

    /// Take a sample stamped `now`.
    pub fn sample_at(&mut self, now: Instant) -> SystemStats {
        let load_average = self.probe.load_average().unwrap_or_else(|e| {
            debug!(error = %e, "load average unavailable");
            0.0
        });

        let memory_usage = match self.probe.memory() {
            Ok(mem) => memory_usage_percent(mem),
            Err(e) => {
                debug!(error = %e, "memory info unavailable");
                0
            }
        };

        let (rx_rate, tx_rate, totals) = match self.probe.traffic() {
            Ok(current) => {
                let elapsed = now
                    .checked_duration_since(self.last.taken_at)
                    .map_or(0.0, |d| d.as_secs_f64());
                let rx = byte_rate(self.last.counters.rx_bytes, current.rx_bytes, elapsed);
                let tx = byte_rate(self.last.counters.tx_bytes, current.tx_bytes, elapsed);
                self.last = TrafficState {
                    counters: current,
                    taken_at: now,
                };
                (rx, tx, current)
            }
            // Keep the old baseline so the next good reading spans the gap.
            Err(e) => {
                debug!(error = %e, "traffic counters unavailable");
                (0, 0, self.last.counters)
            }
        };

        SystemStats {
            load_average,
            memory_usage,
            rx_rate,
            tx_rate,
            rx_total: totals.rx_bytes,
            tx_total: totals.tx_bytes,
            workers: runtime_workers(),
        }
    }
}

/// Bytes per second between two counter readings, floored.
///
/// Zero when no time elapsed or the counter went backwards.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn byte_rate(previous: u64, current: u64, elapsed_secs: f64) -> u64 {
    if elapsed_secs <= 0.0 {
        return 0;
    }
    current
        .checked_sub(previous)
        .map_or(0, |delta| (delta as f64 / elapsed_secs).floor() as u64)
}

/// Percentage of memory in use, rounded. Zero when total is unknown.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn memory_usage_percent(mem: MemoryInfo) -> u8 {
    if mem.total == 0 {
        return 0;
    }
    let used = mem.total.saturating_sub(mem.available);
    (used as f64 / mem.total as f64 * 100.0).round().min(100.0) as u8
}

/// Worker threads of the current tokio runtime, 1 outside a runtime.
fn runtime_workers() -> usize {
    tokio::runtime::Handle::try_current().map_or(1, |handle| handle.metrics().num_workers())
}
