use serde::{Serialize, Serializer};

const KIB: u64 = 1024;
const MIB: u64 = 1024 * 1024;
const GIB: u64 = 1024 * 1024 * 1024;

/// Cumulative byte counters summed over all non-loopback interfaces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrafficCounters {
    /// Bytes received since boot
    pub rx_bytes: u64,
    /// Bytes transmitted since boot
    pub tx_bytes: u64,
}

impl TrafficCounters {
    /// Create counters from raw totals
    #[must_use]
    pub const fn new(rx_bytes: u64, tx_bytes: u64) -> Self {
        Self { rx_bytes, tx_bytes }
    }
}

/// One telemetry sample reported in a heartbeat.
///
/// Serializes into the panel's stats schema, where every figure except
/// the worker count is a preformatted string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SystemStats {
    /// One-minute load average
    pub load_average: f64,
    /// Memory in use, percent of total
    pub memory_usage: u8,
    /// Receive throughput in bytes per second
    pub rx_rate: u64,
    /// Transmit throughput in bytes per second
    pub tx_rate: u64,
    /// Cumulative received bytes
    pub rx_total: u64,
    /// Cumulative transmitted bytes
    pub tx_total: u64,
    /// Concurrent execution units of the agent runtime
    pub workers: usize,
}

#[derive(Serialize)]
struct WireStats {
    cpu_load: String,
    ram_usage: String,
    rx_speed: String,
    tx_speed: String,
    rx_total: String,
    tx_total: String,
    // Field name fixed by the panel schema.
    goroutines: usize,
}

impl Serialize for SystemStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WireStats {
            cpu_load: format!("{:.2}", self.load_average),
            ram_usage: self.memory_usage.to_string(),
            rx_speed: format_rate(self.rx_rate),
            tx_speed: format_rate(self.tx_rate),
            rx_total: format_total(self.rx_total),
            tx_total: format_total(self.tx_total),
            goroutines: self.workers,
        }
        .serialize(serializer)
    }
}

/// Format a byte rate as `B/s`, `KB/s`, or `MB/s` depending on magnitude
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_rate(bytes_per_sec: u64) -> String {
    if bytes_per_sec < KIB {
        format!("{bytes_per_sec} B/s")
    } else if bytes_per_sec < MIB {
        format!("{:.1} KB/s", bytes_per_sec as f64 / KIB as f64)
    } else {
        format!("{:.1} MB/s", bytes_per_sec as f64 / MIB as f64)
    }
}

/// Format a cumulative byte count in gigabytes
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_total(bytes: u64) -> String {
    format!("{:.2} GB", bytes as f64 / GIB as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rate_units() {
        assert_eq!(format_rate(0), "0 B/s");
        assert_eq!(format_rate(1023), "1023 B/s");
        assert_eq!(format_rate(1024), "1.0 KB/s");
        assert_eq!(format_rate(1536), "1.5 KB/s");
        assert_eq!(format_rate(1_048_575), "1024.0 KB/s");
        assert_eq!(format_rate(1_048_576), "1.0 MB/s");
        assert_eq!(format_rate(10 * 1_048_576 + 524_288), "10.5 MB/s");
    }

    #[test]
    fn test_format_total_in_gigabytes() {
        assert_eq!(format_total(0), "0.00 GB");
        assert_eq!(format_total(1_073_741_824), "1.00 GB");
        assert_eq!(format_total(5_368_709_120 / 2), "2.50 GB");
    }

    #[test]
    fn test_stats_wire_schema() {
        let stats = SystemStats {
            load_average: 0.5,
            memory_usage: 42,
            rx_rate: 1024,
            tx_rate: 0,
            rx_total: 1_073_741_824,
            tx_total: 0,
            workers: 1,
        };
        let value = serde_json::to_value(&stats).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "cpu_load": "0.50",
                "ram_usage": "42",
                "rx_speed": "1.0 KB/s",
                "tx_speed": "0 B/s",
                "rx_total": "1.00 GB",
                "tx_total": "0.00 GB",
                "goroutines": 1
            })
        );
    }
}
