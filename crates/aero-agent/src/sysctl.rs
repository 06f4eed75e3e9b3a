//! Kernel forwarding switch.

use std::path::Path;
use tracing::{info, warn};

const IP_FORWARD: &str = "/proc/sys/net/ipv4/ip_forward";

/// Turn on IPv4 forwarding. Failure is logged and otherwise ignored; the
/// agent still keeps rules in sync when it cannot flip the switch.
pub fn enable_ip_forward() -> bool {
    enable_ip_forward_at(Path::new(IP_FORWARD))
}

/// Write `1` to the forwarding switch at `path`. Returns whether it worked.
pub fn enable_ip_forward_at(path: &Path) -> bool {
    match std::fs::write(path, "1\n") {
        Ok(()) => {
            info!(path = %path.display(), "ip forwarding enabled");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not enable ip forwarding");
            false
        }
    }
}
