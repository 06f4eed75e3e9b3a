//! Core types and errors for the aero forwarding agent.
//!
//! This crate provides the foundational types shared by the panel client
//! and the agent binary:
//!
//! - **Types**: forwarding rules, system stats, and the heartbeat wire format
//! - **Errors**: one error enum per failure domain ([`FetchError`],
//!   [`HeartbeatError`], [`ApplyError`], [`TelemetryReadError`])
//!
//! # Example
//!
//! ```rust
//! use aero_core::{ForwardingRule, Protocol};
//!
//! let rule: ForwardingRule = serde_json::from_str(
//!     r#"{"protocol": "tcp+udp", "listen_port": "8080", "dest_ip": "10.0.0.5", "dest_port": 80}"#,
//! ).unwrap();
//! assert_eq!(rule.protocol, Protocol::TcpUdp);
//! assert_eq!(rule.listen_port, 8080);
//! ```

mod error;
pub mod types;

pub use error::{ApplyError, FetchError, HeartbeatError, TelemetryReadError};
pub use types::*;
