//! Panel endpoint modules.

mod heartbeat;
mod rules;

pub use heartbeat::{encode_payload, HeartbeatApi};
pub use rules::RulesApi;
