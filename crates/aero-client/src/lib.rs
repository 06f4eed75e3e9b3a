//! HTTP client for the aero control panel.
//!
//! This crate provides [`PanelClient`] for the two calls an agent makes:
//! downloading its forwarding rules and submitting heartbeats. The
//! [`ControlPlane`] trait abstracts both so the scheduler can run against
//! a fake panel.

mod client;
mod plane;
pub mod api;

pub use client::{ClientError, PanelClient, PanelClientBuilder, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
pub use plane::ControlPlane;
pub use aero_core::{FetchError, HeartbeatError};
