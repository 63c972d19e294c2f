//! Capture session management
//!
//! This module provides the `CaptureSession` abstraction that owns:
//! - The live capture source and its preview binding
//! - The recorder bound to that source
//! - The chunk buffer and the relay task that fills it
//! - Event fan-out to the host
//!
//! Lifecycle: open → start/pause/resume → stop → dispose.

mod events;
mod session;
mod stats;

pub use events::{
    BridgeEvent, BridgeEventKind, BridgeListener, EventHub, ListenerId, Subscription,
};
pub use session::{CaptureSession, SessionContext};
pub use stats::{BridgeStatus, SessionStats};
