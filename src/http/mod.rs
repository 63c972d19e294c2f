//! HTTP API server for out-of-process hosts
//!
//! This module exposes the bridge as a REST API:
//! - POST /previews/:id - Register a preview surface
//! - POST /camera/enable - Acquire camera + microphone, prepare a recorder
//! - POST /recording/{start,pause,resume,stop} - Drive the recorder
//! - GET /recording/status - Current status and session stats
//! - GET /events - Server-sent bridge events
//! - GET /artifacts/:id - Download a recorded artifact (DELETE revokes it)
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
