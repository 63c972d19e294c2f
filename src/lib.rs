pub mod bridge;
pub mod config;
pub mod error;
pub mod http;
pub mod media;
pub mod session;

pub use bridge::CaptureBridge;
pub use config::Config;
pub use error::{BridgeError, BridgeResult};
pub use http::{create_router, AppState};
pub use media::{
    Artifact, ArtifactRef, CapturePlatform, MediaChunk, PermissionState, RecorderOptions,
    RecorderState, SyntheticPlatform,
};
pub use session::{
    BridgeEvent, BridgeEventKind, BridgeListener, BridgeStatus, ListenerId, SessionStats,
    Subscription,
};
