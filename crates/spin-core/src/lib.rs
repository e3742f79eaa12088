//! Spin Core - rotation engine for 360° product photography
//!
//! Everything here is pure state and arithmetic: the browser frontend feeds
//! pointer, touch, timer and image-load events into [`SpinEngine`] and applies
//! the [`Action`]s it returns.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod layout;
pub mod momentum;
pub mod preload;
pub mod replay;
pub mod tracker;

pub use cache::FrameCache;
pub use config::ViewerConfig;
pub use engine::{Action, Capabilities, RotationState, SpinEngine};
pub use error::{Result, SpinError};
pub use frame::{frame_at, frame_for_delta, frame_for_progress, progress_for_frame, wrap_frame, wrap_position};
pub use layout::{
    format_gaps, missing_count, missing_numbers, plan_normalization, FrameFileName, FrameUrlScheme, NamingStyle,
    Rename, SpinManifest, FRAME_EXTENSIONS, MANIFEST_FILE,
};
pub use momentum::{MomentumIntegrator, MomentumState};
pub use preload::{PreloadRequest, Preloader, Priority};
pub use replay::{replay, DragTrace, ReplayReport, TraceEvent, TraceEventKind};
pub use tracker::{DragSession, DragTracker, Motion, PointerKind};
