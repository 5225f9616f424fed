//! Runtime: the per-frame loop and the lifecycle that bounds it.
//!
//! # Invariants
//! - Within a tick: displacement, then camera-follow sync, then controller
//!   update, then render.
//! - The frame loop only reads key state; host key events are the only writers.
//! - Every resource acquired at setup is released exactly once, in reverse
//!   acquisition order, and teardown tolerates partial setup.
//! - No tick runs after the stage is stopped.

pub mod config;
pub mod frame_loop;
pub mod host;
pub mod registry;
pub mod stage;

pub use config::{CameraConfig, ConfigError, ControlsConfig, StageConfig};
pub use frame_loop::{FrameLoop, TickReport};
pub use host::{EventKind, FrameRequest, HeadlessHost, Host, HostEvent, HostStats, ListenerId};
pub use registry::{Resource, ResourceRegistry};
pub use stage::{Stage, StageError, StageState};

pub fn crate_info() -> &'static str {
    "stagehand-runtime v0.1.0"
}
