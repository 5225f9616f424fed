//! Rendering Adapter: renderer-agnostic interface plus the camera types every
//! backend consumes.
//!
//! # Invariants
//! - Renderers read the scene and camera; they never mutate either.
//! - Camera aspect ratio and projection change together.
//!
//! `DebugTextRenderer` is the GPU-free backend used by the CLI and tests. The
//! wgpu backend lives in `stagehand-render-wgpu` behind the same trait.

mod camera;
mod orbit;
mod renderer;

pub use camera::PerspectiveCamera;
pub use orbit::OrbitController;
pub use renderer::{DebugTextRenderer, Renderer};

pub fn crate_info() -> &'static str {
    "stagehand-render v0.1.0"
}
