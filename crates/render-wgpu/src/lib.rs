//! wgpu render backend for stagehand.
//!
//! Draws the scene's ground planes and boxes with ambient plus directional
//! lighting, and flattens shadow-casting boxes onto the ground along the key
//! light.
//!
//! # Invariants
//! - The renderer never mutates the scene or camera.
//! - After `dispose` no GPU work is submitted.

mod backend;
mod gpu;
mod shaders;

pub use backend::{BackendError, WgpuRenderer};

pub fn crate_info() -> &'static str {
    "stagehand-render-wgpu v0.1.0"
}
