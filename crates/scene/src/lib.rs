//! Scene graph: the objects, lights and shared geometry/material tables a frame draws.
//!
//! # Invariants
//! - Geometry and material handles are disposed at most once; disposing an absent
//!   handle is a no-op.
//! - Scene construction happens once, before the frame loop starts.

pub mod layout;
pub mod scene;

pub use layout::{LayoutConfig, StageLayout};
pub use scene::{
    Geometry, GeometryHandle, Light, Material, MaterialHandle, Scene, SceneObject,
};

pub fn crate_info() -> &'static str {
    "stagehand-scene v0.1.0"
}
