//! Shared types used across the stagehand crates.

mod types;

pub use types::{ObjectId, Transform, Viewport};
