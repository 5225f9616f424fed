//! Input: held-key state and the directional control set.
//!
//! # Invariants
//! - Key state mirrors the physical action: key-down means held, key-up means released.
//! - Only key handlers write key state; the frame loop reads it.

pub mod keys;
pub mod tracker;

pub use keys::Direction;
pub use tracker::InputTracker;

pub fn crate_info() -> &'static str {
    "stagehand-input v0.1.0"
}
