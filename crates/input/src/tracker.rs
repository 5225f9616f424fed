use std::collections::BTreeMap;

use crate::keys::Direction;

/// Held/released state for every key the host has reported.
///
/// Keys outside the directional set are still tracked; consumers decide what
/// to ignore. A key that was never reported reads as released.
#[derive(Debug, Clone, Default)]
pub struct InputTracker {
    keys: BTreeMap<String, bool>,
}

impl InputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as held. Repeated key-down events leave it held.
    pub fn on_key_down(&mut self, key: &str) {
        if let Some(held) = self.keys.get_mut(key) {
            *held = true;
        } else {
            tracing::trace!(key, "first key-down");
            self.keys.insert(key.to_owned(), true);
        }
    }

    /// Mark `key` as released.
    pub fn on_key_up(&mut self, key: &str) {
        if let Some(held) = self.keys.get_mut(key) {
            *held = false;
        } else {
            self.keys.insert(key.to_owned(), false);
        }
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.keys.get(key).copied().unwrap_or(false)
    }

    /// Directional keys currently held, in [`Direction::ALL`] order.
    pub fn held_directions(&self) -> impl Iterator<Item = Direction> + '_ {
        Direction::ALL
            .into_iter()
            .filter(|d| self.is_held(d.key()))
    }

    /// Number of keys ever reported since the last [`clear`](Self::clear).
    pub fn tracked(&self) -> usize {
        self.keys.len()
    }

    /// Forget every key. Used at teardown.
    pub fn clear(&mut self) {
        self.keys.clear();
    }
}
