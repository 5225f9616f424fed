use stagehand_scene::{GeometryHandle, MaterialHandle};

use crate::host::ListenerId;

/// Something a stage acquired during setup and must release at teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Geometry(GeometryHandle),
    Material(MaterialHandle),
    Controls,
    Surface,
    Listener(ListenerId),
}

/// Acquisition log, released last-in first-out.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    acquired: Vec<Resource>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self, resource: Resource) {
        self.acquired.push(resource);
    }

    /// Most recently acquired resource still held.
    pub fn pop(&mut self) -> Option<Resource> {
        self.acquired.pop()
    }

    pub fn contains(&self, resource: Resource) -> bool {
        self.acquired.contains(&resource)
    }

    /// Held resources in acquisition order.
    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.acquired.iter()
    }

    pub fn len(&self) -> usize {
        self.acquired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.acquired.is_empty()
    }
}
