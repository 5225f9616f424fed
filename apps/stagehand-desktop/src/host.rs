use std::collections::BTreeMap;
use std::sync::Arc;

use stagehand_common::Viewport;
use stagehand_runtime::{EventKind, FrameRequest, Host, ListenerId};
use winit::window::Window;

/// [`Host`] backed by a winit window.
///
/// The window is the mount point. Frame requests map onto
/// `Window::request_redraw`; winit cannot retract a redraw, so cancelling only
/// forgets the request and the stage ignores the stray callback.
pub struct WinitHost {
    window: Arc<Window>,
    viewport: Viewport,
    surface_attached: bool,
    listeners: BTreeMap<ListenerId, EventKind>,
    pending: Option<FrameRequest>,
    next_id: u64,
}

impl WinitHost {
    pub fn new(window: Arc<Window>) -> Self {
        let size = window.inner_size();
        Self {
            window,
            viewport: Viewport::new(size.width, size.height),
            surface_attached: false,
            listeners: BTreeMap::new(),
            pending: None,
            next_id: 0,
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Listeners registered and not yet removed.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl Host for WinitHost {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn attach_surface(&mut self) -> bool {
        self.surface_attached = true;
        true
    }

    fn detach_surface(&mut self) {
        if self.surface_attached {
            self.surface_attached = false;
            tracing::debug!("surface detached");
        }
    }

    fn add_listener(&mut self, kind: EventKind) -> ListenerId {
        let id = ListenerId(self.next_id());
        self.listeners.insert(id, kind);
        tracing::trace!(?kind, id = id.0, "listener added");
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        if let Some(kind) = self.listeners.remove(&id) {
            tracing::trace!(
                ?kind,
                id = id.0,
                remaining = self.listeners.len(),
                "listener removed"
            );
        }
    }

    fn request_frame(&mut self) -> FrameRequest {
        let request = FrameRequest(self.next_id());
        self.pending = Some(request);
        self.window.request_redraw();
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.pending == Some(request) {
            self.pending = None;
        }
    }
}
