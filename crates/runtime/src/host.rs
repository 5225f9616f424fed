use std::collections::BTreeMap;

use stagehand_common::Viewport;

/// Kinds of host events a stage can listen for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    KeyDown,
    KeyUp,
    Resize,
    PointerDrag,
    Wheel,
}

/// An event delivered by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    KeyDown(String),
    KeyUp(String),
    Resize(Viewport),
    /// Pointer moved with the primary button held, in pixels.
    PointerDrag { dx: f32, dy: f32 },
    /// Scroll wheel; negative scrolls toward the scene.
    Wheel { delta_y: f32 },
}

impl HostEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::KeyDown(_) => EventKind::KeyDown,
            Self::KeyUp(_) => EventKind::KeyUp,
            Self::Resize(_) => EventKind::Resize,
            Self::PointerDrag { .. } => EventKind::PointerDrag,
            Self::Wheel { .. } => EventKind::Wheel,
        }
    }
}

/// Registration returned by [`Host::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

/// A pending display-refresh callback returned by [`Host::request_frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameRequest(pub u64);

/// The windowing host a stage runs inside.
///
/// The host owns the mount point for the render surface, dispatches input and
/// resize events, and calls back once per display refresh for every pending
/// frame request.
pub trait Host {
    /// Current drawable area in physical pixels.
    fn viewport(&self) -> Viewport;

    /// Attach the render surface to the host's mount point.
    /// Returns false when there is nothing to mount into.
    fn attach_surface(&mut self) -> bool;

    fn detach_surface(&mut self);

    fn add_listener(&mut self, kind: EventKind) -> ListenerId;

    fn remove_listener(&mut self, id: ListenerId);

    /// Ask for one callback at the next display refresh.
    fn request_frame(&mut self) -> FrameRequest;

    fn cancel_frame(&mut self, request: FrameRequest);
}

impl<T: Host + ?Sized> Host for &mut T {
    fn viewport(&self) -> Viewport {
        (**self).viewport()
    }

    fn attach_surface(&mut self) -> bool {
        (**self).attach_surface()
    }

    fn detach_surface(&mut self) {
        (**self).detach_surface()
    }

    fn add_listener(&mut self, kind: EventKind) -> ListenerId {
        (**self).add_listener(kind)
    }

    fn remove_listener(&mut self, id: ListenerId) {
        (**self).remove_listener(id)
    }

    fn request_frame(&mut self) -> FrameRequest {
        (**self).request_frame()
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        (**self).cancel_frame(request)
    }
}

/// Call counts recorded by [`HeadlessHost`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostStats {
    pub listeners_added: usize,
    pub listeners_removed: usize,
    pub surface_attaches: usize,
    pub surface_detaches: usize,
    pub frames_requested: usize,
    pub frames_cancelled: usize,
}

/// In-memory host with no window.
///
/// Frame requests queue up until [`fire_frame`](Self::fire_frame) is called,
/// which stands in for a display refresh. Every call is counted in
/// [`HostStats`] so lifecycle pairing can be checked.
#[derive(Debug)]
pub struct HeadlessHost {
    viewport: Viewport,
    has_mount: bool,
    surface_attached: bool,
    listeners: BTreeMap<ListenerId, EventKind>,
    pending_frame: Option<FrameRequest>,
    next_id: u64,
    stats: HostStats,
}

impl HeadlessHost {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            has_mount: true,
            surface_attached: false,
            listeners: BTreeMap::new(),
            pending_frame: None,
            next_id: 0,
            stats: HostStats::default(),
        }
    }

    /// A host whose mount point is missing; surface attachment fails.
    pub fn without_mount(viewport: Viewport) -> Self {
        Self {
            has_mount: false,
            ..Self::new(viewport)
        }
    }

    /// Change the viewport size. The caller is responsible for delivering the
    /// matching [`HostEvent::Resize`].
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Simulate a display refresh: hands out the pending request, if any.
    pub fn fire_frame(&mut self) -> Option<FrameRequest> {
        self.pending_frame.take()
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending_frame.is_some()
    }

    pub fn is_surface_attached(&self) -> bool {
        self.surface_attached
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_listening(&self, kind: EventKind) -> bool {
        self.listeners.values().any(|k| *k == kind)
    }

    pub fn stats(&self) -> &HostStats {
        &self.stats
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl Host for HeadlessHost {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn attach_surface(&mut self) -> bool {
        if !self.has_mount {
            return false;
        }
        self.surface_attached = true;
        self.stats.surface_attaches += 1;
        true
    }

    fn detach_surface(&mut self) {
        if self.surface_attached {
            self.surface_attached = false;
            self.stats.surface_detaches += 1;
        }
    }

    fn add_listener(&mut self, kind: EventKind) -> ListenerId {
        let id = ListenerId(self.next_id());
        self.listeners.insert(id, kind);
        self.stats.listeners_added += 1;
        id
    }

    fn remove_listener(&mut self, id: ListenerId) {
        if self.listeners.remove(&id).is_some() {
            self.stats.listeners_removed += 1;
        }
    }

    fn request_frame(&mut self) -> FrameRequest {
        let request = FrameRequest(self.next_id());
        self.pending_frame = Some(request);
        self.stats.frames_requested += 1;
        request
    }

    fn cancel_frame(&mut self, request: FrameRequest) {
        if self.pending_frame == Some(request) {
            self.pending_frame = None;
            self.stats.frames_cancelled += 1;
        }
    }
}
