use std::collections::BTreeMap;

use glam::Vec3;
use stagehand_input::InputTracker;
use stagehand_render::Renderer;
use stagehand_scene::StageLayout;

use crate::config::{ConfigError, StageConfig};
use crate::frame_loop::{FrameLoop, TickReport};
use crate::host::{EventKind, FrameRequest, HeadlessHost, Host, HostEvent, ListenerId};
use crate::registry::{Resource, ResourceRegistry};

/// Errors that abort stage setup.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("host has no mount point for the render surface")]
    MissingMount,
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    Running,
    Stopped,
}

/// A mounted, running view: frame loop plus every resource it acquired.
///
/// [`start`](Self::start) builds the scene, installs the orbit controller,
/// mounts the surface, registers listeners and requests the first frame.
/// [`stop`](Self::stop) cancels the pending frame and releases everything in
/// reverse acquisition order. `stop` runs at most once; later calls and the
/// implicit call on drop are no-ops.
pub struct Stage<H: Host, R: Renderer> {
    host: H,
    input: InputTracker,
    frame_loop: FrameLoop<R>,
    registry: ResourceRegistry,
    listening: BTreeMap<ListenerId, EventKind>,
    pending_frame: Option<FrameRequest>,
    state: StageState,
}

impl<H: Host, R: Renderer> Stage<H, R> {
    pub fn start(host: H, renderer: R, config: &StageConfig) -> Result<Self, StageError> {
        config.validate()?;

        let viewport = host.viewport();
        let layout = StageLayout::build(&config.layout);
        let target = layout
            .scene
            .position(layout.controlled)
            .unwrap_or(Vec3::ZERO);
        let camera = config.build_camera(viewport.aspect(), target);

        let mut stage = Self {
            host,
            input: InputTracker::new(),
            frame_loop: FrameLoop::new(layout.scene, camera, renderer, config.step),
            registry: ResourceRegistry::new(),
            listening: BTreeMap::new(),
            pending_frame: None,
            state: StageState::Running,
        };

        for geometry in layout.geometries {
            stage.registry.acquire(Resource::Geometry(geometry));
        }
        for material in layout.materials {
            stage.registry.acquire(Resource::Material(material));
        }

        stage
            .frame_loop
            .install_controls(config.build_controls(target));
        stage.registry.acquire(Resource::Controls);
        stage.listen(EventKind::PointerDrag);
        stage.listen(EventKind::Wheel);

        stage.frame_loop.resize(viewport);
        if !stage.host.attach_surface() {
            tracing::error!("no mount point for the render surface; setup aborted");
            stage.stop();
            return Err(StageError::MissingMount);
        }
        stage.registry.acquire(Resource::Surface);

        stage.listen(EventKind::KeyDown);
        stage.listen(EventKind::KeyUp);
        stage.listen(EventKind::Resize);

        stage.frame_loop.attach(layout.controlled);
        stage.pending_frame = Some(stage.host.request_frame());

        tracing::info!(
            width = viewport.width,
            height = viewport.height,
            resources = stage.registry.len(),
            "stage started"
        );
        Ok(stage)
    }

    fn listen(&mut self, kind: EventKind) {
        let id = self.host.add_listener(kind);
        self.listening.insert(id, kind);
        self.registry.acquire(Resource::Listener(id));
    }

    /// Route a host event. Returns false if nothing listens for its kind.
    pub fn handle_event(&mut self, event: HostEvent) -> bool {
        let kind = event.kind();
        if !self.listening.values().any(|k| *k == kind) {
            return false;
        }
        match event {
            HostEvent::KeyDown(key) => self.input.on_key_down(&key),
            HostEvent::KeyUp(key) => self.input.on_key_up(&key),
            HostEvent::Resize(viewport) => self.frame_loop.resize(viewport),
            HostEvent::PointerDrag { dx, dy } => {
                let height = self.frame_loop.renderer().size().height;
                if let Some(controls) = self.frame_loop.controls_mut() {
                    controls.handle_drag(dx, dy, height);
                }
            }
            HostEvent::Wheel { delta_y } => {
                if let Some(controls) = self.frame_loop.controls_mut() {
                    controls.handle_wheel(delta_y);
                }
            }
        }
        true
    }

    /// Display-refresh callback. Runs one tick and requests the next refresh.
    ///
    /// Refreshes that do not match the pending request (stale, or arriving
    /// after [`stop`](Self::stop)) are ignored.
    pub fn on_frame(&mut self, request: FrameRequest) -> Option<TickReport> {
        if self.state != StageState::Running || self.pending_frame != Some(request) {
            tracing::trace!(request = request.0, "stale frame ignored");
            return None;
        }
        self.pending_frame = None;
        let report = self.frame_loop.tick(&self.input);
        self.pending_frame = Some(self.host.request_frame());
        Some(report)
    }

    /// Cancel the frame loop and release every acquired resource.
    pub fn stop(&mut self) {
        if self.state == StageState::Stopped {
            return;
        }
        self.state = StageState::Stopped;

        if let Some(request) = self.pending_frame.take() {
            self.host.cancel_frame(request);
        }

        let mut released = 0;
        while let Some(resource) = self.registry.pop() {
            self.release(resource);
            released += 1;
        }

        self.frame_loop.detach();
        self.input.clear();
        self.frame_loop.renderer_mut().dispose();
        tracing::info!(released, ticks = self.frame_loop.ticks(), "stage stopped");
    }

    fn release(&mut self, resource: Resource) {
        match resource {
            Resource::Listener(id) => {
                self.listening.remove(&id);
                self.host.remove_listener(id);
            }
            Resource::Surface => self.host.detach_surface(),
            Resource::Controls => {
                self.frame_loop.dispose_controls();
            }
            Resource::Geometry(handle) => {
                if self.frame_loop.scene_mut().dispose_geometry(handle).is_none() {
                    tracing::debug!(handle = handle.0, "geometry already released");
                }
            }
            Resource::Material(handle) => {
                if self.frame_loop.scene_mut().dispose_material(handle).is_none() {
                    tracing::debug!(handle = handle.0, "material already released");
                }
            }
        }
    }

    pub fn state(&self) -> StageState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == StageState::Running
    }

    pub fn pending_frame(&self) -> Option<FrameRequest> {
        self.pending_frame
    }

    pub fn input(&self) -> &InputTracker {
        &self.input
    }

    pub fn frame_loop(&self) -> &FrameLoop<R> {
        &self.frame_loop
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }
}

impl<R: Renderer> Stage<&mut HeadlessHost, R> {
    /// Simulate one display refresh on a headless host.
    pub fn pump(&mut self) -> Option<TickReport> {
        let request = self.host.fire_frame()?;
        self.on_frame(request)
    }
}

impl<H: Host, R: Renderer> Drop for Stage<H, R> {
    fn drop(&mut self) {
        self.stop();
    }
}
