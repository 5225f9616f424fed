use glam::Vec3;
use stagehand_common::{ObjectId, Viewport};
use stagehand_input::InputTracker;
use stagehand_render::{OrbitController, PerspectiveCamera, Renderer};
use stagehand_scene::Scene;

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    /// Controlled object position after displacement; `None` for a render-only tick.
    pub position: Option<Vec3>,
    /// Movement applied this tick.
    pub displacement: Vec3,
}

impl TickReport {
    pub fn render_only(&self) -> bool {
        self.position.is_none()
    }
}

/// Per-tick update and render of the scene.
///
/// Each [`tick`](Self::tick) runs, in order: displacement of the controlled
/// object from held keys, camera-follow sync (controller target = object
/// position), controller update, render. The sync must precede the update or
/// the camera aims at last tick's position.
pub struct FrameLoop<R: Renderer> {
    scene: Scene,
    camera: PerspectiveCamera,
    controls: Option<OrbitController>,
    renderer: R,
    controlled: Option<ObjectId>,
    step: f32,
    ticks: u64,
}

impl<R: Renderer> FrameLoop<R> {
    /// `step` is the per-tick displacement for each held arrow key.
    pub fn new(scene: Scene, camera: PerspectiveCamera, renderer: R, step: f32) -> Self {
        Self {
            scene,
            camera,
            controls: None,
            renderer,
            controlled: None,
            step,
            ticks: 0,
        }
    }

    /// Bind the object the arrow keys drive. Succeeds once, and only for an
    /// object present in the scene.
    pub fn attach(&mut self, id: ObjectId) -> bool {
        if self.controlled.is_some() || self.scene.object(id).is_none() {
            return false;
        }
        tracing::debug!(object = %id.short(), "controlled object attached");
        self.controlled = Some(id);
        true
    }

    pub fn detach(&mut self) -> Option<ObjectId> {
        self.controlled.take()
    }

    pub fn controlled(&self) -> Option<ObjectId> {
        self.controlled
    }

    pub fn install_controls(&mut self, controls: OrbitController) {
        self.controls = Some(controls);
    }

    /// Dispose and drop the orbit controller. Returns false if none was installed.
    pub fn dispose_controls(&mut self) -> bool {
        match self.controls.take() {
            Some(mut controls) => {
                controls.dispose();
                true
            }
            None => false,
        }
    }

    pub fn controls(&self) -> Option<&OrbitController> {
        self.controls.as_ref()
    }

    pub fn controls_mut(&mut self) -> Option<&mut OrbitController> {
        self.controls.as_mut()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn camera(&self) -> &PerspectiveCamera {
        &self.camera
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run one tick. `input` is only read.
    pub fn tick(&mut self, input: &InputTracker) -> TickReport {
        self.ticks += 1;
        let mut report = TickReport {
            tick: self.ticks,
            position: None,
            displacement: Vec3::ZERO,
        };

        if let Some(object) = self.controlled.and_then(|id| self.scene.object_mut(id)) {
            let start = object.transform.position;
            for direction in input.held_directions() {
                object.transform.position += direction.axis() * self.step;
            }
            let position = object.transform.position;
            report.position = Some(position);
            report.displacement = position - start;

            if let Some(controls) = self.controls.as_mut() {
                controls.target = position;
                controls.update(&mut self.camera);
            }
        }

        self.renderer.render(&self.scene, &self.camera);

        tracing::trace!(
            tick = report.tick,
            render_only = report.render_only(),
            "tick"
        );
        report
    }

    /// Apply a viewport change to camera and surface together.
    ///
    /// A zero-area viewport (minimised window) is ignored, leaving both at
    /// their last usable size.
    pub fn resize(&mut self, viewport: Viewport) {
        if viewport.is_empty() {
            tracing::debug!(
                width = viewport.width,
                height = viewport.height,
                "zero-area resize ignored"
            );
            return;
        }
        self.camera.aspect = viewport.aspect();
        self.camera.update_projection_matrix();
        self.renderer.set_size(viewport);
        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            aspect = self.camera.aspect,
            "viewport resized"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_render::DebugTextRenderer;
    use stagehand_scene::{LayoutConfig, StageLayout};

    const EPS: f32 = 1e-6;

    fn rig() -> (FrameLoop<DebugTextRenderer>, ObjectId) {
        let layout = StageLayout::build(&LayoutConfig::default());
        let mut camera = PerspectiveCamera::new(75.0, 800.0 / 600.0, 0.1, 1000.0);
        camera.position = Vec3::new(0.0, 3.0, 6.0);
        let mut fl = FrameLoop::new(layout.scene, camera, DebugTextRenderer::default(), 0.05);
        let mut controls = OrbitController::new(Vec3::new(0.0, 0.5, 0.0)).above_ground();
        controls.enable_damping = true;
        fl.install_controls(controls);
        assert!(fl.attach(layout.controlled));
        (fl, layout.controlled)
    }

    fn holding(keys: &[&str]) -> InputTracker {
        let mut input = InputTracker::new();
        for k in keys {
            input.on_key_down(k);
        }
        input
    }

    #[test]
    fn idle_tick_renders_without_moving() {
        let (mut fl, id) = rig();
        let report = fl.tick(&InputTracker::new());
        assert_eq!(report.displacement, Vec3::ZERO);
        assert_eq!(fl.scene().position(id), Some(Vec3::new(0.0, 0.5, 0.0)));
        assert_eq!(fl.renderer().frames(), 1);
    }

    #[test]
    fn single_key_moves_one_axis() {
        let cases = [
            ("ArrowUp", Vec3::new(0.0, 0.05, 0.0)),
            ("ArrowDown", Vec3::new(0.0, -0.05, 0.0)),
            ("ArrowLeft", Vec3::new(-0.05, 0.0, 0.0)),
            ("ArrowRight", Vec3::new(0.05, 0.0, 0.0)),
        ];
        for (key, expected) in cases {
            let (mut fl, id) = rig();
            let before = fl.scene().position(id).unwrap();
            fl.tick(&holding(&[key]));
            let after = fl.scene().position(id).unwrap();
            let delta = after - before;
            assert!((delta - expected).length() < EPS, "{key}: moved {delta:?}");
            assert_eq!(after.z, before.z, "{key}: z must not change");
        }
    }

    #[test]
    fn diagonal_speed_is_not_normalized() {
        let (mut fl, _) = rig();
        let report = fl.tick(&holding(&["ArrowUp", "ArrowRight"]));
        assert!((report.displacement.x - 0.05).abs() < EPS);
        assert!((report.displacement.y - 0.05).abs() < EPS);
        let speed = report.displacement.length();
        assert!((speed - 0.05 * std::f32::consts::SQRT_2).abs() < EPS);
        assert!((speed - 0.0707).abs() < 1e-4);
    }

    #[test]
    fn opposite_keys_cancel() {
        let (mut fl, id) = rig();
        fl.tick(&holding(&["ArrowLeft", "ArrowRight"]));
        let p = fl.scene().position(id).unwrap();
        assert!(p.x.abs() < EPS);
    }

    #[test]
    fn unrelated_keys_are_ignored() {
        let (mut fl, id) = rig();
        fl.tick(&holding(&["KeyW", "Space"]));
        assert_eq!(fl.scene().position(id), Some(Vec3::new(0.0, 0.5, 0.0)));
    }

    #[test]
    fn target_copies_position_every_tick() {
        let (mut fl, id) = rig();
        let input = holding(&["ArrowUp", "ArrowLeft"]);
        for _ in 0..25 {
            fl.tick(&input);
            let position = fl.scene().position(id).unwrap();
            assert_eq!(fl.controls().unwrap().target, position);
        }
    }

    /// Sync runs before the controller update, so the camera aims at this
    /// tick's position rather than the previous one.
    #[test]
    fn camera_aims_at_current_position() {
        let (mut fl, id) = rig();
        let input = holding(&["ArrowRight"]);
        for _ in 0..5 {
            fl.tick(&input);
            let position = fl.scene().position(id).unwrap();
            assert_eq!(fl.camera().look_target(), position);
            let to_object = (position - fl.camera().position).normalize();
            assert!((fl.camera().forward() - to_object).length() < 1e-5);
        }
    }

    #[test]
    fn unattached_tick_is_render_only() {
        let layout = StageLayout::build(&LayoutConfig::default());
        let mut fl = FrameLoop::new(
            layout.scene,
            PerspectiveCamera::default(),
            DebugTextRenderer::default(),
            0.05,
        );
        fl.install_controls(OrbitController::new(Vec3::ZERO));
        let report = fl.tick(&holding(&["ArrowUp"]));
        assert!(report.render_only());
        assert_eq!(fl.renderer().frames(), 1);
        assert_eq!(fl.controls().unwrap().target, Vec3::ZERO);
        assert_eq!(
            fl.scene().position(layout.controlled),
            Some(Vec3::new(0.0, 0.5, 0.0))
        );
    }

    #[test]
    fn vanished_object_degrades_to_render_only() {
        let (mut fl, id) = rig();
        fl.scene_mut().remove_object(id);
        let report = fl.tick(&holding(&["ArrowUp"]));
        assert!(report.render_only());
        assert_eq!(fl.renderer().frames(), 1);
    }

    #[test]
    fn attach_happens_once() {
        let (mut fl, id) = rig();
        assert!(!fl.attach(id));
        assert_eq!(fl.detach(), Some(id));
        assert!(fl.attach(id));
        assert!(!fl.attach(ObjectId::new()));
    }

    #[test]
    fn missing_controls_still_moves_object() {
        let (mut fl, id) = rig();
        assert!(fl.dispose_controls());
        assert!(!fl.dispose_controls());
        fl.tick(&holding(&["ArrowDown"]));
        let p = fl.scene().position(id).unwrap();
        assert!((p.y - 0.45).abs() < EPS);
    }

    #[test]
    fn resize_updates_camera_and_surface_together() {
        let (mut fl, _) = rig();
        let fov = fl.camera().fov_degrees;
        let (near, far) = (fl.camera().near, fl.camera().far);
        let before = fl.camera().projection_matrix();

        fl.resize(Viewport::new(1920, 1080));

        assert_eq!(fl.camera().aspect, 1920.0 / 1080.0);
        assert_ne!(fl.camera().projection_matrix(), before);
        assert_eq!(fl.renderer().size(), Viewport::new(1920, 1080));
        assert_eq!(fl.camera().fov_degrees, fov);
        assert_eq!(fl.camera().near, near);
        assert_eq!(fl.camera().far, far);
    }

    #[test]
    fn zero_area_resize_keeps_camera_and_surface() {
        let (mut fl, _) = rig();
        fl.resize(Viewport::new(1920, 1080));
        let projection = fl.camera().projection_matrix();

        fl.resize(Viewport::new(0, 0));
        fl.resize(Viewport::new(0, 720));

        assert_eq!(fl.camera().aspect, 1920.0 / 1080.0);
        assert!(fl.camera().projection_matrix().is_finite());
        assert_eq!(fl.camera().projection_matrix(), projection);
        assert_eq!(fl.renderer().size(), Viewport::new(1920, 1080));

        fl.tick(&InputTracker::new());
        assert!(fl.camera().view_projection().is_finite());
    }

    #[test]
    fn tick_counter_advances() {
        let (mut fl, _) = rig();
        let input = InputTracker::new();
        fl.tick(&input);
        let report = fl.tick(&input);
        assert_eq!(report.tick, 2);
        assert_eq!(fl.ticks(), 2);
    }
}
