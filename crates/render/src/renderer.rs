use stagehand_common::Viewport;
use stagehand_scene::Scene;

use crate::camera::PerspectiveCamera;

/// Renderer-agnostic interface. All backends implement this trait.
///
/// A backend owns its drawable surface. `render` reads the scene and camera
/// and draws one frame; it never mutates either.
pub trait Renderer {
    /// Draw one frame.
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera);

    /// Resize the drawable surface.
    fn set_size(&mut self, viewport: Viewport);

    /// Current drawable surface size.
    fn size(&self) -> Viewport;

    /// Release backend resources. Called once at teardown.
    fn dispose(&mut self) {}
}

/// GPU-free text renderer.
///
/// Produces a human-readable description of each frame. Useful for CLI output,
/// logging, and driving the render interface in tests.
#[derive(Debug)]
pub struct DebugTextRenderer {
    size: Viewport,
    frames: u64,
    last_frame: String,
    disposed: bool,
}

impl DebugTextRenderer {
    pub fn new(size: Viewport) -> Self {
        Self {
            size,
            frames: 0,
            last_frame: String::new(),
            disposed: false,
        }
    }

    /// Number of frames drawn so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Text of the most recent frame; empty before the first one.
    pub fn last_frame(&self) -> &str {
        &self.last_frame
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl Default for DebugTextRenderer {
    fn default() -> Self {
        Self::new(Viewport::new(800, 600))
    }
}

impl Renderer for DebugTextRenderer {
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) {
        if self.disposed {
            return;
        }
        self.frames += 1;

        let mut out = String::new();
        out.push_str(&format!(
            "=== Frame {} ({}x{}) ===\n",
            self.frames, self.size.width, self.size.height
        ));
        let eye = camera.position;
        let target = camera.look_target();
        out.push_str(&format!(
            "Camera: eye=({:.2}, {:.2}, {:.2}) target=({:.2}, {:.2}, {:.2}) fov={:.0} aspect={:.3}\n",
            eye.x, eye.y, eye.z, target.x, target.y, target.z, camera.fov_degrees, camera.aspect
        ));
        out.push_str(&format!(
            "Objects: {}  Lights: {}\n",
            scene.object_count(),
            scene.lights().len()
        ));

        for (id, obj) in scene.objects() {
            let p = obj.transform.position;
            let drawable = scene.geometry(obj.geometry).is_some()
                && scene.material(obj.material).is_some();
            out.push_str(&format!(
                "  [{}] {} pos=({:.2}, {:.2}, {:.2}){}\n",
                id.short(),
                obj.name,
                p.x,
                p.y,
                p.z,
                if drawable { "" } else { " (released)" }
            ));
        }

        self.last_frame = out;
    }

    fn set_size(&mut self, viewport: Viewport) {
        self.size = viewport;
    }

    fn size(&self) -> Viewport {
        self.size
    }

    fn dispose(&mut self) {
        self.disposed = true;
    }
}
