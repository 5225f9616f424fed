use glam::{Mat4, Vec3};

/// Perspective camera with a cached projection matrix.
///
/// `aspect` may be changed freely, but the projection only follows after
/// [`update_projection_matrix`](Self::update_projection_matrix). Resize handlers
/// must call both.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    pub position: Vec3,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    look_target: Vec3,
    projection: Mat4,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        Self::new(75.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}

impl PerspectiveCamera {
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            fov_degrees,
            aspect,
            near,
            far,
            look_target: Vec3::ZERO,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Recompute the cached projection from fov, aspect and clip planes.
    pub fn update_projection_matrix(&mut self) {
        self.projection =
            Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    /// Point the camera at `target`. Ignored when `target` coincides with the camera.
    pub fn look_at(&mut self, target: Vec3) {
        if (target - self.position).length_squared() > f32::EPSILON {
            self.look_target = target;
        }
    }

    /// Point the camera last looked at.
    pub fn look_target(&self) -> Vec3 {
        self.look_target
    }

    pub fn forward(&self) -> Vec3 {
        (self.look_target - self.position).normalize_or(Vec3::NEG_Z)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.forward(), Vec3::Y)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }
}
