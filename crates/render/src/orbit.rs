use glam::Vec3;
use std::f32::consts::{FRAC_PI_2, PI, TAU};

use crate::camera::PerspectiveCamera;

const EPS: f32 = 1e-6;

/// Offset from the target in spherical form, y-up.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    /// Polar angle from +Y.
    phi: f32,
    /// Azimuth around Y, measured from +Z toward +X.
    theta: f32,
}

impl Spherical {
    fn from_offset(v: Vec3) -> Self {
        let radius = v.length();
        if radius < EPS {
            return Self {
                radius: 0.0,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
            theta: v.x.atan2(v.z),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi = self.phi.sin();
        Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }

    /// Keep phi off the poles so the up vector stays well defined.
    fn make_safe(&mut self) {
        self.phi = self.phi.clamp(EPS, PI - EPS);
    }
}

/// Damped orbit controller: keeps a camera on a sphere around `target`.
///
/// User input (drag, wheel) accumulates as pending rotation and zoom. Each
/// [`update`](Self::update) applies the pending deltas, places the camera on the
/// orbit and points it at the target. With damping enabled only
/// `damping_factor` of the pending rotation is applied per update and the rest
/// decays geometrically, which smooths abrupt input over several frames.
///
/// The controller does not pan: `target` is owned by whoever drives the follow
/// constraint and is expected to be written before every `update`.
#[derive(Debug, Clone)]
pub struct OrbitController {
    pub target: Vec3,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    disposed: bool,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            disposed: false,
        }
    }
}

impl OrbitController {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }

    /// Keeps the camera at or above the horizon.
    pub fn above_ground(mut self) -> Self {
        self.max_polar_angle = FRAC_PI_2 - 0.05;
        self
    }

    pub fn rotate_left(&mut self, angle: f32) {
        if !self.disposed {
            self.delta_theta -= angle;
        }
    }

    pub fn rotate_up(&mut self, angle: f32) {
        if !self.disposed {
            self.delta_phi -= angle;
        }
    }

    /// Move toward the target; `factor` > 1.
    pub fn dolly_in(&mut self, factor: f32) {
        if !self.disposed && factor > 0.0 {
            self.scale /= factor;
        }
    }

    /// Move away from the target; `factor` > 1.
    pub fn dolly_out(&mut self, factor: f32) {
        if !self.disposed && factor > 0.0 {
            self.scale *= factor;
        }
    }

    /// Pointer drag in pixels. A drag across the full viewport height turns a full circle.
    pub fn handle_drag(&mut self, dx: f32, dy: f32, viewport_height: u32) {
        let height = viewport_height.max(1) as f32;
        self.rotate_left(TAU * dx / height * self.rotate_speed);
        self.rotate_up(TAU * dy / height * self.rotate_speed);
    }

    /// Scroll wheel; negative `delta_y` scrolls toward the target.
    pub fn handle_wheel(&mut self, delta_y: f32) {
        let factor = 0.95_f32.powf(-self.zoom_speed);
        if delta_y < 0.0 {
            self.dolly_in(factor);
        } else if delta_y > 0.0 {
            self.dolly_out(factor);
        }
    }

    /// Advance one step and reposition `camera`. Returns true if the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - self.target;
        let mut spherical = Spherical::from_offset(offset);

        if self.enable_damping {
            spherical.theta += self.delta_theta * self.damping_factor;
            spherical.phi += self.delta_phi * self.damping_factor;
        } else {
            spherical.theta += self.delta_theta;
            spherical.phi += self.delta_phi;
        }

        spherical.phi = spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle);
        spherical.make_safe();
        spherical.radius =
            (spherical.radius * self.scale).clamp(self.min_distance, self.max_distance);

        let previous = camera.position;
        camera.position = self.target + spherical.to_offset();
        camera.look_at(self.target);

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.scale = 1.0;

        camera.position.distance_squared(previous) > EPS
    }

    /// True while rotation from earlier input is still being applied.
    pub fn is_settling(&self) -> bool {
        self.delta_theta.abs() > EPS || self.delta_phi.abs() > EPS
    }

    /// Stop reacting to input and drop anything pending. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if !self.disposed {
            tracing::debug!("orbit controller disposed");
        }
        self.disposed = true;
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.scale = 1.0;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_at(position: Vec3) -> PerspectiveCamera {
        let mut cam = PerspectiveCamera::default();
        cam.position = position;
        cam
    }

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-3
    }

    #[test]
    fn spherical_round_trip() {
        let v = Vec3::new(1.0, 2.0, -3.0);
        let back = Spherical::from_offset(v).to_offset();
        assert!(approx(v, back));
    }

    #[test]
    fn idle_update_keeps_position_and_aims_at_target() {
        let mut cam = camera_at(Vec3::new(0.0, 3.0, 6.0));
        let mut controls = OrbitController::new(Vec3::new(0.0, 0.5, 0.0));
        let moved = controls.update(&mut cam);
        assert!(!moved);
        assert!(approx(cam.position, Vec3::new(0.0, 3.0, 6.0)));
        assert_eq!(cam.look_target(), Vec3::new(0.0, 0.5, 0.0));
    }

    #[test]
    fn undamped_rotation_applies_in_one_update() {
        let mut cam = camera_at(Vec3::new(0.0, 0.0, 5.0));
        let mut controls = OrbitController::new(Vec3::ZERO);
        controls.rotate_left(-FRAC_PI_2);
        controls.update(&mut cam);
        assert!(approx(cam.position, Vec3::new(5.0, 0.0, 0.0)));
        assert!(!controls.is_settling());
    }

    #[test]
    fn damped_rotation_spreads_over_updates() {
        let mut cam = camera_at(Vec3::new(0.0, 0.0, 5.0));
        let mut controls = OrbitController::new(Vec3::ZERO);
        controls.enable_damping = true;
        controls.damping_factor = 0.1;
        controls.rotate_left(-FRAC_PI_2);

        controls.update(&mut cam);
        let first_theta = cam.position.x.atan2(cam.position.z);
        assert!((first_theta - FRAC_PI_2 * 0.1).abs() < 1e-4);
        assert!(controls.is_settling());

        for _ in 0..400 {
            controls.update(&mut cam);
        }
        assert!(approx(cam.position, Vec3::new(5.0, 0.0, 0.0)));
        // Radius is preserved throughout.
        assert!((cam.position.length() - 5.0).abs() < 1e-3);
    }

    #[test]
    fn target_change_reaims_without_snapping_position() {
        let mut cam = camera_at(Vec3::new(0.0, 3.0, 6.0));
        let mut controls = OrbitController::new(Vec3::ZERO);
        controls.enable_damping = true;
        controls.update(&mut cam);

        controls.target = Vec3::new(0.0, 0.05, 0.0);
        controls.update(&mut cam);
        assert!(approx(cam.position, Vec3::new(0.0, 3.0, 6.0)));
        assert_eq!(cam.look_target(), Vec3::new(0.0, 0.05, 0.0));
    }

    #[test]
    fn polar_angle_is_clamped_above_ground() {
        let mut cam = camera_at(Vec3::new(0.0, 2.0, 5.0));
        let mut controls = OrbitController::new(Vec3::ZERO).above_ground();
        controls.rotate_up(-PI);
        controls.update(&mut cam);
        assert!(cam.position.y > 0.0);
    }

    #[test]
    fn dolly_respects_distance_limits() {
        let mut cam = camera_at(Vec3::new(0.0, 0.0, 10.0));
        let mut controls = OrbitController::new(Vec3::ZERO);
        controls.min_distance = 4.0;
        controls.max_distance = 20.0;

        controls.dolly_in(2.0);
        controls.update(&mut cam);
        assert!((cam.position.length() - 5.0).abs() < 1e-4);

        controls.dolly_in(10.0);
        controls.update(&mut cam);
        assert!((cam.position.length() - 4.0).abs() < 1e-4);

        controls.dolly_out(100.0);
        controls.update(&mut cam);
        assert!((cam.position.length() - 20.0).abs() < 1e-3);
    }

    #[test]
    fn wheel_direction() {
        let mut cam = camera_at(Vec3::new(0.0, 0.0, 10.0));
        let mut controls = OrbitController::new(Vec3::ZERO);
        controls.handle_wheel(-1.0);
        controls.update(&mut cam);
        assert!(cam.position.length() < 10.0);
    }

    #[test]
    fn disposed_controller_ignores_input() {
        let mut cam = camera_at(Vec3::new(0.0, 0.0, 5.0));
        let mut controls = OrbitController::new(Vec3::ZERO);
        controls.dispose();
        controls.dispose();
        assert!(controls.is_disposed());
        controls.rotate_left(1.0);
        controls.handle_drag(100.0, 50.0, 600);
        controls.dolly_in(3.0);
        controls.update(&mut cam);
        assert!(approx(cam.position, Vec3::new(0.0, 0.0, 5.0)));
    }
}
