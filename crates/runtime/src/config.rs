use glam::Vec3;
use serde::{Deserialize, Serialize};
use stagehand_render::{OrbitController, PerspectiveCamera};
use stagehand_scene::LayoutConfig;
use std::path::Path;

/// Errors from loading or validating a stage configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Projection and starting placement of the camera.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 75.0,
            near: 0.1,
            far: 1000.0,
            position: Vec3::new(0.0, 3.0, 6.0),
        }
    }
}

/// Orbit controller tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            enable_damping: true,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 2.0,
            max_distance: 50.0,
        }
    }
}

/// Everything a stage needs before its first frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Displacement per tick for each held arrow key, in world units.
    pub step: f32,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub layout: LayoutConfig,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            step: 0.05,
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

impl StageConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.step.is_finite() {
            return Err(invalid("step", format!("{} is not finite", self.step)));
        }
        let cam = &self.camera;
        if !(cam.fov_degrees > 0.0 && cam.fov_degrees < 180.0) {
            return Err(invalid(
                "camera.fov_degrees",
                format!("{} is outside (0, 180)", cam.fov_degrees),
            ));
        }
        if !(cam.near > 0.0 && cam.near < cam.far) {
            return Err(invalid(
                "camera.near",
                format!("need 0 < near < far, got near={} far={}", cam.near, cam.far),
            ));
        }
        let controls = &self.controls;
        if !(controls.damping_factor > 0.0 && controls.damping_factor <= 1.0) {
            return Err(invalid(
                "controls.damping_factor",
                format!("{} is outside (0, 1]", controls.damping_factor),
            ));
        }
        // max may be +inf for an unbounded dolly; NaN fails every comparison.
        if !(controls.min_distance.is_finite()
            && controls.min_distance >= 0.0
            && controls.min_distance <= controls.max_distance)
        {
            return Err(invalid(
                "controls.min_distance",
                format!(
                    "need 0 <= min <= max with min finite, got min={} max={}",
                    controls.min_distance, controls.max_distance
                ),
            ));
        }
        if !controls.rotate_speed.is_finite() {
            return Err(invalid(
                "controls.rotate_speed",
                format!("{} is not finite", controls.rotate_speed),
            ));
        }
        if !(controls.zoom_speed.is_finite() && controls.zoom_speed > 0.0) {
            return Err(invalid(
                "controls.zoom_speed",
                format!("{} is not a finite positive number", controls.zoom_speed),
            ));
        }
        Ok(())
    }

    /// Camera placed and projected per this configuration, aimed at `target`.
    pub fn build_camera(&self, aspect: f32, target: Vec3) -> PerspectiveCamera {
        let mut camera =
            PerspectiveCamera::new(self.camera.fov_degrees, aspect, self.camera.near, self.camera.far);
        camera.position = self.camera.position;
        camera.look_at(target);
        camera
    }

    /// Orbit controller tuned per this configuration, orbiting `target`.
    pub fn build_controls(&self, target: Vec3) -> OrbitController {
        let c = &self.controls;
        let mut controls = OrbitController::new(target).above_ground();
        controls.enable_damping = c.enable_damping;
        controls.damping_factor = c.damping_factor;
        controls.rotate_speed = c.rotate_speed;
        controls.zoom_speed = c.zoom_speed;
        controls.min_distance = c.min_distance;
        controls.max_distance = c.max_distance;
        controls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = StageConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.step, 0.05);
        assert_eq!(config.camera.fov_degrees, 75.0);
        assert!(config.controls.enable_damping);
    }

    #[test]
    fn save_and_load() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut config = StageConfig::default();
        config.step = 0.1;
        config.controls.enable_damping = false;
        config.save(tmp.path()).unwrap();

        let loaded = StageConfig::load(tmp.path()).unwrap();
        assert_eq!(loaded.step, 0.1);
        assert!(!loaded.controls.enable_damping);
        assert_eq!(loaded.layout.ground_size, config.layout.ground_size);
    }

    #[test]
    fn partial_file_takes_defaults() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), r#"{ "step": 0.2, "camera": { "fov_degrees": 60.0 } }"#).unwrap();
        let loaded = StageConfig::load(tmp.path()).unwrap();
        assert_eq!(loaded.step, 0.2);
        assert_eq!(loaded.camera.fov_degrees, 60.0);
        assert_eq!(loaded.camera.near, 0.1);
        assert_eq!(loaded.controls.damping_factor, 0.05);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = StageConfig::load("/nonexistent/stage.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn malformed_file_is_json_error() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "{ step: ").unwrap();
        let err = StageConfig::load(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = StageConfig::default();
        config.camera.fov_degrees = 180.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "camera.fov_degrees", .. })
        ));

        let mut config = StageConfig::default();
        config.camera.near = 2000.0;
        assert!(config.validate().is_err());

        let mut config = StageConfig::default();
        config.controls.damping_factor = 0.0;
        assert!(config.validate().is_err());

        let mut config = StageConfig::default();
        config.step = f32::NAN;
        assert!(config.validate().is_err());
    }

    fn rejected_field(config: &StageConfig) -> Option<&'static str> {
        match config.validate() {
            Err(ConfigError::Invalid { field, .. }) => Some(field),
            _ => None,
        }
    }

    #[test]
    fn rejects_non_finite_controls() {
        let mut config = StageConfig::default();
        config.controls.max_distance = f32::NAN;
        assert_eq!(rejected_field(&config), Some("controls.min_distance"));

        for min in [f32::NAN, f32::INFINITY, -1.0] {
            let mut config = StageConfig::default();
            config.controls.min_distance = min;
            assert_eq!(rejected_field(&config), Some("controls.min_distance"), "min={min}");
        }

        for speed in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let mut config = StageConfig::default();
            config.controls.rotate_speed = speed;
            assert_eq!(rejected_field(&config), Some("controls.rotate_speed"), "rotate={speed}");
        }

        for speed in [f32::NAN, f32::INFINITY, 0.0, -1.0] {
            let mut config = StageConfig::default();
            config.controls.zoom_speed = speed;
            assert_eq!(rejected_field(&config), Some("controls.zoom_speed"), "zoom={speed}");
        }
    }

    #[test]
    fn unbounded_max_distance_is_accepted() {
        let mut config = StageConfig::default();
        config.controls.max_distance = f32::INFINITY;
        assert!(config.validate().is_ok());

        let mut controls = config.build_controls(Vec3::ZERO);
        let mut camera = config.build_camera(1.0, Vec3::ZERO);
        controls.handle_wheel(-120.0);
        controls.update(&mut camera);
        assert!(camera.position.is_finite());
    }

    #[test]
    fn built_camera_matches_config() {
        let config = StageConfig::default();
        let cam = config.build_camera(4.0 / 3.0, Vec3::new(0.0, 0.5, 0.0));
        assert_eq!(cam.position, config.camera.position);
        assert_eq!(cam.near, 0.1);
        assert_eq!(cam.far, 1000.0);
        assert_eq!(cam.look_target(), Vec3::new(0.0, 0.5, 0.0));
    }

    #[test]
    fn built_controls_match_config() {
        let config = StageConfig::default();
        let controls = config.build_controls(Vec3::ZERO);
        assert!(controls.enable_damping);
        assert_eq!(controls.damping_factor, 0.05);
        assert!(controls.max_polar_angle < std::f32::consts::FRAC_PI_2);
    }
}
