use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use stagehand_common::{ObjectId, Transform};

use crate::scene::{Geometry, GeometryHandle, Light, Material, MaterialHandle, Scene, SceneObject};

/// Placement and look of the default stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Starting position of the controlled box.
    pub object_position: Vec3,
    /// Edge length of the controlled box.
    pub object_size: f32,
    /// Edge length of the square ground plane.
    pub ground_size: f32,
    pub object_color: u32,
    pub ground_color: u32,
    pub background_color: u32,
    /// Position of the shadow-casting directional light.
    pub light_position: Vec3,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            object_position: Vec3::new(0.0, 0.5, 0.0),
            object_size: 1.0,
            ground_size: 20.0,
            object_color: 0x00ff00,
            ground_color: 0x808080,
            background_color: 0x87ceeb,
            light_position: Vec3::new(5.0, 10.0, 7.5),
        }
    }
}

/// A constructed scene plus everything the lifecycle needs to release it.
#[derive(Debug)]
pub struct StageLayout {
    pub scene: Scene,
    /// The object driven by the arrow keys.
    pub controlled: ObjectId,
    pub ground: ObjectId,
    /// Geometries created during construction, in creation order.
    pub geometries: Vec<GeometryHandle>,
    /// Materials created during construction, in creation order.
    pub materials: Vec<MaterialHandle>,
}

impl StageLayout {
    /// Build the default stage: a lit ground plane with one shadow-casting box on it.
    pub fn build(config: &LayoutConfig) -> Self {
        let mut scene = Scene::new();
        scene.set_background(Material::from_rgb(config.background_color).color);

        scene.add_light(Light::Ambient {
            color: [1.0, 1.0, 1.0],
            intensity: 0.5,
        });
        scene.add_light(Light::Directional {
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            position: config.light_position,
            cast_shadow: true,
        });

        let ground_geometry = scene.add_geometry(Geometry::Plane {
            width: config.ground_size,
            height: config.ground_size,
        });
        let ground_material = scene.add_material(Material {
            roughness: 0.8,
            ..Material::from_rgb(config.ground_color)
        });
        // Plane geometry faces +Z; lay it flat so it faces +Y.
        let ground = scene.add_object(SceneObject {
            name: "ground".into(),
            transform: Transform {
                rotation: Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2),
                ..Transform::default()
            },
            geometry: ground_geometry,
            material: ground_material,
            cast_shadow: false,
            receive_shadow: true,
        });

        let box_geometry = scene.add_geometry(Geometry::Box {
            width: config.object_size,
            height: config.object_size,
            depth: config.object_size,
        });
        let box_material = scene.add_material(Material {
            roughness: 0.5,
            ..Material::from_rgb(config.object_color)
        });
        let controlled = scene.add_object(SceneObject {
            name: "player".into(),
            transform: Transform::from_position(config.object_position),
            geometry: box_geometry,
            material: box_material,
            cast_shadow: true,
            receive_shadow: false,
        });

        tracing::debug!(
            objects = scene.object_count(),
            controlled = %controlled.short(),
            "stage layout built"
        );

        Self {
            scene,
            controlled,
            ground,
            geometries: vec![ground_geometry, box_geometry],
            materials: vec![ground_material, box_material],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layout_places_box_on_ground() {
        let layout = StageLayout::build(&LayoutConfig::default());
        assert_eq!(layout.scene.object_count(), 2);
        assert_eq!(
            layout.scene.position(layout.controlled),
            Some(Vec3::new(0.0, 0.5, 0.0))
        );
        assert_eq!(layout.scene.position(layout.ground), Some(Vec3::ZERO));
    }

    #[test]
    fn every_created_resource_is_listed() {
        let layout = StageLayout::build(&LayoutConfig::default());
        assert_eq!(layout.geometries.len(), layout.scene.geometry_count());
        assert_eq!(layout.materials.len(), layout.scene.material_count());
        for obj in layout.scene.objects().values() {
            assert!(layout.geometries.contains(&obj.geometry));
            assert!(layout.materials.contains(&obj.material));
        }
    }

    #[test]
    fn ground_faces_up() {
        let layout = StageLayout::build(&LayoutConfig::default());
        let ground = layout.scene.object(layout.ground).unwrap();
        let normal = ground.transform.rotation * Vec3::Z;
        assert!((normal - Vec3::Y).length() < 1e-6);
        assert!(ground.receive_shadow);
    }

    #[test]
    fn key_light_casts_shadow() {
        let layout = StageLayout::build(&LayoutConfig::default());
        match layout.scene.key_light() {
            Some(Light::Directional { cast_shadow, .. }) => assert!(*cast_shadow),
            other => panic!("expected directional light, got {other:?}"),
        }
    }

    #[test]
    fn custom_start_position() {
        let config = LayoutConfig {
            object_position: Vec3::new(2.0, 0.5, -1.0),
            ..LayoutConfig::default()
        };
        let layout = StageLayout::build(&config);
        assert_eq!(
            layout.scene.position(layout.controlled),
            Some(Vec3::new(2.0, 0.5, -1.0))
        );
    }
}
