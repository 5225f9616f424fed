use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use stagehand_common::{ObjectId, Transform};

/// A handle referencing a geometry in the scene's geometry table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeometryHandle(pub u64);

/// A handle referencing a material in the scene's material table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialHandle(pub u64);

/// Shape data, in object-local units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    /// Axis-aligned box centered on the origin.
    Box { width: f32, height: f32, depth: f32 },
    /// Flat rectangle in the local XY plane, facing +Z.
    Plane { width: f32, height: f32 },
}

impl Geometry {
    /// Scale that maps a unit cube or unit quad onto this shape.
    pub fn extent(&self) -> Vec3 {
        match *self {
            Self::Box {
                width,
                height,
                depth,
            } => Vec3::new(width, height, depth),
            Self::Plane { width, height } => Vec3::new(width, height, 1.0),
        }
    }
}

/// Lit surface description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Linear RGBA.
    pub color: [f32; 4],
    /// 0 = mirror-like, 1 = fully diffuse.
    pub roughness: f32,
}

impl Material {
    pub fn from_rgb(rgb: u32) -> Self {
        let channel = |shift: u32| ((rgb >> shift) & 0xff) as f32 / 255.0;
        Self {
            color: [channel(16), channel(8), channel(0), 1.0],
            roughness: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Light {
    Ambient {
        color: [f32; 3],
        intensity: f32,
    },
    /// Parallel light shining from `position` toward the origin.
    Directional {
        color: [f32; 3],
        intensity: f32,
        position: Vec3,
        cast_shadow: bool,
    },
}

/// A drawable node: transform plus references into the shared tables.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneObject {
    pub name: String,
    pub transform: Transform,
    pub geometry: GeometryHandle,
    pub material: MaterialHandle,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

/// The scene graph consumed by renderers.
///
/// Objects live in a BTreeMap so every renderer iterates them in the same order.
/// Geometry and material tables are shared between objects and are released
/// explicitly through `dispose_*`; an object whose geometry or material is gone
/// is skipped by renderers rather than treated as an error.
#[derive(Debug, Clone)]
pub struct Scene {
    objects: BTreeMap<ObjectId, SceneObject>,
    geometries: BTreeMap<GeometryHandle, Geometry>,
    materials: BTreeMap<MaterialHandle, Material>,
    lights: Vec<Light>,
    background: [f32; 4],
    next_handle: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            objects: BTreeMap::new(),
            geometries: BTreeMap::new(),
            materials: BTreeMap::new(),
            lights: Vec::new(),
            background: [0.0, 0.0, 0.0, 1.0],
            next_handle: 0,
        }
    }
}

impl Scene {
    /// Create an empty scene with a black background.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn background(&self) -> [f32; 4] {
        self.background
    }

    pub fn set_background(&mut self, color: [f32; 4]) {
        self.background = color;
    }

    fn next_handle(&mut self) -> u64 {
        let h = self.next_handle;
        self.next_handle += 1;
        h
    }

    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryHandle {
        let handle = GeometryHandle(self.next_handle());
        self.geometries.insert(handle, geometry);
        handle
    }

    pub fn add_material(&mut self, material: Material) -> MaterialHandle {
        let handle = MaterialHandle(self.next_handle());
        self.materials.insert(handle, material);
        handle
    }

    pub fn geometry(&self, handle: GeometryHandle) -> Option<&Geometry> {
        self.geometries.get(&handle)
    }

    pub fn material(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(&handle)
    }

    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    /// Release a geometry. Returns `None` if it was already released.
    pub fn dispose_geometry(&mut self, handle: GeometryHandle) -> Option<Geometry> {
        let geometry = self.geometries.remove(&handle);
        if geometry.is_some() {
            tracing::debug!(handle = handle.0, "geometry disposed");
        }
        geometry
    }

    /// Release a material. Returns `None` if it was already released.
    pub fn dispose_material(&mut self, handle: MaterialHandle) -> Option<Material> {
        let material = self.materials.remove(&handle);
        if material.is_some() {
            tracing::debug!(handle = handle.0, "material disposed");
        }
        material
    }

    /// Insert an object and return its id.
    pub fn add_object(&mut self, object: SceneObject) -> ObjectId {
        let id = ObjectId::new();
        self.objects.insert(id, object);
        id
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(&id)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(&id)
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<SceneObject> {
        self.objects.remove(&id)
    }

    /// World-space position of an object, if it exists.
    pub fn position(&self, id: ObjectId) -> Option<Vec3> {
        self.objects.get(&id).map(|o| o.transform.position)
    }

    /// Read-only access to all objects (BTreeMap for deterministic iteration).
    pub fn objects(&self) -> &BTreeMap<ObjectId, SceneObject> {
        &self.objects
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn add_light(&mut self, light: Light) {
        self.lights.push(light);
    }

    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    /// Summed ambient contribution (color already scaled by intensity).
    pub fn ambient(&self) -> Vec3 {
        self.lights
            .iter()
            .filter_map(|l| match l {
                Light::Ambient { color, intensity } => Some(Vec3::from(*color) * *intensity),
                _ => None,
            })
            .sum()
    }

    /// First directional light, used for shading and shadow projection.
    pub fn key_light(&self) -> Option<&Light> {
        self.lights
            .iter()
            .find(|l| matches!(l, Light::Directional { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(scene: &mut Scene) -> SceneObject {
        let geometry = scene.add_geometry(Geometry::Box {
            width: 1.0,
            height: 1.0,
            depth: 1.0,
        });
        let material = scene.add_material(Material::from_rgb(0x00ff00));
        SceneObject {
            name: "cube".into(),
            transform: Transform::default(),
            geometry,
            material,
            cast_shadow: true,
            receive_shadow: false,
        }
    }

    #[test]
    fn scene_starts_empty() {
        let s = Scene::new();
        assert_eq!(s.object_count(), 0);
        assert_eq!(s.geometry_count(), 0);
        assert!(s.lights().is_empty());
    }

    #[test]
    fn handles_are_distinct() {
        let mut s = Scene::new();
        let g = s.add_geometry(Geometry::Plane {
            width: 1.0,
            height: 1.0,
        });
        let m = s.add_material(Material::from_rgb(0xffffff));
        assert_ne!(g.0, m.0);
    }

    #[test]
    fn add_and_move_object() {
        let mut s = Scene::new();
        let obj = cube(&mut s);
        let id = s.add_object(obj);
        assert_eq!(s.position(id), Some(Vec3::ZERO));

        s.object_mut(id).unwrap().transform.position.y += 1.5;
        assert_eq!(s.position(id), Some(Vec3::new(0.0, 1.5, 0.0)));
    }

    #[test]
    fn dispose_twice_is_noop() {
        let mut s = Scene::new();
        let obj = cube(&mut s);
        assert!(s.dispose_geometry(obj.geometry).is_some());
        assert!(s.dispose_geometry(obj.geometry).is_none());
        assert!(s.dispose_material(obj.material).is_some());
        assert!(s.dispose_material(obj.material).is_none());
        assert_eq!(s.geometry_count(), 0);
        assert_eq!(s.material_count(), 0);
    }

    #[test]
    fn material_from_rgb() {
        let m = Material::from_rgb(0xff8000);
        assert_eq!(m.color[0], 1.0);
        assert!((m.color[1] - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(m.color[2], 0.0);
        assert_eq!(m.color[3], 1.0);
    }

    #[test]
    fn ambient_sums_intensities() {
        let mut s = Scene::new();
        s.add_light(Light::Ambient {
            color: [1.0, 1.0, 1.0],
            intensity: 0.25,
        });
        s.add_light(Light::Ambient {
            color: [1.0, 0.0, 0.0],
            intensity: 0.5,
        });
        assert_eq!(s.ambient(), Vec3::new(0.75, 0.25, 0.25));
        assert!(s.key_light().is_none());
    }

    #[test]
    fn plane_extent_is_flat() {
        let g = Geometry::Plane {
            width: 20.0,
            height: 10.0,
        };
        assert_eq!(g.extent(), Vec3::new(20.0, 10.0, 1.0));
    }
}
