use crate::shaders;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};
use stagehand_render::PerspectiveCamera;
use stagehand_scene::{Geometry, Light, Scene};
use wgpu::util::DeviceExt;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Lift applied to projected shadows so they sit just above the ground.
const SHADOW_LIFT: f32 = 0.002;

const SHADOW_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 0.35];

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Uniforms {
    view_proj: [[f32; 4]; 4],
    eye: [f32; 4],
    light_dir: [f32; 4],
    light_color: [f32; 4],
    ambient: [f32; 4],
    shadow_color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
struct Vertex {
    position: [f32; 3],
    normal: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub(crate) struct InstanceData {
    model_0: [f32; 4],
    model_1: [f32; 4],
    model_2: [f32; 4],
    model_3: [f32; 4],
    color: [f32; 4],
    material: [f32; 4],
}

impl InstanceData {
    fn new(model: Mat4, color: [f32; 4], roughness: f32) -> Self {
        let cols = model.to_cols_array_2d();
        Self {
            model_0: cols[0],
            model_1: cols[1],
            model_2: cols[2],
            model_3: cols[3],
            color,
            material: [roughness, 0.0, 0.0, 0.0],
        }
    }

    #[cfg(test)]
    fn model(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&[self.model_0, self.model_1, self.model_2, self.model_3])
    }
}

/// Unit cube centered on the origin.
fn cube_mesh() -> (Vec<Vertex>, Vec<u16>) {
    let p = 0.5_f32;
    let faces: [(Vec3, Vec3, Vec3); 6] = [
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
        (Vec3::X, Vec3::NEG_Z, Vec3::Y),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::X, Vec3::NEG_Z),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let base = vertices.len() as u16;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = (normal + u * su + v * sv) * p;
            vertices.push(Vertex {
                position: position.to_array(),
                normal: normal.to_array(),
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base + 2, base + 3, base]);
    }
    (vertices, indices)
}

/// Unit quad in the XY plane, facing +Z.
fn quad_mesh() -> (Vec<Vertex>, Vec<u16>) {
    let p = 0.5_f32;
    let normal = [0.0, 0.0, 1.0];
    #[rustfmt::skip]
    let vertices = vec![
        Vertex { position: [-p, -p, 0.0], normal },
        Vertex { position: [ p, -p, 0.0], normal },
        Vertex { position: [ p,  p, 0.0], normal },
        Vertex { position: [-p,  p, 0.0], normal },
    ];
    (vertices, vec![0, 1, 2, 2, 3, 0])
}

/// Flattens geometry onto the y = 0 plane along a directional light.
///
/// `to_light` points from the scene toward the light and must have a
/// positive y component.
pub(crate) fn ground_shadow_matrix(to_light: Vec3) -> Mat4 {
    let l = to_light;
    let flatten = Mat4::from_cols(
        Vec4::new(l.y, 0.0, 0.0, 0.0),
        Vec4::new(-l.x, 0.0, -l.z, 0.0),
        Vec4::new(0.0, 0.0, l.y, 0.0),
        Vec4::new(0.0, 0.0, 0.0, l.y),
    );
    Mat4::from_translation(Vec3::Y * SHADOW_LIFT) * flatten
}

/// Per-frame instance lists, grouped by mesh and pipeline.
#[derive(Debug, Default)]
pub(crate) struct FrameBatches {
    pub boxes: Vec<InstanceData>,
    pub planes: Vec<InstanceData>,
    pub shadows: Vec<InstanceData>,
}

impl FrameBatches {
    /// Objects whose geometry or material has been released are skipped.
    pub fn collect(scene: &Scene) -> Self {
        let mut batches = Self::default();

        let shadow = match scene.key_light() {
            Some(Light::Directional {
                position,
                cast_shadow: true,
                ..
            }) if position.y > 0.0 => {
                let receives = scene.objects().values().any(|o| o.receive_shadow);
                receives.then(|| ground_shadow_matrix(position.normalize()))
            }
            _ => None,
        };

        for object in scene.objects().values() {
            let (Some(geometry), Some(material)) = (
                scene.geometry(object.geometry),
                scene.material(object.material),
            ) else {
                continue;
            };
            let t = &object.transform;
            let model = Mat4::from_scale_rotation_translation(
                t.scale * geometry.extent(),
                t.rotation,
                t.position,
            );
            let instance = InstanceData::new(model, material.color, material.roughness);
            match geometry {
                Geometry::Box { .. } => batches.boxes.push(instance),
                Geometry::Plane { .. } => batches.planes.push(instance),
            }
            if let (Some(flatten), true, Geometry::Box { .. }) =
                (shadow, object.cast_shadow, geometry)
            {
                batches
                    .shadows
                    .push(InstanceData::new(flatten * model, SHADOW_COLOR, 1.0));
            }
        }
        batches
    }

    fn len(&self) -> usize {
        self.boxes.len() + self.planes.len() + self.shadows.len()
    }
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn upload(
        device: &wgpu::Device,
        name: &str,
        (vertices, indices): (Vec<Vertex>, Vec<u16>),
    ) -> Self {
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(format!("{name}_vertex_buffer").as_str()),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(format!("{name}_index_buffer").as_str()),
            contents: bytemuck::cast_slice(&indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: indices.len() as u32,
        }
    }

    fn draw(&self, pass: &mut wgpu::RenderPass<'_>, instances: std::ops::Range<u32>) {
        if instances.is_empty() {
            return;
        }
        pass.set_vertex_buffer(0, self.vertex.slice(..));
        pass.set_index_buffer(self.index.slice(..), wgpu::IndexFormat::Uint16);
        pass.draw_indexed(0..self.index_count, 0, instances);
    }

    fn destroy(&self) {
        self.vertex.destroy();
        self.index.destroy();
    }
}

/// GPU pipelines and buffers for drawing a [`Scene`].
pub(crate) struct ScenePipelines {
    lit_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    cube: MeshBuffers,
    quad: MeshBuffers,
    instance_buffer: wgpu::Buffer,
    max_instances: u32,
    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,
}

impl ScenePipelines {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Self {
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform_buffer"),
            size: std::mem::size_of::<Uniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("uniform_bind_group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene_shader"),
            source: wgpu::ShaderSource::Wgsl(shaders::SCENE_SHADER.into()),
        });

        let buffers = [
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<Vertex>() as u64,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![
                    0 => Float32x3,
                    1 => Float32x3,
                ],
            },
            wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<InstanceData>() as u64,
                step_mode: wgpu::VertexStepMode::Instance,
                attributes: &wgpu::vertex_attr_array![
                    2 => Float32x4,
                    3 => Float32x4,
                    4 => Float32x4,
                    5 => Float32x4,
                    6 => Float32x4,
                    7 => Float32x4,
                ],
            },
        ];

        let lit_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("lit_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        // Flattened geometry has degenerate winding, so nothing is culled.
        let shadow_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shadow_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_shadow"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });

        let cube = MeshBuffers::upload(device, "cube", cube_mesh());
        let quad = MeshBuffers::upload(device, "quad", quad_mesh());

        let max_instances = 1024u32;
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("instance_buffer"),
            size: (max_instances as u64) * std::mem::size_of::<InstanceData>() as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let (depth_texture, depth_view) = Self::create_depth_texture(device, width, height);

        Self {
            lit_pipeline,
            shadow_pipeline,
            uniform_buffer,
            uniform_bind_group,
            cube,
            quad,
            instance_buffer,
            max_instances,
            depth_texture,
            depth_view,
        }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.depth_texture.destroy();
        let (texture, view) = Self::create_depth_texture(device, width, height);
        self.depth_texture = texture;
        self.depth_view = view;
    }

    /// Draw one frame: ground planes, then projected shadows, then boxes.
    pub fn draw(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        view: &wgpu::TextureView,
        scene: &Scene,
        camera: &PerspectiveCamera,
    ) {
        queue.write_buffer(
            &self.uniform_buffer,
            0,
            bytemuck::bytes_of(&Self::uniforms(scene, camera)),
        );

        let batches = FrameBatches::collect(scene);
        if batches.len() > self.max_instances as usize {
            tracing::warn!(
                instances = batches.len(),
                max = self.max_instances,
                "instance buffer full, frame skipped"
            );
            return;
        }

        let planes = 0..batches.planes.len() as u32;
        let shadows = planes.end..planes.end + batches.shadows.len() as u32;
        let boxes = shadows.end..shadows.end + batches.boxes.len() as u32;

        let mut instances = Vec::with_capacity(batches.len());
        instances.extend_from_slice(&batches.planes);
        instances.extend_from_slice(&batches.shadows);
        instances.extend_from_slice(&batches.boxes);
        if !instances.is_empty() {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }

        let [r, g, b, a] = scene.background().map(f64::from);
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("render_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("main_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                ..Default::default()
            });

            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_vertex_buffer(1, self.instance_buffer.slice(..));

            pass.set_pipeline(&self.lit_pipeline);
            self.quad.draw(&mut pass, planes);

            pass.set_pipeline(&self.shadow_pipeline);
            self.cube.draw(&mut pass, shadows);

            pass.set_pipeline(&self.lit_pipeline);
            self.cube.draw(&mut pass, boxes);
        }

        queue.submit(std::iter::once(encoder.finish()));
    }

    /// Free every GPU buffer and texture now rather than on drop.
    pub fn destroy(&self) {
        self.uniform_buffer.destroy();
        self.instance_buffer.destroy();
        self.cube.destroy();
        self.quad.destroy();
        self.depth_texture.destroy();
    }

    fn uniforms(scene: &Scene, camera: &PerspectiveCamera) -> Uniforms {
        let (light_dir, light_color) = match scene.key_light() {
            Some(Light::Directional {
                color,
                intensity,
                position,
                ..
            }) => (
                position.normalize_or(Vec3::Y),
                Vec3::from(*color) * *intensity,
            ),
            _ => (Vec3::Y, Vec3::ZERO),
        };
        Uniforms {
            view_proj: camera.view_projection().to_cols_array_2d(),
            eye: camera.position.extend(1.0).to_array(),
            light_dir: light_dir.extend(0.0).to_array(),
            light_color: light_color.extend(1.0).to_array(),
            ambient: scene.ambient().extend(1.0).to_array(),
            shadow_color: SHADOW_COLOR,
        }
    }

    fn create_depth_texture(
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("depth_texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&Default::default());
        (texture, view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagehand_scene::{LayoutConfig, StageLayout};

    const EPS: f32 = 1e-5;

    #[test]
    fn cube_mesh_faces_point_outward() {
        let (vertices, indices) = cube_mesh();
        assert_eq!(vertices.len(), 24);
        assert_eq!(indices.len(), 36);
        for tri in indices.chunks(3) {
            let [a, b, c] =
                [tri[0], tri[1], tri[2]].map(|i| Vec3::from(vertices[i as usize].position));
            let face_normal = (b - a).cross(c - a).normalize();
            let n = Vec3::from(vertices[tri[0] as usize].normal);
            assert!((face_normal - n).length() < EPS, "winding {face_normal:?} vs {n:?}");
        }
        for v in &vertices {
            assert!(v.position.iter().all(|c| c.abs() == 0.5));
        }
    }

    #[test]
    fn quad_mesh_faces_plus_z() {
        let (vertices, indices) = quad_mesh();
        assert_eq!(vertices.len(), 4);
        let [a, b, c] = [0, 1, 2].map(|i| Vec3::from(vertices[indices[i] as usize].position));
        assert!(((b - a).cross(c - a).normalize() - Vec3::Z).length() < EPS);
    }

    #[test]
    fn shadow_matrix_flattens_along_light() {
        let light = Vec3::new(5.0, 10.0, 7.5).normalize();
        let m = ground_shadow_matrix(light);

        let top = Vec3::new(0.0, 1.0, 0.0);
        let projected = m.project_point3(top);
        assert!((projected.y - SHADOW_LIFT).abs() < EPS);
        assert!((projected.x + 0.5).abs() < EPS);
        assert!((projected.z + 0.75).abs() < EPS);

        // Points already on the ground only receive the lift.
        let foot = Vec3::new(2.0, 0.0, -3.0);
        let p = m.project_point3(foot);
        assert!((p - (foot + Vec3::Y * SHADOW_LIFT)).length() < EPS);
    }

    #[test]
    fn stage_layout_batches() {
        let layout = StageLayout::build(&LayoutConfig::default());
        let batches = FrameBatches::collect(&layout.scene);
        assert_eq!(batches.boxes.len(), 1);
        assert_eq!(batches.planes.len(), 1);
        assert_eq!(batches.shadows.len(), 1);

        let cube = batches.boxes[0].model();
        let center = cube.transform_point3(Vec3::ZERO);
        assert!((center - Vec3::new(0.0, 0.5, 0.0)).length() < EPS);

        // Ground quad is rotated into the XZ plane and scaled to 20x20.
        let ground = batches.planes[0].model();
        let corner = ground.transform_point3(Vec3::new(0.5, 0.5, 0.0));
        assert!(corner.y.abs() < EPS);
        assert!((corner.x - 10.0).abs() < EPS);
        assert!((corner.z.abs() - 10.0).abs() < EPS);
    }

    #[test]
    fn released_geometry_is_not_drawn() {
        let mut layout = StageLayout::build(&LayoutConfig::default());
        for handle in &layout.geometries {
            layout.scene.dispose_geometry(*handle);
        }
        let batches = FrameBatches::collect(&layout.scene);
        assert_eq!(batches.len(), 0);
    }

    #[test]
    fn no_shadows_without_receiver() {
        let mut layout = StageLayout::build(&LayoutConfig::default());
        layout.scene.remove_object(layout.ground);
        let batches = FrameBatches::collect(&layout.scene);
        assert_eq!(batches.boxes.len(), 1);
        assert!(batches.shadows.is_empty());
    }
}
