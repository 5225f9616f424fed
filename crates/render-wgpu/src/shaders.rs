/// WGSL shader for lit scene meshes and their projected ground shadows.
///
/// `vs_main` is shared. `fs_main` shades with ambient + Lambert diffuse +
/// a Blinn-Phong highlight scaled by (1 - roughness). `fs_shadow` writes the
/// flat shadow color for geometry already flattened onto the ground.
pub const SCENE_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    eye: vec4<f32>,
    light_dir: vec4<f32>,
    light_color: vec4<f32>,
    ambient: vec4<f32>,
    shadow_color: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct InstanceInput {
    @location(2) model_0: vec4<f32>,
    @location(3) model_1: vec4<f32>,
    @location(4) model_2: vec4<f32>,
    @location(5) model_3: vec4<f32>,
    @location(6) color: vec4<f32>,
    @location(7) material: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_normal: vec3<f32>,
    @location(1) world_pos: vec3<f32>,
    @location(2) color: vec4<f32>,
    @location(3) roughness: f32,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let world_pos = model * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * world_pos;
    out.world_normal = (model * vec4<f32>(vertex.normal, 0.0)).xyz;
    out.world_pos = world_pos.xyz / world_pos.w;
    out.color = instance.color;
    out.roughness = instance.material.x;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let n = normalize(in.world_normal);
    let l = normalize(uniforms.light_dir.xyz);
    let v = normalize(uniforms.eye.xyz - in.world_pos);
    let h = normalize(l + v);

    let diffuse = max(dot(n, l), 0.0);
    let specular = pow(max(dot(n, h), 0.0), 32.0) * (1.0 - in.roughness);
    let lit = in.color.rgb * (uniforms.ambient.rgb + uniforms.light_color.rgb * diffuse)
        + uniforms.light_color.rgb * specular * 0.5;
    return vec4<f32>(lit, in.color.a);
}

@fragment
fn fs_shadow(in: VertexOutput) -> @location(0) vec4<f32> {
    return uniforms.shadow_color;
}
"#;
