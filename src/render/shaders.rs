//! WGSL sources. Bind group 0 carries per-frame data, group 1 per-draw data.

const COMMON_WGSL: &str = r#"
struct SpotLight {
    // xyz position, w intensity
    position: vec4<f32>,
    // xyz direction to target, w cos(cone angle)
    direction: vec4<f32>,
    // rgb linear color, w decay exponent
    color: vec4<f32>,
    // x cos(inner penumbra angle)
    params: vec4<f32>,
};

struct Frame {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    ambient: vec4<f32>,
    sky: vec4<f32>,
    ground: vec4<f32>,
    // x, y render target size in pixels
    viewport: vec4<f32>,
    spots: array<SpotLight, 2>,
};

struct Object {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    // rgb linear color, a opacity
    base_color: vec4<f32>,
    // rgb emissive radiance
    emissive: vec4<f32>,
    // x metalness, y roughness, z unlit flag, w point size
    surface: vec4<f32>,
};

@group(0) @binding(0) var<uniform> frame: Frame;
@group(1) @binding(0) var<uniform> node: Object;

const PI: f32 = 3.141592653589793;

fn rrt_odt_fit(v: vec3<f32>) -> vec3<f32> {
    let a = v * (v + 0.0245786) - 0.000090537;
    let b = v * (0.983729 * v + 0.4329510) + 0.238081;
    return a / b;
}

fn aces_filmic(color: vec3<f32>) -> vec3<f32> {
    let input_mat = mat3x3<f32>(
        vec3<f32>(0.59719, 0.07600, 0.02840),
        vec3<f32>(0.35458, 0.90834, 0.13383),
        vec3<f32>(0.04823, 0.01566, 0.83777),
    );
    let output_mat = mat3x3<f32>(
        vec3<f32>(1.60475, -0.10208, -0.00327),
        vec3<f32>(-0.53108, 1.10813, -0.07276),
        vec3<f32>(-0.07367, -0.00605, 1.07602),
    );
    var c = color / 0.6;
    c = input_mat * c;
    c = rrt_odt_fit(c);
    c = output_mat * c;
    return clamp(c, vec3<f32>(0.0), vec3<f32>(1.0));
}
"#;

const MESH_WGSL: &str = r#"
struct VertexIn {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

struct VertexOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) normal: vec3<f32>,
};

@vertex
fn vs_main(input: VertexIn) -> VertexOut {
    var out: VertexOut;
    let world = node.model * vec4<f32>(input.position, 1.0);
    out.world_pos = world.xyz;
    out.normal = (node.normal_matrix * vec4<f32>(input.normal, 0.0)).xyz;
    out.clip = frame.view_proj * world;
    return out;
}

fn environment(dir: vec3<f32>) -> vec3<f32> {
    let t = clamp(dir.y * 0.5 + 0.5, 0.0, 1.0);
    return mix(frame.ground.rgb, frame.sky.rgb, t);
}

fn env_brdf(f0: vec3<f32>, roughness: f32, n_dot_v: f32) -> vec3<f32> {
    let c0 = vec4<f32>(-1.0, -0.0275, -0.572, 0.022);
    let c1 = vec4<f32>(1.0, 0.0425, 1.04, -0.04);
    let r = roughness * c0 + c1;
    let a004 = min(r.x * r.x, exp2(-9.28 * n_dot_v)) * r.x + r.y;
    let ab = vec2<f32>(-1.04, 1.04) * a004 + r.zw;
    return f0 * ab.x + ab.y;
}

fn direct_brdf(
    n: vec3<f32>,
    v: vec3<f32>,
    l: vec3<f32>,
    diffuse: vec3<f32>,
    f0: vec3<f32>,
    roughness: f32,
) -> vec3<f32> {
    let h = normalize(l + v);
    let n_dot_l = clamp(dot(n, l), 0.0, 1.0);
    let n_dot_v = clamp(abs(dot(n, v)), 1e-4, 1.0);
    let n_dot_h = clamp(dot(n, h), 0.0, 1.0);
    let v_dot_h = clamp(dot(v, h), 0.0, 1.0);

    let alpha = roughness * roughness;
    let a2 = alpha * alpha;
    let denom = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    let d = a2 / (PI * denom * denom);
    let gv = n_dot_l * sqrt(a2 + (1.0 - a2) * n_dot_v * n_dot_v);
    let gl = n_dot_v * sqrt(a2 + (1.0 - a2) * n_dot_l * n_dot_l);
    let vis = 0.5 / max(gv + gl, 1e-6);
    let fresnel = f0 + (vec3<f32>(1.0) - f0) * pow(1.0 - v_dot_h, 5.0);

    return (diffuse / PI + d * vis * fresnel) * n_dot_l;
}

fn spot_radiance(index: u32, world_pos: vec3<f32>) -> vec4<f32> {
    let spot = frame.spots[index];
    let to_light = spot.position.xyz - world_pos;
    let dist = length(to_light);
    let l = to_light / max(dist, 1e-4);
    let angle_cos = dot(-l, spot.direction.xyz);
    let cone = smoothstep(spot.direction.w, spot.params.x, angle_cos);
    let falloff = 1.0 / max(pow(dist, spot.color.w), 0.01);
    return vec4<f32>(spot.color.rgb * spot.position.w * cone * falloff, 0.0);
}

@fragment
fn fs_main(input: VertexOut, @builtin(front_facing) front: bool) -> @location(0) vec4<f32> {
    let base = node.base_color;
    if (node.surface.z > 0.5) {
        return vec4<f32>(aces_filmic(base.rgb), base.a);
    }

    var n = normalize(input.normal);
    if (!front) {
        n = -n;
    }
    let v = normalize(frame.camera_pos.xyz - input.world_pos);
    let metalness = node.surface.x;
    let roughness = clamp(node.surface.y, 0.0525, 1.0);
    let diffuse = base.rgb * (1.0 - metalness);
    let f0 = mix(vec3<f32>(0.04), base.rgb, metalness);

    var color = vec3<f32>(0.0);
    for (var i = 0u; i < 2u; i = i + 1u) {
        let spot = frame.spots[i];
        let l = normalize(spot.position.xyz - input.world_pos);
        let radiance = spot_radiance(i, input.world_pos).rgb;
        color += radiance * direct_brdf(n, v, l, diffuse, f0, roughness);
    }

    let n_dot_v = clamp(abs(dot(n, v)), 1e-4, 1.0);
    color += (frame.ambient.rgb + environment(n)) * diffuse / PI;
    color += environment(reflect(-v, n)) * env_brdf(f0, roughness, n_dot_v);
    color += node.emissive.rgb;

    return vec4<f32>(aces_filmic(color), base.a);
}
"#;

const POINTS_WGSL: &str = r#"
struct PointIn {
    @location(0) position: vec3<f32>,
    @location(1) color: vec3<f32>,
};

struct PointOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) color: vec3<f32>,
};

@vertex
fn vs_points(@builtin(vertex_index) vid: u32, input: PointIn) -> PointOut {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-0.5, -0.5),
        vec2<f32>(0.5, -0.5),
        vec2<f32>(0.5, 0.5),
        vec2<f32>(-0.5, -0.5),
        vec2<f32>(0.5, 0.5),
        vec2<f32>(-0.5, 0.5),
    );
    var out: PointOut;
    var clip = frame.view_proj * node.model * vec4<f32>(input.position, 1.0);
    // Pixel size scales with half the target height over depth, like GL point sprites.
    let aspect = frame.viewport.y / max(frame.viewport.x, 1.0);
    let corner = corners[vid];
    clip = vec4<f32>(clip.xy + corner * node.surface.w * vec2<f32>(aspect, 1.0), clip.zw);
    out.clip = clip;
    out.color = input.color;
    return out;
}

@fragment
fn fs_points(input: PointOut) -> @location(0) vec4<f32> {
    let color = node.base_color.rgb * input.color;
    return vec4<f32>(aces_filmic(color), node.base_color.a);
}
"#;

pub const BLIT_WGSL: &str = r#"
struct BlitOut {
    @builtin(position) clip: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@group(0) @binding(0) var scene_texture: texture_2d<f32>;
@group(0) @binding(1) var scene_sampler: sampler;

@vertex
fn vs_blit(@builtin(vertex_index) vid: u32) -> BlitOut {
    var positions = array<vec2<f32>, 3>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(3.0, -1.0),
        vec2<f32>(-1.0, 3.0),
    );
    let pos = positions[vid];
    var out: BlitOut;
    out.clip = vec4<f32>(pos, 0.0, 1.0);
    out.uv = vec2<f32>(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    return out;
}

@fragment
fn fs_blit(input: BlitOut) -> @location(0) vec4<f32> {
    return textureSample(scene_texture, scene_sampler, input.uv);
}

fn encode_srgb(c: vec3<f32>) -> vec3<f32> {
    let low = c * 12.92;
    let high = 1.055 * pow(c, vec3<f32>(1.0 / 2.4)) - 0.055;
    return select(high, low, c <= vec3<f32>(0.0031308));
}

// For non-sRGB swap chains the hardware does not encode on write.
@fragment
fn fs_blit_encode(input: BlitOut) -> @location(0) vec4<f32> {
    let color = textureSample(scene_texture, scene_sampler, input.uv);
    return vec4<f32>(encode_srgb(color.rgb), color.a);
}
"#;

pub fn mesh_source() -> String {
    format!("{COMMON_WGSL}{MESH_WGSL}")
}

pub fn points_source() -> String {
    format!("{COMMON_WGSL}{POINTS_WGSL}")
}
