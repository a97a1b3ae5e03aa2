//! Frame composition and shader program lifecycle.
//!
//! The [`Renderer`] owns the three shader programs (entity/terrain/skybox),
//! the projection matrix, the entity collection, the terrain singleton and
//! the skybox resources. Every frame it pushes the shared camera, projection
//! and light uniforms, then issues draw commands in a fixed pass order:
//!
//! 1. entities, 2. terrain, 3. skybox
//!
//! The order is a correctness requirement, not a style choice: the skybox
//! must render after the opaque geometry to be occluded by it, and uniform
//! locations are resolved per program so the program-binding order has to
//! match the pass order.
//!
//! Entities draw in insertion order, unsorted and undeduplicated by
//! texture or mesh. That is the documented baseline behavior; sorting and
//! batching are a future optimization, not something to slip in silently.

use cgmath::{perspective, Deg, Matrix4, Vector3};

use crate::camera::Camera;
use crate::device::{BufferId, Device, ProgramId, TextureId, VertexArrayId};
use crate::drawable::{self, Drawable};
use crate::resources::texture::TextureImage;
use crate::shader::{ProgramSet, ShaderSources};

/// Fixed vertical field of view.
pub const FIELD_OF_VIEW: Deg<f32> = Deg(70.0);
const NEAR_PLANE: f32 = 0.1;
const FAR_PLANE: f32 = 150.0;

/// Half-extent of the skybox cube. Must stay inside the far plane.
const SKYBOX_SIZE: f32 = 100.0;

/// Unit skybox cube, 36 vertices, wound to face inward.
#[rustfmt::skip]
const SKYBOX_VERTICES: [f32; 108] = [
    -1.0,  1.0, -1.0,  -1.0, -1.0, -1.0,   1.0, -1.0, -1.0,
     1.0, -1.0, -1.0,   1.0,  1.0, -1.0,  -1.0,  1.0, -1.0,

    -1.0, -1.0,  1.0,  -1.0, -1.0, -1.0,  -1.0,  1.0, -1.0,
    -1.0,  1.0, -1.0,  -1.0,  1.0,  1.0,  -1.0, -1.0,  1.0,

     1.0, -1.0, -1.0,   1.0, -1.0,  1.0,   1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,   1.0,  1.0, -1.0,   1.0, -1.0, -1.0,

    -1.0, -1.0,  1.0,  -1.0,  1.0,  1.0,   1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,   1.0, -1.0,  1.0,  -1.0, -1.0,  1.0,

    -1.0,  1.0, -1.0,   1.0,  1.0, -1.0,   1.0,  1.0,  1.0,
     1.0,  1.0,  1.0,  -1.0,  1.0,  1.0,  -1.0,  1.0, -1.0,

    -1.0, -1.0, -1.0,  -1.0, -1.0,  1.0,   1.0, -1.0, -1.0,
     1.0, -1.0, -1.0,  -1.0, -1.0,  1.0,   1.0, -1.0,  1.0,
];

const SKYBOX_VERTEX_COUNT: i32 = (SKYBOX_VERTICES.len() / 3) as i32;

/// Construction parameters for the [`Renderer`].
#[derive(Debug, Clone, Copy)]
pub struct RendererConfig {
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Whether [`Renderer::shutdown`] also releases the terrain and skybox
    /// resources. Off by default: callers may rebuild entities across a
    /// partial teardown and keep the environment alive, which is the
    /// behavior this renderer inherited. Turn it on when the renderer goes
    /// away for good.
    pub release_environment: bool,
}

impl RendererConfig {
    pub fn new(viewport_width: u32, viewport_height: u32) -> Self {
        Self {
            viewport_width,
            viewport_height,
            release_environment: false,
        }
    }
}

/// Owns all GPU-facing state of the scene and composes each frame.
///
/// Construction never fails: a shader category that does not compile or link
/// stores the zero program sentinel and its pass degenerates into harmless
/// no-ops at the GL level (binding program 0). The symptom is missing
/// geometry, not a crash.
pub struct Renderer {
    programs: ProgramSet,
    projection: Matrix4<f32>,
    entities: Vec<Drawable>,
    terrain: Option<Drawable>,
    skybox_vbo: BufferId,
    cube_map: TextureId,
    release_environment: bool,
}

impl Renderer {
    /// Set up fixed GPU state, build the three programs, bake the projection
    /// matrix and upload the skybox geometry and cube map.
    ///
    /// `skybox_faces` are expected in cube-map order +X, -X, +Y, -Y, +Z, -Z
    /// (right, left, top, bottom, back, front), as produced by
    /// [`crate::resources::texture::load_skybox_faces`].
    pub fn new<D: Device>(
        device: &D,
        config: RendererConfig,
        sources: &ShaderSources,
        skybox_faces: &[TextureImage; 6],
    ) -> Self {
        device.enable_depth_test();
        device.enable_backface_culling();

        let programs = ProgramSet::build(device, sources);

        let aspect = config.viewport_width as f32 / config.viewport_height as f32;
        let projection = perspective(FIELD_OF_VIEW, aspect, NEAR_PLANE, FAR_PLANE);

        let vertices = SKYBOX_VERTICES.map(|v| v * SKYBOX_SIZE);
        let skybox_vbo = drawable::store_attribute(device, 0, 3, &vertices);

        let cube_map = device.create_texture();
        device.bind_cube_map(cube_map);
        for (face, image) in skybox_faces.iter().enumerate() {
            device.upload_cube_map_face(face as u32, image.width, image.height, &image.pixels);
        }

        log::info!(
            "renderer up: entity program {}, terrain program {}, skybox program {}",
            programs.entity.id().raw(),
            programs.terrain.id().raw(),
            programs.skybox.id().raw()
        );

        Self {
            programs,
            projection,
            entities: Vec::new(),
            terrain: None,
            skybox_vbo,
            cube_map,
            release_environment: config.release_environment,
        }
    }

    /// Render one frame: entity pass, terrain pass, skybox pass, in that
    /// order (see the module docs for why the order is load-bearing).
    pub fn render<D: Device>(&self, device: &D, light: Vector3<f32>, camera: &Camera) {
        device.clear_frame(0.2, 0.4, 0.6, 1.0);

        // Entity pass.
        let entity_program = self.programs.entity.id();
        device.use_program(entity_program);
        self.load_shared_uniforms(device, entity_program, light, camera);
        for entity in &self.entities {
            draw_drawable(device, entity_program, entity);
        }

        // Terrain pass, same uniform routine on the terrain program.
        let terrain_program = self.programs.terrain.id();
        device.use_program(terrain_program);
        self.load_shared_uniforms(device, terrain_program, light, camera);
        if let Some(terrain) = &self.terrain {
            draw_drawable(device, terrain_program, terrain);
        }
        device.use_program(ProgramId::NONE);

        // Skybox pass. The view matrix is stripped of its translation so the
        // camera only ever rotates relative to the skybox; it never gets
        // closer to it.
        let skybox_program = self.programs.skybox.id();
        device.use_program(skybox_program);
        let mut sky_view = camera.view_matrix();
        sky_view.w.x = 0.0;
        sky_view.w.y = 0.0;
        sky_view.w.z = 0.0;
        device.set_uniform_mat4(skybox_program, "projMatrix", &self.projection);
        device.set_uniform_mat4(skybox_program, "viewMatrix", &sky_view);
        device.bind_cube_map(self.cube_map);
        // The skybox draws from its raw VBO, not through a vertex array.
        device.bind_array_buffer(self.skybox_vbo);
        device.vertex_attrib(0, 3);
        device.draw_triangles(SKYBOX_VERTEX_COUNT);
        device.bind_array_buffer(BufferId::NONE);
        device.use_program(ProgramId::NONE);
    }

    /// Run the per-frame update hook of every entity, in insertion order.
    /// Statuses are currently ignored.
    pub fn update(&mut self) {
        for entity in &mut self.entities {
            let _ = entity.update();
        }
    }

    /// Append an entity; the renderer owns it from here on. No sorting, no
    /// deduplication (documented baseline).
    pub fn add_entity(&mut self, entity: Drawable) {
        self.entities.push(entity);
    }

    /// Install or replace the terrain singleton.
    pub fn set_terrain(&mut self, terrain: Drawable) {
        self.terrain = Some(terrain);
    }

    pub fn terrain(&self) -> Option<&Drawable> {
        self.terrain.as_ref()
    }

    pub fn terrain_mut(&mut self) -> Option<&mut Drawable> {
        self.terrain.as_mut()
    }

    pub fn entities(&self) -> &[Drawable] {
        &self.entities
    }

    pub fn projection(&self) -> &Matrix4<f32> {
        &self.projection
    }

    /// Release all GPU handles this renderer tracks: per entity the three
    /// attribute buffers and the VAO, then the shader stages recorded at
    /// construction, then the three programs.
    ///
    /// Terrain and skybox resources are kept alive unless
    /// [`RendererConfig::release_environment`] was set (see there).
    pub fn shutdown<D: Device>(&mut self, device: &D) {
        for entity in &mut self.entities {
            entity.release(device);
        }
        self.entities.clear();

        if self.release_environment {
            if let Some(terrain) = &mut self.terrain {
                terrain.release(device);
            }
            self.terrain = None;
            if self.skybox_vbo.is_valid() {
                device.delete_buffer(self.skybox_vbo);
                self.skybox_vbo = BufferId::NONE;
            }
            if self.cube_map.is_valid() {
                device.delete_texture(self.cube_map);
                self.cube_map = TextureId::NONE;
            }
        }

        self.programs.release(device);
    }

    fn load_shared_uniforms<D: Device>(
        &self,
        device: &D,
        program: ProgramId,
        light: Vector3<f32>,
        camera: &Camera,
    ) {
        device.set_uniform_mat4(program, "projMatrix", &self.projection);
        device.set_uniform_mat4(program, "viewMatrix", &camera.view_matrix());
        device.set_uniform_vec3(program, "lightPosition", light);
    }
}

fn draw_drawable<D: Device>(device: &D, program: ProgramId, drawable: &Drawable) {
    device.set_uniform_mat4(program, "modelMatrix", drawable.model_matrix());
    device.bind_texture_2d(drawable.texture());
    device.bind_vertex_array(drawable.vao());
    device.draw_indexed_triangles(drawable.index_count());
    device.bind_vertex_array(VertexArrayId::NONE);
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, Matrix4, SquareMatrix, Vector3};

    use super::*;
    use crate::device::trace::{Call, TraceDevice};
    use crate::drawable::MeshData;
    use crate::shader::StageSources;

    fn sources() -> ShaderSources {
        let stage = |tag: &str| StageSources {
            vertex: format!("#version 330 core // {tag}\nvoid main() {{}}"),
            fragment: format!("#version 330 core // {tag}\nvoid main() {{}}"),
        };
        ShaderSources {
            entity: stage("entities"),
            terrain: stage("terrain"),
            skybox: stage("skybox"),
        }
    }

    fn faces() -> [TextureImage; 6] {
        std::array::from_fn(|_| TextureImage::solid(2, 2, [80, 120, 200, 255]))
    }

    fn cube_mesh() -> MeshData {
        // 8 corners, 12 triangles
        let corners = [
            [-1.0f32, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0],
            [-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0],
        ];
        MeshData {
            positions: corners.iter().flatten().copied().collect(),
            tex_coords: vec![0.0; 16],
            normals: corners.iter().flatten().copied().collect(),
            indices: vec![
                0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4, 0, 4, 7, 7, 3, 0,
                1, 5, 6, 6, 2, 1, 3, 2, 6, 6, 7, 3, 0, 1, 5, 5, 4, 0,
            ],
        }
    }

    fn make_entity(device: &TraceDevice) -> Drawable {
        let texture = device.create_texture();
        Drawable::upload(device, &cube_mesh(), Matrix4::identity(), texture)
    }

    fn camera() -> Camera {
        Camera::new((4.0, 2.0, 8.0), Deg(-90.0), Deg(-15.0))
    }

    #[test]
    fn construction_builds_three_programs_and_bakes_aspect_ratio() {
        let device = TraceDevice::new();
        let renderer = Renderer::new(&device, RendererConfig::new(1920, 1080), &sources(), &faces());

        assert!(renderer.programs.entity.is_valid());
        assert!(renderer.programs.terrain.is_valid());
        assert!(renderer.programs.skybox.is_valid());

        // for a perspective matrix, m00 = m11 / aspect
        let projection = renderer.projection();
        let aspect = projection.y.y / projection.x.x;
        assert!((aspect - 1920.0 / 1080.0).abs() < 1e-5);

        // fixed state and the six cube-map faces went to the device
        assert_eq!(device.count(|c| matches!(c, Call::EnableDepthTest)), 1);
        assert_eq!(device.count(|c| matches!(c, Call::EnableBackfaceCulling)), 1);
        assert_eq!(
            device.count(|c| matches!(c, Call::UploadCubeMapFace { .. })),
            6
        );
    }

    #[test]
    fn render_passes_keep_entity_terrain_skybox_order() {
        let device = TraceDevice::new();
        let mut renderer =
            Renderer::new(&device, RendererConfig::new(800, 600), &sources(), &faces());
        renderer.add_entity(make_entity(&device));
        renderer.add_entity(make_entity(&device));
        renderer.set_terrain(make_entity(&device));
        device.clear_calls();

        renderer.render(&device, Vector3::new(0.0, 50.0, 0.0), &camera());

        let calls = device.calls();
        let entity_program = renderer.programs.entity.id().raw();
        let terrain_program = renderer.programs.terrain.id().raw();
        let skybox_program = renderer.programs.skybox.id().raw();

        let program_binds: Vec<u32> = calls
            .iter()
            .filter_map(|c| match c {
                Call::UseProgram { program } => Some(*program),
                _ => None,
            })
            .collect();
        assert_eq!(
            program_binds,
            vec![entity_program, terrain_program, 0, skybox_program, 0]
        );

        // all indexed draws happen before the skybox's non-indexed draw
        let last_indexed = calls
            .iter()
            .rposition(|c| matches!(c, Call::DrawIndexedTriangles { .. }))
            .unwrap();
        let skybox_draw = calls
            .iter()
            .position(|c| matches!(c, Call::DrawTriangles { .. }))
            .unwrap();
        assert!(last_indexed < skybox_draw);

        // two entity draws, then the terrain draw
        let indexed: Vec<usize> = calls
            .iter()
            .enumerate()
            .filter_map(|(i, c)| matches!(c, Call::DrawIndexedTriangles { .. }).then_some(i))
            .collect();
        assert_eq!(indexed.len(), 3);
    }

    #[test]
    fn added_entity_draws_once_with_its_index_count() {
        let device = TraceDevice::new();
        let mut renderer =
            Renderer::new(&device, RendererConfig::new(640, 480), &sources(), &faces());
        renderer.set_terrain(make_entity(&device));
        renderer.add_entity(make_entity(&device));
        device.clear_calls();

        renderer.render(&device, Vector3::new(1.0, 1.0, 1.0), &camera());

        let draws: Vec<i32> = device
            .calls()
            .iter()
            .filter_map(|c| match c {
                Call::DrawIndexedTriangles { index_count } => Some(*index_count),
                _ => None,
            })
            .collect();
        // the cube draws with its 36 indices before the terrain draw
        assert_eq!(draws, vec![36, 36]);

        // adding another entity leaves the first draw untouched
        renderer.add_entity(make_entity(&device));
        device.clear_calls();
        renderer.render(&device, Vector3::new(1.0, 1.0, 1.0), &camera());
        assert_eq!(
            device.count(|c| matches!(c, Call::DrawIndexedTriangles { .. })),
            3
        );
    }

    #[test]
    fn skybox_view_matrix_is_translation_stripped() {
        let device = TraceDevice::new();
        let renderer =
            Renderer::new(&device, RendererConfig::new(1024, 768), &sources(), &faces());
        let camera = camera();
        device.clear_calls();

        renderer.render(&device, Vector3::new(0.0, 10.0, 0.0), &camera);

        let skybox_program = renderer.programs.skybox.id().raw();
        let view: [[f32; 4]; 4] = device
            .calls()
            .iter()
            .find_map(|c| match c {
                Call::UniformMat4 { program, name, value }
                    if *program == skybox_program && name == "viewMatrix" =>
                {
                    Some(*value)
                }
                _ => None,
            })
            .expect("skybox view matrix uniform");

        let full: [[f32; 4]; 4] = camera.view_matrix().into();
        // translation components exactly zeroed
        assert_eq!(view[3][0], 0.0);
        assert_eq!(view[3][1], 0.0);
        assert_eq!(view[3][2], 0.0);
        assert_eq!(view[3][3], full[3][3]);
        // rotation columns untouched
        for column in 0..3 {
            assert_eq!(view[column], full[column]);
        }
    }

    #[test]
    fn shutdown_releases_entities_stages_and_programs() {
        let device = TraceDevice::new();
        let mut renderer =
            Renderer::new(&device, RendererConfig::new(320, 240), &sources(), &faces());
        renderer.add_entity(make_entity(&device));
        renderer.add_entity(make_entity(&device));
        device.clear_calls();

        renderer.shutdown(&device);

        assert!(renderer.entities().is_empty());
        assert_eq!(device.count(|c| matches!(c, Call::DeleteBuffer { .. })), 6);
        assert_eq!(
            device.count(|c| matches!(c, Call::DeleteVertexArray { .. })),
            2
        );
        assert_eq!(device.count(|c| matches!(c, Call::DeleteShader { .. })), 6);
        assert_eq!(device.count(|c| matches!(c, Call::DeleteProgram { .. })), 3);
        // known gaps kept from the original: the two element buffers and the
        // skybox VBO survive teardown
        assert_eq!(device.live_buffers(), 3);
    }

    #[test]
    fn shutdown_with_release_environment_reclaims_terrain_and_skybox() {
        let device = TraceDevice::new();
        let mut config = RendererConfig::new(320, 240);
        config.release_environment = true;
        let mut renderer = Renderer::new(&device, config, &sources(), &faces());
        renderer.set_terrain(make_entity(&device));

        renderer.shutdown(&device);

        assert!(renderer.terrain().is_none());
        assert_eq!(device.live_buffers(), 1); // terrain element buffer stays in its VAO record
        assert_eq!(device.live_vertex_arrays(), 0);
        assert_eq!(device.live_programs(), 0);
        assert_eq!(
            device.count(|c| matches!(c, Call::DeleteTexture { .. })),
            1 // the cube map
        );
    }

    #[test]
    fn failed_program_stores_sentinel_and_render_still_runs() {
        let device = TraceDevice::new();
        device.fail_compiles_containing("// entities");
        let renderer =
            Renderer::new(&device, RendererConfig::new(800, 600), &sources(), &faces());

        assert!(!renderer.programs.entity.is_valid());
        assert!(renderer.programs.terrain.is_valid());

        device.clear_calls();
        renderer.render(&device, Vector3::new(0.0, 1.0, 0.0), &camera());
        // the entity pass binds program 0 and carries on
        assert!(device
            .calls()
            .contains(&Call::UseProgram { program: 0 }));
        assert_eq!(device.count(|c| matches!(c, Call::DrawTriangles { .. })), 1);
    }

    #[test]
    fn update_touches_no_device_state() {
        let device = TraceDevice::new();
        let mut renderer =
            Renderer::new(&device, RendererConfig::new(800, 600), &sources(), &faces());
        renderer.add_entity(make_entity(&device));
        device.clear_calls();

        renderer.update();
        assert!(device.calls().is_empty());
    }
}
