//! GL-style device abstraction and typed GPU resource handles.
//!
//! Everything the renderer asks of the GPU goes through the [`Device`] trait:
//! shader compilation and linking, buffer/texture uploads, uniform updates and
//! draw calls. Two implementations are provided:
//!
//! - [`gl::GlDevice`] issues real OpenGL calls through a `glow::Context`
//! - [`trace::TraceDevice`] is headless and records every call in order,
//!   which is how the rendering and teardown invariants are tested
//!
//! Handles are plain integers with single-owner semantics. Zero is the
//! invalid sentinel everywhere, mirroring the underlying API: a failed
//! allocation or compilation yields the sentinel rather than an error, and
//! callers must check [`is_valid`](BufferId::is_valid) before relying on a
//! handle. Release is always explicit (`delete_*`) because GPU handles need a
//! live context; none of the handle types free anything on `Drop`.

use cgmath::{Matrix4, Vector3};

pub mod gl;
pub mod trace;

macro_rules! handle_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(u32);

        impl $name {
            /// The invalid sentinel (zero).
            pub const NONE: $name = $name(0);

            pub fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            pub fn raw(self) -> u32 {
                self.0
            }

            pub fn is_valid(self) -> bool {
                self.0 != 0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::NONE
            }
        }
    };
}

handle_type!(
    /// A vertex or element buffer object.
    BufferId
);
handle_type!(
    /// A vertex array object.
    VertexArrayId
);
handle_type!(
    /// A 2D or cube-map texture object.
    TextureId
);
handle_type!(
    /// A compiled shader stage.
    ShaderId
);
handle_type!(
    /// A linked shader program.
    ProgramId
);

/// The two shader stages a program is linked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// A face of a cube-map texture, in upload order +X, -X, +Y, -Y, +Z, -Z.
pub type CubeFace = u32;

/// GL-shaped GPU operations used by the renderer and the loaders.
///
/// Methods take `&self`: implementations either wrap an API that is already
/// interior-mutable (a GL context) or track state behind a `RefCell`. All
/// calls must happen on the single thread owning the context.
///
/// Stateful binding follows the underlying API: `array_buffer_data`,
/// `element_buffer_data`, `vertex_attrib` and the texture uploads operate on
/// whatever was bound last.
pub trait Device {
    // Fixed GPU state, set once at renderer construction.
    fn enable_depth_test(&self);
    fn enable_backface_culling(&self);

    /// Clear colour and depth for a new frame.
    fn clear_frame(&self, r: f32, g: f32, b: f32, a: f32);

    // Shader stages.
    fn create_shader(&self, stage: ShaderStage) -> ShaderId;
    fn shader_source(&self, shader: ShaderId, source: &str);
    fn compile_shader(&self, shader: ShaderId);
    fn shader_compiled(&self, shader: ShaderId) -> bool;
    fn shader_info_log(&self, shader: ShaderId) -> String;
    fn delete_shader(&self, shader: ShaderId);

    // Programs.
    fn create_program(&self) -> ProgramId;
    fn attach_shader(&self, program: ProgramId, shader: ShaderId);
    fn detach_shader(&self, program: ProgramId, shader: ShaderId);
    fn link_program(&self, program: ProgramId);
    fn program_linked(&self, program: ProgramId) -> bool;
    fn program_info_log(&self, program: ProgramId) -> String;
    fn delete_program(&self, program: ProgramId);
    /// Bind a program for subsequent draws; [`ProgramId::NONE`] unbinds.
    fn use_program(&self, program: ProgramId);

    // Uniforms, resolved by name on every call. A name the program does not
    // declare is silently ignored, as GL does for location -1.
    fn set_uniform_mat4(&self, program: ProgramId, name: &str, value: &Matrix4<f32>);
    fn set_uniform_vec3(&self, program: ProgramId, name: &str, value: Vector3<f32>);

    // Vertex arrays and buffers.
    fn create_vertex_array(&self) -> VertexArrayId;
    fn bind_vertex_array(&self, vao: VertexArrayId);
    fn create_buffer(&self) -> BufferId;
    fn bind_array_buffer(&self, buffer: BufferId);
    fn array_buffer_data(&self, data: &[f32]);
    /// Point attribute `index` at the bound array buffer and enable it.
    fn vertex_attrib(&self, index: u32, components: i32);
    fn bind_element_buffer(&self, buffer: BufferId);
    fn element_buffer_data(&self, data: &[u32]);
    fn delete_buffer(&self, buffer: BufferId);
    fn delete_vertex_array(&self, vao: VertexArrayId);

    // Textures. Uploads target the bound texture of the matching kind and
    // expect tightly packed RGBA8 pixels.
    fn create_texture(&self) -> TextureId;
    fn bind_texture_2d(&self, texture: TextureId);
    fn bind_cube_map(&self, texture: TextureId);
    fn upload_texture_2d(&self, width: u32, height: u32, pixels: &[u8]);
    fn upload_cube_map_face(&self, face: CubeFace, width: u32, height: u32, pixels: &[u8]);
    fn delete_texture(&self, texture: TextureId);

    // Draws.
    fn draw_indexed_triangles(&self, index_count: i32);
    fn draw_triangles(&self, vertex_count: i32);
}
