//! OpenGL backend for [`Device`], built on [glow].
//!
//! [`GlDevice`] owns a `glow::Context` and translates the typed handles of
//! the device trait into glow's non-zero native handles. A handle of zero on
//! our side maps to "no object" on the GL side, so deleting or binding the
//! sentinel is a no-op exactly like binding object 0 in GL.
//!
//! # Safety
//!
//! The wrapped context must be current on the calling thread for the whole
//! lifetime of the device, and must not be made current on any other thread.
//! The renderer is single-threaded by design, so no synchronization is done
//! here.
//!
//! [glow]: https://docs.rs/glow

use std::num::NonZeroU32;

use cgmath::{Matrix4, Vector3};
use glow::HasContext;

use super::{BufferId, CubeFace, Device, ProgramId, ShaderId, ShaderStage, TextureId, VertexArrayId};

/// A [`Device`] issuing real OpenGL calls.
pub struct GlDevice {
    gl: glow::Context,
}

impl GlDevice {
    /// Wrap a glow context. The context must already be current on this
    /// thread (see the module docs).
    pub fn new(gl: glow::Context) -> Self {
        Self { gl }
    }

    /// Access the underlying context, e.g. for host-application GL calls
    /// outside the renderer.
    pub fn context(&self) -> &glow::Context {
        &self.gl
    }

    fn shader(id: ShaderId) -> Option<glow::NativeShader> {
        NonZeroU32::new(id.raw()).map(glow::NativeShader)
    }

    fn program(id: ProgramId) -> Option<glow::NativeProgram> {
        NonZeroU32::new(id.raw()).map(glow::NativeProgram)
    }

    fn buffer(id: BufferId) -> Option<glow::NativeBuffer> {
        NonZeroU32::new(id.raw()).map(glow::NativeBuffer)
    }

    fn vertex_array(id: VertexArrayId) -> Option<glow::NativeVertexArray> {
        NonZeroU32::new(id.raw()).map(glow::NativeVertexArray)
    }

    fn texture(id: TextureId) -> Option<glow::NativeTexture> {
        NonZeroU32::new(id.raw()).map(glow::NativeTexture)
    }

    fn location(&self, program: ProgramId, name: &str) -> Option<glow::NativeUniformLocation> {
        let program = Self::program(program)?;
        unsafe { self.gl.get_uniform_location(program, name) }
    }
}

impl Device for GlDevice {
    fn enable_depth_test(&self) {
        unsafe {
            self.gl.enable(glow::DEPTH_TEST);
            self.gl.depth_func(glow::LESS);
        }
    }

    fn enable_backface_culling(&self) {
        unsafe {
            self.gl.enable(glow::CULL_FACE);
            self.gl.cull_face(glow::BACK);
        }
    }

    fn clear_frame(&self, r: f32, g: f32, b: f32, a: f32) {
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    fn create_shader(&self, stage: ShaderStage) -> ShaderId {
        let kind = match stage {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Fragment => glow::FRAGMENT_SHADER,
        };
        match unsafe { self.gl.create_shader(kind) } {
            Ok(shader) => ShaderId::from_raw(shader.0.get()),
            Err(err) => {
                log::error!("could not allocate {stage:?} shader object: {err}");
                ShaderId::NONE
            }
        }
    }

    fn shader_source(&self, shader: ShaderId, source: &str) {
        if let Some(shader) = Self::shader(shader) {
            unsafe { self.gl.shader_source(shader, source) }
        }
    }

    fn compile_shader(&self, shader: ShaderId) {
        if let Some(shader) = Self::shader(shader) {
            unsafe { self.gl.compile_shader(shader) }
        }
    }

    fn shader_compiled(&self, shader: ShaderId) -> bool {
        match Self::shader(shader) {
            Some(shader) => unsafe { self.gl.get_shader_compile_status(shader) },
            None => false,
        }
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        match Self::shader(shader) {
            Some(shader) => unsafe { self.gl.get_shader_info_log(shader) },
            None => String::new(),
        }
    }

    fn delete_shader(&self, shader: ShaderId) {
        if let Some(shader) = Self::shader(shader) {
            unsafe { self.gl.delete_shader(shader) }
        }
    }

    fn create_program(&self) -> ProgramId {
        match unsafe { self.gl.create_program() } {
            Ok(program) => ProgramId::from_raw(program.0.get()),
            Err(err) => {
                log::error!("could not allocate program object: {err}");
                ProgramId::NONE
            }
        }
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        if let (Some(program), Some(shader)) = (Self::program(program), Self::shader(shader)) {
            unsafe { self.gl.attach_shader(program, shader) }
        }
    }

    fn detach_shader(&self, program: ProgramId, shader: ShaderId) {
        if let (Some(program), Some(shader)) = (Self::program(program), Self::shader(shader)) {
            unsafe { self.gl.detach_shader(program, shader) }
        }
    }

    fn link_program(&self, program: ProgramId) {
        if let Some(program) = Self::program(program) {
            unsafe { self.gl.link_program(program) }
        }
    }

    fn program_linked(&self, program: ProgramId) -> bool {
        match Self::program(program) {
            Some(program) => unsafe { self.gl.get_program_link_status(program) },
            None => false,
        }
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        match Self::program(program) {
            Some(program) => unsafe { self.gl.get_program_info_log(program) },
            None => String::new(),
        }
    }

    fn delete_program(&self, program: ProgramId) {
        if let Some(program) = Self::program(program) {
            unsafe { self.gl.delete_program(program) }
        }
    }

    fn use_program(&self, program: ProgramId) {
        unsafe { self.gl.use_program(Self::program(program)) }
    }

    fn set_uniform_mat4(&self, program: ProgramId, name: &str, value: &Matrix4<f32>) {
        if let Some(location) = self.location(program, name) {
            let values: &[f32; 16] = value.as_ref();
            unsafe {
                self.gl
                    .uniform_matrix_4_f32_slice(Some(&location), false, values)
            }
        }
    }

    fn set_uniform_vec3(&self, program: ProgramId, name: &str, value: Vector3<f32>) {
        if let Some(location) = self.location(program, name) {
            unsafe {
                self.gl
                    .uniform_3_f32(Some(&location), value.x, value.y, value.z)
            }
        }
    }

    fn create_vertex_array(&self) -> VertexArrayId {
        match unsafe { self.gl.create_vertex_array() } {
            Ok(vao) => VertexArrayId::from_raw(vao.0.get()),
            Err(err) => {
                log::error!("could not allocate vertex array object: {err}");
                VertexArrayId::NONE
            }
        }
    }

    fn bind_vertex_array(&self, vao: VertexArrayId) {
        unsafe { self.gl.bind_vertex_array(Self::vertex_array(vao)) }
    }

    fn create_buffer(&self) -> BufferId {
        match unsafe { self.gl.create_buffer() } {
            Ok(buffer) => BufferId::from_raw(buffer.0.get()),
            Err(err) => {
                log::error!("could not allocate buffer object: {err}");
                BufferId::NONE
            }
        }
    }

    fn bind_array_buffer(&self, buffer: BufferId) {
        unsafe { self.gl.bind_buffer(glow::ARRAY_BUFFER, Self::buffer(buffer)) }
    }

    fn array_buffer_data(&self, data: &[f32]) {
        unsafe {
            self.gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(data),
                glow::STATIC_DRAW,
            )
        }
    }

    fn vertex_attrib(&self, index: u32, components: i32) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, components, glow::FLOAT, false, 0, 0);
            self.gl.enable_vertex_attrib_array(index);
        }
    }

    fn bind_element_buffer(&self, buffer: BufferId) {
        unsafe {
            self.gl
                .bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Self::buffer(buffer))
        }
    }

    fn element_buffer_data(&self, data: &[u32]) {
        unsafe {
            self.gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(data),
                glow::STATIC_DRAW,
            )
        }
    }

    fn delete_buffer(&self, buffer: BufferId) {
        if let Some(buffer) = Self::buffer(buffer) {
            unsafe { self.gl.delete_buffer(buffer) }
        }
    }

    fn delete_vertex_array(&self, vao: VertexArrayId) {
        if let Some(vao) = Self::vertex_array(vao) {
            unsafe { self.gl.delete_vertex_array(vao) }
        }
    }

    fn create_texture(&self) -> TextureId {
        match unsafe { self.gl.create_texture() } {
            Ok(texture) => TextureId::from_raw(texture.0.get()),
            Err(err) => {
                log::error!("could not allocate texture object: {err}");
                TextureId::NONE
            }
        }
    }

    fn bind_texture_2d(&self, texture: TextureId) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0);
            self.gl.bind_texture(glow::TEXTURE_2D, Self::texture(texture));
        }
    }

    fn bind_cube_map(&self, texture: TextureId) {
        unsafe {
            self.gl.active_texture(glow::TEXTURE0);
            self.gl
                .bind_texture(glow::TEXTURE_CUBE_MAP, Self::texture(texture));
        }
    }

    fn upload_texture_2d(&self, width: u32, height: u32, pixels: &[u8]) {
        unsafe {
            self.gl.tex_image_2d(
                glow::TEXTURE_2D,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(pixels)),
            );
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, glow::REPEAT as i32);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, glow::REPEAT as i32);
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR_MIPMAP_LINEAR as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            self.gl.generate_mipmap(glow::TEXTURE_2D);
        }
    }

    fn upload_cube_map_face(&self, face: CubeFace, width: u32, height: u32, pixels: &[u8]) {
        unsafe {
            self.gl.tex_image_2d(
                glow::TEXTURE_CUBE_MAP_POSITIVE_X + face,
                0,
                glow::RGBA as i32,
                width as i32,
                height as i32,
                0,
                glow::RGBA,
                glow::UNSIGNED_BYTE,
                glow::PixelUnpackData::Slice(Some(pixels)),
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_CUBE_MAP,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_CUBE_MAP,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_CUBE_MAP,
                glow::TEXTURE_WRAP_S,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_CUBE_MAP,
                glow::TEXTURE_WRAP_T,
                glow::CLAMP_TO_EDGE as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_CUBE_MAP,
                glow::TEXTURE_WRAP_R,
                glow::CLAMP_TO_EDGE as i32,
            );
        }
    }

    fn delete_texture(&self, texture: TextureId) {
        if let Some(texture) = Self::texture(texture) {
            unsafe { self.gl.delete_texture(texture) }
        }
    }

    fn draw_indexed_triangles(&self, index_count: i32) {
        unsafe {
            self.gl
                .draw_elements(glow::TRIANGLES, index_count, glow::UNSIGNED_INT, 0)
        }
    }

    fn draw_triangles(&self, vertex_count: i32) {
        unsafe { self.gl.draw_arrays(glow::TRIANGLES, 0, vertex_count) }
    }
}
