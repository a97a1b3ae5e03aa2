//! Headless capturing backend for [`Device`].
//!
//! [`TraceDevice`] allocates monotonically increasing fake handles and records
//! every call in invocation order, so frame composition, pass ordering and
//! teardown accounting can be asserted without a GPU context. Compile and link
//! failures can be injected to exercise the fail-soft error paths.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use cgmath::{Matrix4, Vector3};

use super::{BufferId, CubeFace, Device, ProgramId, ShaderId, ShaderStage, TextureId, VertexArrayId};

/// One recorded device call. Queries (compile status, info logs) are not
/// recorded since they mutate nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    EnableDepthTest,
    EnableBackfaceCulling,
    ClearFrame { r: f32, g: f32, b: f32, a: f32 },
    CreateShader { stage: ShaderStage, shader: u32 },
    ShaderSource { shader: u32 },
    CompileShader { shader: u32 },
    DeleteShader { shader: u32 },
    CreateProgram { program: u32 },
    AttachShader { program: u32, shader: u32 },
    DetachShader { program: u32, shader: u32 },
    LinkProgram { program: u32 },
    DeleteProgram { program: u32 },
    UseProgram { program: u32 },
    UniformMat4 { program: u32, name: String, value: [[f32; 4]; 4] },
    UniformVec3 { program: u32, name: String, value: [f32; 3] },
    CreateVertexArray { vao: u32 },
    BindVertexArray { vao: u32 },
    CreateBuffer { buffer: u32 },
    BindArrayBuffer { buffer: u32 },
    ArrayBufferData { floats: usize },
    VertexAttrib { index: u32, components: i32 },
    BindElementBuffer { buffer: u32 },
    ElementBufferData { indices: usize },
    DeleteBuffer { buffer: u32 },
    DeleteVertexArray { vao: u32 },
    CreateTexture { texture: u32 },
    BindTexture2d { texture: u32 },
    BindCubeMap { texture: u32 },
    UploadTexture2d { width: u32, height: u32 },
    UploadCubeMapFace { face: CubeFace, width: u32, height: u32 },
    DeleteTexture { texture: u32 },
    DrawIndexedTriangles { index_count: i32 },
    DrawTriangles { vertex_count: i32 },
}

#[derive(Default)]
struct TraceState {
    next_handle: u32,
    calls: Vec<Call>,
    // injected failures
    fail_compile_markers: Vec<String>,
    fail_link: bool,
    // shader bookkeeping for status queries
    sources: HashMap<u32, String>,
    compiled: HashMap<u32, bool>,
    linked: HashMap<u32, bool>,
    // live handle sets per resource kind
    buffers: HashSet<u32>,
    vertex_arrays: HashSet<u32>,
    shaders: HashSet<u32>,
    programs: HashSet<u32>,
    textures: HashSet<u32>,
}

impl TraceState {
    fn alloc(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// A [`Device`] that records calls instead of talking to a driver.
#[derive(Default)]
pub struct TraceDevice {
    state: RefCell<TraceState>,
}

impl TraceDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every shader whose source contains `marker` fail to compile.
    pub fn fail_compiles_containing(&self, marker: &str) {
        self.state
            .borrow_mut()
            .fail_compile_markers
            .push(marker.to_string());
    }

    /// Make every subsequent program link fail.
    pub fn fail_linking(&self) {
        self.state.borrow_mut().fail_link = true;
    }

    /// Snapshot of all recorded calls, in invocation order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    /// Drop the recorded calls, e.g. to isolate one frame.
    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    /// Count of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| predicate(c)).count()
    }

    pub fn live_buffers(&self) -> usize {
        self.state.borrow().buffers.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.state.borrow().vertex_arrays.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.state.borrow().shaders.len()
    }

    pub fn live_programs(&self) -> usize {
        self.state.borrow().programs.len()
    }

    pub fn live_textures(&self) -> usize {
        self.state.borrow().textures.len()
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }
}

impl Device for TraceDevice {
    fn enable_depth_test(&self) {
        self.record(Call::EnableDepthTest);
    }

    fn enable_backface_culling(&self) {
        self.record(Call::EnableBackfaceCulling);
    }

    fn clear_frame(&self, r: f32, g: f32, b: f32, a: f32) {
        self.record(Call::ClearFrame { r, g, b, a });
    }

    fn create_shader(&self, stage: ShaderStage) -> ShaderId {
        let mut state = self.state.borrow_mut();
        let shader = state.alloc();
        state.shaders.insert(shader);
        state.calls.push(Call::CreateShader { stage, shader });
        ShaderId::from_raw(shader)
    }

    fn shader_source(&self, shader: ShaderId, source: &str) {
        let mut state = self.state.borrow_mut();
        state.sources.insert(shader.raw(), source.to_string());
        state.calls.push(Call::ShaderSource { shader: shader.raw() });
    }

    fn compile_shader(&self, shader: ShaderId) {
        let mut state = self.state.borrow_mut();
        let source = state.sources.get(&shader.raw()).cloned().unwrap_or_default();
        let rejected = state
            .fail_compile_markers
            .iter()
            .any(|marker| source.contains(marker));
        state.compiled.insert(shader.raw(), !rejected);
        state.calls.push(Call::CompileShader { shader: shader.raw() });
    }

    fn shader_compiled(&self, shader: ShaderId) -> bool {
        self.state
            .borrow()
            .compiled
            .get(&shader.raw())
            .copied()
            .unwrap_or(false)
    }

    fn shader_info_log(&self, shader: ShaderId) -> String {
        if self.shader_compiled(shader) {
            String::new()
        } else {
            format!("0:1(1): error: simulated compiler rejection of shader {}", shader.raw())
        }
    }

    fn delete_shader(&self, shader: ShaderId) {
        let mut state = self.state.borrow_mut();
        state.shaders.remove(&shader.raw());
        state.calls.push(Call::DeleteShader { shader: shader.raw() });
    }

    fn create_program(&self) -> ProgramId {
        let mut state = self.state.borrow_mut();
        let program = state.alloc();
        state.programs.insert(program);
        state.calls.push(Call::CreateProgram { program });
        ProgramId::from_raw(program)
    }

    fn attach_shader(&self, program: ProgramId, shader: ShaderId) {
        self.record(Call::AttachShader {
            program: program.raw(),
            shader: shader.raw(),
        });
    }

    fn detach_shader(&self, program: ProgramId, shader: ShaderId) {
        self.record(Call::DetachShader {
            program: program.raw(),
            shader: shader.raw(),
        });
    }

    fn link_program(&self, program: ProgramId) {
        let mut state = self.state.borrow_mut();
        let linked = !state.fail_link;
        state.linked.insert(program.raw(), linked);
        state.calls.push(Call::LinkProgram { program: program.raw() });
    }

    fn program_linked(&self, program: ProgramId) -> bool {
        self.state
            .borrow()
            .linked
            .get(&program.raw())
            .copied()
            .unwrap_or(false)
    }

    fn program_info_log(&self, program: ProgramId) -> String {
        if self.program_linked(program) {
            String::new()
        } else {
            format!("error: simulated link failure of program {}", program.raw())
        }
    }

    fn delete_program(&self, program: ProgramId) {
        let mut state = self.state.borrow_mut();
        state.programs.remove(&program.raw());
        state.calls.push(Call::DeleteProgram { program: program.raw() });
    }

    fn use_program(&self, program: ProgramId) {
        self.record(Call::UseProgram { program: program.raw() });
    }

    fn set_uniform_mat4(&self, program: ProgramId, name: &str, value: &Matrix4<f32>) {
        self.record(Call::UniformMat4 {
            program: program.raw(),
            name: name.to_string(),
            value: (*value).into(),
        });
    }

    fn set_uniform_vec3(&self, program: ProgramId, name: &str, value: Vector3<f32>) {
        self.record(Call::UniformVec3 {
            program: program.raw(),
            name: name.to_string(),
            value: value.into(),
        });
    }

    fn create_vertex_array(&self) -> VertexArrayId {
        let mut state = self.state.borrow_mut();
        let vao = state.alloc();
        state.vertex_arrays.insert(vao);
        state.calls.push(Call::CreateVertexArray { vao });
        VertexArrayId::from_raw(vao)
    }

    fn bind_vertex_array(&self, vao: VertexArrayId) {
        self.record(Call::BindVertexArray { vao: vao.raw() });
    }

    fn create_buffer(&self) -> BufferId {
        let mut state = self.state.borrow_mut();
        let buffer = state.alloc();
        state.buffers.insert(buffer);
        state.calls.push(Call::CreateBuffer { buffer });
        BufferId::from_raw(buffer)
    }

    fn bind_array_buffer(&self, buffer: BufferId) {
        self.record(Call::BindArrayBuffer { buffer: buffer.raw() });
    }

    fn array_buffer_data(&self, data: &[f32]) {
        self.record(Call::ArrayBufferData { floats: data.len() });
    }

    fn vertex_attrib(&self, index: u32, components: i32) {
        self.record(Call::VertexAttrib { index, components });
    }

    fn bind_element_buffer(&self, buffer: BufferId) {
        self.record(Call::BindElementBuffer { buffer: buffer.raw() });
    }

    fn element_buffer_data(&self, data: &[u32]) {
        self.record(Call::ElementBufferData { indices: data.len() });
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let mut state = self.state.borrow_mut();
        state.buffers.remove(&buffer.raw());
        state.calls.push(Call::DeleteBuffer { buffer: buffer.raw() });
    }

    fn delete_vertex_array(&self, vao: VertexArrayId) {
        let mut state = self.state.borrow_mut();
        state.vertex_arrays.remove(&vao.raw());
        state.calls.push(Call::DeleteVertexArray { vao: vao.raw() });
    }

    fn create_texture(&self) -> TextureId {
        let mut state = self.state.borrow_mut();
        let texture = state.alloc();
        state.textures.insert(texture);
        state.calls.push(Call::CreateTexture { texture });
        TextureId::from_raw(texture)
    }

    fn bind_texture_2d(&self, texture: TextureId) {
        self.record(Call::BindTexture2d { texture: texture.raw() });
    }

    fn bind_cube_map(&self, texture: TextureId) {
        self.record(Call::BindCubeMap { texture: texture.raw() });
    }

    fn upload_texture_2d(&self, width: u32, height: u32, _pixels: &[u8]) {
        self.record(Call::UploadTexture2d { width, height });
    }

    fn upload_cube_map_face(&self, face: CubeFace, width: u32, height: u32, _pixels: &[u8]) {
        self.record(Call::UploadCubeMapFace { face, width, height });
    }

    fn delete_texture(&self, texture: TextureId) {
        let mut state = self.state.borrow_mut();
        state.textures.remove(&texture.raw());
        state.calls.push(Call::DeleteTexture { texture: texture.raw() });
    }

    fn draw_indexed_triangles(&self, index_count: i32) {
        self.record(Call::DrawIndexedTriangles { index_count });
    }

    fn draw_triangles(&self, vertex_count: i32) {
        self.record(Call::DrawTriangles { vertex_count });
    }
}
