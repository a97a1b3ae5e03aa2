//! Shader stage compilation and program linking.
//!
//! Compile and link failures are not propagated as errors: the driver
//! diagnostic is written to the log, any partially created handle is
//! released, and the zero sentinel travels up the call chain instead. The
//! surrounding application has no recovery path for a broken shader, so a
//! crash would buy nothing; the user-visible symptom of a failed program is
//! missing geometry, not an abort ("fail soft, log loud").
//!
//! A successfully linked [`ShaderProgram`] keeps its two stage handles
//! attached to it logically but detached at the GL level: the stages stay
//! alive, owned by the program record, and are bulk-released together with
//! the program at renderer teardown.

use crate::device::{Device, ProgramId, ShaderId, ShaderStage};

/// The three program categories the renderer owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramKind {
    Entity,
    Terrain,
    Skybox,
}

/// Vertex + fragment source text for one program.
#[derive(Debug, Clone, Default)]
pub struct StageSources {
    pub vertex: String,
    pub fragment: String,
}

/// Source text for all three program categories, as produced by
/// [`crate::resources::load_shader_sources`].
#[derive(Debug, Clone, Default)]
pub struct ShaderSources {
    pub entity: StageSources,
    pub terrain: StageSources,
    pub skybox: StageSources,
}

/// Compile one shader stage.
///
/// On compiler failure the diagnostic is logged, the stage handle is deleted
/// and [`ShaderId::NONE`] is returned; callers must check for the sentinel.
pub fn compile_stage<D: Device>(device: &D, stage: ShaderStage, source: &str) -> ShaderId {
    let shader = device.create_shader(stage);
    if !shader.is_valid() {
        return ShaderId::NONE;
    }
    device.shader_source(shader, source);
    device.compile_shader(shader);
    if !device.shader_compiled(shader) {
        log::error!(
            "{stage:?} shader failed to compile: {}",
            device.shader_info_log(shader).trim()
        );
        device.delete_shader(shader);
        return ShaderId::NONE;
    }
    shader
}

/// A linked program together with the stage handles it was linked from.
///
/// Invariant: `program` is valid only if both stages compiled and the link
/// succeeded. On any failure all three handles are the zero sentinel and
/// nothing is left allocated on the device.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShaderProgram {
    program: ProgramId,
    vertex: ShaderId,
    fragment: ShaderId,
}

impl ShaderProgram {
    /// Compile both stages and link them.
    ///
    /// If either stage fails to compile, the valid one (if any) is released
    /// and no link is attempted. On link failure both stages and the program
    /// object are released. On success the stages are detached from the
    /// program but kept alive for bulk release at teardown.
    pub fn build<D: Device>(device: &D, vertex_source: &str, fragment_source: &str) -> Self {
        let vertex = compile_stage(device, ShaderStage::Vertex, vertex_source);
        let fragment = compile_stage(device, ShaderStage::Fragment, fragment_source);

        if !vertex.is_valid() || !fragment.is_valid() {
            if vertex.is_valid() {
                device.delete_shader(vertex);
            }
            if fragment.is_valid() {
                device.delete_shader(fragment);
            }
            return Self::default();
        }

        let program = device.create_program();
        device.attach_shader(program, vertex);
        device.attach_shader(program, fragment);
        device.link_program(program);

        if !device.program_linked(program) {
            log::error!(
                "shader program failed to link: {}",
                device.program_info_log(program).trim()
            );
            device.delete_shader(vertex);
            device.delete_shader(fragment);
            device.delete_program(program);
            return Self::default();
        }

        device.detach_shader(program, vertex);
        device.detach_shader(program, fragment);

        Self {
            program,
            vertex,
            fragment,
        }
    }

    pub fn id(&self) -> ProgramId {
        self.program
    }

    pub fn is_valid(&self) -> bool {
        self.program.is_valid()
    }

    /// The tracked stage handles, vertex first. Zero entries mean the build
    /// failed and there is nothing to release.
    pub fn stages(&self) -> [ShaderId; 2] {
        [self.vertex, self.fragment]
    }
}

/// The renderer's three programs, keyed by category.
///
/// Replaces positional index juggling with an explicit mapping from
/// [`ProgramKind`] to its program and stage handles.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProgramSet {
    pub entity: ShaderProgram,
    pub terrain: ShaderProgram,
    pub skybox: ShaderProgram,
}

impl ProgramSet {
    /// Build all three programs. A failed category leaves the zero sentinel
    /// in place; construction continues with the remaining categories.
    pub fn build<D: Device>(device: &D, sources: &ShaderSources) -> Self {
        Self {
            entity: ShaderProgram::build(device, &sources.entity.vertex, &sources.entity.fragment),
            terrain: ShaderProgram::build(
                device,
                &sources.terrain.vertex,
                &sources.terrain.fragment,
            ),
            skybox: ShaderProgram::build(device, &sources.skybox.vertex, &sources.skybox.fragment),
        }
    }

    pub fn get(&self, kind: ProgramKind) -> &ShaderProgram {
        match kind {
            ProgramKind::Entity => &self.entity,
            ProgramKind::Terrain => &self.terrain,
            ProgramKind::Skybox => &self.skybox,
        }
    }

    /// Delete every tracked stage handle, then every program handle. Called
    /// exactly once during renderer teardown; handles are zeroed so a second
    /// call releases nothing.
    pub fn release<D: Device>(&mut self, device: &D) {
        for program in [&mut self.entity, &mut self.terrain, &mut self.skybox] {
            for stage in [&mut program.vertex, &mut program.fragment] {
                if stage.is_valid() {
                    device.delete_shader(*stage);
                    *stage = ShaderId::NONE;
                }
            }
        }
        for program in [&mut self.entity, &mut self.terrain, &mut self.skybox] {
            if program.program.is_valid() {
                device.delete_program(program.program);
                program.program = ProgramId::NONE;
            }
        }
    }
}
