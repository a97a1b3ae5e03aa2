//! GPU-resident mesh records.
//!
//! A [`Drawable`] is one mesh the renderer can draw: a vertex array object,
//! the three attribute buffers behind it, a texture, the index count and a
//! model transform. Entities and the terrain singleton share this shape and
//! differ only in which container the renderer holds them in.
//!
//! All handles in a drawable are either all valid or the record is unusable
//! (see [`Drawable::is_renderable`]). The element buffer id is deliberately
//! not retained: it lives in the VAO binding and is never released
//! individually, matching the teardown accounting of [`crate::renderer`].

use cgmath::Matrix4;

use crate::device::{BufferId, Device, TextureId, VertexArrayId};

/// Parallel mesh arrays as produced by the OBJ loader: `positions` and
/// `normals` hold three floats per vertex, `tex_coords` two.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub positions: Vec<f32>,
    pub tex_coords: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }
}

/// Status returned by the per-frame [`Drawable::update`] hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    Unchanged,
}

/// Upload one attribute array into a fresh buffer and point `attribute` of
/// the bound VAO at it.
pub fn store_attribute<D: Device>(
    device: &D,
    attribute: u32,
    components: i32,
    data: &[f32],
) -> BufferId {
    let buffer = device.create_buffer();
    device.bind_array_buffer(buffer);
    device.array_buffer_data(data);
    device.vertex_attrib(attribute, components);
    buffer
}

/// A GPU-resident mesh plus its texture and transform, ready for drawing.
#[derive(Debug, Clone)]
pub struct Drawable {
    vao: VertexArrayId,
    vertex_buffer: BufferId,
    normal_buffer: BufferId,
    texcoord_buffer: BufferId,
    texture: TextureId,
    index_count: i32,
    model_matrix: Matrix4<f32>,
}

impl Drawable {
    /// Upload `mesh` into freshly created GPU buffers.
    ///
    /// Attribute layout: 0 = positions (vec3), 1 = texture coordinates
    /// (vec2), 2 = normals (vec3), plus an element buffer bound into the VAO.
    pub fn upload<D: Device>(
        device: &D,
        mesh: &MeshData,
        model_matrix: Matrix4<f32>,
        texture: TextureId,
    ) -> Self {
        let vao = device.create_vertex_array();
        device.bind_vertex_array(vao);

        let vertex_buffer = store_attribute(device, 0, 3, &mesh.positions);
        let texcoord_buffer = store_attribute(device, 1, 2, &mesh.tex_coords);
        let normal_buffer = store_attribute(device, 2, 3, &mesh.normals);

        let index_buffer = device.create_buffer();
        device.bind_element_buffer(index_buffer);
        device.element_buffer_data(&mesh.indices);

        device.bind_vertex_array(VertexArrayId::NONE);

        Self {
            vao,
            vertex_buffer,
            normal_buffer,
            texcoord_buffer,
            texture,
            index_count: mesh.indices.len() as i32,
            model_matrix,
        }
    }

    /// Wrap handles that were already uploaded, for resource reuse across
    /// drawables sharing a mesh.
    #[allow(clippy::too_many_arguments)]
    pub fn from_cached(
        vao: VertexArrayId,
        vertex_buffer: BufferId,
        normal_buffer: BufferId,
        texcoord_buffer: BufferId,
        texture: TextureId,
        index_count: i32,
        model_matrix: Matrix4<f32>,
    ) -> Self {
        Self {
            vao,
            vertex_buffer,
            normal_buffer,
            texcoord_buffer,
            texture,
            index_count,
            model_matrix,
        }
    }

    /// Per-frame hook, called once per drawable per frame by the renderer.
    /// Currently recomputes nothing; kept as the seam for future per-frame
    /// entity logic.
    pub fn update(&mut self) -> UpdateStatus {
        UpdateStatus::Unchanged
    }

    pub fn vao(&self) -> VertexArrayId {
        self.vao
    }

    pub fn texture(&self) -> TextureId {
        self.texture
    }

    pub fn index_count(&self) -> i32 {
        self.index_count
    }

    pub fn model_matrix(&self) -> &Matrix4<f32> {
        &self.model_matrix
    }

    /// Replace the model transform. The only mutation a drawable supports
    /// after upload.
    pub fn set_model_matrix(&mut self, model_matrix: Matrix4<f32>) {
        self.model_matrix = model_matrix;
    }

    /// True when every GPU handle is valid.
    pub fn is_renderable(&self) -> bool {
        self.vao.is_valid()
            && self.vertex_buffer.is_valid()
            && self.normal_buffer.is_valid()
            && self.texcoord_buffer.is_valid()
            && self.texture.is_valid()
    }

    /// Delete the three attribute buffers and the VAO, zeroing the handles so
    /// a second call releases nothing. The texture handle is not released
    /// here: textures may be shared between drawables and the renderer keeps
    /// the original's policy of leaving them to the process teardown.
    pub(crate) fn release<D: Device>(&mut self, device: &D) {
        for buffer in [
            &mut self.vertex_buffer,
            &mut self.normal_buffer,
            &mut self.texcoord_buffer,
        ] {
            if buffer.is_valid() {
                device.delete_buffer(*buffer);
                *buffer = BufferId::NONE;
            }
        }
        if self.vao.is_valid() {
            device.delete_vertex_array(self.vao);
            self.vao = VertexArrayId::NONE;
        }
    }
}
