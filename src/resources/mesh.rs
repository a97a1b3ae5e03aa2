//! OBJ mesh loading via [tobj].
//!
//! Meshes are triangulated and re-indexed to a single index per vertex, so
//! the parallel arrays in [`MeshData`] line up one-to-one. Multi-object files
//! are merged into one mesh with rebased indices; the renderer does not
//! deduplicate or split drawables.
//!
//! [tobj]: https://docs.rs/tobj

use std::io::{BufReader, Cursor};
use std::path::Path;

use anyhow::{bail, Context};

use crate::drawable::MeshData;

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    }
}

/// Load an OBJ file from disk into parallel mesh arrays.
pub fn load_obj(path: impl AsRef<Path>) -> anyhow::Result<MeshData> {
    let path = path.as_ref();
    let (models, _materials) = tobj::load_obj(path, &load_options())
        .with_context(|| format!("reading OBJ file {}", path.display()))?;
    merge(models, &path.display().to_string())
}

/// Parse OBJ text that is already in memory. Material libraries referenced by
/// the text are ignored.
pub fn parse_obj(text: &str) -> anyhow::Result<MeshData> {
    let mut reader = BufReader::new(Cursor::new(text));
    let (models, _materials) = tobj::load_obj_buf(&mut reader, &load_options(), |_| {
        Err(tobj::LoadError::OpenFileFailed)
    })
    .context("parsing OBJ text")?;
    merge(models, "<memory>")
}

fn merge(models: Vec<tobj::Model>, name: &str) -> anyhow::Result<MeshData> {
    let mut data = MeshData::default();
    for model in models {
        let mesh = model.mesh;
        if mesh.normals.is_empty() {
            log::warn!(
                "mesh '{}' in {} has no normals; lighting will be wrong",
                model.name,
                name
            );
        }
        if mesh.texcoords.is_empty() {
            log::warn!(
                "mesh '{}' in {} has no texture coordinates",
                model.name,
                name
            );
        }
        let base = data.vertex_count() as u32;
        data.positions.extend(mesh.positions);
        data.tex_coords.extend(mesh.texcoords);
        data.normals.extend(mesh.normals);
        data.indices.extend(mesh.indices.into_iter().map(|i| i + base));
    }
    if data.positions.is_empty() {
        bail!("no geometry in {name}");
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE_OBJ: &str = "\
v 0.0 0.0 0.0
v 1.0 0.0 0.0
v 0.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 0.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1
";

    const QUAD_OBJ: &str = "\
v -1.0 -1.0 0.0
v 1.0 -1.0 0.0
v 1.0 1.0 0.0
v -1.0 1.0 0.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn triangle_parses_into_parallel_arrays() {
        let mesh = parse_obj(TRIANGLE_OBJ).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.positions.len(), 9);
        assert_eq!(mesh.tex_coords.len(), 6);
        assert_eq!(mesh.normals.len(), 9);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
    }

    #[test]
    fn quad_face_is_triangulated() {
        let mesh = parse_obj(QUAD_OBJ).unwrap();
        assert_eq!(mesh.indices.len(), 6);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertex_count()));
    }

    #[test]
    fn two_objects_merge_with_rebased_indices() {
        let text = format!("o first\n{TRIANGLE_OBJ}o second\n{TRIANGLE_OBJ}");
        let mesh = parse_obj(&text).unwrap();
        assert_eq!(mesh.vertex_count(), 6);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(parse_obj("").is_err());
    }
}
