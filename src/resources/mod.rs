//! Loading of external files: shader sources, OBJ meshes and textures.
//!
//! Everything in here is thin I/O feeding the renderer; failures are real
//! errors (`anyhow::Result`), unlike the fail-soft GPU-side compile/link
//! handling in [`crate::shader`].

use std::fs;
use std::path::Path;

use anyhow::Context;
use cgmath::Matrix4;

use crate::device::Device;
use crate::drawable::Drawable;
use crate::shader::{ShaderSources, StageSources};

pub mod mesh;
pub mod texture;

/// File names of the three shader categories under `<base>/shaders/`.
const SHADER_FILES: [(&str, &str); 3] = [
    ("vertexShaderEntities.txt", "fragmentShaderEntities.txt"),
    ("vertexShaderTerrain.txt", "fragmentShaderTerrain.txt"),
    ("vertexShaderSkybox.txt", "fragmentShaderSkybox.txt"),
];

/// Read the six shader source files from `<base>/shaders/`.
///
/// The text is passed to the driver compiler untouched; there is no
/// preprocessing or versioning.
pub fn load_shader_sources(base: impl AsRef<Path>) -> anyhow::Result<ShaderSources> {
    let shaders = base.as_ref().join("shaders");
    let read = |name: &str| -> anyhow::Result<String> {
        let path = shaders.join(name);
        fs::read_to_string(&path).with_context(|| format!("reading shader source {}", path.display()))
    };
    let stage = |(vertex, fragment): (&str, &str)| -> anyhow::Result<StageSources> {
        Ok(StageSources {
            vertex: read(vertex)?,
            fragment: read(fragment)?,
        })
    };
    // SHADER_FILES is in entity, terrain, skybox order
    let [entity, terrain, skybox] = SHADER_FILES;
    Ok(ShaderSources {
        entity: stage(entity)?,
        terrain: stage(terrain)?,
        skybox: stage(skybox)?,
    })
}

/// Load an OBJ mesh and its texture and upload both, mirroring the classic
/// `readOBJ(file, textureFile, modelMatrix)` entry point.
pub fn load_drawable<D: Device>(
    device: &D,
    obj_path: impl AsRef<Path>,
    texture_path: impl AsRef<Path>,
    model_matrix: Matrix4<f32>,
) -> anyhow::Result<Drawable> {
    let mesh = mesh::load_obj(obj_path)?;
    let image = texture::load_image(texture_path)?;
    let texture = texture::upload_texture(device, &image);
    Ok(Drawable::upload(device, &mesh, model_matrix, texture))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn missing_shader_directory_is_an_error() {
        let result = load_shader_sources("/nonexistent-strata-ngin-base");
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("vertexShaderEntities.txt"));
    }

    #[test]
    fn shader_sources_load_from_fixed_relative_scheme() {
        let base = std::env::temp_dir().join(format!("strata-shaders-{}", std::process::id()));
        let dir = base.join("shaders");
        fs::create_dir_all(&dir).unwrap();
        for (vertex, fragment) in SHADER_FILES {
            fs::write(dir.join(vertex), format!("// {vertex}")).unwrap();
            fs::write(dir.join(fragment), format!("// {fragment}")).unwrap();
        }

        let sources = load_shader_sources(&base).unwrap();
        assert_eq!(sources.entity.vertex, "// vertexShaderEntities.txt");
        assert_eq!(sources.terrain.fragment, "// fragmentShaderTerrain.txt");
        assert_eq!(sources.skybox.vertex, "// vertexShaderSkybox.txt");

        // one missing category file fails the whole load, naming the file
        fs::remove_file(dir.join("fragmentShaderTerrain.txt")).unwrap();
        let err = format!("{:#}", load_shader_sources(&base).unwrap_err());
        assert!(err.contains("fragmentShaderTerrain.txt"));

        fs::remove_dir_all(&base).unwrap();
    }
}
