use strata_ngin::camera::Camera;
use strata_ngin::device::trace::TraceDevice;
use strata_ngin::drawable::Drawable;
use strata_ngin::renderer::{Renderer, RendererConfig};
use strata_ngin::resources::{mesh, texture};
use strata_ngin::shader::{ShaderSources, StageSources};
use strata_ngin::{Deg, Matrix4, SquareMatrix};

/// A unit cube with 36 indices, the classic smoke-test mesh.
pub const CUBE_OBJ: &str = "\
v -1.0 -1.0 1.0
v 1.0 -1.0 1.0
v 1.0 1.0 1.0
v -1.0 1.0 1.0
v -1.0 -1.0 -1.0
v 1.0 -1.0 -1.0
v 1.0 1.0 -1.0
v -1.0 1.0 -1.0
vt 0.0 0.0
vt 1.0 0.0
vt 1.0 1.0
vt 0.0 1.0
vn 0.0 0.0 1.0
vn 0.0 0.0 -1.0
vn 1.0 0.0 0.0
vn -1.0 0.0 0.0
vn 0.0 1.0 0.0
vn 0.0 -1.0 0.0
f 1/1/1 2/2/1 3/3/1
f 3/3/1 4/4/1 1/1/1
f 6/1/2 5/2/2 8/3/2
f 8/3/2 7/4/2 6/1/2
f 2/1/3 6/2/3 7/3/3
f 7/3/3 3/4/3 2/1/3
f 5/1/4 1/2/4 4/3/4
f 4/3/4 8/4/4 5/1/4
f 4/1/5 3/2/5 7/3/5
f 7/3/5 8/4/5 4/1/5
f 5/1/6 6/2/6 2/3/6
f 2/3/6 1/4/6 5/1/6
";

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn valid_sources() -> ShaderSources {
    let stage = |tag: &str| StageSources {
        vertex: format!("#version 330 core // vertex {tag}\nvoid main() {{}}"),
        fragment: format!("#version 330 core // fragment {tag}\nvoid main() {{}}"),
    };
    ShaderSources {
        entity: stage("entities"),
        terrain: stage("terrain"),
        skybox: stage("skybox"),
    }
}

pub fn skybox_faces() -> [texture::TextureImage; 6] {
    std::array::from_fn(|face| {
        texture::TextureImage::solid(4, 4, [face as u8 * 40, 120, 200, 255])
    })
}

pub fn build_renderer(device: &TraceDevice, width: u32, height: u32) -> Renderer {
    Renderer::new(
        device,
        RendererConfig::new(width, height),
        &valid_sources(),
        &skybox_faces(),
    )
}

/// Upload the OBJ cube together with a solid texture.
pub fn cube_entity(device: &TraceDevice) -> Drawable {
    let mesh = mesh::parse_obj(CUBE_OBJ).expect("cube OBJ parses");
    let image = texture::TextureImage::solid(2, 2, [200, 180, 40, 255]);
    let texture = texture::upload_texture(device, &image);
    Drawable::upload(device, &mesh, Matrix4::identity(), texture)
}

pub fn test_camera() -> Camera {
    Camera::new((0.0, 6.0, 12.0), Deg(-90.0), Deg(-25.0))
}
