//! strata-ngin
//!
//! A minimal real-time 3D renderer. The crate loads geometry and textures,
//! compiles shader programs, and issues per-frame draw calls for three
//! categories of drawable (entities, terrain, skybox) under a shared
//! camera/projection/lighting context. All GPU access goes through the
//! [`device::Device`] trait, so the same renderer runs against a real OpenGL
//! context (via glow) or a headless capturing device for tests.
//!
//! High-level modules
//! - `camera`: camera type producing the view matrix for rendering
//! - `device`: GL-style device trait, typed GPU handles, glow and trace backends
//! - `drawable`: GPU-resident mesh records (entities and the terrain singleton)
//! - `renderer`: frame composition, shader program lifecycle and teardown
//! - `resources`: helpers to load shader sources, OBJ meshes and textures
//! - `shader`: shader stage compilation and program linking
//!
//! The renderer is single-threaded by design: every operation is a direct
//! sequence of blocking device calls executed on the thread owning the GPU
//! context.

pub mod camera;
pub mod device;
pub mod drawable;
pub mod renderer;
pub mod resources;
pub mod shader;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath::*;
