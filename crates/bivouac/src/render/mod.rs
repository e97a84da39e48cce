//! # Rendering
//!
//! - [`batch`]: `BatchRenderSystem`, which gathers, sorts and joins meshes on the CPU
//! - [`strip`]: wgpu pipelines and vertex buffers for the joined strips
//! - [`texture`]: Atlas upload and the `TextureStore` resource
//! - [`gpu`]: Device, queue and surface

pub mod batch;
pub mod gpu;
pub mod strip;
pub mod texture;

pub use batch::{BatchRenderSystem, BlendPass, RenderData};
pub use gpu::{FrameError, GpuContext};
pub use strip::{StripRenderer, StripVertex, camera_matrix};
pub use texture::{
    TextureHandle, TextureStore, create_texture_from_rgba, ensure_renderer, load_texture,
    upload_atlas,
};

/// Background colour the frame is cleared to, as a world resource.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearColor(pub wgpu::Color);

impl ClearColor {
    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self(wgpu::Color { r, g, b, a: 1.0 })
    }
}

impl Default for ClearColor {
    fn default() -> Self {
        Self::rgb(0.0, 0.0, 0.0)
    }
}
