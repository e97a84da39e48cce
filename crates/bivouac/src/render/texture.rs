//! # Texture: Atlas Images on the GPU
//!
//! Users never hold a `wgpu::Texture`. Uploading returns a [`TextureHandle`],
//! a `Copy` index into the [`TextureStore`] resource, and the batch renderer
//! binds whichever handle it was given with
//! [`set_texture`](super::batch::BatchRenderSystem::set_texture).
//!
//! ```text
//! TextureStore
//! ┌───────────────────────────────────────────────┐
//! │ entries: Vec<TextureEntry>                    │
//! │   [0] 1x1 white (default)   ◄── always here  │
//! │   [1] "sprites.png"                           │
//! │   ...                                         │
//! │ path_cache: HashMap<String, TextureHandle>    │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Entry 0 is a single white pixel, so untextured meshes drawn without an
//! atlas come out in their vertex colours.
//!
//! The upload helpers take the store out of the [`World`], do the GPU work
//! against the `GpuContext` resource, and put it back.

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use super::gpu::GpuContext;
use super::strip::StripRenderer;
use crate::ecs::World;
use crate::sprite::atlas::{AssetError, TextureAtlas};

/// Handle to an uploaded texture in the [`TextureStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureHandle(pub(crate) usize);

impl TextureHandle {
    /// The built-in 1x1 white texture.
    pub const WHITE: Self = Self(0);
}

pub(crate) struct TextureEntry {
    pub bind_group: wgpu::BindGroup,
    pub width: u32,
    pub height: u32,
}

/// Every uploaded texture and its bind group.
pub struct TextureStore {
    entries: Vec<TextureEntry>,
    path_cache: HashMap<String, TextureHandle>,
}

impl TextureStore {
    /// A store holding only the 1x1 white texture.
    pub fn new(gpu: &GpuContext, renderer: &StripRenderer) -> Self {
        let white = upload_rgba(gpu, renderer, "white 1x1", 1, 1, &[255, 255, 255, 255]);
        Self {
            entries: vec![white],
            path_cache: HashMap::new(),
        }
    }

    /// The bind group for `handle`, or the white texture if the handle is
    /// unknown.
    pub fn bind_group(&self, handle: TextureHandle) -> &wgpu::BindGroup {
        match self.entries.get(handle.0) {
            Some(entry) => &entry.bind_group,
            None => {
                log::warn!("Unknown {:?}; binding the white texture", handle);
                &self.entries[0].bind_group
            }
        }
    }

    /// Pixel size of `handle`'s texture.
    pub fn size(&self, handle: TextureHandle) -> Option<(u32, u32)> {
        self.entries.get(handle.0).map(|e| (e.width, e.height))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, entry: TextureEntry) -> TextureHandle {
        let handle = TextureHandle(self.entries.len());
        self.entries.push(entry);
        handle
    }
}

fn upload_rgba(
    gpu: &GpuContext,
    renderer: &StripRenderer,
    label: &str,
    width: u32,
    height: u32,
    data: &[u8],
) -> TextureEntry {
    let texture = gpu.device.create_texture_with_data(
        &gpu.queue,
        &wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        data,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some(label),
        layout: &renderer.texture_bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&renderer.sampler),
            },
        ],
    });

    TextureEntry {
        bind_group,
        width,
        height,
    }
}

/// Create the [`StripRenderer`] and [`TextureStore`] resources if they are
/// not there yet.
///
/// # Panics
///
/// Panics if the `GpuContext` resource is missing (no window yet).
pub fn ensure_renderer(world: &mut World) {
    if world.has_resource::<StripRenderer>() && world.has_resource::<TextureStore>() {
        return;
    }
    let gpu = world.resource::<GpuContext>();
    let renderer = StripRenderer::new(gpu);
    let store = TextureStore::new(gpu, &renderer);
    world.insert_resource(renderer);
    world.insert_resource(store);
}

/// Upload raw RGBA8 pixels and return a handle.
pub fn create_texture_from_rgba(
    world: &mut World,
    label: &str,
    width: u32,
    height: u32,
    data: &[u8],
) -> TextureHandle {
    ensure_renderer(world);
    let Some(mut store) = world.resource_remove::<TextureStore>() else {
        return TextureHandle::WHITE;
    };

    let entry = upload_rgba(
        world.resource::<GpuContext>(),
        world.resource::<StripRenderer>(),
        label,
        width,
        height,
        data,
    );
    let handle = store.push(entry);
    log::debug!("Uploaded texture `{}` ({}x{}) as {:?}", label, width, height, handle);

    world.insert_resource(store);
    handle
}

/// Load an image from disk and return a handle. The same path loaded twice
/// gives the same handle.
pub fn load_texture(world: &mut World, path: &str) -> Result<TextureHandle, AssetError> {
    ensure_renderer(world);
    if let Some(&handle) = world
        .get_resource::<TextureStore>()
        .and_then(|store| store.path_cache.get(path))
    {
        return Ok(handle);
    }

    let image = image::open(path)?.to_rgba8();
    let (width, height) = image.dimensions();
    let handle = create_texture_from_rgba(world, path, width, height, image.as_raw());
    if let Some(store) = world.get_resource_mut::<TextureStore>() {
        store.path_cache.insert(path.to_owned(), handle);
    }
    log::info!("Loaded texture {} ({}x{})", path, width, height);
    Ok(handle)
}

/// Upload an atlas' image. Returns the white texture (with a warning) if the
/// atlas was built without one.
pub fn upload_atlas(world: &mut World, atlas: &TextureAtlas) -> TextureHandle {
    match atlas.image() {
        Some(image) => {
            let (width, height) = image.dimensions();
            create_texture_from_rgba(world, "texture atlas", width, height, image.as_raw())
        }
        None => {
            log::warn!("Atlas has no image to upload; using the white texture");
            TextureHandle::WHITE
        }
    }
}
