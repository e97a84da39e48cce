//! # Strip Pipeline: One Draw Per Blend Pass
//!
//! The batch renderer hands over one long triangle strip per blend pass, with
//! positions already transformed to pixel space. This module owns the wgpu
//! side of that: the vertex format, the camera uniform, one pipeline per
//! [`BlendPass`] and a growable vertex buffer per pass.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │ StripRenderer                                               │
//! │                                                             │
//! │  Shader module ─── vs_main + fs_main from shader.wgsl      │
//! │                                                             │
//! │  Vertex layout ─── StripVertex { pos, uv, color (RGBA8) }  │
//! │                                                             │
//! │  Bind group layouts                                         │
//! │    group 0: camera uniform (mat4x4, vertex-only)            │
//! │    group 1: atlas texture + sampler (fragment-only)         │
//! │                                                             │
//! │  Pipelines                                                  │
//! │    Normal   ─── PREMULTIPLIED_ALPHA_BLENDING                │
//! │    Additive ─── src × 1 + dst × 1                           │
//! │                                                             │
//! │  Primitive ─── TriangleStrip, no culling                    │
//! │  Depth/stencil ─── None (layer sort on the CPU)             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Camera
//!
//! Pixel coordinates with the origin in the upper-left corner and y growing
//! downwards, so a mesh at `(0, 0)` sits in the corner of the window
//! whatever its size.

use bytemuck::{Pod, Zeroable};

use super::batch::BlendPass;
use super::gpu::GpuContext;
use crate::math::Mat4;
use crate::mesh::Vertex;

/// One strip vertex as the GPU reads it.
///
/// ```text
/// StripVertex (20 bytes per vertex)
/// ┌────────────────┬──────────────┬──────────────┐
/// │ position       │ uv           │ color        │
/// │ [f32; 2]       │ [f32; 2]     │ [u8; 4]      │
/// │ offset 0       │ offset 8     │ offset 16    │
/// │ location(0)    │ location(1)  │ location(2)  │
/// └────────────────┴──────────────┴──────────────┘
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct StripVertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [u8; 4],
}

impl StripVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<StripVertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: 8,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x2,
            },
            wgpu::VertexAttribute {
                offset: 16,
                shader_location: 2,
                format: wgpu::VertexFormat::Unorm8x4,
            },
        ],
    };
}

impl From<&Vertex> for StripVertex {
    fn from(v: &Vertex) -> Self {
        Self {
            position: v.position.to_array(),
            uv: v.tex_coord.to_array(),
            color: v.color,
        }
    }
}

/// Camera view-projection matrix uploaded as a uniform buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn for_viewport(width: f32, height: f32) -> Self {
        Self {
            view_proj: camera_matrix(width, height).to_cols_array_2d(),
        }
    }
}

/// Orthographic projection for a `width` × `height` pixel viewport, origin
/// upper-left, y down.
pub fn camera_matrix(width: f32, height: f32) -> Mat4 {
    Mat4::orthographic_rh(0.0, width.max(1.0), height.max(1.0), 0.0, -1.0, 1.0)
}

fn additive_blending() -> wgpu::BlendState {
    let add = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState { color: add, alpha: add }
}

#[derive(Default)]
struct PassBuffer {
    buffer: Option<wgpu::Buffer>,
    capacity: usize,
    len: u32,
}

/// GPU resources for batched strip drawing. Created lazily on the first
/// frame, once a [`GpuContext`] exists.
pub struct StripRenderer {
    normal_pipeline: wgpu::RenderPipeline,
    additive_pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    pub(crate) texture_bind_group_layout: wgpu::BindGroupLayout,
    pub(crate) sampler: wgpu::Sampler,
    buffers: [PassBuffer; 2],
}

impl StripRenderer {
    pub fn new(gpu: &GpuContext) -> Self {
        use wgpu::util::DeviceExt;

        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("strip shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("camera bind group layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let texture_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("atlas bind group layout"),
                entries: &[
                    wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            multisampled: false,
                            view_dimension: wgpu::TextureViewDimension::D2,
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ],
            });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("strip pipeline layout"),
            bind_group_layouts: &[&camera_bind_group_layout, &texture_bind_group_layout],
            push_constant_ranges: &[],
        });

        let normal_pipeline = build_pipeline(
            gpu,
            &layout,
            &shader,
            "strip pipeline (normal)",
            wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
        );
        let additive_pipeline = build_pipeline(
            gpu,
            &layout,
            &shader,
            "strip pipeline (additive)",
            additive_blending(),
        );

        let (width, height) = gpu.surface_size();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera uniform buffer"),
            contents: bytemuck::cast_slice(&[CameraUniform::for_viewport(
                width as f32,
                height as f32,
            )]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("camera bind group"),
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("atlas sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        log::debug!("Strip renderer created for {:?}", gpu.surface_format());

        Self {
            normal_pipeline,
            additive_pipeline,
            camera_buffer,
            camera_bind_group,
            texture_bind_group_layout,
            sampler,
            buffers: [PassBuffer::default(), PassBuffer::default()],
        }
    }

    /// Point the camera at a `width` × `height` pixel viewport.
    pub fn set_viewport(&self, gpu: &GpuContext, width: u32, height: u32) {
        let uniform = CameraUniform::for_viewport(width as f32, height as f32);
        gpu.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[uniform]));
    }

    /// Replace the vertices drawn for `pass`, growing its buffer if needed.
    pub fn upload(&mut self, gpu: &GpuContext, pass: BlendPass, vertices: &[StripVertex]) {
        let slot = &mut self.buffers[pass.index()];
        slot.len = vertices.len() as u32;
        if vertices.is_empty() {
            return;
        }
        if slot.buffer.is_none() || slot.capacity < vertices.len() {
            let capacity = vertices.len().next_power_of_two();
            slot.buffer = Some(gpu.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(pass.label()),
                size: (capacity * std::mem::size_of::<StripVertex>()) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
            slot.capacity = capacity;
            log::debug!("Grew {} vertex buffer to {} vertices", pass.label(), capacity);
        }
        if let Some(buffer) = &slot.buffer {
            gpu.queue.write_buffer(buffer, 0, bytemuck::cast_slice(vertices));
        }
    }

    /// Record the strip for `pass` with `texture` bound. Does nothing if the
    /// last upload for the pass was empty.
    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>, pass: BlendPass, texture: &wgpu::BindGroup) {
        let slot = &self.buffers[pass.index()];
        let Some(buffer) = &slot.buffer else {
            return;
        };
        if slot.len == 0 {
            return;
        }
        let pipeline = match pass {
            BlendPass::Normal => &self.normal_pipeline,
            BlendPass::Additive => &self.additive_pipeline,
        };
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, &self.camera_bind_group, &[]);
        render_pass.set_bind_group(1, texture, &[]);
        render_pass.set_vertex_buffer(0, buffer.slice(..));
        render_pass.draw(0..slot.len, 0..1);
    }
}

fn build_pipeline(
    gpu: &GpuContext,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    label: &str,
    blend: wgpu::BlendState,
) -> wgpu::RenderPipeline {
    gpu.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[StripVertex::LAYOUT],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: gpu.surface_format(),
                blend: Some(blend),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Vec2, Vec4};

    #[test]
    fn vertex_layout_matches_struct() {
        assert_eq!(std::mem::size_of::<StripVertex>(), 20);
        assert_eq!(StripVertex::LAYOUT.array_stride, 20);
        assert_eq!(std::mem::size_of::<CameraUniform>(), 64);
    }

    #[test]
    fn from_mesh_vertex() {
        let v = Vertex {
            position: Vec2::new(1.0, 2.0),
            color: [9, 8, 7, 6],
            tex_coord: Vec2::new(0.5, 0.25),
        };
        let s = StripVertex::from(&v);
        assert_eq!(s.position, [1.0, 2.0]);
        assert_eq!(s.uv, [0.5, 0.25]);
        assert_eq!(s.color, [9, 8, 7, 6]);
    }

    #[test]
    fn camera_maps_pixels_to_clip_space() {
        let m = camera_matrix(800.0, 600.0);
        let corner = m * Vec4::new(0.0, 0.0, 0.0, 1.0);
        assert!((corner.x + 1.0).abs() < 1e-5 && (corner.y - 1.0).abs() < 1e-5);
        let far = m * Vec4::new(800.0, 600.0, 0.0, 1.0);
        assert!((far.x - 1.0).abs() < 1e-5 && (far.y + 1.0).abs() < 1e-5);
        let centre = m * Vec4::new(400.0, 300.0, 0.0, 1.0);
        assert!(centre.x.abs() < 1e-5 && centre.y.abs() < 1e-5);
    }
}
