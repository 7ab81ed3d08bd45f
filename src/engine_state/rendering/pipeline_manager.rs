//! Manages the wgpu render pipelines and the per-frame render pass.
//!
//! Every draw feeds three vertex buffer slots, one per attribute, so that
//! separate and interleaved layouts go through the same shader. The only
//! thing that differs between layouts is the stride of each slot, so render
//! pipelines are created lazily and cached by their three strides.
//!
//! # Resource Management
//!
//! - One uniform buffer and bind group holding [`FrameUniforms`]
//! - A depth texture recreated on resize
//! - Transient vertex buffers for client-side attribute data, created and
//!   dropped within [`PipelineManager::render`]

use std::collections::HashMap;

use bytemuck::Zeroable;
use wgpu::util::DeviceExt;

use crate::engine_state::camera_state::FrameUniforms;
use crate::engine_state::gpu::wgpu_device::{FrameRecording, WgpuDevice};

use super::texture::DepthTexture;
use super::RenderError;

/// WGSL source for the cube shader.
pub const CUBE_SHADER: &str = include_str!("../../../assets/shaders/cube.wgsl");

const POSITION_ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
    format: wgpu::VertexFormat::Float32x3,
    offset: 0,
    shader_location: 0,
}];
const NORMAL_ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
    format: wgpu::VertexFormat::Float32x3,
    offset: 0,
    shader_location: 1,
}];
const TEX_COORD_ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
    format: wgpu::VertexFormat::Float32x2,
    offset: 0,
    shader_location: 2,
}];

/// Vertex buffer layouts for the three attribute slots at the given strides.
fn vertex_buffer_layouts(strides: [u64; 3]) -> [wgpu::VertexBufferLayout<'static>; 3] {
    let slot = |array_stride, attributes: &'static [wgpu::VertexAttribute]| {
        wgpu::VertexBufferLayout {
            array_stride,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes,
        }
    };
    [
        slot(strides[0], &POSITION_ATTRIBUTES),
        slot(strides[1], &NORMAL_ATTRIBUTES),
        slot(strides[2], &TEX_COORD_ATTRIBUTES),
    ]
}

/// Render pipelines, uniforms and depth buffer for the cube grid.
pub struct PipelineManager {
    shader: wgpu::ShaderModule,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<[u64; 3], wgpu::RenderPipeline>,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    depth_texture: DepthTexture,
    surface_format: wgpu::TextureFormat,
}

impl PipelineManager {
    /// Creates the shader, uniform bindings and depth texture.
    ///
    /// # Errors
    /// `RenderError::ShaderCompilation` if the shader fails validation.
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
    ) -> Result<Self, RenderError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Cube Shader"),
            source: wgpu::ShaderSource::Wgsl(CUBE_SHADER.into()),
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::ShaderCompilation(error.to_string()));
        }

        let uniform_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Frame Uniform Bind Group Layout"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
            });

        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Uniform Buffer"),
            contents: bytemuck::cast_slice(&[FrameUniforms::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Uniform Bind Group"),
            layout: &uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Cube Render Pipeline Layout"),
            bind_group_layouts: &[&uniform_bind_group_layout],
            push_constant_ranges: &[],
        });

        Ok(Self {
            shader,
            pipeline_layout,
            pipelines: HashMap::new(),
            uniform_buffer,
            uniform_bind_group,
            depth_texture: DepthTexture::new(device, config, "Depth Texture"),
            surface_format: config.format,
        })
    }

    /// Creates the pipeline for a stride combination if it does not exist yet.
    fn ensure_pipeline(&mut self, device: &wgpu::Device, strides: [u64; 3]) {
        if self.pipelines.contains_key(&strides) {
            return;
        }

        log::debug!("Creating cube pipeline for strides {:?}", strides);
        let buffers = vertex_buffer_layouts(strides);
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Cube Render Pipeline"),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &self.shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.surface_format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: Some(DepthTexture::depth_stencil_state()),
            multisample: Default::default(),
            multiview: None,
            cache: None,
        });
        self.pipelines.insert(strides, pipeline);
    }

    /// Encodes and presents one frame.
    ///
    /// # Arguments
    /// * `surface` - Target surface
    /// * `gpu` - Device the frame's draws were recorded on
    /// * `frame` - Draws and host uploads recorded this frame
    /// * `uniforms` - Matrices and light position for this frame
    ///
    /// # Errors
    /// `RenderError::Surface` if the surface texture cannot be acquired.
    pub fn render(
        &mut self,
        surface: &wgpu::Surface,
        gpu: &WgpuDevice,
        frame: FrameRecording,
        uniforms: &FrameUniforms,
    ) -> Result<(), RenderError> {
        let device = gpu.device();
        let queue = gpu.queue();

        for draw in &frame.draws {
            self.ensure_pipeline(device, draw.strides());
        }

        queue.write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&[*uniforms]));
        let uploads = gpu.create_upload_buffers(&frame);

        let surface_texture = surface.get_current_texture()?;
        let view = surface_texture.texture.create_view(&Default::default());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Cube Frame Encoder"),
        });
        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Cube Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rpass.set_bind_group(0, &self.uniform_bind_group, &[]);

            'draws: for draw in &frame.draws {
                let Some(pipeline) = self.pipelines.get(&draw.strides()) else {
                    continue;
                };
                rpass.set_pipeline(pipeline);

                for (slot, bound) in draw.attributes.iter().enumerate() {
                    let Some(buffer) = gpu.slot_buffer(bound.source, &uploads) else {
                        log::warn!("Skipping draw: vertex slot {} has no buffer", slot);
                        continue 'draws;
                    };
                    rpass.set_vertex_buffer(slot as u32, buffer.slice(bound.offset_bytes..));
                }

                rpass.draw(
                    draw.first_vertex..draw.first_vertex + draw.vertex_count,
                    0..1,
                );
            }
        }

        queue.submit([encoder.finish()]);
        surface_texture.present();
        Ok(())
    }

    /// Recreates the depth texture for a new surface size.
    pub fn resize(&mut self, device: &wgpu::Device, config: &wgpu::SurfaceConfiguration) {
        self.depth_texture = DepthTexture::new(device, config, "Depth Texture");
    }
}
