//! wgpu implementation of [`GraphicsDevice`].
//!
//! wgpu has no client-side vertex arrays, so host attribute sources are
//! copied at pointer time into per-frame uploads and turned into transient
//! vertex buffers when the frame is encoded. Host sources that share one
//! backing array (the interleaved layout) share one upload. Draws are
//! recorded during the frame and replayed into the render pass by the
//! pipeline manager.

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use super::{
    AttributePointer, AttributeSource, BufferId, DeviceError, GraphicsDevice, VertexAttribute,
};

/// Where a vertex buffer slot reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSource {
    /// A persistent device buffer
    Buffer(BufferId),
    /// Index into the frame's host uploads
    Upload(usize),
}

/// One attribute binding captured at draw time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundAttribute {
    /// Backing buffer
    pub source: SlotSource,
    /// Byte offset of the first element
    pub offset_bytes: u64,
    /// Distance between elements, in bytes (never zero)
    pub stride_bytes: u64,
}

/// A draw waiting to be encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingDraw {
    /// Bindings indexed by shader location
    pub attributes: [BoundAttribute; 3],
    /// First vertex
    pub first_vertex: u32,
    /// Vertex count
    pub vertex_count: u32,
}

impl PendingDraw {
    /// Per-slot strides; selects the render pipeline variant.
    pub fn strides(&self) -> [u64; 3] {
        [
            self.attributes[0].stride_bytes,
            self.attributes[1].stride_bytes,
            self.attributes[2].stride_bytes,
        ]
    }
}

/// Everything recorded for one frame.
#[derive(Debug, Default)]
pub struct FrameRecording {
    /// Host attribute data to upload for this frame
    pub uploads: Vec<Vec<f32>>,
    upload_keys: HashMap<(usize, usize), usize>,
    /// Draws in submission order
    pub draws: Vec<PendingDraw>,
}

impl FrameRecording {
    fn upload(&mut self, data: &[f32]) -> usize {
        let key = (data.as_ptr() as usize, data.len());
        if let Some(&index) = self.upload_keys.get(&key) {
            return index;
        }
        self.uploads.push(data.to_vec());
        self.upload_keys.insert(key, self.uploads.len() - 1);
        self.uploads.len() - 1
    }
}

/// A [`GraphicsDevice`] backed by a wgpu device and queue.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    buffers: HashMap<BufferId, wgpu::Buffer>,
    next_buffer_id: u32,
    enabled: [bool; 3],
    pointers: [Option<BoundAttribute>; 3],
    frame: FrameRecording,
}

impl WgpuDevice {
    /// Wraps a wgpu device and queue.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self {
            device,
            queue,
            buffers: HashMap::new(),
            next_buffer_id: 0,
            enabled: [false; 3],
            pointers: [None; 3],
            frame: FrameRecording::default(),
        }
    }

    /// The underlying wgpu device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// The underlying wgpu queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Takes the draws and uploads recorded since the previous call.
    pub fn take_frame(&mut self) -> FrameRecording {
        std::mem::take(&mut self.frame)
    }

    /// Creates the transient vertex buffers for a frame's host uploads.
    ///
    /// The returned buffers are indexed like `frame.uploads` and only need to
    /// live until the frame's command buffer is submitted.
    pub fn create_upload_buffers(&self, frame: &FrameRecording) -> Vec<wgpu::Buffer> {
        frame
            .uploads
            .iter()
            .map(|upload| {
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Client-side attribute upload"),
                        contents: bytemuck::cast_slice(upload),
                        usage: wgpu::BufferUsages::VERTEX,
                    })
            })
            .collect()
    }

    /// Resolves a slot source to a buffer.
    pub fn slot_buffer<'a>(
        &'a self,
        source: SlotSource,
        uploads: &'a [wgpu::Buffer],
    ) -> Option<&'a wgpu::Buffer> {
        match source {
            SlotSource::Buffer(id) => self.buffers.get(&id),
            SlotSource::Upload(index) => uploads.get(index),
        }
    }
}

impl GraphicsDevice for WgpuDevice {
    fn create_vertex_buffer(&mut self, label: &str, data: &[f32]) -> Result<BufferId, DeviceError> {
        let requested_bytes = (data.len() * std::mem::size_of::<f32>()) as u64;
        let max_bytes = self.device.limits().max_buffer_size;
        if requested_bytes > max_bytes {
            return Err(DeviceError::BufferTooLarge {
                requested_bytes,
                max_bytes,
            });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX,
            });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            log::error!("Failed to create vertex buffer '{}': {}", label, error);
            buffer.destroy();
            return Err(DeviceError::OutOfMemory { requested_bytes });
        }

        self.next_buffer_id += 1;
        let id = BufferId(self.next_buffer_id);
        self.buffers.insert(id, buffer);
        log::debug!("Created {} '{}' ({} bytes)", id, label, requested_bytes);
        Ok(id)
    }

    fn delete_buffers(&mut self, buffers: &[BufferId]) {
        for id in buffers {
            match self.buffers.remove(id) {
                Some(buffer) => buffer.destroy(),
                None => log::warn!("Tried to delete {} which is not live", id),
            }
        }
    }

    fn enable_attribute(&mut self, attribute: VertexAttribute) {
        self.enabled[attribute.location()] = true;
    }

    fn disable_attribute(&mut self, attribute: VertexAttribute) {
        self.enabled[attribute.location()] = false;
    }

    fn attribute_pointer(&mut self, pointer: AttributePointer<'_>) {
        let stride_bytes = pointer.attribute.effective_stride(pointer.stride_bytes);
        let bound = match pointer.source {
            AttributeSource::Host {
                data,
                offset_floats,
            } => BoundAttribute {
                source: SlotSource::Upload(self.frame.upload(data)),
                offset_bytes: (offset_floats * std::mem::size_of::<f32>()) as u64,
                stride_bytes,
            },
            AttributeSource::Device {
                buffer,
                offset_bytes,
            } => BoundAttribute {
                source: SlotSource::Buffer(buffer),
                offset_bytes,
                stride_bytes,
            },
        };
        self.pointers[pointer.attribute.location()] = Some(bound);
    }

    fn draw_triangles(&mut self, first_vertex: u32, vertex_count: u32) {
        let mut attributes = [BoundAttribute {
            source: SlotSource::Upload(0),
            offset_bytes: 0,
            stride_bytes: 0,
        }; 3];

        for attribute in VertexAttribute::ALL {
            let location = attribute.location();
            match (self.enabled[location], self.pointers[location]) {
                (true, Some(bound)) => attributes[location] = bound,
                _ => {
                    log::warn!("Skipping draw: {:?} is not enabled with a pointer", attribute);
                    return;
                }
            }
        }

        self.frame.draws.push(PendingDraw {
            attributes,
            first_vertex,
            vertex_count,
        });
    }
}
