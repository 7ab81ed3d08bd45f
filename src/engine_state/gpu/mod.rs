//! # Graphics Device Abstraction
//!
//! The buffer layout strategies talk to the GPU through [`GraphicsDevice`], a
//! small vertex-array style interface: create and delete vertex buffers, point
//! each vertex attribute at either host memory or a device buffer, enable or
//! disable attributes, and draw a non-indexed triangle list.
//!
//! ## Implementations
//! - [`WgpuDevice`]: drives a real GPU through wgpu. Device buffers are
//!   `wgpu::Buffer`s; host attribute sources are uploaded into transient vertex
//!   buffers for the frame they are drawn in.
//! - [`RecordingDevice`]: keeps buffers in host memory, records every call,
//!   resolves attribute data for each draw and tracks outstanding buffers. Used
//!   to verify strategy behaviour without a GPU.
//!
//! ## Attribute State
//!
//! Attribute enablement and pointers persist between calls, the way they do on
//! a vertex-array driver. Callers that draw must set up every attribute they
//! use and should disable them afterwards.

pub mod recording;
pub mod wgpu_device;

use std::fmt;

use thiserror::Error;

use super::geometry::{NORMAL_DATA_SIZE, POSITION_DATA_SIZE, TEXTURE_COORDINATE_DATA_SIZE};

pub use recording::{DeviceCall, RecordedDraw, RecordingDevice};
pub use wgpu_device::WgpuDevice;

/// Handle to a vertex buffer owned by a [`GraphicsDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

/// The vertex attributes consumed by the cube shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    /// Object-space position, shader location 0
    Position,
    /// Object-space normal, shader location 1
    Normal,
    /// Texture coordinate, shader location 2
    TexCoord,
}

impl VertexAttribute {
    /// Every attribute, in shader location order.
    pub const ALL: [VertexAttribute; 3] = [
        VertexAttribute::Position,
        VertexAttribute::Normal,
        VertexAttribute::TexCoord,
    ];

    /// Shader input location (also the index into per-attribute arrays).
    pub fn location(self) -> usize {
        match self {
            VertexAttribute::Position => 0,
            VertexAttribute::Normal => 1,
            VertexAttribute::TexCoord => 2,
        }
    }

    /// Number of `f32` components per vertex.
    pub fn components(self) -> usize {
        match self {
            VertexAttribute::Position => POSITION_DATA_SIZE,
            VertexAttribute::Normal => NORMAL_DATA_SIZE,
            VertexAttribute::TexCoord => TEXTURE_COORDINATE_DATA_SIZE,
        }
    }

    /// Size of one element of this attribute, in bytes.
    pub fn element_bytes(self) -> u64 {
        (self.components() * std::mem::size_of::<f32>()) as u64
    }

    /// The distance between consecutive elements for a given stride.
    ///
    /// A stride of zero means tightly packed.
    pub fn effective_stride(self, stride_bytes: u32) -> u64 {
        if stride_bytes == 0 {
            self.element_bytes()
        } else {
            stride_bytes as u64
        }
    }
}

/// Where an attribute's data comes from.
#[derive(Debug, Clone, Copy)]
pub enum AttributeSource<'a> {
    /// Host memory, starting `offset_floats` floats into `data`
    Host {
        /// Backing array
        data: &'a [f32],
        /// First float of the first element
        offset_floats: usize,
    },
    /// A device buffer, starting `offset_bytes` into it
    Device {
        /// Buffer created by the same device
        buffer: BufferId,
        /// Byte offset of the first element
        offset_bytes: u64,
    },
}

/// Describes how to fetch one vertex attribute.
#[derive(Debug, Clone, Copy)]
pub struct AttributePointer<'a> {
    /// Which attribute this pointer feeds
    pub attribute: VertexAttribute,
    /// Bytes between consecutive elements, or 0 for tightly packed
    pub stride_bytes: u32,
    /// Where the data lives
    pub source: AttributeSource<'a>,
}

/// Errors reported by a graphics device.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// The device could not allocate the buffer.
    #[error("device out of memory allocating {requested_bytes} bytes")]
    OutOfMemory {
        /// Size of the refused buffer
        requested_bytes: u64,
    },

    /// The buffer exceeds the device's maximum buffer size.
    #[error("buffer of {requested_bytes} bytes exceeds device maximum of {max_bytes} bytes")]
    BufferTooLarge {
        /// Size of the refused buffer
        requested_bytes: u64,
        /// Largest buffer the device supports
        max_bytes: u64,
    },
}

/// A vertex-array style graphics device.
///
/// All calls are made from the render thread.
pub trait GraphicsDevice {
    /// Creates a static vertex buffer initialised with `data`.
    ///
    /// # Errors
    /// `DeviceError` if the device cannot hold the buffer.
    fn create_vertex_buffer(&mut self, label: &str, data: &[f32]) -> Result<BufferId, DeviceError>;

    /// Deletes buffers created by this device. Each id must be deleted once.
    fn delete_buffers(&mut self, buffers: &[BufferId]);

    /// Enables fetching for `attribute` in subsequent draws.
    fn enable_attribute(&mut self, attribute: VertexAttribute);

    /// Disables fetching for `attribute`.
    fn disable_attribute(&mut self, attribute: VertexAttribute);

    /// Sets the data source for an attribute.
    fn attribute_pointer(&mut self, pointer: AttributePointer<'_>);

    /// Draws `vertex_count` vertices as a non-indexed triangle list.
    fn draw_triangles(&mut self, first_vertex: u32, vertex_count: u32);
}
