//! A graphics device that records calls and tracks buffer lifetimes.
//!
//! Buffers are kept in host memory. Every draw resolves the enabled
//! attributes against the data they point at, so the vertices a draw would
//! fetch can be inspected afterwards with [`RecordedDraw::vertex`].
//! Misuse (drawing with an attribute that has no pointer, pointing at a
//! deleted buffer, deleting a buffer twice) is collected as a violation
//! instead of panicking.

use std::{collections::HashMap, sync::Arc};

use super::{
    AttributePointer, AttributeSource, BufferId, DeviceError, GraphicsDevice, VertexAttribute,
};

/// One call made against a [`RecordingDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    /// A buffer was created
    CreateBuffer {
        /// New buffer id
        id: BufferId,
        /// Debug label
        label: String,
        /// Number of floats uploaded
        floats: usize,
    },
    /// A buffer creation was refused
    CreateBufferFailed {
        /// Debug label
        label: String,
        /// Size of the refused buffer
        requested_bytes: u64,
    },
    /// Buffers were deleted
    DeleteBuffers(Vec<BufferId>),
    /// An attribute was enabled
    EnableAttribute(VertexAttribute),
    /// An attribute was disabled
    DisableAttribute(VertexAttribute),
    /// An attribute pointer was set
    AttributePointer {
        /// Target attribute
        attribute: VertexAttribute,
        /// Stride in bytes, 0 for tightly packed
        stride_bytes: u32,
        /// Source buffer, or `None` for host memory
        buffer: Option<BufferId>,
    },
    /// A triangle list was drawn
    DrawTriangles {
        /// First vertex
        first_vertex: u32,
        /// Vertex count
        vertex_count: u32,
    },
}

#[derive(Debug, Clone)]
enum PointerTarget {
    Host(Arc<[f32]>),
    Device(BufferId),
}

#[derive(Debug, Clone)]
struct PointerState {
    stride_bytes: u32,
    offset_bytes: u64,
    target: PointerTarget,
}

/// The data an attribute was fetching from at the time of a draw.
#[derive(Debug, Clone)]
pub struct ResolvedAttribute {
    /// Buffer the attribute read from, `None` for host memory
    pub buffer: Option<BufferId>,
    /// Stride in bytes as given to the pointer call
    pub stride_bytes: u32,
    /// Byte offset of the first element
    pub offset_bytes: u64,
    data: Arc<[f32]>,
}

/// A draw call with its attribute state resolved.
#[derive(Debug, Clone)]
pub struct RecordedDraw {
    /// First vertex
    pub first_vertex: u32,
    /// Vertex count
    pub vertex_count: u32,
    /// Resolved source of each enabled attribute, indexed by shader location
    pub attributes: [Option<ResolvedAttribute>; 3],
}

impl RecordedDraw {
    /// The components of `attribute` that this draw fetched for vertex `index`.
    ///
    /// Returns `None` if the attribute was disabled or the element lies
    /// outside its source data.
    pub fn vertex(&self, attribute: VertexAttribute, index: usize) -> Option<&[f32]> {
        let resolved = self.attributes[attribute.location()].as_ref()?;
        let float_size = std::mem::size_of::<f32>() as u64;
        let stride_floats = (attribute.effective_stride(resolved.stride_bytes) / float_size) as usize;
        let start = (resolved.offset_bytes / float_size) as usize + index * stride_floats;
        resolved.data.get(start..start + attribute.components())
    }

    /// The full `[position, normal, texcoord]` record for vertex `index`.
    pub fn vertex_record(&self, index: usize) -> Option<Vec<f32>> {
        let mut record = Vec::with_capacity(8);
        for attribute in VertexAttribute::ALL {
            record.extend_from_slice(self.vertex(attribute, index)?);
        }
        Some(record)
    }
}

/// Host-memory graphics device that records calls and tracks outstanding buffers.
///
/// # Examples
/// ```
/// use cube_batch::engine_state::gpu::{GraphicsDevice, RecordingDevice};
///
/// let mut device = RecordingDevice::new();
/// let buffer = device.create_vertex_buffer("positions", &[0.0; 9]).unwrap();
/// assert_eq!(device.live_buffer_count(), 1);
///
/// device.delete_buffers(&[buffer]);
/// assert_eq!(device.live_buffer_count(), 0);
/// assert!(device.violations().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct RecordingDevice {
    buffers: HashMap<BufferId, Arc<[f32]>>,
    next_buffer_id: u32,
    enabled: [bool; 3],
    pointers: [Option<PointerState>; 3],
    calls: Vec<DeviceCall>,
    draws: Vec<RecordedDraw>,
    violations: Vec<String>,
    peak_live_buffers: usize,
    memory_limit_bytes: Option<u64>,
}

impl RecordingDevice {
    /// Creates a device with unlimited memory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a device that refuses buffers once `limit_bytes` of buffers are live.
    pub fn with_memory_limit(limit_bytes: u64) -> Self {
        Self {
            memory_limit_bytes: Some(limit_bytes),
            ..Self::default()
        }
    }

    /// Changes the memory limit; `None` removes it.
    pub fn set_memory_limit(&mut self, limit_bytes: Option<u64>) {
        self.memory_limit_bytes = limit_bytes;
    }

    /// Number of buffers created and not yet deleted.
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Highest number of simultaneously live buffers seen so far.
    pub fn peak_live_buffers(&self) -> usize {
        self.peak_live_buffers
    }

    /// Total bytes held by live buffers.
    pub fn live_bytes(&self) -> u64 {
        self.buffers
            .values()
            .map(|data| (data.len() * std::mem::size_of::<f32>()) as u64)
            .sum()
    }

    /// Whether `attribute` is currently enabled.
    pub fn is_attribute_enabled(&self, attribute: VertexAttribute) -> bool {
        self.enabled[attribute.location()]
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Every draw made so far, in order.
    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    /// Misuse detected so far.
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// Forgets recorded calls and draws, keeping buffers and attribute state.
    pub fn clear_log(&mut self) {
        self.calls.clear();
        self.draws.clear();
    }

    fn resolve(&mut self, attribute: VertexAttribute) -> Option<ResolvedAttribute> {
        let Some(pointer) = self.pointers[attribute.location()].clone() else {
            self.violations
                .push(format!("{attribute:?} enabled without a pointer at draw time"));
            return None;
        };

        let (buffer, data) = match pointer.target {
            PointerTarget::Host(data) => (None, data),
            PointerTarget::Device(id) => match self.buffers.get(&id) {
                Some(data) => (Some(id), data.clone()),
                None => {
                    self.violations
                        .push(format!("{attribute:?} reads deleted or unknown {id} at draw time"));
                    return None;
                }
            },
        };

        Some(ResolvedAttribute {
            buffer,
            stride_bytes: pointer.stride_bytes,
            offset_bytes: pointer.offset_bytes,
            data,
        })
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_vertex_buffer(&mut self, label: &str, data: &[f32]) -> Result<BufferId, DeviceError> {
        let requested_bytes = (data.len() * std::mem::size_of::<f32>()) as u64;
        if let Some(limit) = self.memory_limit_bytes {
            if self.live_bytes() + requested_bytes > limit {
                self.calls.push(DeviceCall::CreateBufferFailed {
                    label: label.to_string(),
                    requested_bytes,
                });
                return Err(DeviceError::OutOfMemory { requested_bytes });
            }
        }

        self.next_buffer_id += 1;
        let id = BufferId(self.next_buffer_id);
        self.buffers.insert(id, Arc::from(data));
        self.peak_live_buffers = self.peak_live_buffers.max(self.buffers.len());
        self.calls.push(DeviceCall::CreateBuffer {
            id,
            label: label.to_string(),
            floats: data.len(),
        });
        Ok(id)
    }

    fn delete_buffers(&mut self, buffers: &[BufferId]) {
        for id in buffers {
            if self.buffers.remove(id).is_none() {
                self.violations.push(format!("deleted {id} which is not live"));
            }
        }
        self.calls.push(DeviceCall::DeleteBuffers(buffers.to_vec()));
    }

    fn enable_attribute(&mut self, attribute: VertexAttribute) {
        self.enabled[attribute.location()] = true;
        self.calls.push(DeviceCall::EnableAttribute(attribute));
    }

    fn disable_attribute(&mut self, attribute: VertexAttribute) {
        self.enabled[attribute.location()] = false;
        self.calls.push(DeviceCall::DisableAttribute(attribute));
    }

    fn attribute_pointer(&mut self, pointer: AttributePointer<'_>) {
        let (state, buffer) = match pointer.source {
            AttributeSource::Host {
                data,
                offset_floats,
            } => (
                PointerState {
                    stride_bytes: pointer.stride_bytes,
                    offset_bytes: (offset_floats * std::mem::size_of::<f32>()) as u64,
                    target: PointerTarget::Host(Arc::from(data)),
                },
                None,
            ),
            AttributeSource::Device {
                buffer,
                offset_bytes,
            } => {
                if !self.buffers.contains_key(&buffer) {
                    self.violations
                        .push(format!("{:?} pointed at unknown {buffer}", pointer.attribute));
                }
                (
                    PointerState {
                        stride_bytes: pointer.stride_bytes,
                        offset_bytes,
                        target: PointerTarget::Device(buffer),
                    },
                    Some(buffer),
                )
            }
        };

        self.pointers[pointer.attribute.location()] = Some(state);
        self.calls.push(DeviceCall::AttributePointer {
            attribute: pointer.attribute,
            stride_bytes: pointer.stride_bytes,
            buffer,
        });
    }

    fn draw_triangles(&mut self, first_vertex: u32, vertex_count: u32) {
        let mut attributes: [Option<ResolvedAttribute>; 3] = [None, None, None];
        for attribute in VertexAttribute::ALL {
            if self.enabled[attribute.location()] {
                attributes[attribute.location()] = self.resolve(attribute);
            }
        }

        self.calls.push(DeviceCall::DrawTriangles {
            first_vertex,
            vertex_count,
        });
        self.draws.push(RecordedDraw {
            first_vertex,
            vertex_count,
            attributes,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_limit_refuses_buffers() {
        let mut device = RecordingDevice::with_memory_limit(16);
        let first = device.create_vertex_buffer("a", &[1.0; 3]).unwrap();
        let refused = device.create_vertex_buffer("b", &[1.0; 2]);

        assert_eq!(refused, Err(DeviceError::OutOfMemory { requested_bytes: 8 }));
        device.delete_buffers(&[first]);
        assert!(device.create_vertex_buffer("b", &[1.0; 2]).is_ok());
    }

    #[test]
    fn double_delete_is_a_violation() {
        let mut device = RecordingDevice::new();
        let buffer = device.create_vertex_buffer("a", &[0.0]).unwrap();
        device.delete_buffers(&[buffer]);
        device.delete_buffers(&[buffer]);
        assert_eq!(device.violations().len(), 1);
    }

    #[test]
    fn drawing_from_a_deleted_buffer_is_a_violation() {
        let mut device = RecordingDevice::new();
        let buffer = device.create_vertex_buffer("a", &[0.0; 9]).unwrap();
        device.enable_attribute(VertexAttribute::Position);
        device.attribute_pointer(AttributePointer {
            attribute: VertexAttribute::Position,
            stride_bytes: 0,
            source: AttributeSource::Device {
                buffer,
                offset_bytes: 0,
            },
        });
        device.delete_buffers(&[buffer]);
        device.draw_triangles(0, 3);

        assert_eq!(device.violations().len(), 1);
        assert!(device.draws()[0].attributes[0].is_none());
    }

    #[test]
    fn strided_host_data_resolves_per_vertex() {
        let data = [1.0, 2.0, 3.0, 9.0, 4.0, 5.0, 6.0, 9.0];
        let mut device = RecordingDevice::new();
        device.enable_attribute(VertexAttribute::Position);
        device.attribute_pointer(AttributePointer {
            attribute: VertexAttribute::Position,
            stride_bytes: 16,
            source: AttributeSource::Host {
                data: &data,
                offset_floats: 0,
            },
        });
        device.draw_triangles(0, 2);

        let draw = &device.draws()[0];
        assert_eq!(draw.vertex(VertexAttribute::Position, 1), Some(&[4.0, 5.0, 6.0][..]));
        assert_eq!(draw.vertex(VertexAttribute::Normal, 0), None);
    }
}
