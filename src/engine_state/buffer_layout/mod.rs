//! # Buffer Layout Strategies
//!
//! A [`BufferLayout`] owns the vertex data of one generated cube grid and
//! knows how to feed it to a [`GraphicsDevice`]. There are four layouts,
//! selected by [`LayoutSettings`]:
//!
//! | storage     | stride      | variant            | resources                 |
//! |-------------|-------------|--------------------|---------------------------|
//! | client-side | separate    | `SeparateArray`    | three host arrays         |
//! | client-side | interleaved | `InterleavedArray` | one host array            |
//! | VBO         | separate    | `SeparateVbo`      | three device buffers      |
//! | VBO         | interleaved | `InterleavedVbo`   | one device buffer         |
//!
//! Interleaved layouts use a 32-byte record with the normal at byte 12 and
//! the texture coordinate at byte 24. Separate layouts use tightly packed
//! streams.
//!
//! A layout must be released with [`BufferLayout::release`] exactly once,
//! before whatever replaces it is built.

pub mod interleave;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::geometry::{CubeGeometry, GeometryError, MemoryBudget, BYTES_PER_FLOAT};
use super::gpu::{
    AttributePointer, AttributeSource, BufferId, DeviceError, GraphicsDevice, VertexAttribute,
};
pub use interleave::{deinterleave, interleave};
use interleave::{
    INTERLEAVED_STRIDE_BYTES, NORMAL_OFFSET_FLOATS, POSITION_OFFSET_FLOATS,
    TEXTURE_COORDINATE_OFFSET_FLOATS,
};

/// Where vertex data lives while it is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageMode {
    /// Host memory, handed to the device on every draw
    ClientSide,
    /// Device buffers uploaded once
    Vbo,
}

impl StorageMode {
    /// The other storage mode.
    pub fn toggled(self) -> Self {
        match self {
            StorageMode::ClientSide => StorageMode::Vbo,
            StorageMode::Vbo => StorageMode::ClientSide,
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageMode::ClientSide => write!(f, "Not using VBOs"),
            StorageMode::Vbo => write!(f, "Using VBOs"),
        }
    }
}

/// How the three attributes are arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrideMode {
    /// One tightly packed stream per attribute
    Separate,
    /// One stream of `[position, normal, texcoord]` records
    Interleaved,
}

impl StrideMode {
    /// The other stride mode.
    pub fn toggled(self) -> Self {
        match self {
            StrideMode::Separate => StrideMode::Interleaved,
            StrideMode::Interleaved => StrideMode::Separate,
        }
    }
}

impl fmt::Display for StrideMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrideMode::Separate => write!(f, "Not using stride"),
            StrideMode::Interleaved => write!(f, "Using stride"),
        }
    }
}

/// The storage/stride pair that selects a layout variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayoutSettings {
    pub storage: StorageMode,
    pub stride: StrideMode,
}

impl LayoutSettings {
    /// Builds settings from the two on/off switches used in configuration.
    pub fn from_flags(use_vbos: bool, use_stride: bool) -> Self {
        Self {
            storage: if use_vbos {
                StorageMode::Vbo
            } else {
                StorageMode::ClientSide
            },
            stride: if use_stride {
                StrideMode::Interleaved
            } else {
                StrideMode::Separate
            },
        }
    }

    /// Returns these settings with the requested modes flipped.
    pub fn with_toggles(self, toggle_storage: bool, toggle_stride: bool) -> Self {
        Self {
            storage: if toggle_storage {
                self.storage.toggled()
            } else {
                self.storage
            },
            stride: if toggle_stride {
                self.stride.toggled()
            } else {
                self.stride
            },
        }
    }
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self::from_flags(true, true)
    }
}

/// Failure while building a layout.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    /// Host memory for the layout could not be allocated.
    #[error("host allocation failed: {0}")]
    Geometry(#[from] GeometryError),

    /// A device buffer could not be created.
    #[error("device allocation failed: {0}")]
    Device(#[from] DeviceError),
}

/// Vertex data for one cube grid in one of the four layouts.
#[derive(Debug)]
pub enum BufferLayout {
    /// Three host arrays with tightly packed attributes
    SeparateArray {
        positions: Vec<f32>,
        normals: Vec<f32>,
        tex_coords: Vec<f32>,
        vertex_count: u32,
    },
    /// One host array of interleaved records
    InterleavedArray { data: Vec<f32>, vertex_count: u32 },
    /// Position, normal and texcoord buffers, in that order
    SeparateVbo {
        buffers: [BufferId; 3],
        vertex_count: u32,
    },
    /// One buffer of interleaved records
    InterleavedVbo { buffer: BufferId, vertex_count: u32 },
}

impl BufferLayout {
    /// Builds the layout selected by `settings`, consuming the geometry.
    ///
    /// # Arguments
    /// * `geometry` - Freshly generated vertex data
    /// * `settings` - Selects the variant
    /// * `device` - Creates the device buffers for VBO variants
    /// * `budget` - Bounds host allocations made while interleaving
    ///
    /// # Errors
    /// `LayoutError` if host or device memory runs out. Buffers created
    /// before the failure have been deleted by the time this returns.
    pub fn build(
        geometry: CubeGeometry,
        settings: LayoutSettings,
        device: &mut dyn GraphicsDevice,
        budget: &MemoryBudget,
    ) -> Result<Self, LayoutError> {
        let vertex_count = geometry.vertex_count() as u32;

        let layout = match (settings.storage, settings.stride) {
            (StorageMode::ClientSide, StrideMode::Separate) => BufferLayout::SeparateArray {
                positions: geometry.positions,
                normals: geometry.normals,
                tex_coords: geometry.tex_coords,
                vertex_count,
            },
            (StorageMode::ClientSide, StrideMode::Interleaved) => BufferLayout::InterleavedArray {
                data: interleave(&geometry, budget)?,
                vertex_count,
            },
            (StorageMode::Vbo, StrideMode::Separate) => {
                let streams: [(&str, &[f32]); 3] = [
                    ("Cube positions", geometry.positions.as_slice()),
                    ("Cube normals", geometry.normals.as_slice()),
                    ("Cube texture coordinates", geometry.tex_coords.as_slice()),
                ];
                let mut created = Vec::with_capacity(streams.len());
                for (label, data) in streams {
                    match device.create_vertex_buffer(label, data) {
                        Ok(buffer) => created.push(buffer),
                        Err(error) => {
                            device.delete_buffers(&created);
                            return Err(error.into());
                        }
                    }
                }
                BufferLayout::SeparateVbo {
                    buffers: [created[0], created[1], created[2]],
                    vertex_count,
                }
            }
            (StorageMode::Vbo, StrideMode::Interleaved) => {
                let data = interleave(&geometry, budget)?;
                drop(geometry);
                BufferLayout::InterleavedVbo {
                    buffer: device.create_vertex_buffer("Cube interleaved vertices", &data)?,
                    vertex_count,
                }
            }
        };

        log::debug!("Built {} layout for {} vertices", layout.name(), vertex_count);
        Ok(layout)
    }

    /// The settings that select this variant.
    pub fn settings(&self) -> LayoutSettings {
        match self {
            BufferLayout::SeparateArray { .. } => LayoutSettings::from_flags(false, false),
            BufferLayout::InterleavedArray { .. } => LayoutSettings::from_flags(false, true),
            BufferLayout::SeparateVbo { .. } => LayoutSettings::from_flags(true, false),
            BufferLayout::InterleavedVbo { .. } => LayoutSettings::from_flags(true, true),
        }
    }

    /// Number of vertices drawn per frame.
    pub fn vertex_count(&self) -> u32 {
        match self {
            BufferLayout::SeparateArray { vertex_count, .. }
            | BufferLayout::InterleavedArray { vertex_count, .. }
            | BufferLayout::SeparateVbo { vertex_count, .. }
            | BufferLayout::InterleavedVbo { vertex_count, .. } => *vertex_count,
        }
    }

    /// Short variant name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            BufferLayout::SeparateArray { .. } => "separate-array",
            BufferLayout::InterleavedArray { .. } => "interleaved-array",
            BufferLayout::SeparateVbo { .. } => "separate-VBO",
            BufferLayout::InterleavedVbo { .. } => "interleaved-VBO",
        }
    }

    /// Draws every cube with one triangle-list draw.
    ///
    /// Enables the three attributes, points them at this layout's data,
    /// draws, then disables them again.
    pub fn render(&self, device: &mut dyn GraphicsDevice) {
        match self {
            BufferLayout::SeparateArray {
                positions,
                normals,
                tex_coords,
                ..
            } => {
                for (attribute, data) in VertexAttribute::ALL.into_iter().zip([
                    positions.as_slice(),
                    normals.as_slice(),
                    tex_coords.as_slice(),
                ]) {
                    device.attribute_pointer(AttributePointer {
                        attribute,
                        stride_bytes: 0,
                        source: AttributeSource::Host {
                            data,
                            offset_floats: 0,
                        },
                    });
                    device.enable_attribute(attribute);
                }
            }
            BufferLayout::InterleavedArray { data, .. } => {
                for (attribute, offset_floats) in record_offsets() {
                    device.attribute_pointer(AttributePointer {
                        attribute,
                        stride_bytes: INTERLEAVED_STRIDE_BYTES,
                        source: AttributeSource::Host {
                            data,
                            offset_floats,
                        },
                    });
                    device.enable_attribute(attribute);
                }
            }
            BufferLayout::SeparateVbo { buffers, .. } => {
                for (attribute, buffer) in VertexAttribute::ALL.into_iter().zip(*buffers) {
                    device.attribute_pointer(AttributePointer {
                        attribute,
                        stride_bytes: 0,
                        source: AttributeSource::Device {
                            buffer,
                            offset_bytes: 0,
                        },
                    });
                    device.enable_attribute(attribute);
                }
            }
            BufferLayout::InterleavedVbo { buffer, .. } => {
                for (attribute, offset_floats) in record_offsets() {
                    device.attribute_pointer(AttributePointer {
                        attribute,
                        stride_bytes: INTERLEAVED_STRIDE_BYTES,
                        source: AttributeSource::Device {
                            buffer: *buffer,
                            offset_bytes: (offset_floats * BYTES_PER_FLOAT) as u64,
                        },
                    });
                    device.enable_attribute(attribute);
                }
            }
        }

        device.draw_triangles(0, self.vertex_count());

        for attribute in VertexAttribute::ALL {
            device.disable_attribute(attribute);
        }
    }

    /// Releases the layout's resources. Consumes the layout, so it cannot be
    /// drawn or released again.
    pub fn release(self, device: &mut dyn GraphicsDevice) {
        log::debug!("Releasing {} layout", self.name());
        match self {
            BufferLayout::SeparateVbo { buffers, .. } => device.delete_buffers(&buffers),
            BufferLayout::InterleavedVbo { buffer, .. } => device.delete_buffers(&[buffer]),
            BufferLayout::SeparateArray { .. } | BufferLayout::InterleavedArray { .. } => {}
        }
    }
}

fn record_offsets() -> [(VertexAttribute, usize); 3] {
    [
        (VertexAttribute::Position, POSITION_OFFSET_FLOATS),
        (VertexAttribute::Normal, NORMAL_OFFSET_FLOATS),
        (VertexAttribute::TexCoord, TEXTURE_COORDINATE_OFFSET_FLOATS),
    ]
}
