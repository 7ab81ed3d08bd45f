//! # Cube Grid Geometry
//!
//! Builds the vertex data for an N×N×N grid of unit cubes packed into the
//! fixed volume [-1, 1]³.
//!
//! ## Layout
//!
//! The grid is split into `2N - 1` equal segments per axis. Even segments hold
//! a cube, odd segments are the gaps between them, so the cube pitch is
//! `2 / (2N - 1)` and the outermost cube faces touch the volume bounds.
//!
//! ## Output
//!
//! Geometry is a non-indexed triangle list: 36 vertices per cube (six faces,
//! two triangles each). Positions are computed per cube; normals and texture
//! coordinates are the same 36-entry templates repeated for every cube, since
//! all cubes share one orientation.
//!
//! ## Memory
//!
//! Every allocation goes through a [`MemoryBudget`], which turns allocation
//! failure into [`GeometryError::OutOfMemory`] instead of aborting the process.

pub mod templates;

use std::fmt;

use cgmath::Point3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use templates::{cube_normal_template, cube_texture_coordinate_template, CubeCorners};

/// Floats per vertex position.
pub const POSITION_DATA_SIZE: usize = 3;
/// Floats per vertex normal.
pub const NORMAL_DATA_SIZE: usize = 3;
/// Floats per vertex texture coordinate.
pub const TEXTURE_COORDINATE_DATA_SIZE: usize = 2;
/// Bytes per float.
pub const BYTES_PER_FLOAT: usize = std::mem::size_of::<f32>();
/// Vertices per cube: 6 faces × 2 triangles × 3 vertices.
pub const VERTICES_PER_CUBE: usize = 36;

/// Smallest supported grid side length.
pub const MIN_CUBE_FACTOR: u32 = 1;
/// Largest supported grid side length.
pub const MAX_CUBE_FACTOR: u32 = 16;

const MIN_POSITION: f32 = -1.0;
const MAX_POSITION: f32 = 1.0;

/// Errors raised while building cube geometry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// The requested grid side length is outside `MIN_CUBE_FACTOR..=MAX_CUBE_FACTOR`.
    #[error("cube factor {0} is outside {min}..={max}", min = MIN_CUBE_FACTOR, max = MAX_CUBE_FACTOR)]
    InvalidCubeFactor(u32),

    /// An allocation was refused, either by the budget or by the allocator.
    #[error("out of memory allocating {requested_bytes} bytes of vertex data")]
    OutOfMemory {
        /// Size of the refused allocation
        requested_bytes: usize,
    },
}

/// Side length of the cube grid.
///
/// A factor of `N` produces `N³` cubes. Only values in
/// `MIN_CUBE_FACTOR..=MAX_CUBE_FACTOR` can be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct CubeFactor(u32);

impl CubeFactor {
    /// Creates a cube factor, validating its range.
    pub fn new(factor: u32) -> Result<Self, GeometryError> {
        if (MIN_CUBE_FACTOR..=MAX_CUBE_FACTOR).contains(&factor) {
            Ok(Self(factor))
        } else {
            Err(GeometryError::InvalidCubeFactor(factor))
        }
    }

    /// The raw side length.
    pub fn get(self) -> u32 {
        self.0
    }

    /// Number of cubes in the grid (`N³`).
    pub fn cube_count(self) -> usize {
        let n = self.0 as usize;
        n * n * n
    }

    /// Number of vertices in the grid (`36 · N³`).
    pub fn vertex_count(self) -> usize {
        self.cube_count() * VERTICES_PER_CUBE
    }

    /// The next larger factor, or `None` at the upper bound.
    pub fn increased(self) -> Option<Self> {
        Self::new(self.0 + 1).ok()
    }

    /// The next smaller factor, or `None` at the lower bound.
    pub fn decreased(self) -> Option<Self> {
        Self::new(self.0.checked_sub(1)?).ok()
    }
}

impl TryFrom<u32> for CubeFactor {
    type Error = GeometryError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CubeFactor> for u32 {
    fn from(factor: CubeFactor) -> Self {
        factor.0
    }
}

impl fmt::Display for CubeFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{0}x{0}x{0}", self.0)
    }
}

/// Allocation policy for vertex data.
///
/// `max_allocation_bytes` caps any single allocation; `None` leaves only the
/// system allocator as the limit. Allocations use `try_reserve_exact`, so a
/// refusal from the allocator is reported rather than aborting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryBudget {
    /// Largest single allocation allowed, in bytes
    pub max_allocation_bytes: Option<usize>,
}

impl MemoryBudget {
    /// A budget bounded only by the system allocator.
    pub fn unlimited() -> Self {
        Self::default()
    }

    /// A budget that refuses any allocation larger than `max_allocation_bytes`.
    pub fn limited(max_allocation_bytes: usize) -> Self {
        Self {
            max_allocation_bytes: Some(max_allocation_bytes),
        }
    }

    /// Allocates an empty float vector with room for exactly `floats` elements.
    ///
    /// # Errors
    /// `GeometryError::OutOfMemory` if the request exceeds the budget or the
    /// allocator refuses it.
    pub fn allocate_floats(&self, floats: usize) -> Result<Vec<f32>, GeometryError> {
        let requested_bytes = floats.saturating_mul(BYTES_PER_FLOAT);
        if let Some(limit) = self.max_allocation_bytes {
            if requested_bytes > limit {
                return Err(GeometryError::OutOfMemory { requested_bytes });
            }
        }

        let mut data = Vec::new();
        data.try_reserve_exact(floats)
            .map_err(|_| GeometryError::OutOfMemory { requested_bytes })?;
        Ok(data)
    }

    /// Allocates a vector holding `template` repeated `times` times.
    pub fn repeat_template(&self, template: &[f32], times: usize) -> Result<Vec<f32>, GeometryError> {
        let mut data = self.allocate_floats(template.len().saturating_mul(times))?;
        for _ in 0..times {
            data.extend_from_slice(template);
        }
        Ok(data)
    }
}

/// Vertex data for a whole cube grid, one flat array per attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct CubeGeometry {
    /// The grid size this geometry was generated for
    pub cube_factor: CubeFactor,
    /// `x, y, z` per vertex
    pub positions: Vec<f32>,
    /// `x, y, z` per vertex
    pub normals: Vec<f32>,
    /// `s, t` per vertex
    pub tex_coords: Vec<f32>,
}

impl CubeGeometry {
    /// Number of vertices held by this geometry.
    pub fn vertex_count(&self) -> usize {
        self.positions.len() / POSITION_DATA_SIZE
    }

    /// Total bytes across all three arrays.
    pub fn byte_size(&self) -> usize {
        (self.positions.len() + self.normals.len() + self.tex_coords.len()) * BYTES_PER_FLOAT
    }
}

/// Lower and upper bound of grid cell `index` along one axis.
fn cell_bounds(index: u32, segments: u32) -> (f32, f32) {
    let pitch = (MAX_POSITION - MIN_POSITION) / segments as f32;
    let low = MIN_POSITION + pitch * (index * 2) as f32;
    let high = MIN_POSITION + pitch * (index * 2 + 1) as f32;
    (low, high)
}

/// Generates the vertex data for an N×N×N cube grid.
///
/// Cubes are emitted with `x` outermost and `z` innermost.
///
/// # Arguments
/// * `cube_factor` - Grid side length
/// * `budget` - Allocation policy for the three output arrays
///
/// # Errors
/// `GeometryError::OutOfMemory` if any of the arrays cannot be allocated.
///
/// # Example
/// ```rust
/// use cube_batch::engine_state::geometry::{generate_cube_grid, CubeFactor, MemoryBudget};
///
/// let geometry = generate_cube_grid(CubeFactor::new(3)?, &MemoryBudget::unlimited())?;
/// assert_eq!(geometry.positions.len(), 2916);
/// # Ok::<(), cube_batch::engine_state::geometry::GeometryError>(())
/// ```
pub fn generate_cube_grid(
    cube_factor: CubeFactor,
    budget: &MemoryBudget,
) -> Result<CubeGeometry, GeometryError> {
    let n = cube_factor.get();
    let cube_count = cube_factor.cube_count();
    let segments = n + (n - 1);

    let mut positions = budget.allocate_floats(cube_factor.vertex_count() * POSITION_DATA_SIZE)?;

    for x in 0..n {
        let (x1, x2) = cell_bounds(x, segments);
        for y in 0..n {
            let (y1, y2) = cell_bounds(y, segments);
            for z in 0..n {
                let (z1, z2) = cell_bounds(z, segments);
                CubeCorners::from_bounds(Point3::new(x1, y1, z1), Point3::new(x2, y2, z2))
                    .extend_positions(&mut positions);
            }
        }
    }

    let normals = budget.repeat_template(&cube_normal_template(), cube_count)?;
    let tex_coords = budget.repeat_template(&cube_texture_coordinate_template(), cube_count)?;

    let geometry = CubeGeometry {
        cube_factor,
        positions,
        normals,
        tex_coords,
    };
    log::debug!(
        "Generated {} cubes ({} vertices, {} bytes)",
        cube_count,
        geometry.vertex_count(),
        geometry.byte_size()
    );

    Ok(geometry)
}
