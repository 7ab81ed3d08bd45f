//! Packing of the three attribute streams into one interleaved array.
//!
//! Each vertex record is `[x, y, z, nx, ny, nz, s, t]`.

use crate::engine_state::geometry::{
    CubeGeometry, GeometryError, MemoryBudget, BYTES_PER_FLOAT, NORMAL_DATA_SIZE,
    POSITION_DATA_SIZE, TEXTURE_COORDINATE_DATA_SIZE,
};

/// Floats per interleaved vertex record.
pub const FLOATS_PER_VERTEX: usize =
    POSITION_DATA_SIZE + NORMAL_DATA_SIZE + TEXTURE_COORDINATE_DATA_SIZE;

/// Bytes between consecutive interleaved records.
pub const INTERLEAVED_STRIDE_BYTES: u32 = (FLOATS_PER_VERTEX * BYTES_PER_FLOAT) as u32;

/// Float offset of the position within a record.
pub const POSITION_OFFSET_FLOATS: usize = 0;
/// Float offset of the normal within a record.
pub const NORMAL_OFFSET_FLOATS: usize = POSITION_DATA_SIZE;
/// Float offset of the texture coordinate within a record.
pub const TEXTURE_COORDINATE_OFFSET_FLOATS: usize = POSITION_DATA_SIZE + NORMAL_DATA_SIZE;

/// Interleaves the geometry's attribute arrays into one vector.
///
/// # Errors
/// `GeometryError::OutOfMemory` if the interleaved array cannot be allocated.
pub fn interleave(geometry: &CubeGeometry, budget: &MemoryBudget) -> Result<Vec<f32>, GeometryError> {
    let vertex_count = geometry.vertex_count();
    let mut data = budget.allocate_floats(vertex_count * FLOATS_PER_VERTEX)?;

    let positions = geometry.positions.chunks_exact(POSITION_DATA_SIZE);
    let normals = geometry.normals.chunks_exact(NORMAL_DATA_SIZE);
    let tex_coords = geometry.tex_coords.chunks_exact(TEXTURE_COORDINATE_DATA_SIZE);

    for ((position, normal), tex_coord) in positions.zip(normals).zip(tex_coords) {
        data.extend_from_slice(position);
        data.extend_from_slice(normal);
        data.extend_from_slice(tex_coord);
    }

    Ok(data)
}

/// Splits interleaved records back into position, normal and texture
/// coordinate arrays. A trailing partial record is ignored.
pub fn deinterleave(data: &[f32]) -> (Vec<f32>, Vec<f32>, Vec<f32>) {
    let vertex_count = data.len() / FLOATS_PER_VERTEX;
    let mut positions = Vec::with_capacity(vertex_count * POSITION_DATA_SIZE);
    let mut normals = Vec::with_capacity(vertex_count * NORMAL_DATA_SIZE);
    let mut tex_coords = Vec::with_capacity(vertex_count * TEXTURE_COORDINATE_DATA_SIZE);

    for record in data.chunks_exact(FLOATS_PER_VERTEX) {
        positions.extend_from_slice(&record[..NORMAL_OFFSET_FLOATS]);
        normals.extend_from_slice(&record[NORMAL_OFFSET_FLOATS..TEXTURE_COORDINATE_OFFSET_FLOATS]);
        tex_coords.extend_from_slice(&record[TEXTURE_COORDINATE_OFFSET_FLOATS..]);
    }

    (positions, normals, tex_coords)
}
