//! Per-cube templates shared by every cube in the grid.
//!
//! All cubes are axis-aligned and identically oriented, so normals and texture
//! coordinates only depend on the vertex's position inside the 36-vertex cube
//! template, never on the cube itself.

use cgmath::Point3;

use super::{NORMAL_DATA_SIZE, TEXTURE_COORDINATE_DATA_SIZE, VERTICES_PER_CUBE};

/// Vertices per face: two triangles.
pub const VERTICES_PER_FACE: usize = 6;

/// Texture coordinates for a single face, matching the triangulation in
/// [`FACE_TRIANGLES`].
#[rustfmt::skip]
pub const FACE_TEXTURE_COORDINATES: [f32; VERTICES_PER_FACE * TEXTURE_COORDINATE_DATA_SIZE] = [
    0.0, 0.0,
    0.0, 1.0,
    1.0, 0.0,
    0.0, 1.0,
    1.0, 1.0,
    1.0, 0.0,
];

/// Outward normal of each face, in face order front, right, back, left, top, bottom.
pub const FACE_NORMALS: [[f32; NORMAL_DATA_SIZE]; 6] = [
    [0.0, 0.0, 1.0],
    [1.0, 0.0, 0.0],
    [0.0, 0.0, -1.0],
    [-1.0, 0.0, 0.0],
    [0.0, 1.0, 0.0],
    [0.0, -1.0, 0.0],
];

/// Corner indices (into [`CubeCorners`]) of the two triangles of each face.
///
/// Corners are numbered `p1..p8` in the docs and `0..7` here:
/// `p1 = (x1, y2, z2)`, `p2 = (x2, y2, z2)`, `p3 = (x1, y1, z2)`, `p4 = (x2, y1, z2)`,
/// `p5 = (x1, y2, z1)`, `p6 = (x2, y2, z1)`, `p7 = (x1, y1, z1)`, `p8 = (x2, y1, z1)`.
/// Every triangle winds counter-clockwise when seen from outside the cube.
#[rustfmt::skip]
pub const FACE_TRIANGLES: [[usize; VERTICES_PER_FACE]; 6] = [
    [0, 2, 1, 2, 3, 1], // front
    [1, 3, 5, 3, 7, 5], // right
    [7, 6, 5, 6, 4, 5], // back
    [4, 6, 0, 6, 2, 0], // left
    [4, 0, 5, 0, 1, 5], // top
    [7, 3, 6, 3, 2, 6], // bottom
];

/// The eight corners of one axis-aligned cube.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeCorners(pub [Point3<f32>; 8]);

impl CubeCorners {
    /// Builds the corners of the box spanning `min..max`.
    pub fn from_bounds(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self([
            Point3::new(min.x, max.y, max.z),
            Point3::new(max.x, max.y, max.z),
            Point3::new(min.x, min.y, max.z),
            Point3::new(max.x, min.y, max.z),
            Point3::new(min.x, max.y, min.z),
            Point3::new(max.x, max.y, min.z),
            Point3::new(min.x, min.y, min.z),
            Point3::new(max.x, min.y, min.z),
        ])
    }

    /// Appends the 36 triangulated vertex positions of this cube to `out`.
    pub fn extend_positions(&self, out: &mut Vec<f32>) {
        for face in FACE_TRIANGLES.iter() {
            for &corner in face {
                let point = self.0[corner];
                out.extend_from_slice(&[point.x, point.y, point.z]);
            }
        }
    }
}

/// The 36-vertex normal template for a single cube.
pub fn cube_normal_template() -> [f32; VERTICES_PER_CUBE * NORMAL_DATA_SIZE] {
    let mut template = [0.0; VERTICES_PER_CUBE * NORMAL_DATA_SIZE];
    for (face, normal) in FACE_NORMALS.iter().enumerate() {
        for vertex in 0..VERTICES_PER_FACE {
            let start = (face * VERTICES_PER_FACE + vertex) * NORMAL_DATA_SIZE;
            template[start..start + NORMAL_DATA_SIZE].copy_from_slice(normal);
        }
    }
    template
}

/// The 36-vertex texture coordinate template for a single cube: the face
/// template repeated for all six faces.
pub fn cube_texture_coordinate_template() -> [f32; VERTICES_PER_CUBE * TEXTURE_COORDINATE_DATA_SIZE] {
    let mut template = [0.0; VERTICES_PER_CUBE * TEXTURE_COORDINATE_DATA_SIZE];
    for chunk in template.chunks_exact_mut(FACE_TEXTURE_COORDINATES.len()) {
        chunk.copy_from_slice(&FACE_TEXTURE_COORDINATES);
    }
    template
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::geometry::POSITION_DATA_SIZE;
    use cgmath::{InnerSpace, Vector3};

    fn unit_cube() -> CubeCorners {
        CubeCorners::from_bounds(Point3::new(-1.0, -1.0, -1.0), Point3::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn triangles_wind_counter_clockwise_from_outside() {
        let corners = unit_cube();
        for (face, triangles) in FACE_TRIANGLES.iter().enumerate() {
            let normal = Vector3::from(FACE_NORMALS[face]);
            for triangle in triangles.chunks_exact(3) {
                let a = corners.0[triangle[0]];
                let b = corners.0[triangle[1]];
                let c = corners.0[triangle[2]];
                let winding = (b - a).cross(c - a).normalize();
                assert!(
                    winding.dot(normal) > 0.99,
                    "face {face} triangle {triangle:?} winds away from its normal"
                );
            }
        }
    }

    #[test]
    fn templates_cover_every_vertex() {
        let mut positions = Vec::new();
        unit_cube().extend_positions(&mut positions);

        assert_eq!(positions.len(), VERTICES_PER_CUBE * POSITION_DATA_SIZE);
        assert_eq!(cube_normal_template().len(), VERTICES_PER_CUBE * NORMAL_DATA_SIZE);
        assert_eq!(
            cube_texture_coordinate_template().len(),
            VERTICES_PER_CUBE * TEXTURE_COORDINATE_DATA_SIZE
        );
    }

    #[test]
    fn texture_coordinates_stay_in_unit_range() {
        assert!(cube_texture_coordinate_template()
            .iter()
            .all(|value| (0.0..=1.0).contains(value)));
    }
}
