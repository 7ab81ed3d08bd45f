//! # Camera Implementation
//!
//! - `Camera`: fixed viewpoint looking down the negative Z axis
//! - `Projection`: frustum projection that follows the surface aspect ratio
//! - `ModelRotation`: accumulated drag rotation of the cube grid
//! - `FrameUniforms`: packed matrices and light position for the shader

use cgmath::*;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,  // Scale Z from [-1,1] to [-0.5,0.5]
    0.0, 0.0, 0.5, 1.0,  // Translate Z from [-0.5,0.5] to [0,1]
);

/// Distance along -Z at which the grid is drawn.
pub const MODEL_DISTANCE: f32 = 3.5;

/// Distance along -Z of the point light.
pub const LIGHT_DISTANCE: f32 = 1.0;

#[derive(Debug)]
pub struct Camera {
    pub eye: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new(eye: Point3<f32>, target: Point3<f32>, up: Vector3<f32>) -> Self {
        Self { eye, target, up }
    }

    /// World to eye space.
    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye, self.target, self.up)
    }
}

impl Default for Camera {
    /// Eye just in front of the origin, looking toward the grid.
    fn default() -> Self {
        Self::new(
            Point3::new(0.0, 0.0, -0.5),
            Point3::new(0.0, 0.0, -5.0),
            Vector3::unit_y(),
        )
    }
}

/// Frustum spanning `[-aspect, aspect] x [-1, 1]` at the near plane.
#[derive(Debug)]
pub struct Projection {
    aspect: f32,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: aspect_ratio(width, height),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX
            * frustum(-self.aspect, self.aspect, -1.0, 1.0, self.znear, self.zfar)
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

/// Rotation of the grid accumulated from drag input.
#[derive(Debug)]
pub struct ModelRotation {
    accumulated: Matrix4<f32>,
}

impl ModelRotation {
    pub fn new() -> Self {
        Self {
            accumulated: Matrix4::identity(),
        }
    }

    /// Applies one frame of drag, in degrees: yaw about Y by `delta_x`, then
    /// pitch about X by `delta_y`, on top of everything applied so far.
    pub fn apply(&mut self, delta_x: f32, delta_y: f32) {
        let current = Matrix4::from_angle_y(Deg(delta_x)) * Matrix4::from_angle_x(Deg(delta_y));
        self.accumulated = current * self.accumulated;
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        self.accumulated
    }
}

impl Default for ModelRotation {
    fn default() -> Self {
        Self::new()
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    // cgmath types are not Pod, so matrices are stored as plain arrays
    pub mvp: [[f32; 4]; 4],
    pub mv: [[f32; 4]; 4],
    pub light_pos: [f32; 4],
}

impl FrameUniforms {
    /// Builds the per-frame uniforms from the current matrices.
    ///
    /// # Arguments
    /// * `camera` - Supplies the view matrix
    /// * `projection` - Supplies the projection matrix
    /// * `rotation` - Accumulated model rotation
    pub fn compute(camera: &Camera, projection: &Projection, rotation: &ModelRotation) -> Self {
        let view = camera.calc_matrix();

        let light_model = Matrix4::from_translation(Vector3::new(0.0, 0.0, -LIGHT_DISTANCE));
        let light_in_world = light_model * Vector4::new(0.0, 0.0, 0.0, 1.0);
        let light_in_eye = view * light_in_world;

        let model =
            Matrix4::from_translation(Vector3::new(0.0, 0.0, -MODEL_DISTANCE)) * rotation.matrix();
        let model_view = view * model;
        let model_view_projection = projection.calc_matrix() * model_view;

        Self {
            mvp: model_view_projection.into(),
            mv: model_view.into(),
            light_pos: light_in_eye.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn light_sits_half_a_unit_in_front_of_the_eye() {
        let uniforms =
            FrameUniforms::compute(&Camera::default(), &Projection::new(800, 600, 1.0, 1000.0), &ModelRotation::new());
        // Eye at z = -0.5 looking down -Z; light at z = -1 in world.
        assert!(approx(uniforms.light_pos[0], 0.0));
        assert!(approx(uniforms.light_pos[1], 0.0));
        assert!(approx(uniforms.light_pos[2], -0.5));
        assert!(approx(uniforms.light_pos[3], 1.0));
    }

    #[test]
    fn grid_centre_is_three_units_ahead_in_eye_space() {
        let uniforms =
            FrameUniforms::compute(&Camera::default(), &Projection::new(800, 600, 1.0, 1000.0), &ModelRotation::new());
        let mv = Matrix4::from(uniforms.mv);
        let centre = mv * Vector4::new(0.0, 0.0, 0.0, 1.0);
        assert!(approx(centre.z, -3.0));
    }

    #[test]
    fn projected_depth_is_in_wgpu_range() {
        let uniforms =
            FrameUniforms::compute(&Camera::default(), &Projection::new(640, 480, 1.0, 1000.0), &ModelRotation::new());
        let mvp = Matrix4::from(uniforms.mvp);
        for z in [-1.0f32, 1.0] {
            let clip = mvp * Vector4::new(0.0, 0.0, z, 1.0);
            let depth = clip.z / clip.w;
            assert!((0.0..=1.0).contains(&depth), "depth {depth}");
        }
    }

    #[test]
    fn rotation_composes_on_the_left() {
        let mut rotation = ModelRotation::new();
        rotation.apply(90.0, 0.0);
        rotation.apply(0.0, 90.0);

        let expected = Matrix4::from_angle_x(Deg(90.0)) * Matrix4::from_angle_y(Deg(90.0));
        let actual = rotation.matrix();
        for column in 0..4 {
            for row in 0..4 {
                assert!(approx(actual[column][row], expected[column][row]));
            }
        }
    }

    #[test]
    fn aspect_follows_resize() {
        let mut projection = Projection::new(100, 100, 1.0, 1000.0);
        assert!(approx(projection.aspect(), 1.0));
        projection.resize(200, 100);
        assert!(approx(projection.aspect(), 2.0));
        projection.resize(200, 0);
        assert!(approx(projection.aspect(), 200.0));
    }
}
