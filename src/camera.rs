// Perspective camera for the hero viewport

use glam::{Mat4, Vec3};

pub const FOV_DEGREES: f32 = 75.0;
pub const NEAR: f32 = 0.1;
pub const FAR: f32 = 1000.0;
/// Distance of the camera from the origin at setup.
pub const START_DISTANCE: f32 = 1.0;

#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    projection: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov,
            aspect,
            near,
            far,
            position: Vec3::new(0.0, 0.0, START_DISTANCE),
            target: Vec3::ZERO,
            projection: Mat4::IDENTITY,
        };
        camera.update_projection_matrix();
        camera
    }

    /// Hero camera for a viewport of `width` x `height`.
    pub fn for_viewport(width: u32, height: u32) -> Self {
        Self::new(FOV_DEGREES, width as f32 / height as f32, NEAR, FAR)
    }

    /// Recompute the cached projection after changing fov, aspect or planes.
    pub fn update_projection_matrix(&mut self) {
        self.projection = Mat4::perspective_rh(self.fov.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn projection_matrix(&self) -> Mat4 {
        self.projection
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view_matrix()
    }
}
