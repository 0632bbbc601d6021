// Math utilities for the hero viewport

use glam::{Mat4, Quat, Vec3};

/// Position, rotation and scale of a scene node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Create an identity transform
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Identity transform placed at `position`.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    /// Rotate about the world vertical axis.
    pub fn rotate_y(&mut self, angle: f32) {
        self.rotation = (Quat::from_rotation_y(angle) * self.rotation).normalize();
    }

    /// Rotation about the vertical axis, in radians.
    pub fn yaw(&self) -> f32 {
        self.rotation.to_euler(glam::EulerRot::YXZ).0
    }

    /// Generate transformation matrix
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Smallest box containing every point, or `None` for an empty set.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (min, max) = iter.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Bounds of this box after `matrix` is applied to all eight corners.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        let corners = (0..8).map(|i| {
            let x = if i & 1 == 0 { self.min.x } else { self.max.x };
            let y = if i & 2 == 0 { self.min.y } else { self.max.y };
            let z = if i & 4 == 0 { self.min.z } else { self.max.z };
            matrix.transform_point3(Vec3::new(x, y, z))
        });
        // eight corners always produce a box
        Self::from_points(corners).unwrap_or(*self)
    }
}
