//! Orbit camera controls
//!
//! Pointer drags orbit the camera around a fixed target on a sphere; the wheel
//! dollies toward or away from the target when zoom is enabled. Input is
//! accumulated into a pending delta and applied gradually by [`OrbitControls::update`]
//! when damping is on, so motion eases out after the pointer is released.

use std::f32::consts::PI;

use glam::Vec3;

use crate::camera::PerspectiveCamera;

/// Keeps the polar angle away from the poles.
const POLE_EPSILON: f32 = 1e-6;

#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,

    pub enable_damping: bool,
    /// Fraction of the pending delta applied per update when damping.
    pub damping_factor: f32,
    pub enable_zoom: bool,
    pub enable_pan: bool,
    pub enable_rotate: bool,

    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    // Pending input
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,

    dragging: Option<[f32; 2]>,
    disposed: bool,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            target,
            enable_damping: false,
            damping_factor: 0.05,
            enable_zoom: true,
            enable_pan: true,
            enable_rotate: true,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            dragging: None,
            disposed: false,
        }
    }

    /// Controls as the hero section uses them: damped, no panning.
    pub fn hero(enable_zoom: bool) -> Self {
        Self {
            enable_damping: true,
            enable_pan: false,
            enable_zoom,
            ..Self::new(Vec3::ZERO)
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging.is_some()
    }

    pub fn pointer_down(&mut self, x: f32, y: f32) {
        if self.disposed || !self.enable_rotate {
            return;
        }
        self.dragging = Some([x, y]);
    }

    /// Pointer movement; `viewport_height` sets how far a drag turns.
    pub fn pointer_move(&mut self, x: f32, y: f32, viewport_height: f32) {
        let Some([last_x, last_y]) = self.dragging else {
            return;
        };
        if viewport_height <= 0.0 {
            return;
        }
        let (dx, dy) = (x - last_x, y - last_y);
        self.delta_theta -= 2.0 * PI * dx / viewport_height * self.rotate_speed;
        self.delta_phi -= 2.0 * PI * dy / viewport_height * self.rotate_speed;
        self.dragging = Some([x, y]);
    }

    pub fn pointer_up(&mut self) {
        self.dragging = None;
    }

    /// Wheel input in notches; positive scrolls toward the target.
    pub fn wheel(&mut self, notches: f32) {
        if self.disposed || !self.enable_zoom || notches == 0.0 {
            return;
        }
        let step = 0.95_f32.powf(self.zoom_speed);
        self.scale *= step.powf(notches);
    }

    /// Apply pending input to `camera`. Returns whether the camera moved.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        if self.disposed {
            return false;
        }

        let offset = camera.position - self.target;
        let radius = offset.length();
        if radius <= f32::EPSILON {
            return false;
        }
        let mut theta = offset.x.atan2(offset.z);
        let mut phi = (offset.y / radius).clamp(-1.0, 1.0).acos();

        let step = if self.enable_damping { self.damping_factor } else { 1.0 };
        theta += self.delta_theta * step;
        phi = (phi + self.delta_phi * step).clamp(POLE_EPSILON, PI - POLE_EPSILON);
        let new_radius = (radius * self.scale).clamp(self.min_distance, self.max_distance);

        let new_position = self.target
            + Vec3::new(
                new_radius * phi.sin() * theta.sin(),
                new_radius * phi.cos(),
                new_radius * phi.sin() * theta.cos(),
            );

        if self.enable_damping {
            self.delta_theta *= 1.0 - self.damping_factor;
            self.delta_phi *= 1.0 - self.damping_factor;
        } else {
            self.delta_theta = 0.0;
            self.delta_phi = 0.0;
        }
        self.scale = 1.0;

        let moved = new_position.distance_squared(camera.position) > 1e-12;
        camera.position = new_position;
        moved
    }

    /// Drop pending input and stop reacting to events.
    pub fn dispose(&mut self) {
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.scale = 1.0;
        self.dragging = None;
        self.disposed = true;
    }
}
