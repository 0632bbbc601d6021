// Lighting rig for the hero viewport

use glam::Vec3;

pub const WHITE: Vec3 = Vec3::ONE;

/// Violet used by the accent light (#8b5cf6).
pub const ACCENT: u32 = 0x8b5cf6;

/// Convert a packed `0xRRGGBB` colour into linear-ish RGB floats.
pub fn rgb_from_hex(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    /// Uniform fill with no direction.
    Ambient { color: Vec3, intensity: f32 },
    /// Parallel rays shining from `position` toward the origin.
    Directional {
        color: Vec3,
        intensity: f32,
        position: Vec3,
    },
    /// Omni light; `range` of zero means no cutoff.
    Point {
        color: Vec3,
        intensity: f32,
        position: Vec3,
        range: f32,
    },
}

impl Light {
    pub fn ambient(color: Vec3, intensity: f32) -> Self {
        Light::Ambient { color, intensity }
    }

    pub fn directional(color: Vec3, intensity: f32, position: Vec3) -> Self {
        Light::Directional {
            color,
            intensity,
            position,
        }
    }

    pub fn point(color: Vec3, intensity: f32, range: f32, position: Vec3) -> Self {
        Light::Point {
            color,
            intensity,
            position,
            range,
        }
    }

    pub fn intensity(&self) -> f32 {
        match *self {
            Light::Ambient { intensity, .. }
            | Light::Directional { intensity, .. }
            | Light::Point { intensity, .. } => intensity,
        }
    }
}

/// A named light in the rig.
#[derive(Debug, Clone, Copy)]
pub struct RigLight {
    pub name: &'static str,
    pub light: Light,
}

/// The hand-tuned set of lights the hero scene is lit with.
pub fn hero_rig() -> Vec<RigLight> {
    vec![
        RigLight {
            name: "ambient",
            light: Light::ambient(WHITE, 0.6),
        },
        RigLight {
            name: "key",
            light: Light::directional(WHITE, 1.2, Vec3::new(5.0, 5.0, 5.0)),
        },
        RigLight {
            name: "rim_left",
            light: Light::directional(WHITE, 1.5, Vec3::new(-5.0, 0.0, -5.0)),
        },
        RigLight {
            name: "rim_right",
            light: Light::directional(WHITE, 1.0, Vec3::new(5.0, -3.0, -5.0)),
        },
        RigLight {
            name: "back",
            light: Light::directional(WHITE, 1.8, Vec3::new(0.0, 0.0, -10.0)),
        },
        RigLight {
            name: "accent",
            light: Light::directional(rgb_from_hex(ACCENT), 0.3, Vec3::new(-5.0, -5.0, -5.0)),
        },
    ]
}

/// Glow light parented to the loaded model, in model space.
pub fn model_glow() -> Light {
    Light::point(WHITE, 2.0, 10.0, Vec3::new(0.0, 1.0, 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hex_decodes_accent() {
        let c = rgb_from_hex(ACCENT);
        assert_relative_eq!(c.x, 139.0 / 255.0);
        assert_relative_eq!(c.y, 92.0 / 255.0);
        assert_relative_eq!(c.z, 246.0 / 255.0);
    }

    #[test]
    fn rig_has_one_ambient_and_five_directionals() {
        let rig = hero_rig();
        let ambient = rig.iter().filter(|l| matches!(l.light, Light::Ambient { .. })).count();
        let directional = rig
            .iter()
            .filter(|l| matches!(l.light, Light::Directional { .. }))
            .count();
        assert_eq!(ambient, 1);
        assert_eq!(directional, 5);
    }

    #[test]
    fn back_light_is_brightest() {
        let brightest = hero_rig()
            .into_iter()
            .max_by(|a, b| a.light.intensity().total_cmp(&b.light.intensity()))
            .unwrap();
        assert_eq!(brightest.name, "back");
    }
}
