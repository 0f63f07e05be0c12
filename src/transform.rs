use glam::{Mat4, Quat, Vec3};

// ── Transform ─────────────────────────────────────────────────────────────────

/// Translation / rotation / scale triple, composed into a model matrix as
/// `T × R × S`.  Value type — copied freely into model submissions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Default::default() }
    }

    pub fn from_rotation(rotation: Quat) -> Self {
        Self { rotation, ..Default::default() }
    }

    /// Compose the model matrix (`translate * rotate * scale`).
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Linear interpolation of translation/scale and spherical interpolation
    /// of rotation.  `t` is clamped to `[0, 1]`.
    pub fn lerp(&self, other: &Transform, t: f32) -> Transform {
        let t = t.clamp(0.0, 1.0);
        Transform {
            translation: self.translation.lerp(other.translation, t),
            rotation: self.rotation.slerp(other.rotation, t),
            scale: self.scale.lerp(other.scale, t),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_identity() {
        assert_eq!(Transform::default().to_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn matrix_applies_scale_then_rotation_then_translation() {
        let t = Transform {
            translation: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_z(std::f32::consts::FRAC_PI_2),
            scale: Vec3::splat(2.0),
        };
        // (1, 0, 0) → scaled (2, 0, 0) → rotated (0, 2, 0) → translated (1, 4, 3).
        let p = t.to_matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(1.0, 4.0, 3.0)).length() < 1e-5, "got {p}");
    }

    #[test]
    fn lerp_endpoints_match_inputs() {
        let a = Transform::from_translation(Vec3::ZERO);
        let b = Transform::from_translation(Vec3::new(10.0, 0.0, 0.0));
        assert_eq!(a.lerp(&b, 0.0).translation, a.translation);
        assert_eq!(a.lerp(&b, 1.0).translation, b.translation);
        assert_eq!(a.lerp(&b, 0.5).translation, Vec3::new(5.0, 0.0, 0.0));
    }
}
