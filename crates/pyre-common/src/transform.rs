//! World placement of pooled effects and their attach targets.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Location, rotation and scale in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// World location
    pub location: Vec3,
    /// World rotation
    pub rotation: Quat,
    /// World scale
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Identity transform at the origin.
    pub const IDENTITY: Self = Self {
        location: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    /// Creates an unrotated, unit-scale transform at `location`.
    #[must_use]
    pub const fn from_location(location: Vec3) -> Self {
        Self {
            location,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Replaces the scale.
    #[must_use]
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Translates the location by `offset`. Rotation and scale are kept.
    #[must_use]
    pub fn offset_by(self, offset: Vec3) -> Self {
        Self {
            location: self.location + offset,
            ..self
        }
    }
}
