//! # Pyre Common
//!
//! Common types shared by the Pyre effect crates:
//! - ID types (EffectHandle, EffectCategory, AttachTarget)
//! - World placement (Transform)
//! - Error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod transform;

pub use glam::{Quat, Vec3};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::transform::*;
    pub use glam::{Quat, Vec3};
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_null_handle_is_invalid() {
        assert!(!EffectHandle::NULL.is_valid());
        assert!(EffectHandle::FIRST.is_valid());
        assert_eq!(EffectHandle::FIRST.next().raw(), 2);
    }

    #[test]
    fn test_transform_offset_keeps_scale() {
        let base = Transform::from_location(Vec3::new(10.0, 0.0, 5.0)).with_scale(Vec3::splat(2.0));
        let moved = base.offset_by(Vec3::new(0.0, 0.0, 100.0));

        assert_eq!(moved.location, Vec3::new(10.0, 0.0, 105.0));
        assert_eq!(moved.scale, Vec3::splat(2.0));
        assert_eq!(moved.rotation, Quat::IDENTITY);
    }

    #[test]
    fn test_error_display() {
        let err = EffectError::CategoryNotConfigured(EffectCategory::new(3));
        assert!(err.to_string().contains("category 3"));

        let err = EffectError::UnknownHandle(EffectHandle::from_raw(42));
        assert!(err.to_string().contains("#42"));
    }

    #[test]
    fn test_config_error_converts() {
        fn check_interval(seconds: f32) -> EffectResult<f32> {
            if seconds <= 0.0 {
                return Err(ConfigError::InvalidReclaimInterval(seconds).into());
            }
            Ok(seconds)
        }

        let err = check_interval(-1.0).expect_err("negative interval is rejected");
        assert!(matches!(
            err,
            EffectError::Config(ConfigError::InvalidReclaimInterval(_))
        ));
        assert!(err.to_string().starts_with("configuration error"));
    }

    proptest! {
        #[test]
        fn prop_handle_raw_roundtrip(raw in 1u64..u64::MAX) {
            let handle = EffectHandle::from_raw(raw);
            prop_assert!(handle.is_valid());
            prop_assert_eq!(handle.raw(), raw);
        }
    }
}
