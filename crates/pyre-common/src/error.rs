//! Error types for Pyre.

use thiserror::Error;

use crate::ids::{AttachTarget, EffectCategory, EffectHandle};

/// Errors raised by the pooled effect manager.
///
/// None of these are fatal: the worst outcome of any of them is a
/// dropped visual effect.
#[derive(Debug, Error)]
pub enum EffectError {
    /// No pool was built for the requested category
    #[error("{0} is not configured")]
    CategoryNotConfigured(EffectCategory),

    /// No free slot and nothing to evict
    #[error("pool for {0} is exhausted")]
    PoolExhausted(EffectCategory),

    /// Attach target is null, dead or has no reference frame
    #[error("invalid attach target: {0}")]
    InvalidAttachTarget(AttachTarget),

    /// Handle is not (or no longer) bound to a slot
    #[error("unknown effect handle {0}")]
    UnknownHandle(EffectHandle),

    /// Template for a category could not be resolved
    #[error("failed to load template '{template}' for {category}: {reason}")]
    TemplateLoadFailure {
        /// Category that was skipped
        category: EffectCategory,
        /// Template reference from configuration
        template: String,
        /// Backend-reported reason
        reason: String,
    },

    /// The slot's host object refused activation
    #[error("host object unavailable: {0}")]
    HostUnavailable(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse or serialize errors
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// Two categories share an id or a name
    #[error("duplicate category '{0}'")]
    DuplicateCategory(String),

    /// Reclaim interval outside the supported range
    #[error("reclaim interval {0}s is out of range")]
    InvalidReclaimInterval(f32),
}

/// Result type alias for effect operations.
pub type EffectResult<T> = Result<T, EffectError>;
