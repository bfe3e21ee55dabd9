//! # Pyre Effects
//!
//! Pooled timed effects for short-lived visuals (fires, radius rings).
//!
//! This crate provides:
//! - Fixed-capacity pools with a LIFO free list
//! - Oldest-first eviction when a pool is exhausted
//! - Timed expiry and weak attachment to moving actors
//! - Non-recycled handles for callers
//! - A periodic reclaim scan
//! - A headless backend for simulation and tests
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                   EffectPoolManager                      │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────┐   │
//! │  │ HandleTable │  │ EffectPool[] │  │ReclaimScheduler│   │
//! │  │ handle→slot │  │ per category │  │ (1s interval)  │   │
//! │  └─────────────┘  └──────────────┘  └────────────────┘   │
//! │                          │                               │
//! │                          ▼                               │
//! │                  EffectSlot[0..N] ── EffectHost          │
//! └──────────────────────────────────────────────────────────┘
//!                            │
//!                            ▼
//!                      EffectBackend
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod handles;
pub mod headless;
pub mod host;
pub mod manager;
pub mod pool;
pub mod reclaim;
pub mod slot;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::*;
    pub use crate::handles::*;
    pub use crate::headless::*;
    pub use crate::host::*;
    pub use crate::manager::*;
    pub use crate::pool::*;
    pub use crate::reclaim::*;
    pub use crate::slot::*;
}

pub use prelude::*;
pub use pyre_common;
