//! Lumen Engine -- scene driver built on [`lumen_ecs`].
//!
//! The [`FrameLoop`](frame::FrameLoop) runs the per-frame lifecycle of one
//! scene: initialize, pre-update, systems, post-update, then the deferred
//! component and scene removal flushes.
//!
//! # Quick Start
//!
//! ```
//! use lumen_engine::prelude::*;
//!
//! let config = FrameConfig::from_json_str(r#"{ "fixed_dt": 0.02 }"#).unwrap();
//!
//! let mut world = World::new();
//! let scene = world.create_scene("level");
//! let enemy = world.spawn(Entity::named("enemy"));
//! world.add_to_scene(scene, enemy).unwrap();
//!
//! let mut frames = FrameLoop::new(world, scene, config).unwrap();
//! frames.add_system("despawn", |world, scene, _elapsed| {
//!     let members = world.entity_manager(scene).unwrap().entities().to_vec();
//!     for id in members {
//!         world.kill(id).unwrap();
//!     }
//! });
//!
//! let diagnostics = frames.tick().unwrap();
//! assert_eq!(diagnostics.purged, vec![enemy]);
//! assert_eq!(frames.world().entity_count(), 0);
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod frame;

/// Re-export the ECS crate for convenience.
pub use lumen_ecs;

use lumen_ecs::EcsError;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid frame config: {reason}")]
    InvalidConfig { reason: String },

    #[error(transparent)]
    Ecs(#[from] EcsError),
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

/// Install a global `tracing` subscriber writing to stderr.
///
/// `RUST_LOG` takes precedence over `default_filter`. Fails if the filter
/// does not parse or a global subscriber is already set.
pub fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use lumen_ecs::prelude::*;

    pub use crate::config::FrameConfig;
    pub use crate::frame::{FrameDiagnostics, FrameLoop, SystemFn};
    pub use crate::{init_tracing, EngineError};
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
