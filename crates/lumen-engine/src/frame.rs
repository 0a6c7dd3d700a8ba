//! Frame driver for a single scene.
//!
//! The [`FrameLoop`] owns a [`World`] and drives one of its scenes. Each
//! frame:
//!
//! 1. Scene members that have not been initialized get `initialize`.
//! 2. Every member gets `pre_update`.
//! 3. Registered systems run in declaration order.
//! 4. Every member gets `post_update`.
//! 5. Deferred component removals of every member are flushed.
//! 6. Deferred scene removals are flushed.
//! 7. Killed entities that are no longer in any scene are released.
//!
//! Membership is re-read at the start of every phase, so entities a system
//! adds to the scene receive `post_update` in the same frame and `initialize`
//! at the start of the next one.
//!
//! # Example
//!
//! ```
//! use lumen_engine::frame::FrameLoop;
//! use lumen_engine::prelude::*;
//!
//! let mut world = World::new();
//! let scene = world.create_scene("level");
//! let player = world.spawn(Entity::named("player"));
//! world.add_to_scene(scene, player).unwrap();
//!
//! let mut frames = FrameLoop::new(world, scene, FrameConfig::default()).unwrap();
//! frames.add_system("noop", |_world, _scene, _elapsed| {});
//! frames.run_frames(10).unwrap();
//!
//! assert_eq!(frames.frame_count(), 10);
//! assert!(frames.world().entity(player).unwrap().is_initialized());
//! ```

use std::time::{Duration, Instant};

use lumen_ecs::prelude::*;
use tracing::{debug, trace};

use crate::config::FrameConfig;
use crate::EngineError;

// ---------------------------------------------------------------------------
// FrameDiagnostics
// ---------------------------------------------------------------------------

/// Counters and timings for the last frame.
#[derive(Debug, Clone, Default)]
pub struct FrameDiagnostics {
    /// Frame number (0-based) these diagnostics describe.
    pub frame: u64,
    /// Scene members at the end of the frame.
    pub entity_count: usize,
    /// Entities initialized during the frame.
    pub initialized: usize,
    /// Component instances detached by the component flush.
    pub components_removed: usize,
    /// Entities that left the scene in the scene removal flush, subtrees
    /// included.
    pub entities_removed: usize,
    /// Killed entities released from the world.
    pub purged: Vec<EntityId>,
    /// Wall-clock time per system, in execution order.
    pub system_times: Vec<(String, Duration)>,
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// SystemFn
// ---------------------------------------------------------------------------

/// Per-frame logic. Receives the world, the driven scene and the seconds
/// elapsed since the previous frame.
pub type SystemFn = fn(&mut World, SceneId, f64);

#[derive(Debug)]
struct RegisteredSystem {
    name: String,
    func: SystemFn,
}

// ---------------------------------------------------------------------------
// FrameLoop
// ---------------------------------------------------------------------------

pub struct FrameLoop {
    world: World,
    scene: SceneId,
    systems: Vec<RegisteredSystem>,
    frame_counter: u64,
    sim_time: f64,
    config: FrameConfig,
    last_diagnostics: FrameDiagnostics,
}

impl FrameLoop {
    /// Create a driver for `scene`, which must have been created by `world`.
    pub fn new(world: World, scene: SceneId, config: FrameConfig) -> Result<Self, EngineError> {
        config.validate()?;
        if world.entity_manager(scene).is_none() {
            return Err(EcsError::UnknownScene { scene }.into());
        }
        Ok(Self {
            world,
            scene,
            systems: Vec::new(),
            frame_counter: 0,
            sim_time: 0.0,
            config,
            last_diagnostics: FrameDiagnostics::default(),
        })
    }

    /// Register a system to run every frame, after all previously
    /// registered systems.
    ///
    /// # Panics
    ///
    /// Panics if a system with the same name is already registered.
    pub fn add_system(&mut self, name: &str, func: SystemFn) {
        assert!(
            !self.systems.iter().any(|s| s.name == name),
            "duplicate system name: {name:?}"
        );
        self.systems.push(RegisteredSystem {
            name: name.to_owned(),
            func,
        });
    }

    /// Run one frame with `elapsed` seconds since the previous one.
    pub fn step(&mut self, elapsed: f64) -> Result<&FrameDiagnostics, EngineError> {
        let frame_start = Instant::now();
        let context = FrameContext {
            frame: self.frame_counter,
            time: self.sim_time,
            scene: Some(self.scene),
        };

        let mut initialized = 0;
        for id in self.members()? {
            if let Some(entity) = self.world.entity_mut(id) {
                if entity.initialize(&context) {
                    initialized += 1;
                }
            }
        }

        for id in self.members()? {
            if let Some(entity) = self.world.entity_mut(id) {
                entity.pre_update(&context, elapsed);
            }
        }

        let mut system_times = Vec::with_capacity(self.systems.len());
        for system in &self.systems {
            let sys_start = Instant::now();
            (system.func)(&mut self.world, self.scene, elapsed);
            trace!(system = %system.name, frame = context.frame, "system ran");
            system_times.push((system.name.clone(), sys_start.elapsed()));
        }

        for id in self.members()? {
            if let Some(entity) = self.world.entity_mut(id) {
                entity.post_update(&context, elapsed);
            }
        }

        let components_removed = self.world.process_component_removals(self.scene)?;
        let entities_removed = self.world.process_entity_removals(self.scene)?;
        let purged = self.world.purge_killed();

        self.frame_counter += 1;
        self.sim_time += elapsed;

        let entity_count = self
            .world
            .entity_manager(self.scene)
            .map_or(0, EntityManager::len);
        debug!(
            frame = context.frame,
            entity_count,
            components_removed,
            entities_removed,
            purged = purged.len(),
            "frame complete"
        );

        self.last_diagnostics = FrameDiagnostics {
            frame: context.frame,
            entity_count,
            initialized,
            components_removed,
            entities_removed,
            purged,
            system_times,
            total_time: frame_start.elapsed(),
        };
        Ok(&self.last_diagnostics)
    }

    /// Run one frame of the configured fixed length.
    pub fn tick(&mut self) -> Result<&FrameDiagnostics, EngineError> {
        self.step(self.config.fixed_dt)
    }

    /// Run `count` fixed-length frames. Returns the total number of entities
    /// purged across them.
    pub fn run_frames(&mut self, count: u64) -> Result<usize, EngineError> {
        let mut purged = 0;
        for _ in 0..count {
            purged += self.tick()?.purged.len();
        }
        Ok(purged)
    }

    fn members(&self) -> Result<Vec<EntityId>, EngineError> {
        let manager = self
            .world
            .entity_manager(self.scene)
            .ok_or(EcsError::UnknownScene { scene: self.scene })?;
        Ok(manager.entities().to_vec())
    }

    // -- accessors ----------------------------------------------------------

    /// Frames completed so far.
    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    /// Sum of the `elapsed` values of every completed frame, in seconds.
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn scene(&self) -> SceneId {
        self.scene
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// Give the world back, dropping the driver.
    pub fn into_world(self) -> World {
        self.world
    }

    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn last_diagnostics(&self) -> &FrameDiagnostics {
        &self.last_diagnostics
    }
}

impl std::fmt::Debug for FrameLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameLoop")
            .field("scene", &self.scene)
            .field("frame", &self.frame_counter)
            .field("systems", &self.system_names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
