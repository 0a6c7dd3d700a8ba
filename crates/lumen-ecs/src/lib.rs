//! Lumen ECS -- entities with dynamically attached components, arranged in a
//! parent/child tree and registered into scenes.
//!
//! Entities live in a [`World`](world::World) arena. Components are looked up
//! by a stable string key ([`ComponentType`](component::ComponentType)), at
//! most one per key per entity. Component removal and scene removal are
//! deferred to explicit per-frame flush points so game logic can mutate
//! entities mid-update without disturbing what the rest of the frame sees.
//!
//! # Quick Start
//!
//! ```
//! use lumen_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Health(u32);
//!
//! impl Component for Health {
//!     fn component_type(&self) -> ComponentType {
//!         ComponentType::from_static("health")
//!     }
//! }
//!
//! let mut world = World::new();
//! let scene = world.create_scene("level");
//!
//! let player = world.spawn(Entity::named("player").with_component(Health(100)).unwrap());
//! let sword = world.spawn(Entity::named("sword"));
//! world.add_child(player, sword).unwrap();
//! world.add_to_scene(scene, player).unwrap();
//!
//! assert_eq!(world.entity_manager(scene).unwrap().len(), 2);
//! assert_eq!(
//!     world.entity(player).unwrap().get_as::<Health>("health"),
//!     Some(&Health(100))
//! );
//! ```

#![deny(unsafe_code)]

pub mod component;
pub mod entity;
pub mod hierarchy;
pub mod lifecycle;
pub mod observer;
pub mod scene;
pub mod template;
pub mod world;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations. A failed call leaves all state as it
/// was before the call.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// A component of this type is already attached and `force` was not set.
    #[error("entity {entity} already has a component of type '{component}'")]
    DuplicateComponent {
        entity: entity::EntityId,
        component: component::ComponentType,
    },

    /// The proposed child is the parent itself or one of its ancestors.
    #[error("cycle detected, cannot add entity {child} as a child of {parent}")]
    CycleDetected {
        parent: entity::EntityId,
        child: entity::EntityId,
    },

    /// The proposed child already has a parent.
    #[error("entity already has a parent, cannot add without unparenting")]
    AlreadyParented {
        child: entity::EntityId,
        parent: entity::EntityId,
    },

    /// The id does not refer to an entity held by this world.
    #[error("entity {entity} does not exist in this world")]
    UnknownEntity { entity: entity::EntityId },

    /// The scene was not created by this world.
    #[error("{scene} was not created by this world")]
    UnknownScene { scene: scene::SceneId },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{Component, ComponentSet, ComponentType, TagComponent};
    pub use crate::entity::{Entity, EntityId, DEFAULT_ENTITY_NAME};
    pub use crate::lifecycle::{FrameContext, LifecycleEvent, LifecycleStage};
    pub use crate::observer::{ChangeKind, ComponentChange, ObserverId};
    pub use crate::scene::{EntityManager, SceneId};
    pub use crate::world::{EntitySummary, World};
    pub use crate::EcsError;
}

// ---------------------------------------------------------------------------
// Integration Tests
// ---------------------------------------------------------------------------
