//! The [`World`] is the top-level container for the ECS. It owns every
//! spawned [`Entity`] and the registry of each scene it created.
//!
//! Entities live in an arena keyed by [`EntityId`]. Tree links are stored as
//! ids, so a parent never owns its child's memory: an entity stays in the
//! arena until [`World::purge_killed`] releases it.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::entity::{Entity, EntityId};
use crate::scene::{EntityManager, SceneId};
use crate::EcsError;

// ---------------------------------------------------------------------------
// EntitySummary
// ---------------------------------------------------------------------------

/// Serializable snapshot of one entity, for debugging output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntitySummary {
    pub id: EntityId,
    pub name: String,
    pub types: Vec<String>,
    pub tags: Vec<String>,
    pub parent: Option<EntityId>,
    pub children: Vec<EntityId>,
    pub scene: Option<SceneId>,
    pub killed: bool,
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// The top-level ECS container.
///
/// Per-entity component operations go through [`entity_mut`](Self::entity_mut);
/// anything that touches more than one entity (hierarchy, scene membership,
/// cloning, kill) is a method on the world so the tree and the scene
/// registries are updated together.
#[derive(Default)]
pub struct World {
    pub(crate) entities: BTreeMap<EntityId, Entity>,
    pub(crate) scenes: Vec<EntityManager>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entity_count", &self.entities.len())
            .field("scene_count", &self.scenes.len())
            .finish()
    }
}

impl World {
    /// Create a new, empty world with no scenes.
    pub fn new() -> Self {
        Self::default()
    }

    // -- entity lifecycle ---------------------------------------------------

    /// Move `entity` into the world. Returns its id.
    pub fn spawn(&mut self, entity: Entity) -> EntityId {
        let id = entity.id();
        self.entities.insert(id, entity);
        id
    }

    /// Spawn an anonymous entity with no components.
    pub fn spawn_empty(&mut self) -> EntityId {
        self.spawn(Entity::new())
    }

    /// Release killed entities that no longer belong to any scene.
    ///
    /// Children of a released entity survive as unparented roots. Returns the
    /// released ids in ascending order.
    pub fn purge_killed(&mut self) -> Vec<EntityId> {
        let doomed: Vec<EntityId> = self
            .entities
            .values()
            .filter(|entity| entity.is_killed() && entity.scene.is_none())
            .map(Entity::id)
            .collect();

        for id in &doomed {
            let Some(entity) = self.entities.remove(id) else {
                continue;
            };
            if let Some(parent) = entity.parent.and_then(|p| self.entities.get_mut(&p)) {
                parent.children.retain(|child| child != id);
            }
            for child in &entity.children {
                if let Some(child) = self.entities.get_mut(child) {
                    if child.parent == Some(*id) {
                        child.parent = None;
                    }
                }
            }
        }

        if !doomed.is_empty() {
            debug!(released = doomed.len(), "purged killed entities");
        }
        doomed
    }

    // -- access -------------------------------------------------------------

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub(crate) fn get_checked(&self, id: EntityId) -> Result<&Entity, EcsError> {
        self.entities
            .get(&id)
            .ok_or(EcsError::UnknownEntity { entity: id })
    }

    pub(crate) fn get_checked_mut(&mut self, id: EntityId) -> Result<&mut Entity, EcsError> {
        self.entities
            .get_mut(&id)
            .ok_or(EcsError::UnknownEntity { entity: id })
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of entities held by the world, in any scene or none.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Every held entity, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    // -- diagnostics --------------------------------------------------------

    pub fn summary(&self, id: EntityId) -> Option<EntitySummary> {
        let entity = self.entities.get(&id)?;
        Some(EntitySummary {
            id,
            name: entity.name().to_owned(),
            types: entity.types().iter().map(ToString::to_string).collect(),
            tags: entity.tags().iter().map(ToString::to_string).collect(),
            parent: entity.parent,
            children: entity.children.clone(),
            scene: entity.scene,
            killed: entity.is_killed(),
        })
    }

    /// JSON dump of every member of `scene`, in registry order.
    pub fn debug_dump(&self, scene: SceneId) -> Result<serde_json::Value, EcsError> {
        self.check_scene(scene)?;
        let summaries: Vec<EntitySummary> = self.scenes[scene.0 as usize]
            .entities()
            .iter()
            .filter_map(|id| self.summary(*id))
            .collect();
        Ok(serde_json::json!({
            "scene": scene,
            "name": self.scenes[scene.0 as usize].name(),
            "entities": summaries,
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
