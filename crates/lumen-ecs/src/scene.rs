//! Scene membership and the flat per-scene entity registry.
//!
//! Every scene created by a [`World`] gets an [`EntityManager`]: an ordered,
//! flat list of all entities reachable from the entities explicitly added to
//! that scene. Membership is stored on each entity (`Entity::scene`) and kept
//! in sync with the registry by the operations in this module and in
//! [`hierarchy`](crate::hierarchy).
//!
//! Adding is synchronous. Removing an entity from a scene is deferred until
//! [`World::process_entity_removals`] runs for that scene, so membership stays
//! observable for the rest of the frame.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::entity::EntityId;
use crate::world::World;
use crate::EcsError;

// ---------------------------------------------------------------------------
// SceneId
// ---------------------------------------------------------------------------

/// Identifies a scene within the [`World`] that created it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneId(pub(crate) u32);

impl SceneId {
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SceneId({})", self.0)
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scene#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// EntityManager
// ---------------------------------------------------------------------------

/// Flat registry of the entities belonging to one scene.
#[derive(Debug)]
pub struct EntityManager {
    scene: SceneId,
    name: String,
    entities: Vec<EntityId>,
    members: HashSet<EntityId>,
    pending_removal: Vec<EntityId>,
}

impl EntityManager {
    fn new(scene: SceneId, name: String) -> Self {
        Self {
            scene,
            name,
            entities: Vec::new(),
            members: HashSet::new(),
            pending_removal: Vec::new(),
        }
    }

    pub fn scene(&self) -> SceneId {
        self.scene
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in the order they joined.
    pub fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.members.contains(&entity)
    }

    /// Entities queued by [`World::remove_from_scene`], in queue order.
    pub fn pending_removals(&self) -> &[EntityId] {
        &self.pending_removal
    }

    pub fn is_pending_removal(&self, entity: EntityId) -> bool {
        self.pending_removal.contains(&entity)
    }

    fn attach(&mut self, entity: EntityId) {
        if self.members.insert(entity) {
            self.entities.push(entity);
        }
    }

    fn detach(&mut self, entity: EntityId) {
        if self.members.remove(&entity) {
            self.entities.retain(|member| *member != entity);
        }
        self.pending_removal.retain(|queued| *queued != entity);
    }

    pub(crate) fn queue_removal(&mut self, entity: EntityId) {
        if !self.is_pending_removal(entity) {
            self.pending_removal.push(entity);
        }
    }
}

// ---------------------------------------------------------------------------
// World: scene operations
// ---------------------------------------------------------------------------

impl World {
    /// Create an empty scene.
    pub fn create_scene(&mut self, name: impl Into<String>) -> SceneId {
        let id = SceneId(self.scenes.len() as u32);
        let name = name.into();
        debug!(scene = %id, name = %name, "scene created");
        self.scenes.push(EntityManager::new(id, name));
        id
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// The flat registry of `scene`, or `None` if this world did not create it.
    pub fn entity_manager(&self, scene: SceneId) -> Option<&EntityManager> {
        self.scenes.get(scene.0 as usize)
    }

    pub(crate) fn check_scene(&self, scene: SceneId) -> Result<(), EcsError> {
        if (scene.0 as usize) < self.scenes.len() {
            Ok(())
        } else {
            Err(EcsError::UnknownScene { scene })
        }
    }

    /// Add `entity` and its whole subtree to `scene`.
    ///
    /// Entities of the subtree that belonged to another scene leave it
    /// immediately. A deferred removal of `entity` queued in `scene` is
    /// cancelled.
    pub fn add_to_scene(&mut self, scene: SceneId, entity: EntityId) -> Result<(), EcsError> {
        self.check_scene(scene)?;
        self.get_checked(entity)?;

        self.scenes[scene.0 as usize]
            .pending_removal
            .retain(|queued| *queued != entity);
        let joined = self.set_subtree_scene(entity, Some(scene));
        debug!(%scene, %entity, joined, "entity added to scene");
        Ok(())
    }

    /// Queue `entity` for removal from `scene`.
    ///
    /// Membership is untouched until [`process_entity_removals`] runs.
    /// Returns `false` (and queues nothing) if `entity` is not a member.
    ///
    /// [`process_entity_removals`]: Self::process_entity_removals
    pub fn remove_from_scene(&mut self, scene: SceneId, entity: EntityId) -> Result<bool, EcsError> {
        self.check_scene(scene)?;
        let member = self.get_checked(entity)?.scene == Some(scene);
        if !member {
            warn!(%scene, %entity, "remove_from_scene: entity is not a member of the scene");
            return Ok(false);
        }
        self.scenes[scene.0 as usize].queue_removal(entity);
        trace!(%scene, %entity, "entity queued for scene removal");
        Ok(true)
    }

    /// Apply the deferred removals queued for `scene`.
    ///
    /// Each queued entity leaves the scene together with its subtree; a queued
    /// entity that still has a parent is detached from it first, since
    /// membership must stay derivable from the tree. Returns the number of
    /// entities that left the registry.
    pub fn process_entity_removals(&mut self, scene: SceneId) -> Result<usize, EcsError> {
        self.check_scene(scene)?;
        let queued = std::mem::take(&mut self.scenes[scene.0 as usize].pending_removal);
        let before = self.scenes[scene.0 as usize].len();

        for entity in queued {
            let (member, parent) = match self.entities.get(&entity) {
                Some(record) => (record.scene == Some(scene), record.parent),
                None => continue,
            };
            if !member {
                continue;
            }
            match parent {
                Some(parent) => {
                    self.remove_child(parent, entity)?;
                }
                None => {
                    self.set_subtree_scene(entity, None);
                }
            }
        }

        let removed = before.saturating_sub(self.scenes[scene.0 as usize].len());
        if removed > 0 {
            debug!(%scene, removed, "processed entity removals");
        }
        Ok(removed)
    }

    /// Flush deferred component removals of every member of `scene`.
    /// Returns the number of components removed.
    pub fn process_component_removals(&mut self, scene: SceneId) -> Result<usize, EcsError> {
        self.check_scene(scene)?;
        let mut removed = 0;
        for id in &self.scenes[scene.0 as usize].entities {
            if let Some(entity) = self.entities.get_mut(id) {
                removed += entity.process_component_removal();
            }
        }
        if removed > 0 {
            trace!(%scene, removed, "processed component removals");
        }
        Ok(removed)
    }

    /// Set the scene of `root` and every descendant, moving each between
    /// registries as needed. Returns how many entities changed scene.
    pub(crate) fn set_subtree_scene(&mut self, root: EntityId, scene: Option<SceneId>) -> usize {
        let mut changed = 0;
        for id in self.descendants(root) {
            let Some(entity) = self.entities.get_mut(&id) else {
                continue;
            };
            let previous = std::mem::replace(&mut entity.scene, scene);
            if previous == scene {
                continue;
            }
            if let Some(old) = previous {
                self.scenes[old.0 as usize].detach(id);
            }
            if let Some(new) = scene {
                self.scenes[new.0 as usize].attach(id);
            }
            changed += 1;
        }
        changed
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
