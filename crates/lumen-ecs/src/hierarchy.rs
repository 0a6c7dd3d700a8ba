//! Parent/child edges between entities.
//!
//! The world is the only writer of `parent`, `children` and scene membership.
//! Every fallible operation validates before it mutates, so a rejected call
//! leaves both entities untouched.
//!
//! Scene membership follows the tree: attaching a subtree under a scene member
//! adds the whole subtree to that scene's registry, and detaching a child
//! removes its subtree from the registry right away. Only
//! [`World::remove_from_scene`] is deferred.

use tracing::trace;

use crate::entity::EntityId;
use crate::world::World;
use crate::EcsError;

impl World {
    /// Make `child` the last child of `parent`.
    ///
    /// Fails with [`EcsError::CycleDetected`] if `child` is `parent` or one of
    /// its ancestors, and with [`EcsError::AlreadyParented`] if `child` already
    /// has a parent. On success the parent's scene, if any, is propagated to
    /// the child's subtree. Returns `parent` so calls can be chained.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> Result<EntityId, EcsError> {
        let scene = self.get_checked(parent)?.scene;
        let existing_parent = self.get_checked(child)?.parent;

        if child == parent || self.is_ancestor_of(child, parent) {
            return Err(EcsError::CycleDetected { parent, child });
        }
        if let Some(existing) = existing_parent {
            return Err(EcsError::AlreadyParented { child, parent: existing });
        }

        self.link(parent, child);
        if scene.is_some() {
            self.set_subtree_scene(child, scene);
        }
        trace!(%parent, %child, "child added");
        Ok(parent)
    }

    /// Attach without validation. Only for freshly created children.
    pub(crate) fn link(&mut self, parent: EntityId, child: EntityId) {
        if let Some(record) = self.entities.get_mut(&child) {
            record.parent = Some(parent);
        }
        if let Some(record) = self.entities.get_mut(&parent) {
            record.children.push(child);
        }
    }

    /// Detach `child` from `parent` and clear the scene membership of the
    /// child's subtree.
    ///
    /// Returns `false` if `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: EntityId, child: EntityId) -> Result<bool, EcsError> {
        self.get_checked(parent)?;
        if self.entities.get(&child).and_then(|c| c.parent) != Some(parent) {
            return Ok(false);
        }

        self.get_checked_mut(parent)?
            .children
            .retain(|existing| *existing != child);
        self.get_checked_mut(child)?.parent = None;
        self.set_subtree_scene(child, None);
        trace!(%parent, %child, "child removed");
        Ok(true)
    }

    /// Detach `entity` from its parent, if it has one.
    pub fn unparent(&mut self, entity: EntityId) -> Result<bool, EcsError> {
        match self.get_checked(entity)?.parent {
            Some(parent) => self.remove_child(parent, entity),
            None => Ok(false),
        }
    }

    /// Detach every child of `entity`, one at a time. Returns how many were
    /// removed.
    pub fn remove_all_children(&mut self, entity: EntityId) -> Result<usize, EcsError> {
        let children = self.get_checked(entity)?.children.clone();
        let mut removed = 0;
        for child in children {
            if self.remove_child(entity, child)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Path from the topmost ancestor down to and including `entity`.
    /// Empty if `entity` is unknown.
    pub fn ancestors(&self, entity: EntityId) -> Vec<EntityId> {
        let mut path = Vec::new();
        let mut cursor = self.entities.get(&entity).map(|_| entity);
        while let Some(id) = cursor {
            path.push(id);
            cursor = self.entities.get(&id).and_then(|e| e.parent);
        }
        path.reverse();
        path
    }

    /// `entity` followed by every descendant in depth-first pre-order.
    /// Empty if `entity` is unknown.
    pub fn descendants(&self, entity: EntityId) -> Vec<EntityId> {
        let mut out = Vec::new();
        if !self.entities.contains_key(&entity) {
            return out;
        }
        let mut stack = vec![entity];
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(record) = self.entities.get(&id) {
                stack.extend(record.children.iter().rev().copied());
            }
        }
        out
    }

    /// Whether `candidate` is a strict ancestor of `entity`.
    pub fn is_ancestor_of(&self, candidate: EntityId, entity: EntityId) -> bool {
        let mut cursor = self.entities.get(&entity).and_then(|e| e.parent);
        while let Some(id) = cursor {
            if id == candidate {
                return true;
            }
            cursor = self.entities.get(&id).and_then(|e| e.parent);
        }
        false
    }

    /// Kill `entity`.
    ///
    /// A parented entity is detached from its parent right away; a scene root
    /// is queued for deferred removal from its scene. Descendants are not
    /// killed and stay attached to `entity`. Killing twice is a no-op.
    pub fn kill(&mut self, entity: EntityId) -> Result<(), EcsError> {
        let record = self.get_checked_mut(entity)?;
        if !record.mark_killed() {
            return Ok(());
        }
        let (parent, scene) = (record.parent, record.scene);

        if let Some(parent) = parent {
            self.remove_child(parent, entity)?;
        } else if let Some(scene) = scene {
            self.scenes[scene.0 as usize].queue_removal(entity);
        }
        trace!(%entity, "entity killed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
