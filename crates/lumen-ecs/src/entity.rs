//! Entity identifiers and the entity record.
//!
//! An [`EntityId`] is a process-unique `u64` drawn from a global counter at
//! construction. Ids are never recycled, so a stale id simply stops resolving
//! once the entity has been released from its [`World`](crate::world::World).
//!
//! An [`Entity`] owns its components, tag view, change channels and lifecycle
//! hooks. Its tree links (`parent`, `children`) and scene membership are
//! read-only here; only the world's hierarchy and scene operations write them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::component::{Component, ComponentSet, ComponentType, TagComponent};
use crate::lifecycle::{FrameContext, LifecycleEvent, LifecycleHooks, LifecycleStage};
use crate::observer::{ChangeKind, ComponentChange, ComponentObservable};
use crate::scene::SceneId;
use crate::EcsError;

/// Name given to entities constructed without one.
pub const DEFAULT_ENTITY_NAME: &str = "anonymous";

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

static NEXT_ENTITY_ID: AtomicU64 = AtomicU64::new(0);

/// A process-unique entity identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Allocate the next unused id.
    pub(crate) fn allocate() -> Self {
        Self(NEXT_ENTITY_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw `u64` representation.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct from a raw `u64`. The result only resolves if an entity
    /// with that id is still alive in the world it is looked up in.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// A uniquely identified node of attached components with a place in the
/// entity tree.
pub struct Entity {
    id: EntityId,
    name: String,
    components: ComponentSet,
    killed: bool,
    pub(crate) parent: Option<EntityId>,
    pub(crate) children: Vec<EntityId>,
    pub(crate) scene: Option<SceneId>,
    initialized: bool,
    component_added: ComponentObservable,
    component_removed: ComponentObservable,
    hooks: LifecycleHooks,
}

impl Entity {
    /// An empty entity named [`DEFAULT_ENTITY_NAME`].
    pub fn new() -> Self {
        Self::named(DEFAULT_ENTITY_NAME)
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: EntityId::allocate(),
            name: name.into(),
            components: ComponentSet::new(),
            killed: false,
            parent: None,
            children: Vec::new(),
            scene: None,
            initialized: false,
            component_added: ComponentObservable::new(),
            component_removed: ComponentObservable::new(),
            hooks: LifecycleHooks::new(),
        }
    }

    /// An entity pre-populated with `components`, in order.
    ///
    /// Fails with [`EcsError::DuplicateComponent`] if two components share a
    /// type identity.
    pub fn from_components<I>(components: I, name: Option<&str>) -> Result<Self, EcsError>
    where
        I: IntoIterator<Item = Box<dyn Component>>,
    {
        let mut entity = Self::named(name.unwrap_or(DEFAULT_ENTITY_NAME));
        for component in components {
            entity.add_boxed_component(component, false)?;
        }
        Ok(entity)
    }

    /// Builder-style variant of [`add_component`](Self::add_component).
    pub fn with_component<C: Component>(mut self, component: C) -> Result<Self, EcsError> {
        self.add_component(component, false)?;
        Ok(self)
    }

    // -- identity & flags ---------------------------------------------------

    #[inline]
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn is_killed(&self) -> bool {
        self.killed
    }

    /// Set the killed flag. Tree and scene detachment is done by
    /// [`World::kill`](crate::world::World::kill).
    pub(crate) fn mark_killed(&mut self) -> bool {
        !std::mem::replace(&mut self.killed, true)
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    pub fn scene(&self) -> Option<SceneId> {
        self.scene
    }

    // -- components ---------------------------------------------------------

    /// Attach `component` under its type identity.
    ///
    /// Without `force`, an existing component of the same type is an error
    /// and nothing changes. With `force`, the existing one is removed
    /// immediately (firing a removed event) before the new one is attached.
    pub fn add_component<C: Component>(
        &mut self,
        component: C,
        force: bool,
    ) -> Result<&mut Self, EcsError> {
        self.add_boxed_component(Box::new(component), force)
    }

    pub fn add_boxed_component(
        &mut self,
        component: Box<dyn Component>,
        force: bool,
    ) -> Result<&mut Self, EcsError> {
        let ty = component.component_type();
        if self.components.contains(ty.as_str()) {
            if !force {
                return Err(EcsError::DuplicateComponent {
                    entity: self.id,
                    component: ty,
                });
            }
            self.remove_component(ty.as_str(), true);
        }

        let Self {
            id,
            components,
            component_added,
            ..
        } = &mut *self;
        let attached = components.push(ty, component);
        component_added.notify(&ComponentChange {
            kind: ChangeKind::Added,
            entity: *id,
            component: attached,
        });
        Ok(self)
    }

    /// Detach the component stored under `ty`.
    ///
    /// Deferred by default: the component stays visible until
    /// [`process_component_removal`](Self::process_component_removal) runs.
    /// With `immediate`, it is detached now, any queued deferred removal of
    /// the same type is cancelled, and the removed event fires now.
    ///
    /// Returns `false` if no component of that type is attached.
    pub fn remove_component(&mut self, ty: &str, immediate: bool) -> bool {
        if !immediate {
            return self.components.queue_removal(ty);
        }
        match self.components.take(ty) {
            Some(removed) => {
                self.component_removed.notify(&ComponentChange {
                    kind: ChangeKind::Removed,
                    entity: self.id,
                    component: removed.as_ref(),
                });
                true
            }
            None => false,
        }
    }

    /// Apply queued component removals in the order they were requested,
    /// firing one removed event each. Returns how many were removed.
    pub fn process_component_removal(&mut self) -> usize {
        let removed = self.components.drain_pending();
        for component in &removed {
            self.component_removed.notify(&ComponentChange {
                kind: ChangeKind::Removed,
                entity: self.id,
                component: component.as_ref(),
            });
        }
        removed.len()
    }

    pub fn has(&self, ty: &str) -> bool {
        self.components.contains(ty)
    }

    pub fn get(&self, ty: &str) -> Option<&dyn Component> {
        self.components.get(ty)
    }

    pub fn get_mut(&mut self, ty: &str) -> Option<&mut dyn Component> {
        self.components.get_mut(ty)
    }

    /// Typed access to the component stored under `ty`.
    pub fn get_as<T: Component>(&self, ty: &str) -> Option<&T> {
        self.get(ty)?.as_any().downcast_ref::<T>()
    }

    pub fn get_as_mut<T: Component>(&mut self, ty: &str) -> Option<&mut T> {
        self.get_mut(ty)?.as_any_mut().downcast_mut::<T>()
    }

    /// Live components in attachment order. Components queued for deferred
    /// removal are skipped; [`component_set`](Self::component_set) still
    /// lists them until the flush.
    pub fn components(&self) -> impl Iterator<Item = &dyn Component> {
        self.components.live()
    }

    pub fn component_set(&self) -> &ComponentSet {
        &self.components
    }

    pub fn is_pending_removal(&self, ty: &str) -> bool {
        self.components.is_pending_removal(ty)
    }

    /// All attached type identities in attachment order.
    pub fn types(&self) -> Vec<ComponentType> {
        self.components.types().cloned().collect()
    }

    // -- tags ---------------------------------------------------------------

    /// Attach a tag. Re-adding an existing tag is a no-op; a non-tag
    /// component under the same key fails with
    /// [`EcsError::DuplicateComponent`].
    pub fn add_tag(&mut self, name: impl Into<ComponentType>) -> Result<&mut Self, EcsError> {
        let tag = TagComponent::new(name);
        if self.has_tag(tag.name()) {
            return Ok(self);
        }
        self.add_component(tag, false)
    }

    pub fn remove_tag(&mut self, name: &str, immediate: bool) -> bool {
        self.has_tag(name) && self.remove_component(name, immediate)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.get(name).is_some_and(|component| component.is_tag())
    }

    /// Names of attached tags in attachment order.
    pub fn tags(&self) -> Vec<ComponentType> {
        self.components.tags().cloned().collect()
    }

    // -- change channels ----------------------------------------------------

    pub fn component_added(&mut self) -> &mut ComponentObservable {
        &mut self.component_added
    }

    pub fn component_removed(&mut self) -> &mut ComponentObservable {
        &mut self.component_removed
    }

    // -- lifecycle ----------------------------------------------------------

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Event channels for the lifecycle stages.
    pub fn events_mut(&mut self) -> &mut LifecycleHooks {
        &mut self.hooks
    }

    pub fn set_on_initialize<F>(&mut self, handler: F)
    where
        F: FnMut(&LifecycleEvent) + 'static,
    {
        self.hooks.set_handler(LifecycleStage::Initialize, handler);
    }

    pub fn set_on_pre_update<F>(&mut self, handler: F)
    where
        F: FnMut(&LifecycleEvent) + 'static,
    {
        self.hooks.set_handler(LifecycleStage::PreUpdate, handler);
    }

    pub fn set_on_post_update<F>(&mut self, handler: F)
    where
        F: FnMut(&LifecycleEvent) + 'static,
    {
        self.hooks.set_handler(LifecycleStage::PostUpdate, handler);
    }

    /// Run the initialize hooks. Only the first call for an entity has any
    /// effect; returns whether this call initialized it.
    pub fn initialize(&mut self, context: &FrameContext) -> bool {
        if self.initialized {
            return false;
        }
        self.initialized = true;
        self.dispatch(LifecycleStage::Initialize, context, 0.0);
        true
    }

    pub fn pre_update(&mut self, context: &FrameContext, elapsed: f64) {
        self.dispatch(LifecycleStage::PreUpdate, context, elapsed);
    }

    pub fn post_update(&mut self, context: &FrameContext, elapsed: f64) {
        self.dispatch(LifecycleStage::PostUpdate, context, elapsed);
    }

    fn dispatch(&mut self, stage: LifecycleStage, context: &FrameContext, elapsed: f64) {
        self.hooks.dispatch(&LifecycleEvent {
            stage,
            entity: self.id,
            context: *context,
            elapsed,
        });
    }

    // -- copying ------------------------------------------------------------

    /// A fresh, unlinked entity with the same name and copies of every
    /// component. Children are copied by [`World::clone_entity`].
    ///
    /// [`World::clone_entity`]: crate::world::World::clone_entity
    pub(crate) fn duplicate(&self) -> Entity {
        let mut copy = Entity::named(self.name.clone());
        copy.components = self.components.clone();
        copy
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("types", &self.types())
            .field("killed", &self.killed)
            .field("parent", &self.parent)
            .field("children", &self.children)
            .field("scene", &self.scene)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
