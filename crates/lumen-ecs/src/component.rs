//! Component type identity and the per-entity component container.
//!
//! Every component carries a stable [`ComponentType`] key. An entity holds at
//! most one component per key inside its [`ComponentSet`], which also owns the
//! queue of deferred removals drained once per frame.

use std::any::Any;
use std::borrow::{Borrow, Cow};
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ComponentType
// ---------------------------------------------------------------------------

/// Stable type identity of a component kind.
///
/// Static keys (`ComponentType::from_static("transform")`) never allocate;
/// runtime keys (tags built from user strings) own their name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComponentType(Cow<'static, str>);

impl ComponentType {
    /// Key backed by a `'static` string.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Key backed by an owned string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentType({})", self.0)
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ComponentType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ComponentType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&'static str> for ComponentType {
    fn from(name: &'static str) -> Self {
        Self::from_static(name)
    }
}

impl From<String> for ComponentType {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for ComponentType {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for ComponentType {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// A unit of data attached to exactly one entity.
///
/// Implementors only provide their type key; copying and downcasting come
/// from the blanket [`ComponentBase`] impl for every `Component + Clone`.
///
/// ```
/// use lumen_ecs::component::{Component, ComponentType};
///
/// #[derive(Debug, Clone)]
/// struct Health(u32);
///
/// impl Component for Health {
///     fn component_type(&self) -> ComponentType {
///         ComponentType::from_static("health")
///     }
/// }
/// ```
pub trait Component: ComponentBase + fmt::Debug + 'static {
    /// The key this component is stored under.
    fn component_type(&self) -> ComponentType;

    /// Whether this component is a payload-free marker.
    fn is_tag(&self) -> bool {
        false
    }
}

/// Object-safe plumbing shared by all components.
pub trait ComponentBase {
    /// Deep copy into a fresh box. Used by entity cloning and templates.
    fn clone_box(&self) -> Box<dyn Component>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component + Clone> ComponentBase for T {
    fn clone_box(&self) -> Box<dyn Component> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Clone for Box<dyn Component> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

// ---------------------------------------------------------------------------
// TagComponent
// ---------------------------------------------------------------------------

/// A boolean marker whose type identity is its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagComponent {
    name: ComponentType,
}

impl TagComponent {
    pub fn new(name: impl Into<ComponentType>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}

impl Component for TagComponent {
    fn component_type(&self) -> ComponentType {
        self.name.clone()
    }

    fn is_tag(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// ComponentSet
// ---------------------------------------------------------------------------

/// Ordered container mapping [`ComponentType`] to one boxed component.
///
/// Entries keep attachment order. Deferred removals are queued by key and
/// stay visible to every read path until [`drain_pending`](Self::drain_pending)
/// runs. Entity-level notification is layered on top by
/// [`Entity`](crate::entity::Entity); this type never emits events itself.
#[derive(Debug, Default)]
pub struct ComponentSet {
    entries: Vec<(ComponentType, Box<dyn Component>)>,
    pending_removal: Vec<ComponentType>,
}

impl ComponentSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, ty: &str) -> Option<usize> {
        self.entries.iter().position(|(key, _)| key.as_str() == ty)
    }

    /// Number of attached components, including ones queued for removal.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, ty: &str) -> bool {
        self.position(ty).is_some()
    }

    pub fn get(&self, ty: &str) -> Option<&dyn Component> {
        self.position(ty).map(|idx| self.entries[idx].1.as_ref())
    }

    pub fn get_mut(&mut self, ty: &str) -> Option<&mut dyn Component> {
        let idx = self.position(ty)?;
        Some(self.entries[idx].1.as_mut())
    }

    /// Append `component` under its key. The caller must have checked that
    /// the key is vacant.
    pub(crate) fn push(&mut self, ty: ComponentType, component: Box<dyn Component>) -> &dyn Component {
        self.entries.push((ty, component));
        let last = self.entries.len() - 1;
        self.entries[last].1.as_ref()
    }

    /// Remove the component under `ty` right away, cancelling any queued
    /// deferred removal of the same key.
    pub(crate) fn take(&mut self, ty: &str) -> Option<Box<dyn Component>> {
        self.pending_removal.retain(|key| key.as_str() != ty);
        let idx = self.position(ty)?;
        Some(self.entries.remove(idx).1)
    }

    /// Queue a deferred removal. Returns `false` if nothing is attached under
    /// `ty`; queueing the same key twice is a no-op.
    pub(crate) fn queue_removal(&mut self, ty: &str) -> bool {
        let Some(idx) = self.position(ty) else {
            return false;
        };
        if !self.is_pending_removal(ty) {
            let key = self.entries[idx].0.clone();
            self.pending_removal.push(key);
        }
        true
    }

    pub fn is_pending_removal(&self, ty: &str) -> bool {
        self.pending_removal.iter().any(|key| key.as_str() == ty)
    }

    /// Keys queued for removal, in the order they were queued.
    pub fn pending_removals(&self) -> &[ComponentType] {
        &self.pending_removal
    }

    /// Remove every queued component, returning them in queue order.
    pub(crate) fn drain_pending(&mut self) -> Vec<Box<dyn Component>> {
        let queued = std::mem::take(&mut self.pending_removal);
        let mut removed = Vec::with_capacity(queued.len());
        for key in queued {
            if let Some(idx) = self.position(key.as_str()) {
                removed.push(self.entries.remove(idx).1);
            }
        }
        removed
    }

    /// Every attached key in attachment order.
    pub fn types(&self) -> impl Iterator<Item = &ComponentType> {
        self.entries.iter().map(|(key, _)| key)
    }

    /// Keys of attached tags in attachment order.
    pub fn tags(&self) -> impl Iterator<Item = &ComponentType> {
        self.entries
            .iter()
            .filter(|(_, component)| component.is_tag())
            .map(|(key, _)| key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Component> {
        self.entries.iter().map(|(_, component)| component.as_ref())
    }

    /// Components not queued for removal, in attachment order.
    pub fn live(&self) -> impl Iterator<Item = &dyn Component> {
        self.entries
            .iter()
            .filter(move |(key, _)| !self.pending_removal.contains(key))
            .map(|(_, component)| component.as_ref())
    }
}

impl Clone for ComponentSet {
    /// Deep copy of every component. Pending removals are not carried over.
    fn clone(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|(key, component)| (key.clone(), component.clone_box()))
                .collect(),
            pending_removal: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
