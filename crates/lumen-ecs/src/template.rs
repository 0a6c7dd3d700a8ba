//! Deep copies of entity subtrees.
//!
//! Copies get fresh ids throughout and never share component instances with
//! their source. Scene membership, observers, lifecycle hooks and the killed
//! flag are not copied.

use crate::component::Component;
use crate::entity::EntityId;
use crate::world::World;
use crate::EcsError;

impl World {
    /// Clone `entity` and its whole subtree. Returns the id of the copy,
    /// which is an unparented root outside any scene.
    pub fn clone_entity(&mut self, entity: EntityId) -> Result<EntityId, EcsError> {
        let root = self.get_checked(entity)?.duplicate();
        let root_id = self.spawn(root);

        // (source, parent of its copy); children pushed in reverse so copies
        // are linked in source order.
        let mut stack: Vec<(EntityId, EntityId)> = self
            .get_checked(entity)?
            .children()
            .iter()
            .rev()
            .map(|child| (*child, root_id))
            .collect();

        while let Some((source, copy_parent)) = stack.pop() {
            let record = self.get_checked(source)?;
            let copy = record.duplicate();
            let children = record.children().to_vec();

            let copy_id = self.spawn(copy);
            self.link(copy_parent, copy_id);
            stack.extend(children.into_iter().rev().map(|child| (child, copy_id)));
        }
        Ok(root_id)
    }

    /// Copy every component and child of `template` into `target`.
    ///
    /// Without `force`, a component type already present on `target` fails
    /// with [`EcsError::DuplicateComponent`] before anything is copied. With
    /// `force`, existing components of those types are replaced. Children of
    /// the template are cloned and appended to `target`'s children.
    pub fn add_template(
        &mut self,
        target: EntityId,
        template: EntityId,
        force: bool,
    ) -> Result<(), EcsError> {
        let template_record = self.get_checked(template)?;
        let target_record = self.get_checked(target)?;

        if !force {
            if let Some(clash) = template_record
                .components()
                .map(|component| component.component_type())
                .find(|ty| target_record.has(ty.as_str()))
            {
                return Err(EcsError::DuplicateComponent {
                    entity: target,
                    component: clash,
                });
            }
        }

        let components: Vec<Box<dyn Component>> = template_record
            .components()
            .map(|component| component.clone_box())
            .collect();
        let children = template_record.children().to_vec();

        let target_record = self.get_checked_mut(target)?;
        for component in components {
            target_record.add_boxed_component(component, force)?;
        }
        for child in children {
            let child_copy = self.clone_entity(child)?;
            self.add_child(target, child_copy)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Fake {
        ty: &'static str,
        value: u32,
    }

    impl Component for Fake {
        fn component_type(&self) -> ComponentType {
            ComponentType::from_static(self.ty)
        }
    }

    fn fake(ty: &'static str) -> Box<dyn Component> {
        Box::new(Fake { ty, value: 0 })
    }

    fn spawn_with(world: &mut World, types: &[&'static str]) -> EntityId {
        let entity = Entity::from_components(types.iter().copied().map(fake), None).unwrap();
        world.spawn(entity)
    }

    fn sorted_types(world: &World, id: EntityId) -> Vec<String> {
        let mut types: Vec<String> = world
            .entity(id)
            .unwrap()
            .types()
            .iter()
            .map(ToString::to_string)
            .collect();
        types.sort();
        types
    }

    #[test]
    fn clone_copies_components_and_children() {
        let mut world = World::new();
        let entity = spawn_with(&mut world, &["A", "B"]);
        let child = spawn_with(&mut world, &["Z"]);
        world.add_child(entity, child).unwrap();

        let clone = world.clone_entity(entity).unwrap();
        assert_ne!(clone, entity);
        assert_eq!(sorted_types(&world, clone), vec!["A", "B"]);

        let clone_children = world.entity(clone).unwrap().children().to_vec();
        assert_eq!(clone_children.len(), 1);
        assert_ne!(clone_children[0], child);
        assert_eq!(sorted_types(&world, clone_children[0]), vec!["Z"]);
        assert_eq!(world.entity(clone_children[0]).unwrap().parent(), Some(clone));

        // Source tree untouched.
        assert_eq!(world.entity(entity).unwrap().children(), &[child]);
    }

    #[test]
    fn clone_does_not_share_component_instances() {
        let mut world = World::new();
        let entity = spawn_with(&mut world, &["A"]);
        let clone = world.clone_entity(entity).unwrap();

        world
            .entity_mut(clone)
            .unwrap()
            .get_as_mut::<Fake>("A")
            .unwrap()
            .value = 42;

        let original = world.entity(entity).unwrap().get_as::<Fake>("A").unwrap();
        assert_eq!(original.value, 0);
    }

    #[test]
    fn clone_keeps_child_order_in_wide_tree() {
        let mut world = World::new();
        let root = world.spawn_empty();
        for ty in ["A", "B", "C"] {
            let child = spawn_with(&mut world, &[ty]);
            world.add_child(root, child).unwrap();
            let grandchild = spawn_with(&mut world, &["Z"]);
            world.add_child(child, grandchild).unwrap();
        }

        let clone = world.clone_entity(root).unwrap();
        let children = world.entity(clone).unwrap().children().to_vec();
        let order: Vec<Vec<String>> = children
            .iter()
            .map(|child| sorted_types(&world, *child))
            .collect();
        assert_eq!(order, vec![vec!["A"], vec!["B"], vec!["C"]]);
        for child in children {
            let grandchildren = world.entity(child).unwrap().children().to_vec();
            assert_eq!(grandchildren.len(), 1);
            assert_eq!(world.entity(grandchildren[0]).unwrap().parent(), Some(child));
        }
        assert_eq!(world.descendants(clone).len(), 7);
    }

    #[test]
    fn clone_handles_very_deep_chain() {
        const DEPTH: usize = 100_000;
        let mut world = World::new();
        let mut top = spawn_with(&mut world, &["leaf"]);
        for _ in 0..DEPTH {
            let parent = world.spawn_empty();
            world.add_child(parent, top).unwrap();
            top = parent;
        }

        let clone = world.clone_entity(top).unwrap();
        let copied = world.descendants(clone);
        assert_eq!(copied.len(), DEPTH + 1);
        let leaf = *copied.last().unwrap();
        assert!(world.entity(leaf).unwrap().has("leaf"));
        assert_eq!(world.ancestors(leaf).first(), Some(&clone));

        // Templates share the same copy path.
        let target = world.spawn_empty();
        world.add_template(target, top, false).unwrap();
        assert_eq!(world.descendants(target).len(), DEPTH + 1);
    }

    #[test]
    fn clone_is_outside_any_scene() {
        let mut world = World::new();
        let scene = world.create_scene("main");
        let entity = spawn_with(&mut world, &["A"]);
        world.add_to_scene(scene, entity).unwrap();

        let clone = world.clone_entity(entity).unwrap();
        assert_eq!(world.entity(clone).unwrap().scene(), None);
        assert_eq!(world.entity_manager(scene).unwrap().len(), 1);
    }

    #[test]
    fn template_copies_components_and_nested_children() {
        let mut world = World::new();
        let entity = world.spawn_empty();
        let template = spawn_with(&mut world, &["A", "B"]);
        let middle = spawn_with(&mut world, &["C", "D"]);
        let leaf = spawn_with(&mut world, &["Z"]);
        world.add_child(middle, leaf).unwrap();
        world.add_child(template, middle).unwrap();

        world.add_template(entity, template, false).unwrap();

        assert_eq!(sorted_types(&world, entity), vec!["A", "B"]);
        let first = world.entity(entity).unwrap().children()[0];
        assert_eq!(sorted_types(&world, first), vec!["C", "D"]);
        let second = world.entity(first).unwrap().children()[0];
        assert_eq!(sorted_types(&world, second), vec!["Z"]);

        // The template keeps its own tree.
        assert_eq!(world.entity(template).unwrap().children(), &[middle]);
    }

    #[test]
    fn template_keeps_target_identity() {
        let mut world = World::new();
        let entity = world.spawn(Entity::named("target"));
        world.entity_mut(entity).unwrap().add_tag("existing").unwrap();
        let template = spawn_with(&mut world, &["A"]);

        world.add_template(entity, template, false).unwrap();
        let record = world.entity(entity).unwrap();
        assert_eq!(record.id(), entity);
        assert_eq!(record.name(), "target");
        assert!(record.has_tag("existing"));
        assert!(record.has("A"));
    }

    #[test]
    fn template_clash_is_rejected_atomically() {
        let mut world = World::new();
        let entity = spawn_with(&mut world, &["B"]);
        let template = spawn_with(&mut world, &["A", "B"]);
        let child = world.spawn_empty();
        world.add_child(template, child).unwrap();

        let err = world.add_template(entity, template, false).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { .. }));
        assert_eq!(sorted_types(&world, entity), vec!["B"]);
        assert!(world.entity(entity).unwrap().children().is_empty());
    }

    #[test]
    fn forced_template_replaces_clashing_components() {
        let mut world = World::new();
        let entity = world.spawn(
            Entity::new()
                .with_component(Fake { ty: "A", value: 1 })
                .unwrap(),
        );
        let template = world.spawn(
            Entity::new()
                .with_component(Fake { ty: "A", value: 2 })
                .unwrap(),
        );

        world.add_template(entity, template, true).unwrap();
        let value = world.entity(entity).unwrap().get_as::<Fake>("A").unwrap().value;
        assert_eq!(value, 2);
    }

    #[test]
    fn template_children_join_target_scene() {
        let mut world = World::new();
        let scene = world.create_scene("main");
        let entity = world.spawn_empty();
        world.add_to_scene(scene, entity).unwrap();

        let template = world.spawn_empty();
        let child = world.spawn_empty();
        world.add_child(template, child).unwrap();

        world.add_template(entity, template, false).unwrap();
        assert_eq!(world.entity_manager(scene).unwrap().len(), 2);
    }
}
