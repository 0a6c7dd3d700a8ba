//! Frame loop integration tests: lifecycle ordering, deferred flushes and
//! release of killed entities.

use std::cell::RefCell;
use std::rc::Rc;

use lumen_engine::prelude::*;

thread_local! {
    static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn log(entry: impl Into<String>) {
    LOG.with(|log| log.borrow_mut().push(entry.into()));
}

fn take_log() -> Vec<String> {
    LOG.with(|log| std::mem::take(&mut *log.borrow_mut()))
}

fn recording_entity(name: &'static str) -> Entity {
    let mut entity = Entity::named(name);
    entity.set_on_initialize(move |_| log(format!("{name}:initialize")));
    entity.set_on_pre_update(move |_| log(format!("{name}:preupdate")));
    entity.set_on_post_update(move |_| log(format!("{name}:postupdate")));
    entity
}

fn setup() -> (FrameLoop, EntityId, EntityId) {
    take_log();
    let mut world = World::new();
    let scene = world.create_scene("main");
    let root = world.spawn(recording_entity("root"));
    let child = world.spawn(recording_entity("child"));
    world.add_child(root, child).unwrap();
    world.add_to_scene(scene, root).unwrap();
    let frames = FrameLoop::new(world, scene, FrameConfig::default()).unwrap();
    (frames, root, child)
}

#[test]
fn lifecycle_phases_run_in_order() {
    let (mut frames, _, _) = setup();
    frames.add_system("logic", |_, _, _| log("system"));

    frames.tick().unwrap();
    assert_eq!(
        take_log(),
        vec![
            "root:initialize",
            "child:initialize",
            "root:preupdate",
            "child:preupdate",
            "system",
            "root:postupdate",
            "child:postupdate",
        ]
    );

    frames.tick().unwrap();
    assert_eq!(
        take_log(),
        vec![
            "root:preupdate",
            "child:preupdate",
            "system",
            "root:postupdate",
            "child:postupdate",
        ]
    );
}

#[test]
fn hooks_receive_frame_context() {
    take_log();
    let mut world = World::new();
    let scene = world.create_scene("main");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut entity = Entity::new();
    {
        let seen = Rc::clone(&seen);
        entity
            .events_mut()
            .on(LifecycleStage::PreUpdate, move |event| {
                seen.borrow_mut()
                    .push((event.context.frame, event.context.time, event.elapsed));
            });
    }
    let id = world.spawn(entity);
    world.add_to_scene(scene, id).unwrap();

    let mut frames = FrameLoop::new(world, scene, FrameConfig::default()).unwrap();
    frames.step(0.5).unwrap();
    frames.step(0.25).unwrap();

    assert_eq!(*seen.borrow(), vec![(0, 0.0, 0.5), (1, 0.5, 0.25)]);
}

#[test]
fn scene_removal_is_visible_until_end_of_frame() {
    let (mut frames, root, child) = setup();
    frames.add_system("leave", |world, scene, _| {
        let roots: Vec<EntityId> = world
            .entity_manager(scene)
            .unwrap()
            .entities()
            .iter()
            .copied()
            .filter(|id| world.entity(*id).unwrap().parent().is_none())
            .collect();
        for id in roots {
            world.remove_from_scene(scene, id).unwrap();
        }
    });

    let diagnostics = frames.tick().unwrap();
    assert_eq!(diagnostics.entities_removed, 2);
    assert_eq!(diagnostics.entity_count, 0);

    // Post-update still reached both members before the flush.
    let entries = take_log();
    assert!(entries.contains(&"root:postupdate".to_string()));
    assert!(entries.contains(&"child:postupdate".to_string()));

    let world = frames.world();
    assert_eq!(world.entity(root).unwrap().scene(), None);
    assert_eq!(world.entity(child).unwrap().scene(), None);
    assert_eq!(world.entity(child).unwrap().parent(), Some(root));
}

#[test]
fn killed_children_are_released_after_the_frame() {
    let (mut frames, root, child) = setup();
    frames.add_system("reap", |world, scene, _| {
        let members = world.entity_manager(scene).unwrap().entities().to_vec();
        for id in members {
            if world.entity(id).unwrap().parent().is_some() {
                world.kill(id).unwrap();
            }
        }
    });

    let diagnostics = frames.tick().unwrap();
    assert_eq!(diagnostics.purged, vec![child]);
    assert_eq!(diagnostics.entity_count, 1);

    let world = frames.world();
    assert!(!world.contains(child));
    assert!(world.entity(root).unwrap().children().is_empty());

    // The killed child left the scene inside the system, before post-update.
    let entries = take_log();
    assert!(!entries.contains(&"child:postupdate".to_string()));
}

#[test]
fn entities_joining_mid_frame_initialize_next_frame() {
    let (mut frames, _, _) = setup();
    frames.add_system("spawn", |world, scene, _| {
        if world.entity_count() < 3 {
            let id = world.spawn(recording_entity("late"));
            world.add_to_scene(scene, id).unwrap();
        }
    });

    frames.tick().unwrap();
    let first = take_log();
    assert!(first.contains(&"late:postupdate".to_string()));
    assert!(!first.contains(&"late:initialize".to_string()));

    assert_eq!(frames.tick().unwrap().initialized, 1);
    assert_eq!(take_log()[0], "late:initialize");
}

#[test]
fn run_frames_accumulates_fixed_steps() {
    let mut world = World::new();
    let scene = world.create_scene("main");
    let config = FrameConfig {
        fixed_dt: 0.25,
        ..Default::default()
    };
    let mut frames = FrameLoop::new(world, scene, config).unwrap();

    assert_eq!(frames.run_frames(8).unwrap(), 0);
    assert_eq!(frames.frame_count(), 8);
    assert!((frames.sim_time() - 2.0).abs() < 1e-12);
}

#[test]
fn config_from_json_drives_the_loop() {
    let config = FrameConfig::from_json_str(r#"{ "fixed_dt": 0.1 }"#).unwrap();
    let mut world = World::new();
    let scene = world.create_scene("main");
    let mut frames = FrameLoop::new(world, scene, config).unwrap();
    frames.run_frames(5).unwrap();
    assert!((frames.sim_time() - 0.5).abs() < 1e-12);
}
