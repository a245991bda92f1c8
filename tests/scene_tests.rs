//! Scene Integration Tests
//!
//! Tests for:
//! - Scene construction: viewer wait, background colors, options
//! - Registry: default names, duplicates, removal, lookups
//! - Online dispatch of item setters
//! - Detached items and topology changes while recording
//! - Camera pose/zoom and interactive control

use std::cell::Cell;
use std::rc::Rc;

use glam::{Mat3, Mat4, Vec3};
use image::RgbaImage;

use robomeshcat::animation::PropertyValue;
use robomeshcat::{Color, Command, CommandLog, MemoryTransport, Object, Scene, SceneError, SceneOptions, Transport};

fn new_scene() -> (Scene, CommandLog) {
    let transport = MemoryTransport::new();
    let log = transport.log();
    let scene = Scene::new(transport, SceneOptions::default()).unwrap();
    log.clear();
    (scene, log)
}

fn kinds(commands: &[Command]) -> Vec<&'static str> {
    commands.iter().map(Command::kind).collect()
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn scene_sets_white_background() {
    let transport = MemoryTransport::new();
    let log = transport.log();
    let _scene = Scene::new(transport, SceneOptions::default()).unwrap();

    let commands = log.commands();
    assert_eq!(commands.len(), 2);
    for (command, property) in commands.iter().zip(["top_color", "bottom_color"]) {
        assert_eq!(
            command,
            &Command::SetProperty {
                path: "/Background".to_string(),
                property: property.to_string(),
                value: PropertyValue::Vector(vec![1.0, 1.0, 1.0]),
            }
        );
    }
}

#[test]
fn scene_without_background_sends_nothing() {
    let transport = MemoryTransport::new();
    let log = transport.log();
    let options = SceneOptions {
        background: None,
        ..Default::default()
    };
    let _scene = Scene::new(transport, options).unwrap();
    assert!(log.is_empty());
}

struct WaitCounter {
    waits: Rc<Cell<usize>>,
}

impl Transport for WaitCounter {
    fn send(&mut self, _command: Command) -> robomeshcat::Result<()> {
        Ok(())
    }

    fn capture_image(&mut self) -> robomeshcat::Result<RgbaImage> {
        Ok(RgbaImage::new(1, 1))
    }

    fn wait_until_ready(&mut self) -> robomeshcat::Result<()> {
        self.waits.set(self.waits.get() + 1);
        Ok(())
    }
}

#[test]
fn scene_waits_for_viewer_only_when_asked() {
    let waits = Rc::new(Cell::new(0));
    let _a = Scene::new(WaitCounter { waits: Rc::clone(&waits) }, SceneOptions::default()).unwrap();
    assert_eq!(waits.get(), 1);

    let options = SceneOptions {
        wait_for_viewer: false,
        ..Default::default()
    };
    let _b = Scene::new(WaitCounter { waits: Rc::clone(&waits) }, options).unwrap();
    assert_eq!(waits.get(), 1);
}

#[test]
fn scene_options_deserialize_with_defaults() {
    let options: SceneOptions = serde_json::from_str(r#"{ "wait_for_viewer": false }"#).unwrap();
    assert!(!options.wait_for_viewer);
    assert!(options.background.is_some());
}

// ============================================================================
// Registry
// ============================================================================

#[test]
fn add_object_sends_full_state() {
    let (mut scene, log) = new_scene();
    let name = scene.add_object(Object::cube(0.5).with_name("box")).unwrap();
    assert_eq!(name.as_deref(), Some("box"));

    let commands = log.commands();
    assert_eq!(kinds(&commands), ["set_object", "set_transform", "set_property"]);
    assert!(commands.iter().all(|c| c.path() == Some("/meshcat/box")));
    assert!(scene.object("box").unwrap().is_attached());
}

#[test]
fn unnamed_entities_get_sequential_names() {
    let (mut scene, _log) = new_scene();
    assert_eq!(scene.add_object(Object::sphere(0.1)).unwrap().as_deref(), Some("obj0"));
    assert_eq!(scene.add_object(Object::sphere(0.1)).unwrap().as_deref(), Some("obj1"));
    assert_eq!(scene.names(), ["obj0", "obj1"]);
}

#[test]
fn default_names_skip_user_names() {
    let (mut scene, _log) = new_scene();
    scene.add_object(Object::sphere(0.1).with_name("obj0")).unwrap();
    assert_eq!(scene.add_object(Object::sphere(0.1)).unwrap().as_deref(), Some("obj1"));
}

#[test]
fn independent_scenes_allocate_independently() {
    let (mut a, _) = new_scene();
    let (mut b, _) = new_scene();
    assert_eq!(a.add_object(Object::cube(1.0)).unwrap(), b.add_object(Object::cube(1.0)).unwrap());
}

#[test]
fn duplicate_name_replaces_entity() {
    let (mut scene, log) = new_scene();
    scene.add_object(Object::cube(1.0).with_name("thing").with_opacity(0.3)).unwrap();
    log.clear();

    scene.add_object(Object::sphere(1.0).with_name("thing").with_opacity(0.8)).unwrap();

    assert_eq!(scene.len(), 1);
    assert!((scene.object("thing").unwrap().opacity() - 0.8).abs() < f32::EPSILON);
    let commands = log.commands();
    assert_eq!(
        commands[0],
        Command::Delete {
            path: "/meshcat/thing".to_string()
        }
    );
    assert_eq!(commands[1].kind(), "set_object");
}

#[test]
fn remove_object_detaches_and_deletes() {
    let (mut scene, log) = new_scene();
    scene.add_object(Object::cube(1.0).with_name("box")).unwrap();
    log.clear();

    let mut removed = scene.remove_object("box").unwrap().unwrap();
    assert!(!scene.contains("box"));
    assert_eq!(log.commands(), [Command::Delete { path: "/meshcat/box".to_string() }]);
    assert!(matches!(removed.set_pos(Vec3::ONE), Err(SceneError::NotAttached(_))));

    // A removed object can be added again.
    scene.add_object(removed).unwrap();
    assert!(scene.contains("box"));
}

#[test]
fn lookups_fail_for_unknown_names() {
    let (mut scene, _log) = new_scene();
    scene.add_object(Object::cube(1.0).with_name("box")).unwrap();

    assert!(matches!(scene.object("nope"), Err(SceneError::UnknownEntity(n)) if n == "nope"));
    assert!(matches!(scene.robot("box"), Err(SceneError::UnknownEntity(_))));
    assert!(matches!(scene.remove_human("box"), Err(SceneError::UnknownEntity(_))));
    assert!(scene.contains("box"));
}

#[test]
fn clear_removes_everything() {
    let (mut scene, log) = new_scene();
    scene.add_object(Object::cube(1.0)).unwrap();
    scene.add_object(Object::cube(1.0)).unwrap();
    log.clear();

    scene.clear().unwrap();
    assert!(scene.is_empty());
    assert_eq!(kinds(&log.commands()), ["delete", "delete"]);
}

// ============================================================================
// Online Dispatch
// ============================================================================

#[test]
fn pose_changes_send_transform_only() {
    let (mut scene, log) = new_scene();
    scene.add_object(Object::cube(1.0).with_name("box")).unwrap();
    log.clear();

    scene.object_mut("box").unwrap().set_pos(Vec3::new(1.0, 2.0, 3.0)).unwrap();

    let expected = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(
        log.commands(),
        [Command::SetTransform {
            path: "/meshcat/box".to_string(),
            matrix: expected.to_cols_array(),
        }]
    );
}

#[test]
fn material_changes_recreate_object() {
    let (mut scene, log) = new_scene();
    scene.add_object(Object::cube(1.0).with_name("box")).unwrap();
    log.clear();

    scene.object_mut("box").unwrap().set_opacity(0.25).unwrap();
    assert_eq!(kinds(&log.take()), ["set_object", "set_transform", "set_property"]);

    scene.object_mut("box").unwrap().set_color([0.0, 1.0, 0.0]).unwrap();
    let commands = log.take();
    let Command::SetObject { object, .. } = &commands[0] else {
        panic!("expected set_object, got {:?}", commands[0]);
    };
    assert_eq!(object["materials"][0]["color"], 0x00FF00);
    assert_eq!(object["materials"][0]["opacity"], 0.25);
    assert_eq!(object["materials"][0]["transparent"], true);
}

#[test]
fn visibility_uses_property() {
    let (mut scene, log) = new_scene();
    scene.add_object(Object::cube(1.0).with_name("box")).unwrap();
    log.clear();

    scene.object_mut("box").unwrap().hide().unwrap();
    assert_eq!(
        log.commands(),
        [Command::SetProperty {
            path: "/meshcat/box".to_string(),
            property: "visible".to_string(),
            value: PropertyValue::Boolean(false),
        }]
    );
    assert!(!scene.object("box").unwrap().visible());
}

#[test]
fn online_round_trip_keeps_precision() {
    let (mut scene, _log) = new_scene();
    scene.add_object(Object::cube(1.0).with_name("box")).unwrap();
    let object = scene.object_mut("box").unwrap();

    let color = Color::new(0.123_456_7, 0.5, 0.987_654_3);
    object.set_color(color).unwrap();
    object.set_opacity(0.333_333).unwrap();
    let pose = Mat4::from_rotation_translation(glam::Quat::from_rotation_x(0.4), Vec3::new(0.1, -0.2, 0.3));
    object.set_pose(pose).unwrap();

    assert_eq!(object.color(), color);
    assert_eq!(object.opacity(), 0.333_333);
    assert_eq!(object.pose(), pose);
}

#[test]
fn edits_modify_in_place() {
    let (mut scene, log) = new_scene();
    scene.add_object(Object::cube(1.0).with_name("box").with_pos(Vec3::new(1.0, 0.0, 0.0))).unwrap();
    log.clear();

    let object = scene.object_mut("box").unwrap();
    object.edit_pos(|p| p.z += 2.0).unwrap();
    object.edit_color(|c| c.r = 0.5).unwrap();

    assert_eq!(object.pos(), Vec3::new(1.0, 0.0, 2.0));
    assert!((object.color().r - 0.5).abs() < f32::EPSILON);
    assert_eq!(kinds(&log.commands()), ["set_transform", "set_object", "set_transform", "set_property"]);
}

#[test]
fn set_rot_keeps_translation() {
    let (mut scene, _log) = new_scene();
    scene.add_object(Object::cube(1.0).with_name("box").with_pos(Vec3::new(0.0, 0.0, 1.0))).unwrap();
    let object = scene.object_mut("box").unwrap();

    let rot = Mat3::from_rotation_z(0.5);
    object.set_rot(rot).unwrap();
    assert_eq!(object.pos(), Vec3::new(0.0, 0.0, 1.0));
    assert!(object.rot().abs_diff_eq(rot, 1e-6));
}

#[test]
fn opacity_is_clamped() {
    let (mut scene, _log) = new_scene();
    scene.add_object(Object::cube(1.0).with_name("box")).unwrap();
    scene.object_mut("box").unwrap().set_opacity(1.7).unwrap();
    assert!((scene.object("box").unwrap().opacity() - 1.0).abs() < f32::EPSILON);
}

#[test]
fn change_callback_runs_once_per_write() {
    let (mut scene, _log) = new_scene();
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let mut object = Object::cube(1.0).with_name("box");
    object.on_change(move || counter.set(counter.get() + 1));
    scene.add_object(object).unwrap();
    assert_eq!(calls.get(), 0);

    let object = scene.object_mut("box").unwrap();
    object.set_pos(Vec3::X).unwrap();
    object.edit_color(|c| c.r = 0.5).unwrap();
    object.set_opacity(0.5).unwrap();
    object.hide().unwrap();
    assert_eq!(calls.get(), 4);

    scene.remove_object("box").unwrap();
    assert_eq!(calls.get(), 4);
}

#[test]
fn change_callback_skips_rejected_writes() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let mut object = Object::cube(1.0).with_name("loose");
    object.on_change(move || counter.set(counter.get() + 1));

    assert!(object.set_pos(Vec3::X).is_err());
    assert_eq!(calls.get(), 0);
}

// ============================================================================
// Lifecycle Errors
// ============================================================================

#[test]
fn detached_object_rejects_mutation() {
    let mut object = Object::cube(1.0).with_name("loose");
    assert!(matches!(object.set_pos(Vec3::X), Err(SceneError::NotAttached(n)) if n == "loose"));
    assert!(matches!(object.set_color(Color::BLACK), Err(SceneError::NotAttached(_))));
    assert!(matches!(object.show(), Err(SceneError::NotAttached(_))));
    assert_eq!(object.pos(), Vec3::ZERO);
}

#[test]
fn topology_is_frozen_while_recording() {
    let (mut scene, _log) = new_scene();
    scene.add_object(Object::cube(1.0).with_name("box")).unwrap();
    scene.begin_animation(30).unwrap();

    assert_eq!(scene.add_object(Object::cube(1.0).with_name("late")).unwrap(), None);
    assert!(!scene.contains("late"));
    assert!(scene.remove_object("box").unwrap().is_none());
    assert!(scene.contains("box"));
    scene.clear().unwrap();
    assert!(scene.contains("box"));

    scene.end_animation().unwrap();
    assert!(scene.remove_object("box").unwrap().is_some());
}

// ============================================================================
// Camera
// ============================================================================

#[test]
fn camera_pose_locks_interactive_control() {
    let (mut scene, log) = new_scene();
    assert!(scene.camera_control_enabled());

    scene.set_camera_pos(Vec3::new(2.0, 0.0, 1.0)).unwrap();

    assert!(!scene.camera_control_enabled());
    let commands = log.take();
    assert_eq!(commands[0].path(), Some("/Cameras/default"));
    assert_eq!(commands[0].kind(), "set_transform");
    assert_eq!(
        commands[1],
        Command::SetProperty {
            path: "/Cameras/default/rotated/<object>".to_string(),
            property: "position".to_string(),
            value: PropertyValue::Vector(vec![0.0, 0.0, 0.0]),
        }
    );
}

#[test]
fn reset_camera_restores_control_and_zoom() {
    let (mut scene, log) = new_scene();
    scene.set_camera_pose(Mat4::from_translation(Vec3::Z)).unwrap();
    scene.set_camera_zoom(0.4).unwrap();
    assert!((scene.camera_zoom() - 0.4).abs() < f32::EPSILON);
    log.clear();

    scene.reset_camera().unwrap();

    assert!(scene.camera_control_enabled());
    assert_eq!(scene.camera_pose(), Mat4::IDENTITY);
    let commands = log.commands();
    assert!(commands.contains(&Command::SetProperty {
        path: "/Cameras/default/rotated/<object>".to_string(),
        property: "position".to_string(),
        value: PropertyValue::Vector(vec![3.0, 1.0, 0.0]),
    }));
    assert_eq!(
        commands.last(),
        Some(&Command::SetProperty {
            path: "/Cameras/default/rotated/<object>".to_string(),
            property: "zoom".to_string(),
            value: PropertyValue::Number(1.0),
        })
    );
}

#[test]
fn edit_camera_pose_applies_in_place() {
    let (mut scene, _log) = new_scene();
    scene.edit_camera_pose(|m| m.w_axis.x = 5.0).unwrap();
    assert_eq!(scene.camera().pos(), Vec3::new(5.0, 0.0, 0.0));
}
