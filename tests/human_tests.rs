//! Human Body Tests
//!
//! Tests for:
//! - Mesh construction from a body model, vertex colors
//! - Morph targets: registration, exclusive display, range errors
//! - Online geometry updates and their refusal while recording
//! - Recorded morph influences

use glam::Vec3;

use robomeshcat::animation::PropertyValue;
use robomeshcat::{
    BodyModel, BodyParameters, Color, Command, CommandLog, Human, HumanOptions, MemoryTransport, Scene, SceneError,
    SceneOptions,
};

const BASE: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];

/// Single triangle, uniformly scaled by `1 + betas[0]`.
struct Triangle;

impl BodyModel for Triangle {
    fn vertex_count(&self) -> usize {
        3
    }

    fn faces(&self) -> Vec<[u32; 3]> {
        vec![[0, 1, 2]]
    }

    fn vertices(&self, parameters: &BodyParameters) -> robomeshcat::Result<Vec<[f32; 3]>> {
        let s = 1.0 + parameters.betas.first().copied().unwrap_or(0.0);
        Ok(BASE.iter().map(|v| v.map(|c| c * s)).collect())
    }
}

fn scaled(s: f32) -> Vec<[f32; 3]> {
    BASE.iter().map(|v| v.map(|c| c * s)).collect()
}

fn betas(b: f32) -> BodyParameters {
    BodyParameters {
        betas: vec![b],
        ..Default::default()
    }
}

fn human(options: HumanOptions) -> Human {
    Human::new(Triangle, options).unwrap()
}

fn named(name: &str) -> HumanOptions {
    HumanOptions {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

fn new_scene() -> (Scene, CommandLog) {
    let transport = MemoryTransport::new();
    let log = transport.log();
    let scene = Scene::new(transport, SceneOptions::default()).unwrap();
    log.clear();
    (scene, log)
}

fn positions(human: &Human) -> Vec<[f32; 3]> {
    human.object().geometry().as_mesh().unwrap().positions.clone()
}

fn influences_command(value: Vec<f32>) -> Command {
    Command::SetProperty {
        path: "/meshcat/body".to_string(),
        property: "morphTargetInfluences".to_string(),
        value: PropertyValue::Vector(value),
    }
}

/// A scene holding human `body` with two registered morphs.
fn scene_with_morphs() -> (Scene, CommandLog) {
    let (mut scene, log) = new_scene();
    let mut body = human(named("body"));
    body.add_morph(scaled(2.0), None).unwrap();
    body.add_morph_from_parameters(&betas(2.0)).unwrap();
    scene.add_human(body).unwrap();
    log.clear();
    (scene, log)
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn mesh_comes_from_model() {
    let body = human(HumanOptions {
        parameters: betas(1.0),
        ..Default::default()
    });
    assert_eq!(positions(&body), scaled(2.0));
    assert_eq!(body.parameters().betas, [1.0]);
    assert_eq!(body.object().color(), Color::new(0.9, 0.9, 0.9));
}

struct WrongCount;

impl BodyModel for WrongCount {
    fn vertex_count(&self) -> usize {
        4
    }

    fn faces(&self) -> Vec<[u32; 3]> {
        vec![[0, 1, 2]]
    }

    fn vertices(&self, _parameters: &BodyParameters) -> robomeshcat::Result<Vec<[f32; 3]>> {
        Ok(BASE.to_vec())
    }
}

#[test]
fn model_vertex_count_is_checked() {
    let result = Human::new(WrongCount, HumanOptions::default());
    assert!(matches!(result, Err(SceneError::VertexCount { expected: 4, actual: 3 })));
}

#[test]
fn vertex_colors_replace_material_color() {
    let color = Color::new(0.1, 0.6, 0.3);
    let mut body = human(HumanOptions {
        color,
        use_vertex_colors: true,
        ..Default::default()
    });
    body.add_morph(scaled(0.5), None).unwrap();

    assert_eq!(body.object().color(), Color::WHITE);
    let mesh = body.object().geometry().as_mesh().unwrap();
    assert_eq!(mesh.colors.as_deref(), Some(&[color.to_array(); 3][..]));
    assert_eq!(mesh.morph_colors, [vec![color.to_array(); 3]]);
}

#[test]
fn unnamed_human_gets_default_name() {
    let (mut scene, _log) = new_scene();
    assert_eq!(scene.add_human(human(HumanOptions::default())).unwrap().as_deref(), Some("human0"));
}

#[test]
fn human_options_deserialize() {
    let options: HumanOptions = serde_json::from_str(r#"{ "opacity": 0.5, "parameters": { "betas": [0.1] } }"#).unwrap();
    assert!((options.opacity - 0.5).abs() < f32::EPSILON);
    assert_eq!(options.parameters.betas, [0.1]);
    assert!(!options.use_vertex_colors);
}

// ============================================================================
// Morph Targets
// ============================================================================

#[test]
fn add_sends_zero_influences() {
    let (mut scene, log) = new_scene();
    let mut body = human(named("body"));
    body.add_morph(scaled(2.0), None).unwrap();
    body.add_morph(scaled(3.0), None).unwrap();
    scene.add_human(body).unwrap();

    let commands = log.commands();
    assert_eq!(commands.len(), 4);
    assert_eq!(commands[3], influences_command(vec![0.0, 0.0]));
    assert_eq!(scene.human("body").unwrap().morph_count(), 2);
}

#[test]
fn display_morph_is_exclusive() {
    let (mut scene, log) = scene_with_morphs();
    let body = scene.human_mut("body").unwrap();

    body.display_morph(Some(1)).unwrap();
    assert_eq!(body.displayed_morph(), Some(1));
    assert_eq!(body.object().morph_influences(), [0.0, 1.0]);
    assert_eq!(log.take(), [influences_command(vec![0.0, 1.0])]);

    body.display_morph(None).unwrap();
    assert_eq!(body.displayed_morph(), None);
    assert_eq!(log.take(), [influences_command(vec![0.0, 0.0])]);
}

#[test]
fn display_morph_out_of_range() {
    let (mut scene, log) = scene_with_morphs();
    let body = scene.human_mut("body").unwrap();
    body.display_morph(Some(0)).unwrap();
    log.clear();

    assert!(matches!(
        body.display_morph(Some(2)),
        Err(SceneError::MorphOutOfRange { index: 2, count: 2 })
    ));
    assert_eq!(body.displayed_morph(), Some(0));
    assert!(log.is_empty());
}

#[test]
fn morphs_cannot_be_added_after_attach() {
    let (mut scene, _log) = scene_with_morphs();
    let body = scene.human_mut("body").unwrap();
    body.add_morph(scaled(4.0), None).unwrap();
    assert_eq!(body.morph_count(), 2);
}

#[test]
fn morph_vertex_count_is_checked() {
    let mut body = human(HumanOptions::default());
    assert!(matches!(
        body.add_morph(vec![[0.0; 3]; 2], None),
        Err(SceneError::VertexCount { expected: 3, actual: 2 })
    ));
    assert_eq!(body.morph_count(), 0);
}

#[test]
fn detached_human_cannot_display_morph() {
    let mut body = human(HumanOptions::default());
    body.add_morph(scaled(2.0), None).unwrap();
    assert!(matches!(body.display_morph(Some(0)), Err(SceneError::NotAttached(_))));
}

#[test]
fn morph_influences_are_recorded() {
    let (mut scene, _log) = scene_with_morphs();
    scene.begin_animation(30).unwrap();
    scene.render().unwrap();
    scene.human_mut("body").unwrap().display_morph(Some(0)).unwrap();
    scene.render().unwrap();
    scene.human_mut("body").unwrap().display_morph(Some(1)).unwrap();
    scene.render().unwrap();

    let animation = scene.end_animation().unwrap();
    let track = animation.track("/meshcat/body", "morphTargetInfluences").unwrap();
    assert_eq!(track.frames(), &[0, 1, 2]);
    assert_eq!(
        track.values(),
        &[
            PropertyValue::Vector(vec![0.0, 0.0]),
            PropertyValue::Vector(vec![1.0, 0.0]),
            PropertyValue::Vector(vec![0.0, 1.0]),
        ]
    );
}

// ============================================================================
// Geometry Updates
// ============================================================================

#[test]
fn update_vertices_resends_geometry() {
    let (mut scene, log) = scene_with_morphs();
    let body = scene.human_mut("body").unwrap();
    body.update_vertices(scaled(5.0), None).unwrap();

    assert_eq!(positions(body), scaled(5.0));
    let kinds: Vec<&str> = log.commands().iter().map(|c| c.kind()).collect();
    assert_eq!(kinds, ["set_object", "set_transform", "set_property", "set_property"]);
}

#[test]
fn update_parameters_recomputes_vertices() {
    let (mut scene, _log) = scene_with_morphs();
    let body = scene.human_mut("body").unwrap();
    body.update_parameters(betas(0.5)).unwrap();

    assert_eq!(positions(body), scaled(1.5));
    assert_eq!(body.parameters().betas, [0.5]);
}

#[test]
fn update_vertices_is_skipped_while_recording() {
    let (mut scene, log) = scene_with_morphs();
    scene.begin_animation(30).unwrap();
    scene.human_mut("body").unwrap().update_vertices(scaled(5.0), None).unwrap();
    scene.end_animation().unwrap();

    assert_eq!(positions(scene.human("body").unwrap()), scaled(1.0));
    assert!(log.commands().iter().all(|c| c.kind() == "set_animation"));
}

#[test]
fn skipped_parameter_update_keeps_parameters() {
    let (mut scene, _log) = scene_with_morphs();
    scene.begin_animation(30).unwrap();
    scene.human_mut("body").unwrap().update_parameters(betas(5.0)).unwrap();
    scene.end_animation().unwrap();

    let body = scene.human("body").unwrap();
    assert!(body.parameters().betas.is_empty());
    assert_eq!(positions(body), scaled(1.0));
}

#[test]
fn update_vertices_checks_count_first() {
    let mut body = human(HumanOptions::default());
    assert!(matches!(
        body.update_vertices(vec![[0.0; 3]; 4], None),
        Err(SceneError::VertexCount { expected: 3, actual: 4 })
    ));
    assert!(matches!(body.update_vertices(scaled(2.0), None), Err(SceneError::NotAttached(_))));
}

fn vertex_colored_scene() -> (Scene, CommandLog) {
    let (mut scene, log) = new_scene();
    scene
        .add_human(human(HumanOptions {
            name: Some("body".to_string()),
            use_vertex_colors: true,
            ..Default::default()
        }))
        .unwrap();
    log.clear();
    (scene, log)
}

fn vertex_colors(human: &Human) -> Vec<[f32; 3]> {
    human.object().geometry().as_mesh().unwrap().colors.clone().unwrap()
}

#[test]
fn vertex_color_change_is_skipped_while_recording() {
    let (mut scene, _log) = vertex_colored_scene();
    let grey = Color::new(0.9, 0.9, 0.9);

    scene.begin_animation(30).unwrap();
    scene.human_mut("body").unwrap().set_color([1.0, 0.0, 0.0]).unwrap();
    scene.end_animation().unwrap();

    let body = scene.human_mut("body").unwrap();
    assert_eq!(body.color(), grey);
    assert_eq!(vertex_colors(body), [grey.to_array(); 3]);

    body.update_vertices(scaled(2.0), None).unwrap();
    assert_eq!(vertex_colors(body), [grey.to_array(); 3]);

    body.set_color([1.0, 0.0, 0.0]).unwrap();
    assert_eq!(body.color(), Color::new(1.0, 0.0, 0.0));
    assert_eq!(vertex_colors(body), [[1.0, 0.0, 0.0]; 3]);
}

#[test]
fn detached_color_change_keeps_color() {
    let mut body = human(HumanOptions::default());
    assert!(matches!(body.set_color([1.0, 0.0, 0.0]), Err(SceneError::NotAttached(_))));
    assert_eq!(body.color(), Color::new(0.9, 0.9, 0.9));
    assert_eq!(body.object().color(), Color::new(0.9, 0.9, 0.9));
}

#[test]
fn delegated_setters_reach_object() {
    let (mut scene, _log) = scene_with_morphs();
    let body = scene.human_mut("body").unwrap();
    body.set_pos(Vec3::new(0.0, 1.0, 0.0)).unwrap();
    body.set_color([0.5, 0.5, 0.5]).unwrap();
    body.hide().unwrap();

    assert_eq!(body.object().pos(), Vec3::new(0.0, 1.0, 0.0));
    assert_eq!(body.object().color(), Color::new(0.5, 0.5, 0.5));
    assert!(!body.object().visible());
}
