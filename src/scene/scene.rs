use glam::{Mat4, Vec3};
use image::RgbaImage;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::animation::{Animation, PropertyValue};
use crate::errors::{Result, SceneError};
use crate::human::Human;
use crate::material::Color;
use crate::object::Object;
use crate::robot::Robot;
use crate::scene::camera::Camera;
use crate::scene::names::NameAllocator;
use crate::scene::scope::{AnimationScope, VideoScope};
use crate::scene::{EntityKey, HumanKey, ObjectKey, RobotKey};
use crate::video::{VideoEncoder, VideoOptions};
use crate::viewer::command::{BACKGROUND_PATH, Command};
use crate::viewer::{Transport, Viewer, ViewerHandle};

/// Vertical background gradient of the viewer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Background {
    pub top: Color,
    pub bottom: Color,
}

impl Default for Background {
    fn default() -> Self {
        Self {
            top: Color::WHITE,
            bottom: Color::WHITE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneOptions {
    /// Block in [`Scene::new`] until the viewer answers.
    pub wait_for_viewer: bool,
    /// Applied once at construction. `None` keeps the viewer's default.
    pub background: Option<Background>,
}

impl Default for SceneOptions {
    fn default() -> Self {
        Self {
            wait_for_viewer: true,
            background: Some(Background::default()),
        }
    }
}

/// Registry of objects, robots and humans sharing one viewer.
///
/// Entity names live in a single namespace. Adding an entity under a taken
/// name replaces the previous one; unnamed entities get `obj{n}`,
/// `robot{n}` or `human{n}`. The topology is frozen while an animation is
/// being recorded: adds and removes are skipped with a warning.
pub struct Scene {
    viewer: ViewerHandle,

    objects: SlotMap<ObjectKey, Object>,
    robots: SlotMap<RobotKey, Robot>,
    humans: SlotMap<HumanKey, Human>,
    index: FxHashMap<String, EntityKey>,
    names: NameAllocator,

    camera: Camera,
    video: Option<Box<dyn VideoEncoder>>,
}

impl Scene {
    pub fn new(transport: impl Transport + 'static, options: SceneOptions) -> Result<Self> {
        let mut viewer = Viewer::new(Box::new(transport));
        if options.wait_for_viewer {
            viewer.wait_until_ready()?;
        }
        if let Some(background) = options.background {
            for (property, color) in [("top_color", background.top), ("bottom_color", background.bottom)] {
                viewer.send(Command::SetProperty {
                    path: BACKGROUND_PATH.to_string(),
                    property: property.to_string(),
                    value: PropertyValue::Vector(color.to_array().to_vec()),
                })?;
            }
        }

        Ok(Self {
            viewer: viewer.into_handle(),
            objects: SlotMap::with_key(),
            robots: SlotMap::with_key(),
            humans: SlotMap::with_key(),
            index: FxHashMap::default(),
            names: NameAllocator::new(),
            camera: Camera::default(),
            video: None,
        })
    }

    #[must_use]
    pub fn viewer(&self) -> &ViewerHandle {
        &self.viewer
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Attaches an object and returns its name, or `None` if the add was
    /// skipped because an animation is being recorded.
    pub fn add_object(&mut self, mut object: Object) -> Result<Option<String>> {
        let Some(name) = self.admit(object.name(), "obj")? else {
            return Ok(None);
        };
        object.set_name(name.clone());
        object.attach(self.viewer.clone())?;
        let key = self.objects.insert(object);
        self.index.insert(name.clone(), EntityKey::Object(key));
        Ok(Some(name))
    }

    pub fn add_robot(&mut self, mut robot: Robot) -> Result<Option<String>> {
        let Some(name) = self.admit(robot.name(), "robot")? else {
            return Ok(None);
        };
        robot.set_name(name.clone());
        robot.attach(&self.viewer)?;
        let key = self.robots.insert(robot);
        self.index.insert(name.clone(), EntityKey::Robot(key));
        Ok(Some(name))
    }

    pub fn add_human(&mut self, mut human: Human) -> Result<Option<String>> {
        let Some(name) = self.admit(human.name(), "human")? else {
            return Ok(None);
        };
        human.set_name(name.clone());
        human.attach(&self.viewer)?;
        let key = self.humans.insert(human);
        self.index.insert(name.clone(), EntityKey::Human(key));
        Ok(Some(name))
    }

    /// Resolves the name of a new entity, clearing the slot if it is taken.
    fn admit(&mut self, requested: Option<&str>, prefix: &str) -> Result<Option<String>> {
        if self.is_recording() {
            log::warn!("Adding entities during an animation is not allowed, add them before starting it");
            return Ok(None);
        }
        let name = match requested {
            Some(name) => name.to_string(),
            None => {
                let index = &self.index;
                self.names.allocate(prefix, |n| index.contains_key(n))
            }
        };
        if self.index.contains_key(&name) {
            log::warn!("An entity named '{name}' is already in the scene, it will be replaced");
            self.remove_entry(&name)?;
        }
        Ok(Some(name))
    }

    /// Removes an object from the scene and the viewer, handing it back
    /// detached. Skipped with a warning while recording.
    pub fn remove_object(&mut self, name: &str) -> Result<Option<Object>> {
        if self.reject_removal(name) {
            return Ok(None);
        }
        match self.index.get(name) {
            Some(EntityKey::Object(key)) => {
                let key = *key;
                self.index.remove(name);
                let mut object = self.objects.remove(key).ok_or_else(|| unknown(name))?;
                object.detach()?;
                Ok(Some(object))
            }
            _ => Err(unknown(name)),
        }
    }

    pub fn remove_robot(&mut self, name: &str) -> Result<Option<Robot>> {
        if self.reject_removal(name) {
            return Ok(None);
        }
        match self.index.get(name) {
            Some(EntityKey::Robot(key)) => {
                let key = *key;
                self.index.remove(name);
                let mut robot = self.robots.remove(key).ok_or_else(|| unknown(name))?;
                robot.detach()?;
                Ok(Some(robot))
            }
            _ => Err(unknown(name)),
        }
    }

    pub fn remove_human(&mut self, name: &str) -> Result<Option<Human>> {
        if self.reject_removal(name) {
            return Ok(None);
        }
        match self.index.get(name) {
            Some(EntityKey::Human(key)) => {
                let key = *key;
                self.index.remove(name);
                let mut human = self.humans.remove(key).ok_or_else(|| unknown(name))?;
                human.detach()?;
                Ok(Some(human))
            }
            _ => Err(unknown(name)),
        }
    }

    fn reject_removal(&self, name: &str) -> bool {
        if self.is_recording() {
            log::warn!("Removing '{name}' during an animation is not allowed");
            return true;
        }
        false
    }

    /// Removes whatever entity is registered under `name`.
    fn remove_entry(&mut self, name: &str) -> Result<()> {
        match self.index.remove(name) {
            Some(EntityKey::Object(key)) => self.objects.remove(key).map_or(Ok(()), |mut o| o.detach()),
            Some(EntityKey::Robot(key)) => self.robots.remove(key).map_or(Ok(()), |mut r| r.detach()),
            Some(EntityKey::Human(key)) => self.humans.remove(key).map_or(Ok(()), |mut h| h.detach()),
            None => Ok(()),
        }
    }

    /// Removes every entity. Skipped with a warning while recording.
    pub fn clear(&mut self) -> Result<()> {
        if self.is_recording() {
            log::warn!("Clearing the scene during an animation is not allowed");
            return Ok(());
        }
        let names: Vec<String> = self.index.keys().cloned().collect();
        for name in &names {
            self.remove_entry(name)?;
        }
        log::debug!("Scene cleared ({} entities)", names.len());
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Sorted names of all entities.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.index.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn object(&self, name: &str) -> Result<&Object> {
        match self.index.get(name) {
            Some(EntityKey::Object(key)) => self.objects.get(*key).ok_or_else(|| unknown(name)),
            _ => Err(unknown(name)),
        }
    }

    pub fn object_mut(&mut self, name: &str) -> Result<&mut Object> {
        match self.index.get(name) {
            Some(EntityKey::Object(key)) => self.objects.get_mut(*key).ok_or_else(|| unknown(name)),
            _ => Err(unknown(name)),
        }
    }

    pub fn robot(&self, name: &str) -> Result<&Robot> {
        match self.index.get(name) {
            Some(EntityKey::Robot(key)) => self.robots.get(*key).ok_or_else(|| unknown(name)),
            _ => Err(unknown(name)),
        }
    }

    pub fn robot_mut(&mut self, name: &str) -> Result<&mut Robot> {
        match self.index.get(name) {
            Some(EntityKey::Robot(key)) => self.robots.get_mut(*key).ok_or_else(|| unknown(name)),
            _ => Err(unknown(name)),
        }
    }

    pub fn human(&self, name: &str) -> Result<&Human> {
        match self.index.get(name) {
            Some(EntityKey::Human(key)) => self.humans.get(*key).ok_or_else(|| unknown(name)),
            _ => Err(unknown(name)),
        }
    }

    pub fn human_mut(&mut self, name: &str) -> Result<&mut Human> {
        match self.index.get(name) {
            Some(EntityKey::Human(key)) => self.humans.get_mut(*key).ok_or_else(|| unknown(name)),
            _ => Err(unknown(name)),
        }
    }

    // ========================================================================
    // Animation
    // ========================================================================

    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.viewer.borrow().is_recording()
    }

    /// Index of the open frame, `None` when not recording.
    #[must_use]
    pub fn current_frame(&self) -> Option<u32> {
        self.viewer.borrow().recorder().map(|r| r.current_frame().index())
    }

    /// Starts recording with frame 0 open. Every property write of every
    /// entity goes into the open frame until [`Scene::end_animation`].
    pub fn begin_animation(&mut self, fps: u32) -> Result<()> {
        self.viewer.borrow_mut().begin_recording(fps)?;
        log::debug!("Animation started at {fps} fps");
        Ok(())
    }

    /// Re-asserts every entity's current state into the open frame, closes
    /// it and opens the next one.
    pub fn advance_frame(&mut self) -> Result<()> {
        if !self.is_recording() {
            return Err(SceneError::NotRecording);
        }
        self.reassert_all()?;
        if let Some(recorder) = self.viewer.borrow_mut().recorder_mut() {
            recorder.next_frame();
        }
        Ok(())
    }

    /// Closes the final frame, switches back to live mode and publishes the
    /// deduplicated animation.
    pub fn end_animation(&mut self) -> Result<Animation> {
        let mut viewer = self.viewer.borrow_mut();
        let animation = viewer.end_recording()?.finish();
        viewer.publish(animation.clone())?;
        log::debug!(
            "Animation published: {} clips, {} frames",
            animation.clips().len(),
            animation.duration() + 1
        );
        Ok(animation)
    }

    /// Discards the recording without publishing anything.
    pub fn abort_animation(&mut self) -> Result<()> {
        let recorder = self.viewer.borrow_mut().end_recording()?;
        log::debug!("Animation discarded at frame {}", recorder.current_frame().index());
        Ok(())
    }

    /// Records until the returned scope is finished or dropped.
    pub fn animation(&mut self, fps: u32) -> Result<AnimationScope<'_>> {
        self.begin_animation(fps)?;
        Ok(AnimationScope::new(self))
    }

    fn reassert_all(&self) -> Result<()> {
        for object in self.objects.values() {
            object.reassert()?;
        }
        for robot in self.robots.values() {
            robot.reassert()?;
        }
        for human in self.humans.values() {
            human.reassert()?;
        }
        self.camera.reassert(&mut self.viewer.borrow_mut())
    }

    // ========================================================================
    // Rendering & video
    // ========================================================================

    /// Advances the animation while recording; otherwise appends the current
    /// viewer image to the active video capture, if any.
    pub fn render(&mut self) -> Result<()> {
        if self.is_recording() {
            return self.advance_frame();
        }
        if let Some(encoder) = self.video.as_mut() {
            let image = self.viewer.borrow_mut().capture_image()?;
            encoder.append(&image)?;
        }
        Ok(())
    }

    pub fn render_image(&mut self) -> Result<RgbaImage> {
        self.viewer.borrow_mut().capture_image()
    }

    #[must_use]
    pub fn is_capturing_video(&self) -> bool {
        self.video.is_some()
    }

    /// Starts a video capture and returns the output location.
    pub fn start_video(&mut self, options: &VideoOptions) -> Result<std::path::PathBuf> {
        let (path, encoder) = options.open()?;
        self.install_encoder(encoder)?;
        log::debug!("Capturing video to {}", path.display());
        Ok(path)
    }

    /// Starts a video capture with a custom encoder.
    pub fn start_video_with(&mut self, encoder: impl VideoEncoder + 'static) -> Result<()> {
        self.install_encoder(Box::new(encoder))
    }

    fn install_encoder(&mut self, encoder: Box<dyn VideoEncoder>) -> Result<()> {
        if let Some(mut previous) = self.video.replace(encoder) {
            log::warn!("A video capture was already active, closing it");
            previous.close()?;
        }
        Ok(())
    }

    /// Closes the active video capture, if any.
    pub fn finish_video(&mut self) -> Result<()> {
        match self.video.take() {
            Some(mut encoder) => encoder.close(),
            None => Ok(()),
        }
    }

    /// Captures every live render until the returned scope is finished or
    /// dropped.
    pub fn video_recording(&mut self, options: &VideoOptions) -> Result<VideoScope<'_>> {
        self.start_video(options)?;
        Ok(VideoScope::new(self))
    }

    // ========================================================================
    // Camera
    // ========================================================================

    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[must_use]
    pub fn camera_pose(&self) -> Mat4 {
        self.camera.pose()
    }

    pub fn set_camera_pose(&mut self, pose: Mat4) -> Result<()> {
        self.camera.set_pose(&mut self.viewer.borrow_mut(), pose)
    }

    pub fn set_camera_pos(&mut self, pos: Vec3) -> Result<()> {
        self.edit_camera_pose(|m| m.w_axis = pos.extend(1.0))
    }

    pub fn edit_camera_pose(&mut self, f: impl FnOnce(&mut Mat4)) -> Result<()> {
        self.camera.edit_pose(&mut self.viewer.borrow_mut(), f)
    }

    #[must_use]
    pub fn camera_zoom(&self) -> f32 {
        self.camera.zoom()
    }

    pub fn set_camera_zoom(&mut self, zoom: f32) -> Result<()> {
        self.camera.set_zoom(&mut self.viewer.borrow_mut(), zoom)
    }

    /// Restores the identity pose, unit zoom and interactive control.
    pub fn reset_camera(&mut self) -> Result<()> {
        self.camera.reset(&mut self.viewer.borrow_mut())
    }

    #[must_use]
    pub fn camera_control_enabled(&self) -> bool {
        self.camera.control_enabled()
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("viewer", &self.viewer)
            .field("entities", &self.names())
            .field("camera", &self.camera)
            .field("capturing_video", &self.video.is_some())
            .finish_non_exhaustive()
    }
}

fn unknown(name: &str) -> SceneError {
    SceneError::UnknownEntity(name.to_string())
}
