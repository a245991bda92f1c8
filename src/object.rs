//! Scene Items
//!
//! An [`Object`] is one renderable entity: geometry, pose, material and
//! visibility. Objects are configured with builder methods, then handed to a
//! [`Scene`](crate::scene::Scene) which names and attaches them. Once attached,
//! every setter propagates through the shared viewer link:
//!
//! | property   | live                                  | recording                     |
//! |------------|---------------------------------------|-------------------------------|
//! | pose       | `set_transform`                       | `position` + `quaternion`     |
//! | color      | `set_object` (full re-creation)       | `color` (vector)              |
//! | opacity    | `set_object` (full re-creation)       | `opacity` (number)            |
//! | visibility | `set_property("visible")`             | `visible` (boolean)           |
//! | morphs     | `set_property("morphTargetInfluences")` | `morphTargetInfluences`     |
//!
//! Mutating a detached object fails with [`SceneError::NotAttached`] and
//! leaves its state untouched.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use glam::{Mat3, Mat4, Vec3};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::animation::PropertyValue;
use crate::assets::{self, MeshLoader, Scale};
use crate::errors::{Result, SceneError};
use crate::geometry::{CYLINDER_SECTIONS, Geometry, TriangleMesh};
use crate::material::{Color, Material, Texture};
use crate::property::{Changed, Live};
use crate::viewer::command::{self, Command};
use crate::viewer::{Sink, ViewerHandle};

/// A group of viewer-side fields updated together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Property {
    Pose,
    /// Color, opacity and texture.
    Material,
    Visible,
    MorphInfluences,
}

#[derive(Debug)]
pub struct Object {
    name: Option<String>,
    geometry: Geometry,
    pose: Live<Mat4>,
    color: Live<Color>,
    texture: Option<Texture>,
    opacity: Live<f32>,
    visible: Live<bool>,
    morph_influences: Live<Vec<f32>>,
    wireframe: bool,
    vertex_colors: bool,
    viewer: Option<ViewerHandle>,
}

impl Object {
    /// A visible, opaque object at the origin with a random color.
    #[must_use]
    pub fn new(geometry: Geometry) -> Self {
        Self {
            name: None,
            geometry,
            pose: Live::new(Mat4::IDENTITY),
            color: Live::new(Color::random()),
            texture: None,
            opacity: Live::new(1.0),
            visible: Live::new(true),
            morph_influences: Live::default(),
            wireframe: false,
            vertex_colors: false,
            viewer: None,
        }
    }

    /// Box with the given full edge lengths.
    #[must_use]
    pub fn cuboid(lengths: Vec3) -> Self {
        Self::new(Geometry::Box { lengths })
    }

    #[must_use]
    pub fn cube(size: f32) -> Self {
        Self::cuboid(Vec3::splat(size))
    }

    #[must_use]
    pub fn sphere(radius: f32) -> Self {
        Self::new(Geometry::Sphere { radius })
    }

    /// Cylinder aligned with the z-axis and centered at the origin.
    #[must_use]
    pub fn cylinder(radius: f32, length: f32) -> Self {
        Self::new(Geometry::Mesh(TriangleMesh::cylinder(radius, length, CYLINDER_SECTIONS)))
    }

    /// Loads a mesh file, with the texture it carries if one can be
    /// extracted.
    pub fn mesh(loader: &dyn MeshLoader, path: impl AsRef<Path>, scale: impl Into<Scale>) -> Result<Self> {
        let loaded = assets::load_mesh(loader, path.as_ref(), scale)?;
        let mut object = Self::new(Geometry::Mesh(loaded.mesh));
        object.texture = loaded.texture;
        Ok(object)
    }

    // ========================================================================
    // Builders (before attachment, no dispatch)
    // ========================================================================

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_pose(mut self, pose: Mat4) -> Self {
        self.pose.set_silent(pose);
        self
    }

    #[must_use]
    pub fn with_pos(mut self, pos: Vec3) -> Self {
        let mut pose = *self.pose;
        pose.w_axis = pos.extend(1.0);
        self.pose.set_silent(pose);
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: impl Into<Color>) -> Self {
        self.color.set_silent(color.into());
        self
    }

    #[must_use]
    pub fn with_rgb8(self, r: u8, g: u8, b: u8) -> Self {
        self.with_color(Color::from_rgb8(r, g, b))
    }

    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity.set_silent(opacity.clamp(0.0, 1.0));
        self
    }

    #[must_use]
    pub fn with_texture(mut self, texture: Texture) -> Self {
        self.texture = Some(texture);
        self
    }

    #[must_use]
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible.set_silent(visible);
        self
    }

    #[must_use]
    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }

    /// Draws the mesh with its per-vertex colors instead of the flat color.
    #[must_use]
    pub fn with_vertex_colors(mut self, vertex_colors: bool) -> Self {
        self.vertex_colors = vertex_colors;
        self
    }

    // ========================================================================
    // Getters
    // ========================================================================

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Viewer path, `None` until a name is assigned.
    #[must_use]
    pub fn path(&self) -> Option<String> {
        self.name.as_deref().map(command::item_path)
    }

    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.viewer.is_some()
    }

    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[must_use]
    pub fn pose(&self) -> Mat4 {
        *self.pose
    }

    /// Translation column of the pose.
    #[must_use]
    pub fn pos(&self) -> Vec3 {
        self.pose.w_axis.truncate()
    }

    /// Upper 3x3 block of the pose.
    #[must_use]
    pub fn rot(&self) -> Mat3 {
        Mat3::from_mat4(*self.pose)
    }

    #[must_use]
    pub fn color(&self) -> Color {
        *self.color
    }

    #[must_use]
    pub fn opacity(&self) -> f32 {
        *self.opacity
    }

    #[must_use]
    pub fn visible(&self) -> bool {
        *self.visible
    }

    #[must_use]
    pub fn texture(&self) -> Option<&Texture> {
        self.texture.as_ref()
    }

    #[must_use]
    pub fn morph_influences(&self) -> &[f32] {
        &self.morph_influences
    }

    // ========================================================================
    // Setters
    // ========================================================================

    pub fn set_pose(&mut self, pose: Mat4) -> Result<()> {
        self.ensure_attached()?;
        let changed = self.pose.set(pose);
        self.propagate(Property::Pose, changed)
    }

    pub fn set_pos(&mut self, pos: Vec3) -> Result<()> {
        self.edit_pose(|m| m.w_axis = pos.extend(1.0))
    }

    /// Replaces the rotation block, keeping the translation.
    pub fn set_rot(&mut self, rot: Mat3) -> Result<()> {
        self.edit_pose(|m| {
            m.x_axis = rot.x_axis.extend(0.0);
            m.y_axis = rot.y_axis.extend(0.0);
            m.z_axis = rot.z_axis.extend(0.0);
        })
    }

    pub fn edit_pose(&mut self, f: impl FnOnce(&mut Mat4)) -> Result<()> {
        self.ensure_attached()?;
        let changed = self.pose.update(f);
        self.propagate(Property::Pose, changed)
    }

    /// Modifies the translation in place.
    pub fn edit_pos(&mut self, f: impl FnOnce(&mut Vec3)) -> Result<()> {
        self.edit_pose(|m| {
            let mut pos = m.w_axis.truncate();
            f(&mut pos);
            m.w_axis = pos.extend(1.0);
        })
    }

    pub fn set_color(&mut self, color: impl Into<Color>) -> Result<()> {
        self.ensure_attached()?;
        let changed = self.color.set(color.into());
        self.propagate(Property::Material, changed)
    }

    pub fn edit_color(&mut self, f: impl FnOnce(&mut Color)) -> Result<()> {
        self.ensure_attached()?;
        let changed = self.color.update(f);
        self.propagate(Property::Material, changed)
    }

    /// Sets the opacity, clamped to `[0, 1]`.
    pub fn set_opacity(&mut self, opacity: f32) -> Result<()> {
        self.ensure_attached()?;
        let changed = self.opacity.set(opacity.clamp(0.0, 1.0));
        self.propagate(Property::Material, changed)
    }

    pub fn set_texture(&mut self, texture: Option<Texture>) -> Result<()> {
        self.ensure_attached()?;
        self.texture = texture;
        // Textures are not animatable. Piggyback on the color revision.
        let changed = self.color.update(|_| {});
        self.propagate(Property::Material, changed)
    }

    pub fn set_visible(&mut self, visible: bool) -> Result<()> {
        self.ensure_attached()?;
        let changed = self.visible.set(visible);
        self.propagate(Property::Visible, changed)
    }

    pub fn show(&mut self) -> Result<()> {
        self.set_visible(true)
    }

    pub fn hide(&mut self) -> Result<()> {
        self.set_visible(false)
    }

    /// Registers a callback run after every write to pose, color, opacity,
    /// visibility or morph influences, before the write is sent to the
    /// viewer. Replaces any previous callback.
    pub fn on_change(&mut self, callback: impl FnMut() + 'static) {
        let shared: Rc<RefCell<dyn FnMut()>> = Rc::new(RefCell::new(callback));
        let forward = || {
            let shared = Rc::clone(&shared);
            move || (&mut *shared.borrow_mut())()
        };
        self.pose.observe(forward());
        self.color.observe(forward());
        self.opacity.observe(forward());
        self.visible.observe(forward());
        self.morph_influences.observe(forward());
    }

    // ========================================================================
    // Crate-internal lifecycle
    // ========================================================================

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    /// Binds the object to a viewer and sends its full state.
    pub(crate) fn attach(&mut self, viewer: ViewerHandle) -> Result<()> {
        self.viewer = Some(viewer);
        self.reassert()
    }

    /// Removes the object from the viewer and drops the link.
    pub(crate) fn detach(&mut self) -> Result<()> {
        let Some(viewer) = self.viewer.take() else {
            return Ok(());
        };
        match self.path() {
            Some(path) => viewer.borrow_mut().send(Command::Delete { path }),
            None => Ok(()),
        }
    }

    /// Writes every property's current value to the viewer link.
    ///
    /// Live, this re-creates the render object. While recording, it writes
    /// one value per animatable property into the open frame.
    pub(crate) fn reassert(&self) -> Result<()> {
        let (viewer, path) = self.link()?;
        let mut viewer = viewer.borrow_mut();
        let mut sink = viewer.sink();
        if matches!(sink, Sink::Live(_)) {
            return self.write(&mut sink, &path, Property::Material);
        }
        self.write(&mut sink, &path, Property::Pose)?;
        self.write(&mut sink, &path, Property::Material)?;
        self.write(&mut sink, &path, Property::Visible)?;
        if !self.morph_influences.is_empty() {
            self.write(&mut sink, &path, Property::MorphInfluences)?;
        }
        Ok(())
    }

    /// Places the object without any dispatch.
    pub(crate) fn place(&mut self, pose: Mat4) {
        self.pose.set_silent(pose);
    }

    /// Zeroes `count` morph influences without dispatch.
    pub(crate) fn reset_morph_influences(&mut self, count: usize) {
        self.morph_influences.set_silent(vec![0.0; count]);
    }

    pub(crate) fn set_morph_influences(&mut self, influences: Vec<f32>) -> Result<()> {
        self.ensure_attached()?;
        let changed = self.morph_influences.set(influences);
        self.propagate(Property::MorphInfluences, changed)
    }

    pub(crate) fn viewer_handle(&self) -> Option<&ViewerHandle> {
        self.viewer.as_ref()
    }

    pub(crate) fn geometry_mut(&mut self) -> &mut Geometry {
        &mut self.geometry
    }

    /// Swaps the geometry and re-creates the render object.
    pub(crate) fn replace_geometry(&mut self, geometry: Geometry) -> Result<()> {
        self.ensure_attached()?;
        self.geometry = geometry;
        let changed = self.color.update(|_| {});
        self.propagate(Property::Material, changed)
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    fn ensure_attached(&self) -> Result<()> {
        self.link().map(|_| ())
    }

    fn link(&self) -> Result<(&ViewerHandle, String)> {
        match (&self.viewer, self.path()) {
            (Some(viewer), Some(path)) => Ok((viewer, path)),
            _ => Err(SceneError::NotAttached(
                self.name.clone().unwrap_or_else(|| "<unnamed>".to_string()),
            )),
        }
    }

    fn propagate(&self, property: Property, changed: Changed) -> Result<()> {
        let (viewer, path) = self.link()?;
        log::trace!("{path}: {property:?} changed (revision {})", changed.revision());
        let mut viewer = viewer.borrow_mut();
        self.write(&mut viewer.sink(), &path, property)
    }

    fn write(&self, sink: &mut Sink<'_>, path: &str, property: Property) -> Result<()> {
        match property {
            Property::Pose => sink.set_transform(path, &self.pose),
            Property::Visible => sink.set_property(path, "visible", PropertyValue::Boolean(*self.visible)),
            Property::MorphInfluences => sink.set_property(
                path,
                "morphTargetInfluences",
                PropertyValue::Vector(self.morph_influences.to_vec()),
            ),
            Property::Material => {
                if let Sink::Live(transport) = sink {
                    transport.send(Command::SetObject {
                        path: path.to_string(),
                        object: self.lower(),
                    })?;
                    self.write(sink, path, Property::Pose)?;
                    self.write(sink, path, Property::Visible)?;
                    if !self.morph_influences.is_empty() {
                        self.write(sink, path, Property::MorphInfluences)?;
                    }
                    Ok(())
                } else {
                    sink.set_property(path, "color", PropertyValue::Vector(self.color.to_array().to_vec()))?;
                    sink.set_property(path, "opacity", PropertyValue::Number(*self.opacity))
                }
            }
        }
    }

    /// The three.js object JSON for geometry plus material.
    pub(crate) fn lower(&self) -> Value {
        let geometry = self.geometry.lower();
        let material = Material {
            color: *self.color,
            opacity: *self.opacity,
            texture: self.texture.as_ref(),
            wireframe: self.wireframe,
            vertex_colors: self.vertex_colors,
        }
        .lower();

        json!({
            "metadata": { "version": 4.5, "type": "Object" },
            "geometries": [geometry],
            "materials": [material.material],
            "textures": material.textures,
            "images": material.images,
            "object": {
                "uuid": Uuid::new_v4().to_string(),
                "type": "Mesh",
                "geometry": geometry["uuid"],
                "material": material.material["uuid"],
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detached_setter_leaves_state_untouched() {
        let mut object = Object::cube(1.0).with_name("box").with_opacity(0.4);
        let err = object.set_opacity(0.9).unwrap_err();
        assert!(matches!(err, SceneError::NotAttached(name) if name == "box"));
        assert!((object.opacity() - 0.4).abs() < f32::EPSILON);
    }

    #[test]
    fn test_lowered_object_references_its_parts() {
        let object = Object::sphere(0.5).with_rgb8(255, 0, 0);
        let lowered = object.lower();
        assert_eq!(lowered["object"]["geometry"], lowered["geometries"][0]["uuid"]);
        assert_eq!(lowered["object"]["material"], lowered["materials"][0]["uuid"]);
        assert_eq!(lowered["materials"][0]["color"], 0xFF0000);
    }
}
