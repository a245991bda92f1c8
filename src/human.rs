//! Human Bodies
//!
//! A [`Human`] wraps one deformable triangle mesh computed by a parametric
//! [`BodyModel`]. Online, the mesh can be re-computed and re-sent at any
//! time. Recorded animations cannot carry geometry, so body shapes that
//! should appear in an animation are registered as morph targets before the
//! human is added to a scene and then selected per frame with
//! [`Human::display_morph`].

use glam::{Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SceneError};
use crate::geometry::{Geometry, TriangleMesh};
use crate::material::Color;
use crate::object::Object;
use crate::viewer::ViewerHandle;

/// Shape, pose and expression coefficients of a body model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyParameters {
    pub betas: Vec<f32>,
    pub global_orient: Vec<f32>,
    pub body_pose: Vec<f32>,
    pub left_hand_pose: Vec<f32>,
    pub right_hand_pose: Vec<f32>,
    pub jaw_pose: Vec<f32>,
    pub expression: Vec<f32>,
}

/// Parametric body model producing mesh vertices.
pub trait BodyModel {
    fn vertex_count(&self) -> usize;

    fn faces(&self) -> Vec<[u32; 3]>;

    fn vertices(&self, parameters: &BodyParameters) -> Result<Vec<[f32; 3]>>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HumanOptions {
    pub name: Option<String>,
    pub color: Color,
    pub opacity: f32,
    #[serde(skip)]
    pub pose: Mat4,
    /// Colors every vertex instead of the material, so morphs can change
    /// colors too.
    pub use_vertex_colors: bool,
    pub wireframe: bool,
    pub parameters: BodyParameters,
}

impl Default for HumanOptions {
    fn default() -> Self {
        Self {
            name: None,
            color: Color::new(0.9, 0.9, 0.9),
            opacity: 1.0,
            pose: Mat4::IDENTITY,
            use_vertex_colors: false,
            wireframe: false,
            parameters: BodyParameters::default(),
        }
    }
}

pub struct Human {
    model: Box<dyn BodyModel>,
    parameters: BodyParameters,
    object: Object,
    use_vertex_colors: bool,
    color: Color,
    displayed_morph: Option<usize>,
}

impl Human {
    pub fn new(model: impl BodyModel + 'static, options: HumanOptions) -> Result<Self> {
        let vertices = checked_vertices(&model, &options.parameters)?;
        let mut mesh = TriangleMesh::new(vertices, model.faces());

        let mut object = if options.use_vertex_colors {
            mesh.colors = Some(vec![options.color.to_array(); mesh.vertex_count()]);
            Object::new(Geometry::Mesh(mesh))
                .with_color(Color::WHITE)
                .with_vertex_colors(true)
        } else {
            Object::new(Geometry::Mesh(mesh)).with_color(options.color)
        };
        object = object
            .with_opacity(options.opacity)
            .with_pose(options.pose)
            .with_wireframe(options.wireframe);
        if let Some(name) = options.name {
            object = object.with_name(name);
        }

        Ok(Self {
            model: Box::new(model),
            parameters: options.parameters,
            object,
            use_vertex_colors: options.use_vertex_colors,
            color: options.color,
            displayed_morph: None,
        })
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.object.name()
    }

    #[must_use]
    pub fn object(&self) -> &Object {
        &self.object
    }

    #[must_use]
    pub fn parameters(&self) -> &BodyParameters {
        &self.parameters
    }

    /// Body color, as last applied to the material or the vertex colors.
    #[must_use]
    pub fn color(&self) -> Color {
        self.color
    }

    #[must_use]
    pub fn morph_count(&self) -> usize {
        self.object.geometry().as_mesh().map_or(0, TriangleMesh::morph_count)
    }

    #[must_use]
    pub fn displayed_morph(&self) -> Option<usize> {
        self.displayed_morph
    }

    // ========================================================================
    // Geometry
    // ========================================================================

    /// Replaces the mesh vertices (and optionally vertex colors) and re-sends
    /// the geometry. Only possible online: while recording, the call is
    /// skipped with a warning.
    pub fn update_vertices(&mut self, vertices: Vec<[f32; 3]>, colors: Option<Vec<[f32; 3]>>) -> Result<()> {
        self.replace_vertices(vertices, colors).map(|_| ())
    }

    /// Recomputes the vertices from new body parameters. The parameters are
    /// kept only if the new mesh was sent.
    pub fn update_parameters(&mut self, parameters: BodyParameters) -> Result<()> {
        let vertices = checked_vertices(self.model.as_ref(), &parameters)?;
        if self.replace_vertices(vertices, None)? {
            self.parameters = parameters;
        }
        Ok(())
    }

    /// Returns `false` if the update was skipped because of a recording.
    fn replace_vertices(&mut self, vertices: Vec<[f32; 3]>, colors: Option<Vec<[f32; 3]>>) -> Result<bool> {
        self.check_vertex_count(vertices.len())?;
        if let Some(colors) = &colors {
            self.check_vertex_count(colors.len())?;
        }
        if !self.is_online()? {
            log::warn!("Geometry of a human cannot change during an animation, use morphs instead");
            return Ok(false);
        }

        let mut mesh = self.object.geometry().as_mesh().cloned().unwrap_or_default();
        mesh.positions = vertices;
        if let Some(colors) = colors {
            mesh.colors = Some(colors);
        }
        self.object.replace_geometry(Geometry::Mesh(mesh))?;
        Ok(true)
    }

    /// Registers a morph target. Only possible before the human is added to
    /// a scene; afterwards the call is skipped with a warning.
    pub fn add_morph(&mut self, vertices: Vec<[f32; 3]>, colors: Option<Vec<[f32; 3]>>) -> Result<()> {
        if self.object.is_attached() {
            log::warn!("Morphs have to be added before the human is added to the scene");
            return Ok(());
        }
        self.check_vertex_count(vertices.len())?;
        if let Some(colors) = &colors {
            self.check_vertex_count(colors.len())?;
        }

        let fallback = self.use_vertex_colors.then(|| vec![self.color.to_array(); vertices.len()]);
        if let Geometry::Mesh(mesh) = self.object.geometry_mut() {
            mesh.morph_positions.push(vertices);
            if let Some(colors) = colors.or(fallback) {
                mesh.morph_colors.push(colors);
            }
        }
        Ok(())
    }

    /// Computes a morph target from body parameters.
    pub fn add_morph_from_parameters(&mut self, parameters: &BodyParameters) -> Result<()> {
        let vertices = checked_vertices(self.model.as_ref(), parameters)?;
        self.add_morph(vertices, None)
    }

    /// Shows the given morph target exclusively, or the base mesh for `None`.
    pub fn display_morph(&mut self, morph: Option<usize>) -> Result<()> {
        let count = self.morph_count();
        let mut influences = vec![0.0; count];
        if let Some(index) = morph {
            let slot = influences
                .get_mut(index)
                .ok_or(SceneError::MorphOutOfRange { index, count })?;
            *slot = 1.0;
        }
        self.object.set_morph_influences(influences)?;
        self.displayed_morph = morph;
        Ok(())
    }

    // ========================================================================
    // Delegated item setters
    // ========================================================================

    #[must_use]
    pub fn pose(&self) -> Mat4 {
        self.object.pose()
    }

    pub fn set_pose(&mut self, pose: Mat4) -> Result<()> {
        self.object.set_pose(pose)
    }

    pub fn set_pos(&mut self, pos: Vec3) -> Result<()> {
        self.object.set_pos(pos)
    }

    pub fn set_rot(&mut self, rot: Mat3) -> Result<()> {
        self.object.set_rot(rot)
    }

    /// Sets the body color. With vertex colors enabled this rewrites the
    /// vertex colors, which is only possible online.
    pub fn set_color(&mut self, color: impl Into<Color>) -> Result<()> {
        let color = color.into();
        if self.use_vertex_colors {
            let positions = self
                .object
                .geometry()
                .as_mesh()
                .map(|m| m.positions.clone())
                .unwrap_or_default();
            let colors = vec![color.to_array(); positions.len()];
            if self.replace_vertices(positions, Some(colors))? {
                self.color = color;
            }
        } else {
            self.object.set_color(color)?;
            self.color = color;
        }
        Ok(())
    }

    pub fn set_opacity(&mut self, opacity: f32) -> Result<()> {
        self.object.set_opacity(opacity)
    }

    pub fn set_visible(&mut self, visible: bool) -> Result<()> {
        self.object.set_visible(visible)
    }

    pub fn show(&mut self) -> Result<()> {
        self.set_visible(true)
    }

    pub fn hide(&mut self) -> Result<()> {
        self.set_visible(false)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    fn check_vertex_count(&self, actual: usize) -> Result<()> {
        let expected = self.object.geometry().as_mesh().map_or(0, TriangleMesh::vertex_count);
        if actual == expected {
            Ok(())
        } else {
            Err(SceneError::VertexCount { expected, actual })
        }
    }

    /// `false` while the shared viewer records an animation.
    fn is_online(&self) -> Result<bool> {
        match self.object.viewer_handle() {
            Some(viewer) => Ok(!viewer.borrow().is_recording()),
            None => Err(SceneError::NotAttached(
                self.name().unwrap_or("<unnamed human>").to_string(),
            )),
        }
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.object.set_name(name);
    }

    pub(crate) fn attach(&mut self, viewer: &ViewerHandle) -> Result<()> {
        let count = self.morph_count();
        self.object.reset_morph_influences(count);
        self.displayed_morph = None;
        self.object.attach(viewer.clone())
    }

    pub(crate) fn detach(&mut self) -> Result<()> {
        self.object.detach()
    }

    pub(crate) fn reassert(&self) -> Result<()> {
        self.object.reassert()
    }
}

impl std::fmt::Debug for Human {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Human")
            .field("object", &self.object)
            .field("parameters", &self.parameters)
            .field("displayed_morph", &self.displayed_morph)
            .finish_non_exhaustive()
    }
}

fn checked_vertices(model: &dyn BodyModel, parameters: &BodyParameters) -> Result<Vec<[f32; 3]>> {
    let vertices = model.vertices(parameters)?;
    if vertices.len() != model.vertex_count() {
        return Err(SceneError::VertexCount {
            expected: model.vertex_count(),
            actual: vertices.len(),
        });
    }
    Ok(vertices)
}
