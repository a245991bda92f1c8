//! Robots
//!
//! A [`Robot`] is a composite entity: one [`Object`] per geometry part of a
//! kinematic model, named `"{robot}/{part}"` in the viewer. Forward
//! kinematics is delegated to a [`KinematicsSolver`]; every change of the
//! joint configuration or of the base pose re-solves and moves each part to
//! `base * placement`.

use std::path::PathBuf;

use glam::{Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::assets::{self, MeshLoader};
use crate::errors::{Result, SceneError};
use crate::material::{Color, Texture};
use crate::object::Object;
use crate::viewer::ViewerHandle;

/// Shape of one robot part in its local frame.
#[derive(Debug, Clone, PartialEq)]
pub enum PartShape {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    /// z-aligned cylinder.
    Cylinder { radius: f32, half_length: f32 },
    Mesh { path: PathBuf, scale: Vec3 },
}

/// Visual geometry of one part as described by the robot model.
#[derive(Debug, Clone, PartialEq)]
pub struct PartGeometry {
    pub name: String,
    pub shape: PartShape,
    pub rgba: [f32; 4],
    pub texture: Option<PathBuf>,
}

/// Forward kinematics of a robot model.
pub trait KinematicsSolver {
    /// Names of the configuration entries, in configuration order.
    fn joint_names(&self) -> Vec<String>;

    fn neutral_configuration(&self) -> Vec<f32>;

    fn geometries(&self) -> Vec<PartGeometry>;

    /// World placement of every geometry (in [`Self::geometries`] order) for
    /// the given configuration, relative to the robot base.
    fn placements(&self, configuration: &[f32]) -> Result<Vec<Mat4>>;
}

/// Reference to a joint, by configuration index or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JointRef {
    Index(usize),
    Name(String),
}

impl From<usize> for JointRef {
    fn from(index: usize) -> Self {
        JointRef::Index(index)
    }
}

impl From<&str> for JointRef {
    fn from(name: &str) -> Self {
        JointRef::Name(name.to_string())
    }
}

impl From<String> for JointRef {
    fn from(name: String) -> Self {
        JointRef::Name(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RobotOptions {
    pub name: Option<String>,
    /// Overrides the model's part colors.
    pub color: Option<Color>,
    /// Overrides the model's part alpha.
    pub opacity: Option<f32>,
    #[serde(skip)]
    pub pose: Mat4,
}

impl Default for RobotOptions {
    fn default() -> Self {
        Self {
            name: None,
            color: None,
            opacity: None,
            pose: Mat4::IDENTITY,
        }
    }
}

#[derive(Debug)]
struct Part {
    name: String,
    object: Object,
}

pub struct Robot {
    name: Option<String>,
    solver: Box<dyn KinematicsSolver>,
    joint_names: Vec<String>,
    configuration: Vec<f32>,
    pose: Mat4,
    parts: Vec<Part>,
    attached: bool,
}

impl Robot {
    /// Builds a robot whose mesh parts are read with the default loader.
    pub fn new(solver: impl KinematicsSolver + 'static, options: RobotOptions) -> Result<Self> {
        let loader = assets::default_loader();
        Self::with_mesh_loader(solver, loader.as_ref(), options)
    }

    pub fn with_mesh_loader(
        solver: impl KinematicsSolver + 'static,
        loader: &dyn MeshLoader,
        options: RobotOptions,
    ) -> Result<Self> {
        let mut parts = Vec::new();
        for geometry in solver.geometries() {
            let object = Self::build_part(&geometry, loader, &options)?;
            parts.push(Part {
                name: geometry.name,
                object,
            });
        }

        let joint_names = solver.joint_names();
        let configuration = solver.neutral_configuration();
        let mut robot = Self {
            name: options.name,
            solver: Box::new(solver),
            joint_names,
            configuration,
            pose: options.pose,
            parts,
            attached: false,
        };
        robot.solve()?;
        Ok(robot)
    }

    fn build_part(geometry: &PartGeometry, loader: &dyn MeshLoader, options: &RobotOptions) -> Result<Object> {
        let object = match &geometry.shape {
            PartShape::Box { half_extents } => Object::cuboid(*half_extents * 2.0),
            PartShape::Sphere { radius } => Object::sphere(*radius),
            PartShape::Cylinder { radius, half_length } => Object::cylinder(*radius, 2.0 * half_length),
            PartShape::Mesh { path, scale } => Object::mesh(loader, path, *scale)?,
        };

        let [r, g, b, a] = geometry.rgba;
        let mut object = object
            .with_color(options.color.unwrap_or(Color::new(r, g, b)))
            .with_opacity(options.opacity.unwrap_or(a));

        if object.texture().is_none()
            && let Some(path) = &geometry.texture
        {
            match Texture::from_png_file(path) {
                Ok(texture) => object = object.with_texture(texture),
                Err(err) => log::warn!("Ignoring texture {} of part '{}': {err}", path.display(), geometry.name),
            }
        }
        Ok(object)
    }

    // ========================================================================
    // Identity & parts
    // ========================================================================

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Parts in model order, keyed by their model name.
    pub fn parts(&self) -> impl Iterator<Item = (&str, &Object)> {
        self.parts.iter().map(|p| (p.name.as_str(), &p.object))
    }

    #[must_use]
    pub fn part(&self, name: &str) -> Option<&Object> {
        self.parts.iter().find(|p| p.name == name).map(|p| &p.object)
    }

    // ========================================================================
    // Joints
    // ========================================================================

    #[must_use]
    pub fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    #[must_use]
    pub fn joints(&self) -> &[f32] {
        &self.configuration
    }

    pub fn joint(&self, joint: impl Into<JointRef>) -> Result<f32> {
        let index = self.joint_index(&joint.into())?;
        Ok(self.configuration[index])
    }

    pub fn set_joint(&mut self, joint: impl Into<JointRef>, value: f32) -> Result<()> {
        self.ensure_attached()?;
        let index = self.joint_index(&joint.into())?;
        let mut configuration = self.configuration.clone();
        configuration[index] = value;
        self.apply(configuration, self.pose)
    }

    pub fn set_joints(&mut self, configuration: &[f32]) -> Result<()> {
        self.ensure_attached()?;
        if configuration.len() != self.configuration.len() {
            return Err(SceneError::ConfigurationLength {
                expected: self.configuration.len(),
                actual: configuration.len(),
            });
        }
        self.apply(configuration.to_vec(), self.pose)
    }

    fn joint_index(&self, joint: &JointRef) -> Result<usize> {
        match joint {
            JointRef::Index(index) if *index < self.configuration.len() => Ok(*index),
            JointRef::Index(index) => Err(SceneError::JointIndexOutOfRange {
                index: *index,
                len: self.configuration.len(),
            }),
            JointRef::Name(name) => self
                .joint_names
                .iter()
                .position(|n| n == name)
                .filter(|&i| i < self.configuration.len())
                .ok_or_else(|| SceneError::UnknownJoint(name.clone())),
        }
    }

    // ========================================================================
    // Base pose
    // ========================================================================

    #[must_use]
    pub fn pose(&self) -> Mat4 {
        self.pose
    }

    #[must_use]
    pub fn pos(&self) -> Vec3 {
        self.pose.w_axis.truncate()
    }

    #[must_use]
    pub fn rot(&self) -> Mat3 {
        Mat3::from_mat4(self.pose)
    }

    pub fn set_pose(&mut self, pose: Mat4) -> Result<()> {
        self.ensure_attached()?;
        self.apply(self.configuration.clone(), pose)
    }

    pub fn set_pos(&mut self, pos: Vec3) -> Result<()> {
        let mut pose = self.pose;
        pose.w_axis = pos.extend(1.0);
        self.set_pose(pose)
    }

    pub fn set_rot(&mut self, rot: Mat3) -> Result<()> {
        let mut pose = self.pose;
        pose.x_axis = rot.x_axis.extend(0.0);
        pose.y_axis = rot.y_axis.extend(0.0);
        pose.z_axis = rot.z_axis.extend(0.0);
        self.set_pose(pose)
    }

    // ========================================================================
    // Appearance (fans out to every part)
    // ========================================================================

    pub fn set_color(&mut self, color: impl Into<Color>) -> Result<()> {
        self.ensure_attached()?;
        let color = color.into();
        self.parts.iter_mut().try_for_each(|p| p.object.set_color(color))
    }

    pub fn set_opacity(&mut self, opacity: f32) -> Result<()> {
        self.ensure_attached()?;
        self.parts.iter_mut().try_for_each(|p| p.object.set_opacity(opacity))
    }

    pub fn set_visible(&mut self, visible: bool) -> Result<()> {
        self.ensure_attached()?;
        self.parts.iter_mut().try_for_each(|p| p.object.set_visible(visible))
    }

    pub fn show(&mut self) -> Result<()> {
        self.set_visible(true)
    }

    pub fn hide(&mut self) -> Result<()> {
        self.set_visible(false)
    }

    // ========================================================================
    // Kinematics
    // ========================================================================

    /// Solves forward kinematics for the current configuration and moves
    /// every part.
    pub fn update_kinematics(&mut self) -> Result<()> {
        self.ensure_attached()?;
        let poses = self.part_poses(&self.configuration, self.pose)?;
        self.dispatch_poses(poses)
    }

    /// Solves for a candidate state and commits it only once the solver
    /// accepted it.
    fn apply(&mut self, configuration: Vec<f32>, pose: Mat4) -> Result<()> {
        let poses = self.part_poses(&configuration, pose)?;
        self.configuration = configuration;
        self.pose = pose;
        self.dispatch_poses(poses)
    }

    fn dispatch_poses(&mut self, poses: Vec<Mat4>) -> Result<()> {
        for (part, pose) in self.parts.iter_mut().zip(poses) {
            part.object.set_pose(pose)?;
        }
        Ok(())
    }

    /// Places every part without dispatch.
    fn solve(&mut self) -> Result<()> {
        let poses = self.part_poses(&self.configuration, self.pose)?;
        for (part, pose) in self.parts.iter_mut().zip(poses) {
            part.object.place(pose);
        }
        Ok(())
    }

    fn part_poses(&self, configuration: &[f32], base: Mat4) -> Result<Vec<Mat4>> {
        let placements = self.solver.placements(configuration)?;
        if placements.len() != self.parts.len() {
            return Err(SceneError::Solver(format!(
                "expected {} placements, got {}",
                self.parts.len(),
                placements.len()
            )));
        }
        Ok(placements.into_iter().map(|p| base * p).collect())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    fn ensure_attached(&self) -> Result<()> {
        if self.attached {
            Ok(())
        } else {
            Err(SceneError::NotAttached(
                self.name.clone().unwrap_or_else(|| "<unnamed robot>".to_string()),
            ))
        }
    }

    pub(crate) fn set_name(&mut self, name: String) {
        for part in &mut self.parts {
            part.object.set_name(format!("{name}/{}", part.name));
        }
        self.name = Some(name);
    }

    pub(crate) fn attach(&mut self, viewer: &ViewerHandle) -> Result<()> {
        for part in &mut self.parts {
            part.object.attach(viewer.clone())?;
        }
        self.attached = true;
        Ok(())
    }

    pub(crate) fn detach(&mut self) -> Result<()> {
        self.attached = false;
        self.parts.iter_mut().try_for_each(|p| p.object.detach())
    }

    pub(crate) fn reassert(&self) -> Result<()> {
        self.parts.iter().try_for_each(|p| p.object.reassert())
    }
}

impl std::fmt::Debug for Robot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Robot")
            .field("name", &self.name)
            .field("joint_names", &self.joint_names)
            .field("configuration", &self.configuration)
            .field("pose", &self.pose)
            .field("parts", &self.parts)
            .field("attached", &self.attached)
            .finish_non_exhaustive()
    }
}
