#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

//! Objects, robots and human meshes in a meshcat viewer, updated live or
//! recorded into animations and videos.
//!
//! ```rust,ignore
//! use robomeshcat::{MemoryTransport, Object, Scene, SceneOptions};
//! use glam::Vec3;
//!
//! let mut scene = Scene::new(MemoryTransport::new(), SceneOptions::default())?;
//! scene.add_object(Object::cube(0.2).with_name("box"))?;
//!
//! let mut anim = scene.animation(30)?;
//! for i in 0..30 {
//!     anim.object_mut("box")?.set_pos(Vec3::new(0.0, 0.0, i as f32 / 30.0))?;
//!     anim.render()?;
//! }
//! anim.finish()?;
//! ```

pub mod animation;
pub mod assets;
pub mod errors;
pub mod geometry;
pub mod human;
pub mod material;
pub mod object;
pub mod property;
pub mod robot;
pub mod scene;
pub mod video;
pub mod viewer;

pub use animation::{Animation, AnimationClip, KeyframeTrack, PropertyValue, Recorder, ValueKind};
pub use assets::{MeshLoader, Scale};
pub use errors::{Result, SceneError};
pub use geometry::{Geometry, TriangleMesh};
pub use human::{BodyModel, BodyParameters, Human, HumanOptions};
pub use material::{Color, Texture};
pub use object::Object;
pub use property::{Changed, Live};
pub use robot::{JointRef, KinematicsSolver, PartGeometry, PartShape, Robot, RobotOptions};
pub use scene::{AnimationScope, Background, Camera, Scene, SceneOptions, VideoScope};
pub use video::{VideoEncoder, VideoFormat, VideoOptions};
pub use viewer::{Command, CommandLog, MemoryTransport, StreamTransport, Transport};
