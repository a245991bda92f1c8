//! Scene container
//!
//! - Scene: entity registry, render loop, animation and video sessions
//! - Camera: the viewer's default camera
//! - NameAllocator: default entity names
//! - AnimationScope / VideoScope: RAII session handles

pub mod camera;
pub mod names;
pub mod scene;
pub mod scope;

pub use camera::Camera;
pub use names::NameAllocator;
pub use scene::{Background, Scene, SceneOptions};
pub use scope::{AnimationScope, VideoScope};

use slotmap::new_key_type;

new_key_type! {
    pub struct ObjectKey;
    pub struct RobotKey;
    pub struct HumanKey;
}

/// Slot of a registered entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKey {
    Object(ObjectKey),
    Robot(RobotKey),
    Human(HumanKey),
}
