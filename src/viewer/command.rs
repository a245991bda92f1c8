use serde::Serialize;
use serde_json::Value;

use crate::animation::{Animation, PropertyValue};

/// Root of every item path in the viewer's scene tree.
pub const SCENE_ROOT: &str = "/meshcat";
pub const BACKGROUND_PATH: &str = "/Background";
pub const CAMERA_PATH: &str = "/Cameras/default";
/// Node whose `position` offsets the orbit camera from its pivot.
pub const CAMERA_ORBIT_PATH: &str = "/Cameras/default/rotated/<object>";
pub const ANIMATION_PATH: &str = "/meshcat/animations/animation";

/// Viewer path of a named item.
#[must_use]
pub fn item_path(name: &str) -> String {
    format!("{SCENE_ROOT}/{name}")
}

/// Playback options attached to a published animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnimationOptions {
    pub play: bool,
    pub repetitions: u32,
}

impl Default for AnimationOptions {
    fn default() -> Self {
        Self {
            play: true,
            repetitions: 1,
        }
    }
}

/// A scene-graph operation understood by the viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Creates or replaces the render object at `path`.
    SetObject { path: String, object: Value },
    /// Column-major 4x4 transform.
    SetTransform { path: String, matrix: [f32; 16] },
    SetProperty {
        path: String,
        property: String,
        value: PropertyValue,
    },
    Delete { path: String },
    SetAnimation {
        animations: Animation,
        options: AnimationOptions,
    },
}

impl Command {
    /// Target path, `None` for animations.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Command::SetObject { path, .. }
            | Command::SetTransform { path, .. }
            | Command::SetProperty { path, .. }
            | Command::Delete { path } => Some(path),
            Command::SetAnimation { .. } => None,
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Command::SetObject { .. } => "set_object",
            Command::SetTransform { .. } => "set_transform",
            Command::SetProperty { .. } => "set_property",
            Command::Delete { .. } => "delete",
            Command::SetAnimation { .. } => "set_animation",
        }
    }
}
