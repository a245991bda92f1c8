pub mod values;
pub mod tracks;
pub mod clip;
pub mod recorder;

pub use clip::{Animation, AnimationClip, Track};
pub use recorder::{Frame, Recorder};
pub use tracks::{InterpolationMode, KeyframeTrack};
pub use values::{PropertyValue, ValueKind, VALUE_EPSILON};
