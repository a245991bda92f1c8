use rustc_hash::FxHashMap;
use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::animation::tracks::KeyframeTrack;
use crate::animation::values::{PropertyValue, ValueKind};

/// One named property track of a clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub property: String,
    pub data: KeyframeTrack,
}

/// All tracks recorded for one object path.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub path: String,
    pub name: String,
    pub fps: u32,
    pub tracks: Vec<Track>,
}

impl AnimationClip {
    #[must_use]
    pub fn new(path: impl Into<String>, fps: u32) -> Self {
        Self {
            path: path.into(),
            name: "default".to_string(),
            fps,
            tracks: Vec::new(),
        }
    }

    #[must_use]
    pub fn track(&self, property: &str) -> Option<&KeyframeTrack> {
        self.tracks.iter().find(|t| t.property == property).map(|t| &t.data)
    }

    fn track_mut(&mut self, property: &str, kind: ValueKind) -> &mut KeyframeTrack {
        let index = match self.tracks.iter().position(|t| t.property == property) {
            Some(index) => index,
            None => {
                self.tracks.push(Track {
                    property: property.to_string(),
                    data: KeyframeTrack::new(kind),
                });
                self.tracks.len() - 1
            }
        };
        &mut self.tracks[index].data
    }

    /// Last keyed frame of any track.
    #[must_use]
    pub fn duration(&self) -> u32 {
        self.tracks
            .iter()
            .filter_map(|t| t.data.frames().last().copied())
            .max()
            .unwrap_or(0)
    }
}

/// A recorded animation: one clip per object path, in order of first write.
#[derive(Debug, Clone, Default)]
pub struct Animation {
    fps: u32,
    clips: Vec<AnimationClip>,
    index: FxHashMap<String, usize>,
}

impl PartialEq for Animation {
    fn eq(&self, other: &Self) -> bool {
        self.fps == other.fps && self.clips == other.clips
    }
}

impl Animation {
    #[must_use]
    pub fn new(fps: u32) -> Self {
        Self {
            fps,
            clips: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn fps(&self) -> u32 {
        self.fps
    }

    #[inline]
    #[must_use]
    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    #[must_use]
    pub fn clip(&self, path: &str) -> Option<&AnimationClip> {
        self.index.get(path).map(|&i| &self.clips[i])
    }

    #[must_use]
    pub fn track(&self, path: &str, property: &str) -> Option<&KeyframeTrack> {
        self.clip(path)?.track(property)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Last keyed frame over all clips.
    #[must_use]
    pub fn duration(&self) -> u32 {
        self.clips.iter().map(AnimationClip::duration).max().unwrap_or(0)
    }

    pub fn insert_key(&mut self, path: &str, property: &str, frame: u32, value: PropertyValue) {
        let clip_index = match self.index.get(path) {
            Some(&i) => i,
            None => {
                self.clips.push(AnimationClip::new(path, self.fps));
                self.index.insert(path.to_string(), self.clips.len() - 1);
                self.clips.len() - 1
            }
        };
        let kind = value.kind();
        self.clips[clip_index].track_mut(property, kind).insert(frame, value);
    }

    /// Runs [`KeyframeTrack::remove_redundant_keys`] over every track and
    /// returns the total number of removed keys.
    pub fn remove_redundant_keys(&mut self) -> usize {
        self.clips
            .iter_mut()
            .flat_map(|c| c.tracks.iter_mut())
            .map(|t| t.data.remove_redundant_keys())
            .sum()
    }
}

// ============================================================================
// Lowering to the viewer's animation format
// ============================================================================

struct LoweredKey<'a> {
    time: u32,
    value: &'a PropertyValue,
}

impl Serialize for LoweredKey<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Key", 2)?;
        s.serialize_field("time", &self.time)?;
        s.serialize_field("value", self.value)?;
        s.end()
    }
}

impl Serialize for Track {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let keys: Vec<LoweredKey<'_>> = self
            .data
            .keys()
            .map(|(time, value)| LoweredKey { time, value })
            .collect();
        let mut s = serializer.serialize_struct("Track", 3)?;
        s.serialize_field("name", &format!(".{}", self.property))?;
        s.serialize_field("type", self.data.kind().js_type())?;
        s.serialize_field("keys", &keys)?;
        s.end()
    }
}

impl Serialize for AnimationClip {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Clip", 3)?;
        s.serialize_field("fps", &self.fps)?;
        s.serialize_field("name", &self.name)?;
        s.serialize_field("tracks", &self.tracks)?;
        s.end()
    }
}

struct ClipEntry<'a>(&'a AnimationClip);

impl Serialize for ClipEntry<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ClipEntry", 2)?;
        s.serialize_field("path", &self.0.path)?;
        s.serialize_field("clip", self.0)?;
        s.end()
    }
}

impl Serialize for Animation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.clips.iter().map(ClipEntry))
    }
}
