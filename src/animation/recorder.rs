//! Animation Frame Session
//!
//! A [`Recorder`] lives for exactly one recording session. It always has one
//! open [`Frame`] that buffers the last written value per `(path, property)`.
//! Advancing flushes the open frame into the session's [`Animation`] and opens
//! the next index; finishing flushes the final frame and deduplicates every
//! track.

use glam::Mat4;
use rustc_hash::FxHashMap;

use crate::animation::clip::Animation;
use crate::animation::values::PropertyValue;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct TrackKey {
    path: String,
    property: String,
}

/// Writes of one discrete timestep, one value per property path.
#[derive(Debug, Default)]
pub struct Frame {
    index: u32,
    writes: Vec<(TrackKey, PropertyValue)>,
    slots: FxHashMap<TrackKey, usize>,
}

impl Frame {
    fn new(index: u32) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Number of distinct property paths written in this frame.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    #[must_use]
    pub fn get(&self, path: &str, property: &str) -> Option<&PropertyValue> {
        let key = TrackKey {
            path: path.to_string(),
            property: property.to_string(),
        };
        self.slots.get(&key).map(|&i| &self.writes[i].1)
    }

    fn write(&mut self, key: TrackKey, value: PropertyValue) {
        if let Some(&slot) = self.slots.get(&key) {
            self.writes[slot].1 = value;
        } else {
            self.slots.insert(key.clone(), self.writes.len());
            self.writes.push((key, value));
        }
    }
}

#[derive(Debug)]
pub struct Recorder {
    fps: u32,
    frame: Frame,
    animation: Animation,
}

impl Recorder {
    /// Starts a session with frame 0 open.
    #[must_use]
    pub fn new(fps: u32) -> Self {
        Self {
            fps,
            frame: Frame::new(0),
            animation: Animation::new(fps),
        }
    }

    #[inline]
    #[must_use]
    pub fn fps(&self) -> u32 {
        self.fps
    }

    #[inline]
    #[must_use]
    pub fn current_frame(&self) -> &Frame {
        &self.frame
    }

    /// Tracks flushed by the frames closed so far.
    #[inline]
    #[must_use]
    pub fn recorded(&self) -> &Animation {
        &self.animation
    }

    pub fn set_property(&mut self, path: &str, property: &str, value: PropertyValue) {
        log::trace!("frame {}: {path}.{property} = {value:?}", self.frame.index);
        let key = TrackKey {
            path: path.to_string(),
            property: property.to_string(),
        };
        self.frame.write(key, value);
    }

    /// Records a pose as `position` and `quaternion` tracks.
    pub fn set_transform(&mut self, path: &str, matrix: &Mat4) {
        let (_, rotation, translation) = matrix.to_scale_rotation_translation();
        self.set_property(path, "position", translation.into());
        self.set_property(path, "quaternion", rotation.into());
    }

    /// Closes the open frame and opens the next one.
    pub fn next_frame(&mut self) {
        let next = self.frame.index + 1;
        self.flush();
        self.frame = Frame::new(next);
    }

    /// Closes the final frame and returns the deduplicated animation.
    #[must_use]
    pub fn finish(mut self) -> Animation {
        self.flush();
        let removed = self.animation.remove_redundant_keys();
        log::debug!(
            "Animation finished after {} frames, {removed} redundant keys removed",
            self.frame.index + 1
        );
        self.animation
    }

    fn flush(&mut self) {
        let index = self.frame.index;
        for (key, value) in self.frame.writes.drain(..) {
            self.animation.insert_key(&key.path, &key.property, index, value);
        }
        self.frame.slots.clear();
    }
}
