use crate::animation::values::{PropertyValue, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpolationMode {
    Linear,
    Step,
}

/// Keyframes of one property, keyed by frame index.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack {
    kind: ValueKind,
    frames: Vec<u32>,
    values: Vec<PropertyValue>,
}

impl KeyframeTrack {
    #[must_use]
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            frames: Vec::new(),
            values: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    #[must_use]
    pub fn interpolation(&self) -> InterpolationMode {
        match self.kind {
            ValueKind::Boolean => InterpolationMode::Step,
            _ => InterpolationMode::Linear,
        }
    }

    #[inline]
    #[must_use]
    pub fn frames(&self) -> &[u32] {
        &self.frames
    }

    #[inline]
    #[must_use]
    pub fn values(&self) -> &[PropertyValue] {
        &self.values
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = (u32, &PropertyValue)> {
        self.frames.iter().copied().zip(self.values.iter())
    }

    /// Inserts a key, after any existing key of the same frame.
    ///
    /// Returns `false` (and records nothing) if the value kind does not match
    /// the track.
    pub fn insert(&mut self, frame: u32, value: PropertyValue) -> bool {
        if value.kind() != self.kind {
            log::warn!(
                "Dropping {:?} key at frame {frame}: track holds {:?} values",
                value.kind(),
                self.kind
            );
            return false;
        }
        let index = self.frames.partition_point(|&f| f <= frame);
        self.frames.insert(index, frame);
        self.values.insert(index, value);
        true
    }

    /// Collapses redundant keys and returns how many were removed.
    ///
    /// Keys sharing a frame keep only the last write. Of every run of
    /// consecutive (approximately) equal values only the last key survives,
    /// so the viewer holds the value flat until the next real change instead
    /// of easing through redundant control points.
    pub fn remove_redundant_keys(&mut self) -> usize {
        let len = self.frames.len();
        if len < 2 {
            return 0;
        }

        // Last write per frame.
        let mut keys: Vec<(u32, PropertyValue)> = Vec::with_capacity(len);
        for (frame, value) in self.frames.drain(..).zip(self.values.drain(..)) {
            match keys.last_mut() {
                Some(last) if last.0 == frame => last.1 = value,
                _ => keys.push((frame, value)),
            }
        }

        // Last key of every equal run.
        let mut keys = keys.into_iter().peekable();
        while let Some((frame, value)) = keys.next() {
            if keys.peek().is_some_and(|(_, next)| value.approx_eq(next)) {
                continue;
            }
            self.frames.push(frame);
            self.values.push(value);
        }

        len - self.frames.len()
    }

    /// Samples the track at a (fractional) frame, clamping outside the keyed
    /// range. Returns `None` for an empty track.
    #[must_use]
    pub fn sample(&self, frame: f32) -> Option<PropertyValue> {
        if self.frames.is_empty() {
            return None;
        }

        // partition_point finds the first key strictly after `frame`
        let next_idx = self.frames.partition_point(|&f| (f as f32) <= frame);
        if next_idx == 0 {
            return Some(self.values[0].clone());
        }
        let index = next_idx - 1;
        if next_idx >= self.frames.len() {
            return Some(self.values[index].clone());
        }

        let f0 = self.frames[index] as f32;
        let f1 = self.frames[next_idx] as f32;
        let df = f1 - f0;
        let t = if df > 1e-6 { ((frame - f0) / df).clamp(0.0, 1.0) } else { 0.0 };

        let value = match self.interpolation() {
            InterpolationMode::Step => self.values[index].clone(),
            InterpolationMode::Linear => self.values[index].interpolate(&self.values[next_idx], t),
        };
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn number_track(keys: &[(u32, f32)]) -> KeyframeTrack {
        let mut track = KeyframeTrack::new(ValueKind::Number);
        for &(frame, value) in keys {
            track.insert(frame, PropertyValue::Number(value));
        }
        track
    }

    #[test]
    fn test_single_key_is_untouched() {
        let mut track = number_track(&[(4, 1.0)]);
        assert_eq!(track.remove_redundant_keys(), 0);
        assert_eq!(track.frames(), &[4]);
    }

    #[test]
    fn test_same_frame_keeps_last_write() {
        let mut track = number_track(&[(0, 1.0), (1, 2.0), (1, 3.0)]);
        track.remove_redundant_keys();
        assert_eq!(track.frames(), &[0, 1]);
        assert_eq!(track.values()[1], PropertyValue::Number(3.0));
    }

    #[test]
    fn test_overwritten_key_does_not_join_run() {
        let mut track = number_track(&[(0, 1.0), (1, 1.0), (1, 2.0)]);
        track.remove_redundant_keys();
        assert_eq!(track.frames(), &[0, 1]);
        assert_eq!(track.values()[0], PropertyValue::Number(1.0));
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let mut track = KeyframeTrack::new(ValueKind::Boolean);
        assert!(!track.insert(0, PropertyValue::Number(1.0)));
        assert!(track.is_empty());
    }
}
