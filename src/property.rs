//! Live Properties
//!
//! [`Live`] is a value holder used for every observable field of a scene item
//! (pose, color, opacity, visibility, morph influences) and of the camera.
//!
//! Every notified mutation goes through [`Live::set`] (whole value) or
//! [`Live::update`] (in place). After the write completes, the registered
//! observer (if any) runs before control returns to the caller. Both return a
//! [`Changed`] token that the owner hands to its propagation routine, so a
//! write can never silently skip the viewer. Observers are for code outside
//! the crate, see [`Object::on_change`](crate::object::Object::on_change).
//!
//! ```rust,ignore
//! let mut color = Live::new([1.0, 0.0, 0.0]);
//! color.observe(|| println!("color changed"));
//! let changed = color.update(|c| c[1] = 0.5); // must be propagated by the owner
//! ```

use std::fmt;
use std::ops::Deref;

/// Zero-argument change callback.
pub type Observer = Box<dyn FnMut()>;

/// Proof that a [`Live`] value was written.
#[must_use = "a changed property has to be propagated"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Changed {
    revision: u64,
}

impl Changed {
    /// Revision of the value after the write.
    #[inline]
    #[must_use]
    pub fn revision(self) -> u64 {
        self.revision
    }
}

pub struct Live<T> {
    value: T,
    revision: u64,
    observer: Option<Observer>,
}

impl<T> Live<T> {
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            value,
            revision: 0,
            observer: None,
        }
    }

    /// Registers the callback invoked after every write, replacing any
    /// previous one.
    pub fn observe(&mut self, observer: impl FnMut() + 'static) {
        self.observer = Some(Box::new(observer));
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Number of notified writes so far.
    #[inline]
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replaces the whole value.
    pub fn set(&mut self, value: T) -> Changed {
        self.value = value;
        self.notify()
    }

    /// Mutates the value in place.
    pub fn update(&mut self, f: impl FnOnce(&mut T)) -> Changed {
        f(&mut self.value);
        self.notify()
    }

    /// Writes without notification. Used for state that is not visible yet.
    pub fn set_silent(&mut self, value: T) {
        self.value = value;
    }

    fn notify(&mut self) -> Changed {
        self.revision += 1;
        if let Some(observer) = self.observer.as_mut() {
            observer();
        }
        Changed {
            revision: self.revision,
        }
    }
}

impl<T: Default> Default for Live<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Live<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Live")
            .field("value", &self.value)
            .field("revision", &self.revision)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

impl<T> Deref for Live<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_observer_runs_after_each_write() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut live = Live::new([0.0_f32; 3]);
        live.observe(move || counter.set(counter.get() + 1));

        let _ = live.set([1.0, 2.0, 3.0]);
        assert_eq!(calls.get(), 1);

        let changed = live.update(|v| v[2] = 5.0);
        assert_eq!(changed.revision(), 2);
        assert_eq!(calls.get(), 2);
        assert_eq!(*live.get(), [1.0, 2.0, 5.0]);
    }

    #[test]
    fn test_missing_observer_is_skipped() {
        let mut live = Live::new(1.0_f32);
        let changed = live.set(0.5);
        assert_eq!(changed.revision(), 1);
        assert_eq!(*live, 0.5);
    }

    #[test]
    fn test_silent_write_does_not_notify() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let mut live = Live::new(true);
        live.observe(move || counter.set(counter.get() + 1));

        live.set_silent(false);
        assert_eq!(calls.get(), 0);
        assert_eq!(live.revision(), 0);
        assert!(!*live.get());
    }
}
