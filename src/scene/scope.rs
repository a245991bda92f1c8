//! Scoped recording sessions.
//!
//! [`AnimationScope`] and [`VideoScope`] borrow the [`Scene`] mutably and
//! dereference to it, so the scene is used through the scope while it is
//! open. Dropping a scope ends its session on every exit path, `?` and
//! panics included: an animation scope publishes what was recorded so far,
//! a video scope closes its encoder. Failures during drop are logged.

use std::ops::{Deref, DerefMut};

use crate::animation::Animation;
use crate::errors::Result;
use crate::scene::Scene;

pub struct AnimationScope<'a> {
    scene: &'a mut Scene,
    open: bool,
}

impl<'a> AnimationScope<'a> {
    pub(crate) fn new(scene: &'a mut Scene) -> Self {
        Self { scene, open: true }
    }

    /// Ends the recording and publishes the animation.
    pub fn finish(mut self) -> Result<Animation> {
        self.open = false;
        self.scene.end_animation()
    }

    /// Ends the recording without publishing.
    pub fn discard(mut self) -> Result<()> {
        self.open = false;
        self.scene.abort_animation()
    }
}

impl Deref for AnimationScope<'_> {
    type Target = Scene;

    fn deref(&self) -> &Scene {
        self.scene
    }
}

impl DerefMut for AnimationScope<'_> {
    fn deref_mut(&mut self) -> &mut Scene {
        self.scene
    }
}

impl Drop for AnimationScope<'_> {
    fn drop(&mut self) {
        if self.open
            && self.scene.is_recording()
            && let Err(err) = self.scene.end_animation()
        {
            log::error!("Failed to publish animation: {err}");
        }
    }
}

pub struct VideoScope<'a> {
    scene: &'a mut Scene,
    open: bool,
}

impl<'a> VideoScope<'a> {
    pub(crate) fn new(scene: &'a mut Scene) -> Self {
        Self { scene, open: true }
    }

    /// Closes the encoder.
    pub fn finish(mut self) -> Result<()> {
        self.open = false;
        self.scene.finish_video()
    }
}

impl Deref for VideoScope<'_> {
    type Target = Scene;

    fn deref(&self) -> &Scene {
        self.scene
    }
}

impl DerefMut for VideoScope<'_> {
    fn deref_mut(&mut self) -> &mut Scene {
        self.scene
    }
}

impl Drop for VideoScope<'_> {
    fn drop(&mut self) {
        if self.open
            && let Err(err) = self.scene.finish_video()
        {
            log::error!("Failed to close video: {err}");
        }
    }
}
