use glam::{Mat4, Vec3};

use crate::animation::PropertyValue;
use crate::errors::Result;
use crate::property::{Changed, Live};
use crate::viewer::Viewer;
use crate::viewer::command::{CAMERA_ORBIT_PATH, CAMERA_PATH};

/// Orbit offset of the viewer's default camera. Any other offset disables
/// mouse control.
const ORBIT_OFFSET: [f32; 3] = [3.0, 1.0, 0.0];

/// The viewer's default camera.
///
/// Its pose and zoom follow the same live/recording dispatch as item
/// properties. A non-identity pose pins the camera by collapsing the orbit
/// offset, which disables interactive control in the viewer.
#[derive(Debug)]
pub struct Camera {
    pose: Live<Mat4>,
    zoom: Live<f32>,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pose: Live::new(Mat4::IDENTITY),
            zoom: Live::new(1.0),
        }
    }
}

impl Camera {
    #[must_use]
    pub fn pose(&self) -> Mat4 {
        *self.pose
    }

    #[must_use]
    pub fn pos(&self) -> Vec3 {
        self.pose.w_axis.truncate()
    }

    #[must_use]
    pub fn zoom(&self) -> f32 {
        *self.zoom
    }

    /// Whether the user can orbit the camera in the viewer.
    #[must_use]
    pub fn control_enabled(&self) -> bool {
        self.pose.abs_diff_eq(Mat4::IDENTITY, 1e-6)
    }

    pub(crate) fn set_pose(&mut self, viewer: &mut Viewer, pose: Mat4) -> Result<()> {
        let changed = self.pose.set(pose);
        self.write_pose(viewer, changed)
    }

    pub(crate) fn edit_pose(&mut self, viewer: &mut Viewer, f: impl FnOnce(&mut Mat4)) -> Result<()> {
        let changed = self.pose.update(f);
        self.write_pose(viewer, changed)
    }

    pub(crate) fn set_zoom(&mut self, viewer: &mut Viewer, zoom: f32) -> Result<()> {
        let changed = self.zoom.set(zoom);
        self.write_zoom(viewer, changed)
    }

    pub(crate) fn reset(&mut self, viewer: &mut Viewer) -> Result<()> {
        self.set_pose(viewer, Mat4::IDENTITY)?;
        self.set_zoom(viewer, 1.0)
    }

    /// Re-sends pose, orbit offset and zoom.
    pub(crate) fn reassert(&self, viewer: &mut Viewer) -> Result<()> {
        let mut sink = viewer.sink();
        sink.set_transform(CAMERA_PATH, &self.pose)?;
        sink.set_property(CAMERA_ORBIT_PATH, "position", self.orbit_offset())?;
        sink.set_property(CAMERA_ORBIT_PATH, "zoom", PropertyValue::Number(*self.zoom))
    }

    fn orbit_offset(&self) -> PropertyValue {
        if self.control_enabled() {
            PropertyValue::Vector(ORBIT_OFFSET.to_vec())
        } else {
            PropertyValue::Vector(vec![0.0; 3])
        }
    }

    fn write_pose(&self, viewer: &mut Viewer, changed: Changed) -> Result<()> {
        log::trace!("camera pose changed (revision {})", changed.revision());
        let mut sink = viewer.sink();
        sink.set_transform(CAMERA_PATH, &self.pose)?;
        sink.set_property(CAMERA_ORBIT_PATH, "position", self.orbit_offset())
    }

    fn write_zoom(&self, viewer: &mut Viewer, changed: Changed) -> Result<()> {
        log::trace!("camera zoom changed (revision {})", changed.revision());
        viewer
            .sink()
            .set_property(CAMERA_ORBIT_PATH, "zoom", PropertyValue::Number(*self.zoom))
    }
}
