//! Live Objects Example
//!
//! Streams viewer commands as JSON lines on stdout and reads replies on
//! stdin, so it can be piped into any bridge that forwards them to a meshcat
//! server. Adds a few primitives and moves them around.
//!
//! Run with `RUST_LOG=debug` to see the dispatch log on stderr.

use std::io::{self, BufReader};
use std::thread;
use std::time::Duration;

use glam::{Mat3, Vec3};
use robomeshcat::{Object, Scene, SceneOptions, StreamTransport};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let transport = StreamTransport::new(io::stdout(), BufReader::new(io::stdin()));
    let mut scene = Scene::new(transport, SceneOptions::default())?;

    scene.add_object(
        Object::cube(0.1)
            .with_name("cube")
            .with_rgb8(0xE0, 0x4E, 0x39)
            .with_pos(Vec3::new(0.3, 0.0, 0.05)),
    )?;
    scene.add_object(Object::sphere(0.05).with_name("ball").with_opacity(0.6))?;
    scene.add_object(
        Object::cylinder(0.02, 0.3)
            .with_name("rod")
            .with_pos(Vec3::new(-0.3, 0.0, 0.15)),
    )?;

    for i in 0..100 {
        let t = i as f32 / 100.0;
        scene.object_mut("cube")?.set_rot(Mat3::from_rotation_z(t * std::f32::consts::TAU))?;
        scene.object_mut("ball")?.set_pos(Vec3::new(0.0, 0.0, 0.05 + 0.2 * t))?;
        if i % 25 == 0 {
            scene.object_mut("rod")?.set_color([t, 0.2, 1.0 - t])?;
        }
        thread::sleep(Duration::from_millis(20));
    }

    scene.object_mut("ball")?.hide()?;
    scene.set_camera_pos(Vec3::new(1.0, -1.0, 0.8))?;
    Ok(())
}
