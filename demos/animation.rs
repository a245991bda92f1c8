//! Recorded Animation Example
//!
//! Records a short animation of a bouncing cube and a color fade, then
//! publishes it to the viewer. Commands go out as JSON lines on stdout,
//! replies come back on stdin.

use std::io::{self, BufReader};

use glam::Vec3;
use robomeshcat::{Color, Object, Scene, SceneOptions, StreamTransport};

const FPS: u32 = 30;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let transport = StreamTransport::new(io::stdout(), BufReader::new(io::stdin()));
    let mut scene = Scene::new(transport, SceneOptions::default())?;

    scene.add_object(Object::cube(0.1).with_name("cube").with_color(Color::WHITE))?;
    scene.add_object(Object::sphere(0.03).with_name("marker").with_pos(Vec3::new(0.2, 0.0, 0.0)))?;

    let mut anim = scene.animation(FPS)?;
    for i in 0..2 * FPS {
        let t = i as f32 / FPS as f32;
        let height = 0.05 + (t * std::f32::consts::PI).sin().abs() * 0.3;

        let cube = anim.object_mut("cube")?;
        cube.set_pos(Vec3::new(0.0, 0.0, height))?;
        cube.set_color(Color::new(1.0, 1.0 - t / 2.0, 1.0 - t / 2.0))?;

        // Blink the marker every half second.
        anim.object_mut("marker")?.set_visible((i / (FPS / 2)) % 2 == 0)?;
        anim.render()?;
    }
    let animation = anim.finish()?;

    log::info!(
        "Published {} clips over {} frames",
        animation.clips().len(),
        animation.duration() + 1
    );
    Ok(())
}
