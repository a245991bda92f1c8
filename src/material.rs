//! Colors, textures and the Lambert material every item is drawn with.

use std::io::Cursor;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::errors::{Result, SceneError};

/// Linear RGB color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Builds a color from 8-bit channels.
    #[must_use]
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::new(f32::from(r) / 255.0, f32::from(g) / 255.0, f32::from(b) / 255.0)
    }

    /// Uniformly random color.
    #[must_use]
    pub fn random() -> Self {
        Self::new(rand::random(), rand::random(), rand::random())
    }

    #[must_use]
    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }

    /// Packs the color as `0xRRGGBB`, clamping each channel.
    #[must_use]
    pub fn to_hex(self) -> u32 {
        let channel = |c: f32| (c * 255.0).clamp(0.0, 255.0) as u32;
        (channel(self.r) << 16) | (channel(self.g) << 8) | channel(self.b)
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::WHITE
    }
}

impl From<[f32; 3]> for Color {
    fn from(c: [f32; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}

impl From<[u8; 3]> for Color {
    fn from(c: [u8; 3]) -> Self {
        Self::from_rgb8(c[0], c[1], c[2])
    }
}

/// A PNG-encoded image texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    png: Vec<u8>,
}

impl Texture {
    /// Loads a texture from a PNG file.
    pub fn from_png_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())?;
        Self::from_png_bytes(bytes)
    }

    /// Wraps PNG bytes after checking their signature.
    pub fn from_png_bytes(png: Vec<u8>) -> Result<Self> {
        match image::guess_format(&png)? {
            ImageFormat::Png => Ok(Self { png }),
            other => Err(SceneError::Image(format!("expected PNG texture data, found {other:?}"))),
        }
    }

    /// Encodes an in-memory image.
    pub fn from_image(image: &RgbaImage) -> Result<Self> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(Self { png })
    }

    #[inline]
    #[must_use]
    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    #[must_use]
    pub fn data_uri(&self) -> String {
        format!("data:image/png;base64,{}", STANDARD.encode(&self.png))
    }
}

/// Material parameters of one item.
#[derive(Debug, Clone, Copy)]
pub struct Material<'a> {
    pub color: Color,
    pub opacity: f32,
    pub texture: Option<&'a Texture>,
    pub wireframe: bool,
    pub vertex_colors: bool,
}

/// Lowered material plus the texture/image entries it references.
pub(crate) struct LoweredMaterial {
    pub material: Value,
    pub textures: Vec<Value>,
    pub images: Vec<Value>,
}

impl Material<'_> {
    pub(crate) fn lower(&self) -> LoweredMaterial {
        let mut material = json!({
            "uuid": Uuid::new_v4().to_string(),
            "type": "MeshLambertMaterial",
            "opacity": self.opacity,
            "transparent": self.opacity < 1.0,
            "wireframe": self.wireframe,
            "vertexColors": self.vertex_colors,
        });

        let mut textures = Vec::new();
        let mut images = Vec::new();
        if let Some(texture) = self.texture {
            let image_id = Uuid::new_v4().to_string();
            let texture_id = Uuid::new_v4().to_string();
            images.push(json!({ "uuid": image_id, "url": texture.data_uri() }));
            textures.push(json!({
                "uuid": texture_id,
                "wrap": [1001, 1001],
                "repeat": [1, 1],
                "image": image_id,
            }));
            material["map"] = Value::String(texture_id);
        } else {
            material["color"] = Value::from(self.color.to_hex());
        }

        LoweredMaterial {
            material,
            textures,
            images,
        }
    }
}
