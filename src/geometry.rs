//! Item geometry and its lowering to the viewer's buffer-geometry JSON.

use std::f32::consts::TAU;

use glam::{Mat4, Vec3};
use serde_json::{Value, json};
use uuid::Uuid;

/// Number of radial sections used for generated cylinders.
pub const CYLINDER_SECTIONS: u32 = 50;

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Axis-aligned box with full edge lengths.
    Box { lengths: Vec3 },
    Sphere { radius: f32 },
    Mesh(TriangleMesh),
}

impl Geometry {
    pub(crate) fn lower(&self) -> Value {
        let uuid = Uuid::new_v4().to_string();
        match self {
            Geometry::Box { lengths } => json!({
                "uuid": uuid,
                "type": "BoxGeometry",
                "width": lengths.x,
                "height": lengths.y,
                "depth": lengths.z,
            }),
            Geometry::Sphere { radius } => json!({
                "uuid": uuid,
                "type": "SphereGeometry",
                "radius": radius,
                "widthSegments": 20,
                "heightSegments": 20,
            }),
            Geometry::Mesh(mesh) => mesh.lower(uuid),
        }
    }

    #[must_use]
    pub fn as_mesh(&self) -> Option<&TriangleMesh> {
        match self {
            Geometry::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }
}

/// Indexed triangle mesh with optional per-vertex colors, texture
/// coordinates and morph targets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TriangleMesh {
    pub positions: Vec<[f32; 3]>,
    pub faces: Vec<[u32; 3]>,
    pub colors: Option<Vec<[f32; 3]>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    pub morph_positions: Vec<Vec<[f32; 3]>>,
    pub morph_colors: Vec<Vec<[f32; 3]>>,
}

impl TriangleMesh {
    #[must_use]
    pub fn new(positions: Vec<[f32; 3]>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            positions,
            faces,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_colors(mut self, colors: Vec<[f32; 3]>) -> Self {
        self.colors = Some(colors);
        self
    }

    #[must_use]
    pub fn with_uvs(mut self, uvs: Vec<[f32; 2]>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    /// Closed cylinder whose axis of symmetry is the z-axis, centered at the
    /// origin.
    #[must_use]
    pub fn cylinder(radius: f32, length: f32, sections: u32) -> Self {
        let sections = sections.max(3);
        let h = length / 2.0;

        let mut positions = Vec::with_capacity(2 * sections as usize + 2);
        for i in 0..sections {
            let phi = i as f32 / sections as f32 * TAU;
            let (s, c) = phi.sin_cos();
            positions.push([radius * c, radius * s, -h]);
            positions.push([radius * c, radius * s, h]);
        }
        let bottom = positions.len() as u32;
        positions.push([0.0, 0.0, -h]);
        let top = bottom + 1;
        positions.push([0.0, 0.0, h]);

        let mut faces = Vec::with_capacity(4 * sections as usize);
        for i in 0..sections {
            let b0 = 2 * i;
            let t0 = b0 + 1;
            let b1 = 2 * ((i + 1) % sections);
            let t1 = b1 + 1;
            // Side quad, counter-clockwise seen from outside
            faces.push([b0, b1, t1]);
            faces.push([b0, t1, t0]);
            // Caps
            faces.push([bottom, b1, b0]);
            faces.push([top, t0, t1]);
        }

        Self::new(positions, faces)
    }

    #[inline]
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn morph_count(&self) -> usize {
        self.morph_positions.len().max(self.morph_colors.len())
    }

    pub fn scale(&mut self, scale: Vec3) {
        for p in &mut self.positions {
            *p = (Vec3::from_array(*p) * scale).to_array();
        }
        for morph in &mut self.morph_positions {
            for p in morph {
                *p = (Vec3::from_array(*p) * scale).to_array();
            }
        }
    }

    pub fn transform(&mut self, matrix: &Mat4) {
        for p in &mut self.positions {
            *p = matrix.transform_point3(Vec3::from_array(*p)).to_array();
        }
    }

    /// Appends another mesh, re-indexing its faces. Colors and texture
    /// coordinates survive only if both meshes carry them.
    pub fn append(&mut self, other: TriangleMesh) {
        let offset = self.positions.len() as u32;
        let was_empty = self.positions.is_empty();
        self.colors = merge_attribute(self.colors.take(), other.colors, was_empty);
        self.uvs = merge_attribute(self.uvs.take(), other.uvs, was_empty);
        self.positions.extend(other.positions);
        self.faces
            .extend(other.faces.into_iter().map(|f| [f[0] + offset, f[1] + offset, f[2] + offset]));
    }

    fn lower(&self, uuid: String) -> Value {
        let mut attributes = serde_json::Map::new();
        attributes.insert("position".into(), float_attribute(self.positions.as_slice()));
        if let Some(colors) = &self.colors {
            attributes.insert("color".into(), float_attribute(colors.as_slice()));
        }
        if let Some(uvs) = &self.uvs {
            attributes.insert("uv".into(), float_attribute(uvs.as_slice()));
        }

        let mut morph_attributes = serde_json::Map::new();
        if !self.morph_positions.is_empty() {
            let lowered: Vec<Value> = self.morph_positions.iter().map(|m| float_attribute(m.as_slice())).collect();
            morph_attributes.insert("position".into(), Value::Array(lowered));
        }
        if !self.morph_colors.is_empty() {
            let lowered: Vec<Value> = self.morph_colors.iter().map(|m| float_attribute(m.as_slice())).collect();
            morph_attributes.insert("color".into(), Value::Array(lowered));
        }

        let index: Vec<u32> = self.faces.iter().flatten().copied().collect();
        json!({
            "uuid": uuid,
            "type": "BufferGeometry",
            "data": {
                "attributes": attributes,
                "index": { "itemSize": 3, "type": "Uint32Array", "array": index },
                "morphAttributes": morph_attributes,
            },
        })
    }
}

fn merge_attribute<T>(a: Option<Vec<T>>, b: Option<Vec<T>>, was_empty: bool) -> Option<Vec<T>> {
    match (a, b) {
        (Some(mut a), Some(b)) => {
            a.extend(b);
            Some(a)
        }
        (None, b) if was_empty => b,
        _ => None,
    }
}

fn float_attribute<const N: usize>(data: &[[f32; N]]) -> Value {
    let array: Vec<f32> = data.iter().flatten().copied().collect();
    json!({ "itemSize": N, "type": "Float32Array", "normalized": false, "array": array })
}
