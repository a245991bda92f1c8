use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use glam::{Mat4, Vec3};

use crate::assets::MeshLoader;
use crate::errors::{Result, SceneError};
use crate::geometry::TriangleMesh;
use crate::material::Texture;

/// glTF 2.0 (`.gltf` / `.glb`) mesh loader.
///
/// All triangle primitives reachable from the default scene (or from every
/// scene root if the file declares no default) are flattened into a single
/// mesh with their node transforms applied. Strict mode validates the
/// document and fails on any unreadable primitive; lenient mode skips
/// validation and drops primitives it cannot read.
#[derive(Debug, Default, Clone, Copy)]
pub struct GltfLoader;

impl GltfLoader {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn open(path: &Path, lenient: bool) -> Result<(gltf::Gltf, Vec<Vec<u8>>)> {
        let file = fs::File::open(path)
            .map_err(|e| SceneError::MeshLoad(format!("Failed to open glTF file {}: {e}", path.display())))?;
        let reader = BufReader::new(file);
        let gltf = if lenient {
            gltf::Gltf::from_reader_without_validation(reader)?
        } else {
            gltf::Gltf::from_reader(reader)?
        };

        let base_path = path.parent().map_or_else(|| PathBuf::from("./"), Path::to_path_buf);
        let buffers = Self::load_buffers(&gltf, &base_path)?;
        Ok((gltf, buffers))
    }

    fn load_buffers(gltf: &gltf::Gltf, base_path: &Path) -> Result<Vec<Vec<u8>>> {
        let mut buffer_data = Vec::new();
        for buffer in gltf.buffers() {
            match buffer.source() {
                gltf::buffer::Source::Bin => {
                    let blob = gltf
                        .blob
                        .as_deref()
                        .ok_or_else(|| SceneError::MeshLoad("Missing GLB binary chunk".to_string()))?;
                    buffer_data.push(blob.to_vec());
                }
                gltf::buffer::Source::Uri(uri) => {
                    if let Some((_, data)) = uri.strip_prefix("data:").and_then(|r| r.split_once(";base64,")) {
                        buffer_data.push(STANDARD.decode(data)?);
                    } else {
                        let buffer_path = base_path.join(uri);
                        let data = fs::read(&buffer_path).map_err(|e| {
                            SceneError::MeshLoad(format!("Failed to read buffer file {}: {e}", buffer_path.display()))
                        })?;
                        buffer_data.push(data);
                    }
                }
            }
        }
        Ok(buffer_data)
    }

    fn collect_node(
        node: &gltf::Node,
        parent: Mat4,
        buffers: &[Vec<u8>],
        lenient: bool,
        out: &mut TriangleMesh,
    ) -> Result<()> {
        let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

        if let Some(mesh) = node.mesh() {
            for primitive in mesh.primitives() {
                match Self::read_primitive(&primitive, buffers) {
                    Ok(mut part) => {
                        part.transform(&world);
                        out.append(part);
                    }
                    Err(err) if lenient => {
                        log::warn!("Skipping primitive {} of mesh {:?}: {err}", primitive.index(), mesh.name());
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        for child in node.children() {
            Self::collect_node(&child, world, buffers, lenient, out)?;
        }
        Ok(())
    }

    fn read_primitive(primitive: &gltf::Primitive, buffers: &[Vec<u8>]) -> Result<TriangleMesh> {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            return Err(SceneError::MeshLoad(format!(
                "unsupported primitive mode {:?}",
                primitive.mode()
            )));
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .ok_or_else(|| SceneError::MeshLoad("primitive without positions".to_string()))?
            .collect();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(iter) => iter.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        if indices.len() % 3 != 0 || indices.iter().any(|&i| i as usize >= positions.len()) {
            return Err(SceneError::MeshLoad("malformed triangle indices".to_string()));
        }
        let faces = indices.chunks_exact(3).map(|f| [f[0], f[1], f[2]]).collect();

        let mut mesh = TriangleMesh::new(positions, faces);
        if let Some(colors) = reader.read_colors(0) {
            mesh.colors = Some(colors.into_rgb_f32().collect());
        }
        if let Some(uvs) = reader.read_tex_coords(0) {
            mesh.uvs = Some(uvs.into_f32().collect());
        }
        Ok(mesh)
    }
}

impl MeshLoader for GltfLoader {
    fn load(&self, path: &Path, scale: Vec3, lenient: bool) -> Result<TriangleMesh> {
        let (gltf, buffers) = Self::open(path, lenient)?;

        let mut mesh = TriangleMesh::default();
        let roots: Vec<gltf::Node> = match gltf.default_scene().or_else(|| gltf.scenes().next()) {
            Some(scene) => scene.nodes().collect(),
            None => gltf.nodes().filter(|n| n.mesh().is_some()).collect(),
        };
        for node in &roots {
            Self::collect_node(node, Mat4::IDENTITY, &buffers, lenient, &mut mesh)?;
        }

        if mesh.positions.is_empty() {
            return Err(SceneError::MeshLoad(format!("'{}' contains no triangles", path.display())));
        }
        mesh.scale(scale);
        log::debug!(
            "Loaded '{}': {} vertices, {} faces",
            path.display(),
            mesh.vertex_count(),
            mesh.faces.len()
        );
        Ok(mesh)
    }

    fn extract_texture(&self, path: &Path) -> Result<Option<Texture>> {
        let (gltf, buffers) = Self::open(path, true)?;
        let base_path = path.parent().map_or_else(|| PathBuf::from("./"), Path::to_path_buf);

        let Some(texture) = gltf.textures().next() else {
            return Ok(None);
        };
        let image = match texture.source().source() {
            gltf::image::Source::Uri { uri, .. } => image::open(base_path.join(uri))?.to_rgba8(),
            gltf::image::Source::View { view, .. } => {
                let start = view.offset();
                let end = start + view.length();
                let bytes = buffers
                    .get(view.buffer().index())
                    .and_then(|b| b.get(start..end))
                    .ok_or_else(|| SceneError::MeshLoad("image view out of bounds".to_string()))?;
                image::load_from_memory(bytes)?.to_rgba8()
            }
        };
        Texture::from_image(&image).map(Some)
    }
}
