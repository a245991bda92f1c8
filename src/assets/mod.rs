//! Mesh Loading
//!
//! Mesh file parsing is delegated to a [`MeshLoader`]. [`load_mesh`] applies
//! the loading policy shared by objects and robot parts:
//!
//! 1. Load strictly. On failure, log a warning and retry once with the
//!    loader's lenient mode (broken or unsupported data is skipped).
//! 2. Extract a texture on a best-effort basis. Failures are logged and the
//!    mesh falls back to its flat color.

pub mod loaders;

use std::path::Path;

use glam::Vec3;

use crate::errors::{Result, SceneError};
use crate::geometry::TriangleMesh;
use crate::material::Texture;

#[cfg(feature = "gltf")]
pub use loaders::GltfLoader;

pub trait MeshLoader {
    /// Loads and triangulates the file, scaled per axis.
    fn load(&self, path: &Path, scale: Vec3, lenient: bool) -> Result<TriangleMesh>;

    /// Texture embedded in or referenced by the file, if any.
    fn extract_texture(&self, _path: &Path) -> Result<Option<Texture>> {
        Ok(None)
    }
}

/// Uniform or per-axis mesh scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scale {
    Uniform(f32),
    PerAxis(Vec3),
}

impl Scale {
    #[must_use]
    pub fn to_vec3(self) -> Vec3 {
        match self {
            Scale::Uniform(s) => Vec3::splat(s),
            Scale::PerAxis(v) => v,
        }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Uniform(1.0)
    }
}

impl From<f32> for Scale {
    fn from(s: f32) -> Self {
        Scale::Uniform(s)
    }
}

impl From<Vec3> for Scale {
    fn from(v: Vec3) -> Self {
        Scale::PerAxis(v)
    }
}

impl From<[f32; 3]> for Scale {
    fn from(v: [f32; 3]) -> Self {
        Scale::PerAxis(Vec3::from_array(v))
    }
}

#[derive(Debug, Clone)]
pub struct LoadedMesh {
    pub mesh: TriangleMesh,
    pub texture: Option<Texture>,
}

pub fn load_mesh(loader: &dyn MeshLoader, path: &Path, scale: impl Into<Scale>) -> Result<LoadedMesh> {
    let scale = scale.into().to_vec3();
    let mesh = match loader.load(path, scale, false) {
        Ok(mesh) => mesh,
        Err(err) => {
            log::warn!("Loading '{}' failed ({err}), retrying in lenient mode", path.display());
            loader.load(path, scale, true)?
        }
    };

    let texture = loader.extract_texture(path).unwrap_or_else(|err| {
        log::warn!("Ignoring texture of '{}': {err}", path.display());
        None
    });

    Ok(LoadedMesh { mesh, texture })
}

/// Loader used when none is given explicitly.
#[must_use]
pub fn default_loader() -> Box<dyn MeshLoader> {
    #[cfg(feature = "gltf")]
    {
        Box::new(GltfLoader::new())
    }
    #[cfg(not(feature = "gltf"))]
    {
        Box::new(NoLoader)
    }
}

/// Rejects every file. Stands in for the default loader when no format
/// support is compiled in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLoader;

impl MeshLoader for NoLoader {
    fn load(&self, path: &Path, _scale: Vec3, _lenient: bool) -> Result<TriangleMesh> {
        Err(SceneError::MeshLoad(format!(
            "no mesh loader available for '{}'",
            path.display()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct FlakyLoader {
        calls: RefCell<Vec<bool>>,
    }

    impl MeshLoader for FlakyLoader {
        fn load(&self, _path: &Path, scale: Vec3, lenient: bool) -> Result<TriangleMesh> {
            self.calls.borrow_mut().push(lenient);
            if lenient {
                Ok(TriangleMesh::new(vec![scale.to_array(); 3], vec![[0, 1, 2]]))
            } else {
                Err(SceneError::MeshLoad("broken accessor".to_string()))
            }
        }

        fn extract_texture(&self, _path: &Path) -> Result<Option<Texture>> {
            Err(SceneError::Image("corrupt".to_string()))
        }
    }

    #[test]
    fn test_retries_lenient_and_swallows_texture_errors() {
        let loader = FlakyLoader {
            calls: RefCell::new(Vec::new()),
        };
        let loaded = load_mesh(&loader, Path::new("part.glb"), 2.0).unwrap();
        assert_eq!(*loader.calls.borrow(), vec![false, true]);
        assert_eq!(loaded.mesh.positions[0], [2.0, 2.0, 2.0]);
        assert!(loaded.texture.is_none());
    }

    #[test]
    fn test_no_loader_fails() {
        let err = load_mesh(&NoLoader, Path::new("a.stl"), [1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, SceneError::MeshLoad(_)));
    }
}
