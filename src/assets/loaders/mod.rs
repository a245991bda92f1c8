#[cfg(feature = "gltf")]
mod gltf;

#[cfg(feature = "gltf")]
pub use self::gltf::GltfLoader;
