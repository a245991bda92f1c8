//! Error Types
//!
//! This module defines the error type used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`SceneError`] covers:
//! - Lifecycle misuse (mutating detached items, ending a session twice)
//! - Lookups of unknown entities, joints and morph targets
//! - Failures reported by the external collaborators (viewer transport,
//!   kinematics solver, mesh loader, video encoder)
//!
//! Recoverable conditions (duplicate names, topology changes while recording,
//! texture extraction failures) are logged with `log::warn!` and never surface
//! here.
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, SceneError>`.
//!
//! ```rust,ignore
//! use robomeshcat::errors::{Result, SceneError};
//!
//! fn lift(scene: &mut Scene) -> Result<()> {
//!     scene.object_mut("box")?.edit_pos(|p| p.z += 0.1)
//! }
//! ```

use thiserror::Error;

/// The main error type of the crate.
#[derive(Error, Debug)]
pub enum SceneError {
    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// A property was mutated on an item that has no viewer link yet.
    #[error("'{0}' is not attached to a scene")]
    NotAttached(String),

    /// A recording operation was requested while no animation is active.
    #[error("No animation is being recorded")]
    NotRecording,

    /// An animation was started while another one is being recorded.
    #[error("An animation is already being recorded")]
    AlreadyRecording,

    /// No object, robot or human with this name is registered in the scene.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    // ========================================================================
    // Composite Entity Errors
    // ========================================================================
    /// The robot has no joint with this name.
    #[error("Unknown joint: {0}")]
    UnknownJoint(String),

    /// Joint index outside of the configuration vector.
    #[error("Joint index {index} out of range (configuration has {len} values)")]
    JointIndexOutOfRange {
        /// The requested index
        index: usize,
        /// Length of the configuration vector
        len: usize,
    },

    /// A configuration vector of the wrong size was supplied.
    #[error("Configuration length mismatch: expected {expected}, got {actual}")]
    ConfigurationLength {
        /// Number of values the solver expects
        expected: usize,
        /// Number of values supplied
        actual: usize,
    },

    /// A morph target index outside of the registered morphs.
    #[error("Morph {index} out of range ({count} morphs registered)")]
    MorphOutOfRange {
        /// The requested morph
        index: usize,
        /// Number of registered morphs
        count: usize,
    },

    /// Vertex data does not match the mesh topology.
    #[error("Vertex count mismatch: expected {expected}, got {actual}")]
    VertexCount {
        /// Number of vertices of the mesh
        expected: usize,
        /// Number of vertices supplied
        actual: usize,
    },

    // ========================================================================
    // External Collaborator Errors
    // ========================================================================
    /// Mesh loading failed (after the lenient retry).
    #[error("Mesh load error: {0}")]
    MeshLoad(String),

    /// The kinematics solver or body model rejected its input.
    #[error("Solver error: {0}")]
    Solver(String),

    /// The viewer transport failed or answered with garbage.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Image encoding or decoding error.
    #[error("Image error: {0}")]
    Image(String),

    // ========================================================================
    // I/O & Format Errors
    // ========================================================================
    /// File or stream I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Base64 decoding error.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<image::ImageError> for SceneError {
    fn from(err: image::ImageError) -> Self {
        SceneError::Image(err.to_string())
    }
}

#[cfg(feature = "gltf")]
impl From<gltf::Error> for SceneError {
    fn from(err: gltf::Error) -> Self {
        SceneError::MeshLoad(err.to_string())
    }
}

/// Alias for `Result<T, SceneError>`.
pub type Result<T> = std::result::Result<T, SceneError>;
