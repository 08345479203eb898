//! MeshError: Unified error type for stack-mesh public APIs
//!
//! Every fallible operation in the crate returns this type. Variants fall into
//! three families: configuration errors (bad input, caught before any mesh is
//! touched), invariant violations (caught after a collective reduction so that
//! every rank fails together), and I/O errors.

use crate::topology::point::{BoundaryId, CellId, MaterialId};
use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for stack-mesh operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MeshError {
    /// A configuration value is missing or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),
    /// Box dimensions, repetitions or coordinates do not describe a valid mesh.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
    /// A material name is not present in the layer catalog.
    #[error("Unknown material class `{0}` in layer catalog")]
    UnknownMaterialClass(String),
    /// A boundary name is not present in the layer catalog.
    #[error("Unknown boundary class `{0}` in layer catalog")]
    UnknownBoundaryClass(String),
    /// A catalog entry has no tags at all.
    #[error("Catalog entry `{0}` has an empty tag set")]
    EmptyTagSet(String),
    /// A terminal boundary name must resolve to exactly one boundary id.
    #[error("Boundary `{name}` must map to exactly one boundary id, found {count}")]
    AmbiguousBoundaryTag { name: String, count: usize },
    /// A cell carries a material id that matches none of the weight classes.
    #[error("Cell {cell} has material id {material} outside every weight class")]
    UnmatchedMaterial { cell: CellId, material: MaterialId },
    /// The geometric scan for a terminal face found nothing on any rank.
    #[error("Terminal boundary `{name}` (id {boundary_id}) was not found on any rank")]
    TerminalFaceNotFound { name: String, boundary_id: BoundaryId },
    /// Mesh file with an extension no reader handles.
    #[error("Bad mesh file extension .{extension} in mesh file {}", path.display())]
    UnsupportedMeshFile { path: PathBuf, extension: String },
    /// Mesh file that could not be opened or read.
    #[error("Cannot read mesh file {}: {reason}", path.display())]
    UnreadableMeshFile { path: PathBuf, reason: String },
    /// Syntax error while parsing a mesh or configuration file.
    #[error("Mesh I/O parse error: {0}")]
    MeshIoParse(String),
    /// Encoding or decoding a checkpoint archive failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Checkpoint written by an incompatible format version.
    #[error("Checkpoint format version {found} is not supported (expected {expected})")]
    CheckpointVersion { expected: u32, found: u32 },
    /// Message passing between ranks failed.
    #[error("Communication error: {0}")]
    Communication(String),
    /// A collective operation failed on some rank.
    #[error("Collective operation `{0}` failed on at least one rank")]
    CollectiveFailure(&'static str),
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for MeshError {
    fn from(err: std::io::Error) -> Self {
        MeshError::Io(err.to_string())
    }
}

impl From<bincode::Error> for MeshError {
    fn from(err: bincode::Error) -> Self {
        MeshError::Serialization(err.to_string())
    }
}
