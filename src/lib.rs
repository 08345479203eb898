#![cfg_attr(docsrs, feature(doc_cfg))]
//! # stack-mesh
//!
//! stack-mesh builds the finite-element mesh of a layered electrochemical
//! energy-storage device (supercapacitor or battery cell) and decomposes it
//! across the ranks of a parallel run.
//!
//! ## Features
//! - Structured component meshes for the anode, separator, cathode and the two
//!   current collectors, assembled into one conforming stack of repeating
//!   cycles
//! - Collector alignment so the collector rows line up with the electrodes
//!   while the collector tabs stick out as terminals
//! - Recovery of the anode and cathode terminal boundary ids after merging
//! - Material-weighted repartitioning (contiguous along the stack, or METIS)
//! - Uniform refinement, AVS UCD / Abaqus import and compressed coarse-mesh
//!   checkpoints for restarts
//! - Pluggable communication backends (serial, in-process threads, MPI)
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! stack-mesh = "0.3"
//! # Optional features:
//! # features = ["mpi-support", "rayon", "metis-support"]
//! ```
//!
//! ```no_run
//! use stack_mesh::prelude::*;
//!
//! # fn main() -> Result<(), MeshError> {
//! let config = GeometryConfig::from_path(std::path::Path::new("geometry.toml"))?;
//! let geometry = Geometry::new(&config, NoComm)?;
//! println!("{} cells", geometry.mesh().n_cells());
//! # Ok(())
//! # }
//! ```
//!
//! ## Replication
//!
//! The coarse mesh is replicated: every rank holds every cell and vertex and
//! records the owner rank of each cell. Collective operations (assembly,
//! boundary recovery, repartition, checkpointing) must be called on all ranks
//! in the same order.

pub mod algs;
pub mod config;
pub mod geometry;
pub mod io;
pub mod mesh;
pub mod mesh_error;
pub mod stack;
pub mod topology;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, NoComm, RayonComm, run_on_local_ranks};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::partition::PartitionMethod;
    pub use crate::config::{GeometryConfig, MeshSource};
    pub use crate::geometry::Geometry;
    pub use crate::io::{read_checkpoint, read_mesh_file, write_checkpoint};
    pub use crate::mesh::{Mesh, Ownership};
    pub use crate::mesh_error::MeshError;
    pub use crate::stack::{
        LayerWeights, StackLayout, assemble_stack, recover_terminal_boundaries, repartition,
    };
    pub use crate::topology::catalog::LayerCatalog;
    pub use crate::topology::point::{BoundaryId, CellId, MaterialId, VertexId};
}
