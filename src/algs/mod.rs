//! Mesh algorithms: generation, merging, refinement, partitioning and the
//! communication layer they run on.

pub mod communicator;
pub mod dual_graph;
pub mod merge;
pub mod meshgen;
pub mod partition;
pub mod refine;
pub mod transform;

pub use merge::merge_meshes;
pub use meshgen::subdivided_hyper_rectangle;
pub use partition::{PartitionMethod, partition_cells};
pub use refine::refine_global;
pub use transform::{shift_mesh, transform_mesh};
