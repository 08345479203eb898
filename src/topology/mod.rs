//! Identifiers, reference cells and the material/boundary catalog.

pub mod catalog;
pub mod cell_type;
pub mod point;

pub use catalog::LayerCatalog;
pub use cell_type::CellType;
pub use point::{BoundaryId, CellId, DEFAULT_BOUNDARY_ID, MaterialId, VertexId};
