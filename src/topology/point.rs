//! Strong, zero-cost handles for mesh entities and tags.
//!
//! The mesh is an arena: vertices and cells live in flat vectors and are
//! addressed by their position. `VertexId` and `CellId` wrap that position in
//! a `u32` newtype so the two index spaces cannot be mixed up, and so they can
//! be shipped between ranks as plain integers.
//!
//! Material and boundary tags are small integers (one byte, as in most FE
//! codes); they are plain aliases because arithmetic on them is never needed
//! but ordering and hashing are.

use std::fmt;

/// Integer tag attached to every cell, grouped into named classes by the
/// [`LayerCatalog`](crate::topology::catalog::LayerCatalog).
pub type MaterialId = u8;

/// Integer tag attached to boundary faces.
pub type BoundaryId = u8;

/// Boundary id carried by every face that has not been tagged.
pub const DEFAULT_BOUNDARY_ID: BoundaryId = 0;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
        )]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Wraps an arena position.
            ///
            /// # Panics
            ///
            /// Panics if `index` does not fit in a `u32`; meshes that large are
            /// outside what a single coarse mesh is expected to hold.
            #[inline]
            pub fn new(index: usize) -> Self {
                assert!(
                    index <= u32::MAX as usize,
                    concat!(stringify!($name), " index out of range")
                );
                $name(index as u32)
            }

            /// Returns the arena position.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            /// Returns the raw integer, as sent over the wire.
            #[inline]
            pub const fn get(self) -> u32 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.0).finish()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

arena_id!(
    /// Position of a vertex in [`Mesh`](crate::mesh::Mesh) coordinate storage.
    VertexId
);

arena_id!(
    /// Position of a cell in [`Mesh`](crate::mesh::Mesh) cell storage.
    CellId
);
