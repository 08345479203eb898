//! Cell type metadata for tensor-product cells.
//!
//! Only quadrilaterals (2D) and hexahedra (3D) appear in a layered stack.
//! Vertices are numbered lexicographically: local vertex `v` sits at the
//! reference-cell corner whose coordinate along axis `a` is bit `a` of `v`.
//! Faces are numbered `2 * axis + side`, where `side` 0 is the low end of the
//! axis and 1 the high end.

use serde::{Deserialize, Serialize};

/// Tensor-product cell kinds.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum CellType {
    /// 2D tensor-product cell (quad).
    Quadrilateral,
    /// 3D tensor-product cell (hex).
    Hexahedron,
}

impl CellType {
    /// Cell kind for a spatial dimension, if supported.
    pub fn for_dimension(dimension: usize) -> Option<Self> {
        match dimension {
            2 => Some(CellType::Quadrilateral),
            3 => Some(CellType::Hexahedron),
            _ => None,
        }
    }

    /// Topological dimension of the cell.
    pub fn dimension(self) -> usize {
        match self {
            CellType::Quadrilateral => 2,
            CellType::Hexahedron => 3,
        }
    }

    pub fn vertices_per_cell(self) -> usize {
        1 << self.dimension()
    }

    pub fn faces_per_cell(self) -> usize {
        2 * self.dimension()
    }

    pub fn vertices_per_face(self) -> usize {
        1 << (self.dimension() - 1)
    }

    /// Axis a face is normal to.
    #[inline]
    pub fn face_axis(face: usize) -> usize {
        face / 2
    }

    /// Side of the axis a face lies on (0 = low, 1 = high).
    #[inline]
    pub fn face_side(face: usize) -> usize {
        face % 2
    }

    /// Local vertex indices of `face`, in increasing order.
    pub fn face_vertices(self, face: usize) -> impl Iterator<Item = usize> {
        let axis = Self::face_axis(face);
        let side = Self::face_side(face);
        (0..self.vertices_per_cell()).filter(move |v| (v >> axis) & 1 == side)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quad_faces_are_lexicographic() {
        let quad = CellType::Quadrilateral;
        assert_eq!(quad.faces_per_cell(), 4);
        assert_eq!(quad.face_vertices(0).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(quad.face_vertices(1).collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(quad.face_vertices(2).collect::<Vec<_>>(), vec![0, 1]);
        assert_eq!(quad.face_vertices(3).collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn hex_face_counts() {
        let hex = CellType::Hexahedron;
        assert_eq!(hex.vertices_per_cell(), 8);
        assert_eq!(hex.vertices_per_face(), 4);
        for face in 0..hex.faces_per_cell() {
            assert_eq!(hex.face_vertices(face).count(), 4);
        }
        assert_eq!(hex.face_vertices(5).collect::<Vec<_>>(), vec![4, 5, 6, 7]);
    }

    #[test]
    fn unsupported_dimension() {
        assert!(CellType::for_dimension(1).is_none());
        assert_eq!(CellType::for_dimension(3), Some(CellType::Hexahedron));
    }
}
