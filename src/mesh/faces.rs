//! Face incidence: which cell faces are shared and which lie on the boundary.
//
// A face is identified by the sorted set of its global vertex ids. A face seen
// by exactly one cell is a boundary face; a face seen twice is interior.

use hashbrown::HashMap;

use crate::mesh::Mesh;
use crate::topology::point::{CellId, VertexId};

/// Canonical face identity: sorted vertex ids.
pub type FaceKey = Vec<VertexId>;

/// Incidence counts for every face in a mesh.
#[derive(Clone, Debug, Default)]
pub struct FaceTopology {
    incidence: HashMap<FaceKey, u32>,
    faces_per_cell: usize,
    keys: Vec<FaceKey>,
}

impl FaceTopology {
    pub(crate) fn build(mesh: &Mesh) -> Self {
        let faces_per_cell = mesh.cell_type().faces_per_cell();
        let mut incidence: HashMap<FaceKey, u32> =
            HashMap::with_capacity(mesh.n_cells() * faces_per_cell);
        let mut keys = Vec::with_capacity(mesh.n_cells() * faces_per_cell);
        for c in mesh.cell_ids() {
            for face in 0..faces_per_cell {
                let key = face_key(mesh, c, face);
                *incidence.entry(key.clone()).or_insert(0) += 1;
                keys.push(key);
            }
        }
        Self {
            incidence,
            faces_per_cell,
            keys,
        }
    }

    /// True when face `face` of cell `c` belongs to no other cell.
    pub fn at_boundary(&self, c: CellId, face: usize) -> bool {
        let key = &self.keys[c.index() * self.faces_per_cell + face];
        self.incidence.get(key).copied() == Some(1)
    }

    /// True when any face of `c` is a boundary face.
    pub fn cell_at_boundary(&self, c: CellId) -> bool {
        (0..self.faces_per_cell).any(|f| self.at_boundary(c, f))
    }

    /// Boundary face numbers of cell `c`.
    pub fn boundary_faces(&self, c: CellId) -> impl Iterator<Item = usize> + '_ {
        (0..self.faces_per_cell).filter(move |&f| self.at_boundary(c, f))
    }

    /// Number of distinct faces.
    pub fn n_faces(&self) -> usize {
        self.incidence.len()
    }

    /// Number of distinct boundary faces.
    pub fn n_boundary_faces(&self) -> usize {
        self.incidence.values().filter(|&&n| n == 1).count()
    }

    /// Faces shared by more than two cells indicate a broken merge.
    pub fn n_overfull_faces(&self) -> usize {
        self.incidence.values().filter(|&&n| n > 2).count()
    }
}

/// Sorted global vertex ids of face `face` of cell `c`.
pub fn face_key(mesh: &Mesh, c: CellId, face: usize) -> FaceKey {
    let mut key = mesh.face_vertices(c, face);
    key.sort_unstable();
    key
}
