//! Topological union of two meshes with fusion of coincident vertices.
//
// Vertices of the first mesh are binned into a uniform hash grid whose bucket
// width equals the fusion tolerance; every vertex of the second mesh probes the
// 3^d buckets around it. Two vertices fuse when they agree to within the
// tolerance on every axis.

use hashbrown::HashMap;
use log::debug;

use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::point::{DEFAULT_BOUNDARY_ID, VertexId};

/// Fusion tolerance relative to the shortest edge of either input.
pub const RELATIVE_FUSION_TOLERANCE: f64 = 1e-8;

type BucketKey = [i64; 3];

struct VertexGrid {
    width: f64,
    buckets: HashMap<BucketKey, Vec<VertexId>>,
}

impl VertexGrid {
    fn new(width: f64) -> Self {
        Self {
            width,
            buckets: HashMap::new(),
        }
    }

    fn key(&self, p: &[f64]) -> BucketKey {
        let mut key = [0i64; 3];
        for (k, x) in key.iter_mut().zip(p) {
            *k = (x / self.width).floor() as i64;
        }
        key
    }

    fn insert(&mut self, p: &[f64], v: VertexId) {
        self.buckets.entry(self.key(p)).or_default().push(v);
    }

    fn find(&self, mesh: &Mesh, p: &[f64]) -> Option<VertexId> {
        let centre = self.key(p);
        let dim = p.len();
        let probes = 3usize.pow(dim as u32);
        for probe in 0..probes {
            let mut key = centre;
            let mut code = probe;
            for k in key.iter_mut().take(dim) {
                *k += (code % 3) as i64 - 1;
                code /= 3;
            }
            let Some(bucket) = self.buckets.get(&key) else {
                continue;
            };
            for &candidate in bucket {
                let q = mesh.vertex(candidate);
                if p.iter().zip(q).all(|(a, b)| (a - b).abs() <= self.width) {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

/// Returns the union of `first` and `second`.
///
/// Cells of `first` come first, in order, followed by those of `second`.
/// Materials and owners are kept; every boundary id is reset to the default,
/// so terminal faces must be recovered afterwards.
pub fn merge_meshes(first: &Mesh, second: &Mesh) -> Result<Mesh, MeshError> {
    if first.dimension() != second.dimension() {
        return Err(MeshError::InvalidGeometry(format!(
            "cannot merge a {}D mesh with a {}D mesh",
            first.dimension(),
            second.dimension()
        )));
    }
    let shortest = match (first.min_edge_length(), second.min_edge_length()) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    };

    let mut merged = first.clone();
    merged.reset_boundary_ids();

    let mut grid = shortest
        .filter(|h| *h > 0.0)
        .map(|h| VertexGrid::new(h * RELATIVE_FUSION_TOLERANCE));
    if let Some(grid) = grid.as_mut() {
        for (i, p) in first.vertices().enumerate() {
            grid.insert(p, VertexId::new(i));
        }
    }

    let mut fused = 0usize;
    let mut renumber = Vec::with_capacity(second.n_vertices());
    for p in second.vertices() {
        let existing = grid.as_ref().and_then(|g| g.find(&merged, p));
        let id = match existing {
            Some(v) => {
                fused += 1;
                v
            }
            None => merged.add_vertex(p)?,
        };
        renumber.push(id);
    }

    let faces_per_cell = merged.cell_type().faces_per_cell();
    for cell in second.cells() {
        let vertices = cell.vertices().iter().map(|v| renumber[v.index()]).collect();
        merged.push_raw_cell(
            vertices,
            cell.material(),
            vec![DEFAULT_BOUNDARY_ID; faces_per_cell],
            cell.owner(),
        );
    }

    debug!(
        "merged {} + {} cells, fused {} of {} incoming vertices",
        first.n_cells(),
        second.n_cells(),
        fused,
        second.n_vertices()
    );
    Ok(merged)
}
