//! Arena mesh of tensor-product cells.
//!
//! [`Mesh`] stores vertex coordinates in one flat vector (stride =
//! `dimension`) and cells as lists of [`VertexId`]s in lexicographic order
//! (see [`CellType`]). Each cell carries a material id, one boundary id per
//! face, and the rank that owns it.
//!
//! The coarse mesh is replicated on every rank; ownership decides which rank
//! is authoritative for a cell. Every mutating operation is expected to be
//! invoked collectively with identical arguments so the replicas stay equal.

mod faces;

pub use faces::{FaceKey, FaceTopology, face_key};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::mesh_error::MeshError;
use crate::topology::cell_type::CellType;
use crate::topology::point::{BoundaryId, CellId, DEFAULT_BOUNDARY_ID, MaterialId, VertexId};

/// One cell of the arena.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    vertices: Vec<VertexId>,
    material: MaterialId,
    boundary_ids: Vec<BoundaryId>,
    owner: usize,
}

impl Cell {
    /// Vertices in lexicographic order.
    pub fn vertices(&self) -> &[VertexId] {
        &self.vertices
    }

    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Boundary id of each face, indexed by face number.
    pub fn boundary_ids(&self) -> &[BoundaryId] {
        &self.boundary_ids
    }

    /// Rank owning this cell.
    pub fn owner(&self) -> usize {
        self.owner
    }
}

/// Which cells a filtered traversal visits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ownership {
    /// Every cell in the replica.
    All,
    /// Only cells owned by the given rank.
    LocallyOwned(usize),
}

impl Ownership {
    #[inline]
    fn admits(self, cell: &Cell) -> bool {
        match self {
            Ownership::All => true,
            Ownership::LocallyOwned(rank) => cell.owner == rank,
        }
    }
}

/// Mesh of quadrilaterals (2D) or hexahedra (3D).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    dimension: usize,
    coordinates: Vec<f64>,
    cells: Vec<Cell>,
}

impl Mesh {
    /// Creates an empty mesh of the given spatial dimension (2 or 3).
    pub fn new(dimension: usize) -> Result<Self, MeshError> {
        CellType::for_dimension(dimension).ok_or_else(|| {
            MeshError::InvalidGeometry(format!("unsupported spatial dimension {dimension}"))
        })?;
        Ok(Self {
            dimension,
            coordinates: Vec::new(),
            cells: Vec::new(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn cell_type(&self) -> CellType {
        match self.dimension {
            2 => CellType::Quadrilateral,
            _ => CellType::Hexahedron,
        }
    }

    pub fn n_vertices(&self) -> usize {
        self.coordinates.len() / self.dimension
    }

    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Appends a vertex and returns its id.
    pub fn add_vertex(&mut self, point: &[f64]) -> Result<VertexId, MeshError> {
        if point.len() != self.dimension {
            return Err(MeshError::InvalidGeometry(format!(
                "vertex has dimension {}, expected {}",
                point.len(),
                self.dimension
            )));
        }
        let id = VertexId::new(self.n_vertices());
        self.coordinates.extend_from_slice(point);
        Ok(id)
    }

    /// Appends a cell with default boundary ids, owned by rank 0.
    pub fn add_cell(
        &mut self,
        vertices: Vec<VertexId>,
        material: MaterialId,
    ) -> Result<CellId, MeshError> {
        let kind = self.cell_type();
        if vertices.len() != kind.vertices_per_cell() {
            return Err(MeshError::InvalidGeometry(format!(
                "cell has {} vertices, expected {}",
                vertices.len(),
                kind.vertices_per_cell()
            )));
        }
        let n_vertices = self.n_vertices();
        if let Some(bad) = vertices.iter().find(|v| v.index() >= n_vertices) {
            return Err(MeshError::InvalidGeometry(format!(
                "cell references missing vertex {bad}"
            )));
        }
        let id = CellId::new(self.cells.len());
        self.cells.push(Cell {
            vertices,
            material,
            boundary_ids: vec![DEFAULT_BOUNDARY_ID; kind.faces_per_cell()],
            owner: 0,
        });
        Ok(id)
    }

    /// Checks the arena invariants that [`Mesh::add_vertex`] and
    /// [`Mesh::add_cell`] enforce on construction. Meshes restored by
    /// deserialization bypass those checks.
    pub fn validate(&self) -> Result<(), MeshError> {
        let kind = CellType::for_dimension(self.dimension).ok_or_else(|| {
            MeshError::InvalidGeometry(format!("unsupported spatial dimension {}", self.dimension))
        })?;
        if self.coordinates.len() % self.dimension != 0 {
            return Err(MeshError::InvalidGeometry(format!(
                "{} coordinates do not form {}D vertices",
                self.coordinates.len(),
                self.dimension
            )));
        }
        let n_vertices = self.n_vertices();
        for (i, cell) in self.cells.iter().enumerate() {
            if cell.vertices.len() != kind.vertices_per_cell() {
                return Err(MeshError::InvalidGeometry(format!(
                    "cell {i} has {} vertices, expected {}",
                    cell.vertices.len(),
                    kind.vertices_per_cell()
                )));
            }
            if let Some(bad) = cell.vertices.iter().find(|v| v.index() >= n_vertices) {
                return Err(MeshError::InvalidGeometry(format!(
                    "cell {i} references missing vertex {bad}"
                )));
            }
            if cell.boundary_ids.len() != kind.faces_per_cell() {
                return Err(MeshError::InvalidGeometry(format!(
                    "cell {i} has {} boundary ids, expected {}",
                    cell.boundary_ids.len(),
                    kind.faces_per_cell()
                )));
            }
        }
        Ok(())
    }

    /// Coordinates of vertex `v`.
    #[inline]
    pub fn vertex(&self, v: VertexId) -> &[f64] {
        let start = v.index() * self.dimension;
        &self.coordinates[start..start + self.dimension]
    }

    /// Iterates vertex coordinates in id order.
    pub fn vertices(&self) -> impl Iterator<Item = &[f64]> {
        self.coordinates.chunks_exact(self.dimension)
    }

    /// Mutable access to every vertex coordinate tuple.
    pub fn vertices_mut(&mut self) -> impl Iterator<Item = &mut [f64]> {
        self.coordinates.chunks_exact_mut(self.dimension)
    }

    #[inline]
    pub fn cell(&self, c: CellId) -> &Cell {
        &self.cells[c.index()]
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn cell_ids(&self) -> impl Iterator<Item = CellId> + use<> {
        (0..self.cells.len()).map(CellId::new)
    }

    pub fn set_material(&mut self, c: CellId, material: MaterialId) {
        self.cells[c.index()].material = material;
    }

    pub fn boundary_id(&self, c: CellId, face: usize) -> BoundaryId {
        self.cells[c.index()].boundary_ids[face]
    }

    pub fn set_boundary_id(&mut self, c: CellId, face: usize, id: BoundaryId) {
        self.cells[c.index()].boundary_ids[face] = id;
    }

    /// Resets every face to [`DEFAULT_BOUNDARY_ID`].
    pub fn reset_boundary_ids(&mut self) {
        for cell in &mut self.cells {
            cell.boundary_ids.fill(DEFAULT_BOUNDARY_ID);
        }
    }

    pub fn owner(&self, c: CellId) -> usize {
        self.cells[c.index()].owner
    }

    /// Overwrites cell ownership; `owners` is indexed by cell id.
    pub fn set_owners(&mut self, owners: &[usize]) -> Result<(), MeshError> {
        if owners.len() != self.cells.len() {
            return Err(MeshError::InvalidGeometry(format!(
                "ownership vector has {} entries for {} cells",
                owners.len(),
                self.cells.len()
            )));
        }
        for (cell, &owner) in self.cells.iter_mut().zip(owners) {
            cell.owner = owner;
        }
        Ok(())
    }

    /// Cells admitted by `ownership` that satisfy `predicate`.
    pub fn filter_cells<'a, P>(
        &'a self,
        ownership: Ownership,
        mut predicate: P,
    ) -> impl Iterator<Item = CellId> + 'a
    where
        P: FnMut(&Cell) -> bool + 'a,
    {
        self.cells
            .iter()
            .enumerate()
            .filter(move |(_, cell)| ownership.admits(cell) && predicate(cell))
            .map(|(i, _)| CellId::new(i))
    }

    /// Number of cells owned by `rank`.
    pub fn n_locally_owned_cells(&self, rank: usize) -> usize {
        self.cells.iter().filter(|c| c.owner == rank).count()
    }

    /// Cell count per material id.
    pub fn material_histogram(&self) -> BTreeMap<MaterialId, usize> {
        let mut histogram = BTreeMap::new();
        for cell in &self.cells {
            *histogram.entry(cell.material).or_insert(0) += 1;
        }
        histogram
    }

    /// Vertex-average center of a cell.
    pub fn cell_center(&self, c: CellId) -> Vec<f64> {
        self.average(self.cells[c.index()].vertices.iter().copied())
    }

    /// Vertex-average center of face `face` of cell `c`.
    pub fn face_center(&self, c: CellId, face: usize) -> Vec<f64> {
        let cell = &self.cells[c.index()];
        self.average(
            self.cell_type()
                .face_vertices(face)
                .map(|local| cell.vertices[local]),
        )
    }

    /// Global vertex ids of face `face` of cell `c`, in local order.
    pub fn face_vertices(&self, c: CellId, face: usize) -> Vec<VertexId> {
        let cell = &self.cells[c.index()];
        self.cell_type()
            .face_vertices(face)
            .map(|local| cell.vertices[local])
            .collect()
    }

    /// Area (2D) or volume (3D) of a cell.
    pub fn measure(&self, c: CellId) -> f64 {
        let v = &self.cells[c.index()].vertices;
        match self.cell_type() {
            CellType::Quadrilateral => {
                // Shoelace over the counter-clockwise cycle 0-1-3-2.
                let ring = [v[0], v[1], v[3], v[2]];
                let mut twice_area = 0.0;
                for i in 0..4 {
                    let p = self.vertex(ring[i]);
                    let q = self.vertex(ring[(i + 1) % 4]);
                    twice_area += p[0] * q[1] - q[0] * p[1];
                }
                0.5 * twice_area.abs()
            }
            CellType::Hexahedron => {
                // Six tetrahedra sharing the 0-7 diagonal.
                const TETS: [[usize; 4]; 6] = [
                    [0, 1, 3, 7],
                    [0, 1, 5, 7],
                    [0, 2, 3, 7],
                    [0, 2, 6, 7],
                    [0, 4, 5, 7],
                    [0, 4, 6, 7],
                ];
                TETS.iter()
                    .map(|t| {
                        tet_volume(
                            self.vertex(v[t[0]]),
                            self.vertex(v[t[1]]),
                            self.vertex(v[t[2]]),
                            self.vertex(v[t[3]]),
                        )
                    })
                    .sum()
            }
        }
    }

    /// Axis-aligned bounding box `(min, max)`; `None` for a mesh without vertices.
    pub fn bounding_box(&self) -> Option<(Vec<f64>, Vec<f64>)> {
        let mut iter = self.vertices();
        let first = iter.next()?;
        let mut lo = first.to_vec();
        let mut hi = first.to_vec();
        for p in iter {
            for d in 0..self.dimension {
                lo[d] = lo[d].min(p[d]);
                hi[d] = hi[d].max(p[d]);
            }
        }
        Some((lo, hi))
    }

    /// Shortest cell edge, used to scale vertex-fusion tolerances.
    pub fn min_edge_length(&self) -> Option<f64> {
        let n = self.cell_type().vertices_per_cell();
        let mut shortest: Option<f64> = None;
        for cell in &self.cells {
            for a in 0..n {
                for axis in 0..self.dimension {
                    let b = a | (1 << axis);
                    if b == a {
                        continue;
                    }
                    let p = self.vertex(cell.vertices[a]);
                    let q = self.vertex(cell.vertices[b]);
                    let len = p
                        .iter()
                        .zip(q)
                        .map(|(x, y)| (x - y) * (x - y))
                        .sum::<f64>()
                        .sqrt();
                    shortest = Some(shortest.map_or(len, |s| s.min(len)));
                }
            }
        }
        shortest
    }

    /// Face incidence of the whole replica.
    pub fn face_topology(&self) -> FaceTopology {
        FaceTopology::build(self)
    }

    fn average(&self, vertices: impl Iterator<Item = VertexId>) -> Vec<f64> {
        let mut sum = vec![0.0; self.dimension];
        let mut count = 0usize;
        for v in vertices {
            for (s, x) in sum.iter_mut().zip(self.vertex(v)) {
                *s += x;
            }
            count += 1;
        }
        if count > 0 {
            for s in &mut sum {
                *s /= count as f64;
            }
        }
        sum
    }

    pub(crate) fn push_raw_cell(
        &mut self,
        vertices: Vec<VertexId>,
        material: MaterialId,
        boundary_ids: Vec<BoundaryId>,
        owner: usize,
    ) -> CellId {
        let id = CellId::new(self.cells.len());
        self.cells.push(Cell {
            vertices,
            material,
            boundary_ids,
            owner,
        });
        id
    }
}

fn tet_volume(a: &[f64], b: &[f64], c: &[f64], d: &[f64]) -> f64 {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let w = [d[0] - a[0], d[1] - a[1], d[2] - a[2]];
    let det = u[0] * (v[1] * w[2] - v[2] * w[1]) - u[1] * (v[0] * w[2] - v[2] * w[0])
        + u[2] * (v[0] * w[1] - v[1] * w[0]);
    det.abs() / 6.0
}
