//! Recovery of the terminal boundary ids lost during merging.
//!
//! For each terminal, every rank scans its locally owned collector cells for
//! boundary faces whose centre lies on the expected terminal coordinate along
//! the alignment axis and tags them. The tagged faces are then exchanged so
//! every replica carries the same ids, and a max-reduction of the "found"
//! flag decides, identically on all ranks, whether the terminal exists.

use log::{info, warn};

use crate::algs::communicator::Communicator;
use crate::mesh::{Mesh, Ownership};
use crate::mesh_error::MeshError;
use crate::stack::alignment_axis;
use crate::topology::catalog::{LayerCatalog, names};
use crate::topology::point::{BoundaryId, CellId, MaterialId};

/// Face-centre tolerance relative to the cell measure.
pub const TERMINAL_TOLERANCE: f64 = 1e-6;

/// One terminal to recover.
#[derive(Clone, Debug, PartialEq)]
pub struct Terminal {
    /// Material class of the collector carrying the terminal.
    pub material_class: &'static str,
    /// Boundary name whose single id is assigned.
    pub boundary: &'static str,
    /// Expected coordinate along the alignment axis.
    pub position: f64,
}

impl Terminal {
    /// Top face of the anode collector.
    pub fn anode(collector_top: f64) -> Self {
        Self {
            material_class: names::COLLECTOR_ANODE,
            boundary: names::ANODE,
            position: collector_top,
        }
    }

    /// Bottom face of the cathode collector.
    pub fn cathode(collector_bottom: f64) -> Self {
        Self {
            material_class: names::COLLECTOR_CATHODE,
            boundary: names::CATHODE,
            position: collector_bottom,
        }
    }
}

/// Faces tagged per terminal, summed over all ranks.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub anode_faces: usize,
    pub cathode_faces: usize,
}

/// Tags the anode and cathode terminal faces. Collective.
pub fn recover_terminal_boundaries<C: Communicator>(
    mesh: &mut Mesh,
    catalog: &LayerCatalog,
    collector_top: f64,
    collector_bottom: f64,
    comm: &C,
) -> Result<RecoveryReport, MeshError> {
    Ok(RecoveryReport {
        anode_faces: recover_terminal(mesh, catalog, &Terminal::anode(collector_top), comm)?,
        cathode_faces: recover_terminal(
            mesh,
            catalog,
            &Terminal::cathode(collector_bottom),
            comm,
        )?,
    })
}

/// Tags one terminal and returns the global number of tagged faces.
pub fn recover_terminal<C: Communicator>(
    mesh: &mut Mesh,
    catalog: &LayerCatalog,
    terminal: &Terminal,
    comm: &C,
) -> Result<usize, MeshError> {
    let boundary_id = catalog.unique_boundary(terminal.boundary)?;
    let materials = catalog.material(terminal.material_class)?;

    let in_class = |m: MaterialId| materials.contains(&m);
    let local = scan_terminal_faces(mesh, terminal, boundary_id, in_class, comm.rank());

    let mut words = Vec::with_capacity(local.len() * 3);
    for &(cell, face, id) in &local {
        words.extend([cell.index() as u64, face as u64, u64::from(id)]);
    }
    let gathered = comm.allgather(&words)?;
    let mut tagged = 0usize;
    for triple in gathered.iter().flat_map(|w| w.chunks_exact(3)) {
        let cell = triple[0] as usize;
        let face = triple[1] as usize;
        if cell >= mesh.n_cells() || face >= mesh.cell_type().faces_per_cell() {
            return Err(MeshError::Communication(format!(
                "received boundary tag for unknown face {face} of cell {cell}"
            )));
        }
        let id = BoundaryId::try_from(triple[2])
            .map_err(|_| MeshError::Communication("boundary id out of range".into()))?;
        mesh.set_boundary_id(CellId::new(cell), face, id);
        tagged += 1;
    }

    let found = comm.allreduce_max(u64::from(!local.is_empty()))?;
    if found == 0 {
        warn!(
            "no face of `{}` lies at {} along the alignment axis",
            terminal.material_class, terminal.position
        );
        return Err(MeshError::TerminalFaceNotFound {
            name: terminal.boundary.to_string(),
            boundary_id,
        });
    }
    info!(
        "tagged {tagged} `{}` terminal faces with boundary id {boundary_id}",
        terminal.boundary
    );
    Ok(tagged)
}

fn scan_terminal_faces<F>(
    mesh: &Mesh,
    terminal: &Terminal,
    boundary_id: BoundaryId,
    in_class: F,
    rank: usize,
) -> Vec<(CellId, usize, BoundaryId)>
where
    F: Fn(MaterialId) -> bool,
{
    let axis = alignment_axis(mesh.dimension());
    let topology = mesh.face_topology();
    let candidates: Vec<CellId> = mesh
        .filter_cells(Ownership::LocallyOwned(rank), |cell| in_class(cell.material()))
        .collect();

    let mut hits = Vec::new();
    for c in candidates {
        if !topology.cell_at_boundary(c) {
            continue;
        }
        let tolerance = TERMINAL_TOLERANCE * mesh.measure(c);
        for face in topology.boundary_faces(c) {
            let centre = mesh.face_center(c, face);
            if (centre[axis] - terminal.position).abs() < tolerance {
                hits.push((c, face, boundary_id));
            }
        }
    }
    hits
}
