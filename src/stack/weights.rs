//! Material-aware cell weights and the weighted repartition.
//!
//! Electrode cells carry two coupled transport fields while separator and
//! collector cells carry one, so each cell's partition weight is a base weight
//! plus a per-class extra looked up from its material id.

use log::{debug, info};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algs::communicator::Communicator;
use crate::algs::partition::{PartitionMethod, part_loads, partition_cells};
use crate::mesh::{Mesh, Ownership};
use crate::mesh_error::MeshError;
use crate::topology::catalog::{LayerCatalog, names};
use crate::topology::point::{CellId, MaterialId};

/// Weight every cell carries before its class extra is added.
pub const BASE_CELL_WEIGHT: u32 = 1000;

/// Extra weight per material class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerWeights {
    pub anode: u32,
    pub cathode: u32,
    pub separator: u32,
    pub collector: u32,
}

/// Outcome of a weight lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellWeight {
    /// Class extra of a recognised material.
    Known(u32),
    /// The material id belongs to none of the weighted classes.
    Unmatched,
}

impl CellWeight {
    /// Total partition weight, `None` for an unmatched material.
    pub fn partition_weight(self) -> Option<u32> {
        match self {
            CellWeight::Known(extra) => Some(BASE_CELL_WEIGHT.saturating_add(extra)),
            CellWeight::Unmatched => None,
        }
    }
}

/// Material id → class weight, checking classes in the order
/// anode, cathode, separator, collector.
#[derive(Clone, Copy, Debug)]
pub struct WeightFunction<'a> {
    catalog: &'a LayerCatalog,
    weights: LayerWeights,
}

impl<'a> WeightFunction<'a> {
    pub fn new(catalog: &'a LayerCatalog, weights: LayerWeights) -> Self {
        Self { catalog, weights }
    }

    pub fn weight(&self, material: MaterialId) -> CellWeight {
        let classes = [
            (names::ANODE, self.weights.anode),
            (names::CATHODE, self.weights.cathode),
            (names::SEPARATOR, self.weights.separator),
            (names::COLLECTOR, self.weights.collector),
        ];
        classes
            .into_iter()
            .find(|(name, _)| self.catalog.material_contains(name, material))
            .map_or(CellWeight::Unmatched, |(_, w)| CellWeight::Known(w))
    }

    /// Partition weight of every cell, or the first cell with an unmatched
    /// material.
    pub fn cell_weights(&self, mesh: &Mesh) -> Result<Vec<u32>, CellId> {
        #[cfg(feature = "rayon")]
        let iter = mesh.cells().par_iter();
        #[cfg(not(feature = "rayon"))]
        let iter = mesh.cells().iter();
        let lookups: Vec<Option<u32>> = iter
            .map(|cell| self.weight(cell.material()).partition_weight())
            .collect();
        lookups
            .iter()
            .enumerate()
            .map(|(i, w)| w.ok_or_else(|| CellId::new(i)))
            .collect()
    }
}

/// Loads after a repartition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionSummary {
    /// Summed partition weight per rank.
    pub loads: Vec<u64>,
    /// Owned cells per rank.
    pub cells: Vec<usize>,
}

/// Reassigns cell ownership across `comm`'s ranks by weighted load.
///
/// Collective. An unmatched material on any rank's owned cells fails the call
/// on every rank with the same error.
pub fn repartition<C: Communicator>(
    mesh: &mut Mesh,
    catalog: &LayerCatalog,
    weights: LayerWeights,
    method: PartitionMethod,
    comm: &C,
) -> Result<PartitionSummary, MeshError> {
    let function = WeightFunction::new(catalog, weights);
    let rank = comm.rank();

    // smallest locally owned offender, encoded as index + 1
    let local_bad = mesh
        .filter_cells(Ownership::LocallyOwned(rank), |cell| {
            function.weight(cell.material()) == CellWeight::Unmatched
        })
        .next()
        .map_or(0, |c| c.index() as u64 + 1);
    let global_bad = comm.allreduce_max(local_bad)?;
    if global_bad > 0 {
        let cell = CellId::new((global_bad - 1) as usize);
        return Err(MeshError::UnmatchedMaterial {
            cell,
            material: mesh.cell(cell).material(),
        });
    }

    let cell_weights = function.cell_weights(mesh).map_err(|cell| MeshError::UnmatchedMaterial {
        cell,
        material: mesh.cell(cell).material(),
    })?;
    let nparts = comm.size();
    let owners = partition_cells(mesh, &cell_weights, nparts, method)?;
    mesh.set_owners(&owners)?;

    let loads = part_loads(&owners, &cell_weights, nparts);
    let mut cells = vec![0usize; nparts];
    for &owner in &owners {
        cells[owner] += 1;
    }
    info!("repartitioned {} cells over {nparts} ranks, loads {:?}", mesh.n_cells(), loads);
    debug!(
        "rank {rank} owns {} cells",
        mesh.n_locally_owned_cells(rank)
    );
    Ok(PartitionSummary { loads, cells })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::algs::meshgen::subdivided_hyper_rectangle;

    #[test]
    fn class_precedence_and_sentinel() {
        let catalog = LayerCatalog::default();
        let weights = LayerWeights {
            anode: 11,
            cathode: 22,
            separator: 33,
            collector: 44,
        };
        let f = WeightFunction::new(&catalog, weights);
        assert_eq!(f.weight(0), CellWeight::Known(11));
        assert_eq!(f.weight(1), CellWeight::Known(33));
        assert_eq!(f.weight(2), CellWeight::Known(22));
        assert_eq!(f.weight(3), CellWeight::Known(44));
        assert_eq!(f.weight(4), CellWeight::Known(44));
        assert_eq!(f.weight(200), CellWeight::Unmatched);
        assert_eq!(CellWeight::Known(11).partition_weight(), Some(1011));
        assert_eq!(CellWeight::Unmatched.partition_weight(), None);
    }

    #[test]
    fn serial_repartition_keeps_everything_on_rank_zero() {
        let mut mesh = subdivided_hyper_rectangle(&[3, 1], &[0.0, 0.0], &[3.0, 1.0], 0).unwrap();
        let summary = repartition(
            &mut mesh,
            &LayerCatalog::default(),
            LayerWeights::default(),
            PartitionMethod::Contiguous,
            &NoComm,
        )
        .unwrap();
        assert_eq!(summary.loads, vec![3000]);
        assert_eq!(summary.cells, vec![3]);
    }

    #[test]
    fn unmatched_material_fails() {
        let mut mesh = subdivided_hyper_rectangle(&[2, 1], &[0.0, 0.0], &[2.0, 1.0], 0).unwrap();
        mesh.set_material(CellId::new(1), 9);
        let err = repartition(
            &mut mesh,
            &LayerCatalog::default(),
            LayerWeights::default(),
            PartitionMethod::Contiguous,
            &NoComm,
        )
        .unwrap_err();
        assert_eq!(
            err,
            MeshError::UnmatchedMaterial {
                cell: CellId::new(1),
                material: 9
            }
        );
    }
}
