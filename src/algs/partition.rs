//! Weighted cell partitioners.
//!
//! The default partitioner orders cells along the stack (cell centres compared
//! axis by axis, axis 0 first) and cuts the sequence into `nparts` contiguous
//! runs of roughly equal total weight. With the `metis-support` feature the
//! face dual graph can be partitioned by METIS instead.
//!
//! Both are deterministic: every rank holding the same replica and weights
//! computes the same owner vector.

use std::cmp::Ordering;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
#[cfg(feature = "metis-support")]
use crate::algs::dual_graph::build_dual;

/// Partitioning algorithm used by a repartition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionMethod {
    /// Contiguous weighted runs along the stack.
    #[default]
    Contiguous,
    /// METIS k-way over the face dual graph.
    #[cfg(feature = "metis-support")]
    Metis,
}

/// Owner rank of every cell, indexed by cell id.
pub fn partition_cells(
    mesh: &Mesh,
    weights: &[u32],
    nparts: usize,
    method: PartitionMethod,
) -> Result<Vec<usize>, MeshError> {
    if weights.len() != mesh.n_cells() {
        return Err(MeshError::InvalidGeometry(format!(
            "{} weights for {} cells",
            weights.len(),
            mesh.n_cells()
        )));
    }
    if nparts == 0 {
        return Err(MeshError::Config("cannot partition into zero parts".into()));
    }
    if nparts == 1 || mesh.is_empty() {
        return Ok(vec![0; mesh.n_cells()]);
    }
    match method {
        PartitionMethod::Contiguous => Ok(contiguous_partition(mesh, weights, nparts)),
        #[cfg(feature = "metis-support")]
        PartitionMethod::Metis => metis_partition(mesh, weights, nparts),
    }
}

/// Splits the stack-ordered cell sequence by prefix weight.
///
/// A cell whose weight midpoint sits at cumulative position `m` goes to part
/// `floor(m * nparts / total)`.
pub fn contiguous_partition(mesh: &Mesh, weights: &[u32], nparts: usize) -> Vec<usize> {
    let order = stack_order(mesh);
    let total: f64 = weights.iter().map(|&w| f64::from(w)).sum();
    let mut owners = vec![0usize; mesh.n_cells()];
    if total <= 0.0 {
        // all-zero weights: fall back to equal cell counts
        let n = order.len();
        for (pos, &c) in order.iter().enumerate() {
            owners[c] = (pos * nparts / n).min(nparts - 1);
        }
        return owners;
    }
    let mut prefix = 0.0;
    for &c in &order {
        let w = f64::from(weights[c]);
        let mid = prefix + 0.5 * w;
        owners[c] = ((mid * nparts as f64 / total).floor() as usize).min(nparts - 1);
        prefix += w;
    }
    owners
}

/// Equal cell counts per rank along the stack; the ownership used right after
/// assembly, before the weighted repartition.
pub fn uniform_partition(mesh: &Mesh, nparts: usize) -> Vec<usize> {
    if nparts <= 1 {
        return vec![0; mesh.n_cells()];
    }
    contiguous_partition(mesh, &vec![1; mesh.n_cells()], nparts)
}

/// Cell indices sorted by centre, axis 0 first, ties broken by cell id.
pub fn stack_order(mesh: &Mesh) -> Vec<usize> {
    let centres: Vec<Vec<f64>> = mesh.cell_ids().map(|c| mesh.cell_center(c)).collect();
    (0..mesh.n_cells())
        .sorted_by(|&a, &b| {
            centres[a]
                .iter()
                .zip(&centres[b])
                .map(|(x, y)| x.total_cmp(y))
                .find(|o| *o != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
                .then(a.cmp(&b))
        })
        .collect()
}

#[cfg(feature = "metis-support")]
fn metis_partition(mesh: &Mesh, weights: &[u32], nparts: usize) -> Result<Vec<usize>, MeshError> {
    use metis::{Graph, Idx};

    let dual = build_dual(mesh, weights)?;
    let to_idx = |v: usize| {
        Idx::try_from(v).map_err(|_| MeshError::InvalidGeometry("graph too large for METIS".into()))
    };
    let xadj = dual.xadj.iter().map(|&v| to_idx(v)).collect::<Result<Vec<_>, _>>()?;
    let adjncy = dual.adjncy.iter().map(|&v| to_idx(v)).collect::<Result<Vec<_>, _>>()?;
    let vwgt: Vec<Idx> = dual.vwgt.iter().map(|&w| w as Idx).collect();
    let mut part = vec![0 as Idx; dual.n_vertices()];
    let nparts_idx = to_idx(nparts)?;

    Graph::new(1, nparts_idx, &xadj, &adjncy)
        .map_err(|e| MeshError::InvalidGeometry(format!("METIS rejected the dual graph: {e}")))?
        .set_vwgt(&vwgt)
        .part_kway(&mut part)
        .map_err(|e| MeshError::InvalidGeometry(format!("METIS partitioning failed: {e}")))?;

    Ok(part.into_iter().map(|p| p as usize).collect())
}

/// Summed weight per part.
pub fn part_loads(owners: &[usize], weights: &[u32], nparts: usize) -> Vec<u64> {
    let mut loads = vec![0u64; nparts];
    for (&owner, &w) in owners.iter().zip(weights) {
        if owner < nparts {
            loads[owner] += u64::from(w);
        }
    }
    loads
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::meshgen::subdivided_hyper_rectangle;

    #[test]
    fn heavy_cells_get_their_own_part() {
        let mesh = subdivided_hyper_rectangle(&[4, 1], &[0.0, 0.0], &[4.0, 1.0], 0).unwrap();
        let weights = [3000, 1000, 1000, 1000];
        let owners = partition_cells(&mesh, &weights, 2, PartitionMethod::Contiguous).unwrap();
        assert_eq!(owners, vec![0, 1, 1, 1]);
        assert_eq!(part_loads(&owners, &weights, 2), vec![3000, 3000]);
    }

    #[test]
    fn uniform_split_follows_stack_axis() {
        let mesh = subdivided_hyper_rectangle(&[2, 3], &[0.0, 0.0], &[2.0, 3.0], 0).unwrap();
        let owners = uniform_partition(&mesh, 2);
        for c in mesh.cell_ids() {
            let expected = if mesh.cell_center(c)[0] < 1.0 { 0 } else { 1 };
            assert_eq!(owners[c.index()], expected);
        }
    }

    #[test]
    fn degenerate_requests() {
        let mesh = subdivided_hyper_rectangle(&[2, 1], &[0.0, 0.0], &[2.0, 1.0], 0).unwrap();
        assert!(partition_cells(&mesh, &[1, 1], 0, PartitionMethod::Contiguous).is_err());
        assert!(partition_cells(&mesh, &[1], 2, PartitionMethod::Contiguous).is_err());
        assert_eq!(
            partition_cells(&mesh, &[1, 1], 1, PartitionMethod::Contiguous).unwrap(),
            vec![0, 0]
        );
        assert_eq!(contiguous_partition(&mesh, &[0, 0], 2), vec![0, 1]);
    }

    #[test]
    fn more_parts_than_cells() {
        let mesh = subdivided_hyper_rectangle(&[2, 1], &[0.0, 0.0], &[2.0, 1.0], 0).unwrap();
        let owners = contiguous_partition(&mesh, &[1, 1], 4);
        assert_eq!(owners, vec![1, 3]);
    }
}
