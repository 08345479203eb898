//! Uniform global refinement of tensor-product cells.
//!
//! Every cell is split into `2^dim` children through its `3^dim` lattice of
//! corner, edge, face and centre points. New points are keyed by the sorted
//! parent vertices they average, so a midpoint shared by neighbouring cells is
//! created once and the refined mesh stays conforming.

use hashbrown::HashMap;
use log::info;

use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::point::{DEFAULT_BOUNDARY_ID, VertexId};

/// Refines every cell of `mesh` `n_refinements` times.
///
/// Children inherit material and owner. A child face lying on a parent face
/// inherits its boundary id; faces interior to the parent get the default id.
pub fn refine_global(mesh: &mut Mesh, n_refinements: usize) -> Result<(), MeshError> {
    for _ in 0..n_refinements {
        *mesh = refine_once(mesh)?;
    }
    if n_refinements > 0 {
        info!(
            "refined {} times: {} cells, {} vertices",
            n_refinements,
            mesh.n_cells(),
            mesh.n_vertices()
        );
    }
    Ok(())
}

fn refine_once(coarse: &Mesh) -> Result<Mesh, MeshError> {
    let dim = coarse.dimension();
    let kind = coarse.cell_type();
    let corners = kind.vertices_per_cell();
    let lattice_size = 3usize.pow(dim as u32);

    let mut fine = Mesh::new(dim)?;
    for p in coarse.vertices() {
        fine.add_vertex(p)?;
    }
    let mut midpoints: HashMap<Vec<VertexId>, VertexId> = HashMap::new();

    for cell in coarse.cells() {
        let parents = cell.vertices();

        let mut lattice = Vec::with_capacity(lattice_size);
        for code in 0..lattice_size {
            let t = lattice_coords(code, dim);
            let mut key: Vec<VertexId> = (0..corners)
                .filter(|&v| {
                    (0..dim).all(|a| {
                        let bit = (v >> a) & 1;
                        t[a] == 1 || t[a] == 2 * bit
                    })
                })
                .map(|v| parents[v])
                .collect();
            if key.len() == 1 {
                lattice.push(key[0]);
                continue;
            }
            key.sort_unstable();
            let id = match midpoints.get(&key) {
                Some(&id) => id,
                None => {
                    let mut point = vec![0.0; dim];
                    for &v in &key {
                        for (x, y) in point.iter_mut().zip(coarse.vertex(v)) {
                            *x += y;
                        }
                    }
                    for x in &mut point {
                        *x /= key.len() as f64;
                    }
                    let id = fine.add_vertex(&point)?;
                    midpoints.insert(key, id);
                    id
                }
            };
            lattice.push(id);
        }

        for child in 0..corners {
            let vertices = (0..corners)
                .map(|v| {
                    let code: usize = (0..dim)
                        .map(|a| (((child >> a) & 1) + ((v >> a) & 1)) * 3usize.pow(a as u32))
                        .sum();
                    lattice[code]
                })
                .collect();
            let boundary_ids = (0..kind.faces_per_cell())
                .map(|face| {
                    let axis = face / 2;
                    let side = face % 2;
                    if (child >> axis) & 1 == side {
                        cell.boundary_ids()[face]
                    } else {
                        DEFAULT_BOUNDARY_ID
                    }
                })
                .collect();
            fine.push_raw_cell(vertices, cell.material(), boundary_ids, cell.owner());
        }
    }
    Ok(fine)
}

fn lattice_coords(mut code: usize, dim: usize) -> Vec<usize> {
    let mut t = Vec::with_capacity(dim);
    for _ in 0..dim {
        t.push(code % 3);
        code /= 3;
    }
    t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::meshgen::subdivided_hyper_rectangle;
    use crate::topology::point::CellId;
    use approx::assert_relative_eq;

    #[test]
    fn quad_refinement_matches_finer_grid() {
        let mut mesh = subdivided_hyper_rectangle(&[2, 1], &[0.0, 0.0], &[2.0, 1.0], 3).unwrap();
        refine_global(&mut mesh, 1).unwrap();
        assert_eq!(mesh.n_cells(), 8);
        assert_eq!(mesh.n_vertices(), 5 * 3);
        assert_eq!(mesh.face_topology().n_overfull_faces(), 0);
        assert!(mesh.cells().iter().all(|c| c.material() == 3));
        let area: f64 = mesh.cell_ids().map(|c| mesh.measure(c)).sum();
        assert_relative_eq!(area, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn hex_refinement_twice() {
        let mut mesh =
            subdivided_hyper_rectangle(&[1, 1, 1], &[0.0; 3], &[1.0, 1.0, 1.0], 0).unwrap();
        refine_global(&mut mesh, 2).unwrap();
        assert_eq!(mesh.n_cells(), 64);
        assert_eq!(mesh.n_vertices(), 125);
        assert_relative_eq!(mesh.min_edge_length().unwrap(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn boundary_ids_follow_parent_faces() {
        let mut mesh = subdivided_hyper_rectangle(&[1, 1], &[0.0, 0.0], &[1.0, 1.0], 0).unwrap();
        mesh.set_boundary_id(CellId::new(0), 3, 7);
        mesh.set_owners(&[2]).unwrap();
        refine_global(&mut mesh, 1).unwrap();
        let tagged: usize = mesh
            .cells()
            .iter()
            .map(|c| c.boundary_ids().iter().filter(|&&id| id == 7).count())
            .sum();
        assert_eq!(tagged, 2);
        for c in mesh.cell_ids() {
            if mesh.boundary_id(c, 3) == 7 {
                assert_relative_eq!(mesh.face_center(c, 3)[1], 1.0);
            }
        }
        assert!(mesh.cells().iter().all(|c| c.owner() == 2));
    }

    #[test]
    fn zero_refinements_is_identity() {
        let mut mesh = subdivided_hyper_rectangle(&[2, 2], &[0.0, 0.0], &[1.0, 1.0], 0).unwrap();
        let before = mesh.clone();
        refine_global(&mut mesh, 0).unwrap();
        assert_eq!(mesh, before);
    }
}
