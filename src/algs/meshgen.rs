//! Structured box generator for one slab of the stack.

use log::debug;

use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::point::{MaterialId, VertexId};

fn invalid_geometry(message: impl Into<String>) -> MeshError {
    MeshError::InvalidGeometry(message.into())
}

/// Subdivides the axis-aligned box `[origin, corner]` into a regular grid of
/// `repetitions[a]` cells along each axis `a`, every cell tagged `material`.
///
/// Vertices are numbered with axis 0 running fastest, so vertex `(i, j[, k])`
/// has id `i + (nx + 1) * (j + (ny + 1) * k)`.
pub fn subdivided_hyper_rectangle(
    repetitions: &[usize],
    origin: &[f64],
    corner: &[f64],
    material: MaterialId,
) -> Result<Mesh, MeshError> {
    let dimension = origin.len();
    if corner.len() != dimension {
        return Err(invalid_geometry(format!(
            "box corners have dimensions {} and {}",
            dimension,
            corner.len()
        )));
    }
    if repetitions.len() != dimension {
        return Err(invalid_geometry(format!(
            "{} repetition counts given for a {dimension}D box",
            repetitions.len()
        )));
    }
    if let Some(axis) = repetitions.iter().position(|&n| n == 0) {
        return Err(invalid_geometry(format!(
            "repetition count along axis {axis} must be positive"
        )));
    }
    if let Some(axis) = (0..dimension).find(|&a| !(corner[a] > origin[a])) {
        return Err(invalid_geometry(format!(
            "box extent along axis {axis} is not positive ({} .. {})",
            origin[axis], corner[axis]
        )));
    }

    let mut mesh = Mesh::new(dimension)?;
    let points_per_axis: Vec<usize> = repetitions.iter().map(|n| n + 1).collect();
    let step: Vec<f64> = (0..dimension)
        .map(|a| (corner[a] - origin[a]) / repetitions[a] as f64)
        .collect();

    let n_points: usize = points_per_axis.iter().product();
    let mut index = vec![0usize; dimension];
    let mut point = vec![0.0; dimension];
    for _ in 0..n_points {
        for a in 0..dimension {
            // the last layer lands exactly on the corner
            point[a] = if index[a] == repetitions[a] {
                corner[a]
            } else {
                origin[a] + step[a] * index[a] as f64
            };
        }
        mesh.add_vertex(&point)?;
        advance(&mut index, &points_per_axis);
    }

    let mut strides = vec![1usize; dimension];
    for a in 1..dimension {
        strides[a] = strides[a - 1] * points_per_axis[a - 1];
    }
    let n_cells: usize = repetitions.iter().product();
    let corners = 1usize << dimension;
    let mut cell_index = vec![0usize; dimension];
    for _ in 0..n_cells {
        let base: usize = cell_index.iter().zip(&strides).map(|(i, s)| i * s).sum();
        let vertices = (0..corners)
            .map(|local| {
                let offset: usize = (0..dimension)
                    .filter(|a| (local >> a) & 1 == 1)
                    .map(|a| strides[a])
                    .sum();
                VertexId::new(base + offset)
            })
            .collect();
        mesh.add_cell(vertices, material)?;
        advance(&mut cell_index, repetitions);
    }

    debug!(
        "structured box {:?}..{:?} with {:?} subdivisions: {} cells, material {}",
        origin,
        corner,
        repetitions,
        mesh.n_cells(),
        material
    );
    Ok(mesh)
}

// odometer increment, axis 0 fastest
fn advance(index: &mut [usize], extents: &[usize]) {
    for (i, &n) in index.iter_mut().zip(extents) {
        *i += 1;
        if *i < n {
            return;
        }
        *i = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::point::CellId;
    use approx::assert_relative_eq;

    #[test]
    fn quad_grid_counts_and_order() {
        let mesh = subdivided_hyper_rectangle(&[3, 2], &[0.0, 0.0], &[3.0, 1.0], 5).unwrap();
        assert_eq!(mesh.n_vertices(), 12);
        assert_eq!(mesh.n_cells(), 6);
        assert!(mesh.cells().iter().all(|c| c.material() == 5));
        let first = mesh.cell(CellId::new(0));
        let ids: Vec<usize> = first.vertices().iter().map(|v| v.index()).collect();
        assert_eq!(ids, vec![0, 1, 4, 5]);
        assert_relative_eq!(mesh.measure(CellId::new(0)), 0.5);
    }

    #[test]
    fn hex_grid_volume_sums_to_box() {
        let mesh =
            subdivided_hyper_rectangle(&[2, 3, 1], &[0.0, 0.0, 0.0], &[1.0, 3.0, 0.5], 0).unwrap();
        assert_eq!(mesh.n_cells(), 6);
        assert_eq!(mesh.n_vertices(), 3 * 4 * 2);
        let total: f64 = mesh.cell_ids().map(|c| mesh.measure(c)).sum();
        assert_relative_eq!(total, 1.5, epsilon = 1e-12);
        let (lo, hi) = mesh.bounding_box().unwrap();
        assert_eq!(lo, vec![0.0, 0.0, 0.0]);
        assert_eq!(hi, vec![1.0, 3.0, 0.5]);
    }

    #[test]
    fn far_face_is_exact() {
        let mesh = subdivided_hyper_rectangle(&[7, 1], &[0.1, 0.0], &[0.3, 1.0], 0).unwrap();
        assert!(mesh.vertices().any(|p| p[0] == 0.3));
    }

    #[test]
    fn rejects_bad_repetitions() {
        assert!(matches!(
            subdivided_hyper_rectangle(&[1], &[0.0, 0.0], &[1.0, 1.0], 0),
            Err(MeshError::InvalidGeometry(_))
        ));
        assert!(subdivided_hyper_rectangle(&[0, 1], &[0.0, 0.0], &[1.0, 1.0], 0).is_err());
        assert!(subdivided_hyper_rectangle(&[1, 1], &[0.0, 0.0], &[1.0, 0.0], 0).is_err());
        assert!(subdivided_hyper_rectangle(&[1, 1], &[0.0, 0.0], &[1.0], 0).is_err());
    }
}
