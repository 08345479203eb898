//! Coordinate transforms that leave topology unchanged.

use crate::mesh::Mesh;
use crate::mesh_error::MeshError;

/// Applies `update` to every vertex coordinate tuple of `mesh`.
///
/// The closure may fail; the first error aborts the transform with the
/// vertices visited so far already updated.
pub fn transform_mesh<F>(mesh: &mut Mesh, mut update: F) -> Result<(), MeshError>
where
    F: FnMut(&mut [f64]) -> Result<(), MeshError>,
{
    for point in mesh.vertices_mut() {
        update(point)?;
    }
    Ok(())
}

/// Translates every vertex by `shift`.
pub fn shift_mesh(mesh: &mut Mesh, shift: &[f64]) -> Result<(), MeshError> {
    if shift.len() != mesh.dimension() {
        return Err(MeshError::InvalidGeometry(format!(
            "shift vector has dimension {}, mesh has {}",
            shift.len(),
            mesh.dimension()
        )));
    }
    transform_mesh(mesh, |point| {
        for (x, dx) in point.iter_mut().zip(shift) {
            *x += dx;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::meshgen::subdivided_hyper_rectangle;

    #[test]
    fn shift_moves_bounding_box() {
        let mut mesh = subdivided_hyper_rectangle(&[2, 2], &[0.0, 0.0], &[1.0, 1.0], 0).unwrap();
        shift_mesh(&mut mesh, &[2.0, -1.0]).unwrap();
        let (lo, hi) = mesh.bounding_box().unwrap();
        assert_eq!(lo, vec![2.0, -1.0]);
        assert_eq!(hi, vec![3.0, 0.0]);
        assert!(shift_mesh(&mut mesh, &[1.0]).is_err());
    }

    #[test]
    fn failing_transform_propagates() {
        let mut mesh = subdivided_hyper_rectangle(&[1, 1], &[0.0, 0.0], &[1.0, 1.0], 0).unwrap();
        let result = transform_mesh(&mut mesh, |p| {
            if p[0] > 0.5 {
                Err(MeshError::InvalidGeometry("out of range".into()))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
    }
}
