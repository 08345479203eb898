//! Mesh input and checkpoint archives.
//!
//! Two ASCII formats are imported, chosen by file extension: AVS UCD
//! (`.ucd`) and Abaqus input (`.inp`). Checkpoints of the coarse stack mesh
//! are compressed binary archives (see [`checkpoint`]).

pub mod abaqus;
pub mod checkpoint;
pub mod ucd;

pub use abaqus::AbaqusReader;
pub use checkpoint::{CHECKPOINT_FORMAT_VERSION, read_checkpoint, write_checkpoint};
pub use ucd::UcdReader;

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use hashbrown::HashMap;
use log::info;

use crate::mesh::{FaceKey, Mesh, face_key};
use crate::mesh_error::MeshError;
use crate::topology::point::{BoundaryId, CellId, MaterialId, VertexId};

/// Trait for readers producing a [`Mesh`] of a given spatial dimension.
pub trait MeshReader {
    fn read<R: Read>(&self, reader: R, dimension: usize) -> Result<Mesh, MeshError>;
}

/// Supported mesh file formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshFileFormat {
    Ucd,
    Abaqus,
}

impl MeshFileFormat {
    /// Format implied by the extension of `path`.
    pub fn from_path(path: &Path) -> Result<Self, MeshError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        match extension {
            "ucd" => Ok(MeshFileFormat::Ucd),
            "inp" => Ok(MeshFileFormat::Abaqus),
            other => Err(MeshError::UnsupportedMeshFile {
                path: path.to_path_buf(),
                extension: other.to_string(),
            }),
        }
    }
}

/// Reads a `.ucd` or `.inp` mesh file.
pub fn read_mesh_file(path: &Path, dimension: usize) -> Result<Mesh, MeshError> {
    let format = MeshFileFormat::from_path(path)?;
    let file = File::open(path).map_err(|e| MeshError::UnreadableMeshFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let reader = BufReader::new(file);
    let mesh = match format {
        MeshFileFormat::Ucd => UcdReader.read(reader, dimension),
        MeshFileFormat::Abaqus => AbaqusReader.read(reader, dimension),
    }
    .map_err(|e| MeshError::UnreadableMeshFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    info!(
        "read {:?} mesh {}: {} cells, {} vertices",
        format,
        path.display(),
        mesh.n_cells(),
        mesh.n_vertices()
    );
    Ok(mesh)
}

/// Boundary face listed in a mesh file, by point index.
#[derive(Clone, Debug)]
pub(crate) struct BoundaryFace {
    pub vertices: Vec<usize>,
    pub boundary_id: BoundaryId,
}

/// Builds a mesh from parsed points, lexicographically ordered cells and
/// tagged boundary faces.
pub(crate) fn assemble_imported(
    dimension: usize,
    points: &[Vec<f64>],
    cells: &[(Vec<usize>, MaterialId)],
    faces: &[BoundaryFace],
) -> Result<Mesh, MeshError> {
    let mut mesh = Mesh::new(dimension)?;
    for p in points {
        mesh.add_vertex(p)?;
    }
    for (vertices, material) in cells {
        mesh.add_cell(vertices.iter().map(|&v| VertexId::new(v)).collect(), *material)?;
    }
    if faces.is_empty() {
        return Ok(mesh);
    }

    let topology = mesh.face_topology();
    let mut boundary: HashMap<FaceKey, (usize, usize)> = HashMap::new();
    for c in mesh.cell_ids() {
        for face in topology.boundary_faces(c) {
            boundary.insert(face_key(&mesh, c, face), (c.index(), face));
        }
    }
    for listed in faces {
        let mut key: FaceKey = listed.vertices.iter().map(|&v| VertexId::new(v)).collect();
        key.sort_unstable();
        let &(cell, face) = boundary.get(&key).ok_or_else(|| {
            MeshError::MeshIoParse(format!(
                "boundary face {:?} matches no boundary face of the mesh",
                listed.vertices
            ))
        })?;
        mesh.set_boundary_id(CellId::new(cell), face, listed.boundary_id);
    }
    Ok(mesh)
}
