//! Compressed checkpoint of the coarse stack mesh.
//!
//! The archive is a zlib stream holding a bincode-encoded format version
//! followed by the mesh (vertices, cells, materials, boundary ids, owners)
//! and the layer catalog. Archives are tied to the bincode encoding of this
//! crate's types; they are not meant to move between builds with different
//! type layouts.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::algs::communicator::{Communicator, ROOT_RANK};
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::catalog::LayerCatalog;

/// Version written at the head of every archive.
pub const CHECKPOINT_FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct ArchiveRef<'a> {
    mesh: &'a Mesh,
    catalog: &'a LayerCatalog,
}

#[derive(Deserialize)]
struct Archive {
    mesh: Mesh,
    catalog: LayerCatalog,
}

/// Encodes `mesh` and `catalog` into `writer`.
pub fn encode_checkpoint<W: Write>(
    writer: W,
    mesh: &Mesh,
    catalog: &LayerCatalog,
) -> Result<W, MeshError> {
    let mut encoder = ZlibEncoder::new(writer, Compression::default());
    bincode::serialize_into(&mut encoder, &CHECKPOINT_FORMAT_VERSION)?;
    bincode::serialize_into(&mut encoder, &ArchiveRef { mesh, catalog })?;
    Ok(encoder.finish()?)
}

/// Decodes an archive produced by [`encode_checkpoint`].
pub fn decode_checkpoint<R: Read>(reader: R) -> Result<(Mesh, LayerCatalog), MeshError> {
    let mut decoder = ZlibDecoder::new(reader);
    let version: u32 = bincode::deserialize_from(&mut decoder)?;
    if version != CHECKPOINT_FORMAT_VERSION {
        return Err(MeshError::CheckpointVersion {
            expected: CHECKPOINT_FORMAT_VERSION,
            found: version,
        });
    }
    let archive: Archive = bincode::deserialize_from(&mut decoder)?;
    archive.mesh.validate()?;
    Ok((archive.mesh, archive.catalog))
}

/// Writes the checkpoint on rank 0. Collective.
///
/// Other ranks only take part in the failure reduction and the closing
/// barrier; a failed write fails the call on every rank.
pub fn write_checkpoint<C: Communicator>(
    path: &Path,
    mesh: &Mesh,
    catalog: &LayerCatalog,
    comm: &C,
) -> Result<(), MeshError> {
    let outcome = if comm.rank() == ROOT_RANK {
        write_archive(path, mesh, catalog)
    } else {
        Ok(())
    };
    if let Err(e) = &outcome {
        warn!("checkpoint {} not written: {e}", path.display());
    }
    let failed = comm.allreduce_max(u64::from(outcome.is_err()))?;
    comm.barrier()?;
    match outcome {
        Err(e) => Err(e),
        Ok(()) if failed > 0 => Err(MeshError::CollectiveFailure("write_checkpoint")),
        Ok(()) => Ok(()),
    }
}

fn write_archive(path: &Path, mesh: &Mesh, catalog: &LayerCatalog) -> Result<(), MeshError> {
    let file = File::create(path)?;
    let mut writer = encode_checkpoint(BufWriter::new(file), mesh, catalog)?;
    writer.flush()?;
    info!(
        "wrote coarse mesh checkpoint {} ({} cells)",
        path.display(),
        mesh.n_cells()
    );
    Ok(())
}

/// Reads a checkpoint archive. Every rank reads the same file.
pub fn read_checkpoint(path: &Path) -> Result<(Mesh, LayerCatalog), MeshError> {
    let file = File::open(path).map_err(|e| MeshError::UnreadableMeshFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let (mesh, catalog) = decode_checkpoint(BufReader::new(file))?;
    info!(
        "restored coarse mesh {}: {} cells, {} materials",
        path.display(),
        mesh.n_cells(),
        catalog.materials().len()
    );
    Ok((mesh, catalog))
}
