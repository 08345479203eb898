//! Geometry facade: owns the global mesh, its layer catalog and the
//! communicator, and runs the pipeline selected by a [`GeometryConfig`].

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use log::info;

use crate::algs::communicator::Communicator;
use crate::algs::partition::PartitionMethod;
use crate::algs::refine;
use crate::config::{GeometryConfig, MeshSource};
use crate::io::{read_checkpoint, read_mesh_file, write_checkpoint};
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::stack::{
    LayerWeights, MergeStep, PartitionSummary, RecoveryReport, assemble_stack,
    recover_terminal_boundaries, repartition,
};
use crate::topology::catalog::LayerCatalog;
use crate::topology::point::{BoundaryId, MaterialId};

/// The distributed stack geometry of one simulation.
#[derive(Debug)]
pub struct Geometry<C: Communicator> {
    mesh: Mesh,
    catalog: Arc<LayerCatalog>,
    comm: C,
    partition_method: PartitionMethod,
    merge_steps: Vec<MergeStep>,
    recovery: Option<RecoveryReport>,
    last_partition: Option<PartitionSummary>,
}

impl<C: Communicator> Geometry<C> {
    /// Builds the geometry described by `config`. Collective.
    pub fn new(config: &GeometryConfig, comm: C) -> Result<Self, MeshError> {
        info!(
            "building {}D geometry from {:?} source on {} rank(s)",
            config.dimension,
            config.source,
            comm.size()
        );
        let mut geometry = match config.source {
            MeshSource::Supercapacitor | MeshSource::Generate => Self::assembled(config, comm)?,
            MeshSource::File => Self::imported(config, comm)?,
            MeshSource::Restart => Self::restarted(config, comm)?,
        };
        geometry.refine_global(config.refinements())?;
        geometry.repartition(config.weights)?;
        Ok(geometry)
    }

    fn assembled(config: &GeometryConfig, comm: C) -> Result<Self, MeshError> {
        let catalog = config.layer_catalog()?;
        let layout = config.stack_layout()?;
        let mut assembly = assemble_stack(&layout, &catalog, &comm)?;
        let recovery = recover_terminal_boundaries(
            &mut assembly.mesh,
            &catalog,
            assembly.collector_top,
            assembly.collector_bottom,
            &comm,
        )?;
        if let Some(path) = config.checkpoint_path()? {
            write_checkpoint(path, &assembly.mesh, &catalog, &comm)?;
        }
        let mut geometry = Self::from_mesh(Arc::new(catalog), assembly.mesh, comm);
        geometry.partition_method = config.partition_method;
        geometry.merge_steps = assembly.steps;
        geometry.recovery = Some(recovery);
        Ok(geometry)
    }

    fn imported(config: &GeometryConfig, comm: C) -> Result<Self, MeshError> {
        let catalog = config.layer_catalog()?;
        let mesh = read_mesh_file(config.mesh_file()?, config.dimension)?;
        if let Some(path) = config.checkpoint_path()? {
            write_checkpoint(path, &mesh, &catalog, &comm)?;
        }
        let mut geometry = Self::from_mesh(Arc::new(catalog), mesh, comm);
        geometry.partition_method = config.partition_method;
        Ok(geometry)
    }

    fn restarted(config: &GeometryConfig, comm: C) -> Result<Self, MeshError> {
        let (mesh, catalog) = read_checkpoint(config.coarse_mesh_filename()?)?;
        if mesh.dimension() != config.dimension {
            return Err(MeshError::Config(format!(
                "checkpoint holds a {}D mesh, configuration asks for {}D",
                mesh.dimension(),
                config.dimension
            )));
        }
        let mut geometry = Self::from_mesh(Arc::new(catalog), mesh, comm);
        geometry.partition_method = config.partition_method;
        Ok(geometry)
    }

    /// Wraps an already built mesh.
    pub fn from_mesh(catalog: Arc<LayerCatalog>, mesh: Mesh, comm: C) -> Self {
        Self {
            mesh,
            catalog,
            comm,
            partition_method: PartitionMethod::default(),
            merge_steps: Vec::new(),
            recovery: None,
            last_partition: None,
        }
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn catalog(&self) -> &Arc<LayerCatalog> {
        &self.catalog
    }

    pub fn materials(&self) -> &BTreeMap<String, BTreeSet<MaterialId>> {
        self.catalog.materials()
    }

    pub fn boundaries(&self) -> &BTreeMap<String, BTreeSet<BoundaryId>> {
        self.catalog.boundaries()
    }

    pub fn communicator(&self) -> &C {
        &self.comm
    }

    /// Merge steps of the stack assembly; empty for imported and restored
    /// meshes.
    pub fn merge_steps(&self) -> &[MergeStep] {
        &self.merge_steps
    }

    pub fn recovery(&self) -> Option<&RecoveryReport> {
        self.recovery.as_ref()
    }

    pub fn last_partition(&self) -> Option<&PartitionSummary> {
        self.last_partition.as_ref()
    }

    pub fn set_partition_method(&mut self, method: PartitionMethod) {
        self.partition_method = method;
    }

    /// Weighted repartition across the communicator's ranks. Collective.
    pub fn repartition(&mut self, weights: LayerWeights) -> Result<&PartitionSummary, MeshError> {
        let summary = repartition(
            &mut self.mesh,
            &self.catalog,
            weights,
            self.partition_method,
            &self.comm,
        )?;
        Ok(self.last_partition.insert(summary))
    }

    /// Refines every cell `n` times. Ownership is inherited by the children
    /// until the next repartition.
    pub fn refine_global(&mut self, n: usize) -> Result<(), MeshError> {
        refine::refine_global(&mut self.mesh, n)
    }

    /// Writes the current mesh and catalog as a checkpoint. Collective.
    pub fn output_coarse_mesh(&self, path: &Path) -> Result<(), MeshError> {
        write_checkpoint(path, &self.mesh, &self.catalog, &self.comm)
    }

    pub fn into_mesh(self) -> Mesh {
        self.mesh
    }
}
