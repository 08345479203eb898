//! Assembly of the layered anode / separator / cathode / collector stack.
//!
//! Two named axes organise the stack:
//!
//! - [`MERGE_AXIS`] (axis 0) is the stacking direction. Layer thicknesses are
//!   box extents along it and the merge offset advances along it.
//! - [`alignment_axis`] (the last axis) is the vertical direction. Collectors
//!   are taller than the electrodes by the terminal tab, are stretched along
//!   it, and carry their terminal faces at its extremes.
//!
//! [`assemble_stack`] runs the whole pipeline: build one component per role,
//! align the collectors, seed the global mesh with the anode collector and
//! merge the rest in [`STACK_ORDER`].

pub mod alignment;
pub mod boundary;
pub mod component;
pub mod engine;
pub mod order;
pub mod weights;

pub use alignment::{AlignmentTransform, CollectorAlignment, ENDPOINT_TOLERANCE};
pub use boundary::{RecoveryReport, Terminal, recover_terminal, recover_terminal_boundaries};
pub use component::{Component, ComponentSpec, StackLayout};
pub use engine::{MergeStep, StackMergeEngine};
pub use order::{MERGES_PER_CYCLE, STACK_ORDER, StackComponents, StackRole};
pub use weights::{
    BASE_CELL_WEIGHT, CellWeight, LayerWeights, PartitionSummary, WeightFunction, repartition,
};

use log::info;

use crate::algs::communicator::Communicator;
use crate::algs::partition::uniform_partition;
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::topology::catalog::LayerCatalog;

/// Stacking direction.
pub const MERGE_AXIS: usize = 0;

/// Vertical direction for a mesh of `dimension` spatial dimensions.
#[inline]
pub const fn alignment_axis(dimension: usize) -> usize {
    dimension - 1
}

/// Result of [`assemble_stack`].
#[derive(Clone, Debug)]
pub struct StackAssembly {
    pub mesh: Mesh,
    /// Vertical coordinate of the anode terminal face.
    pub collector_top: f64,
    /// Vertical coordinate of the cathode terminal face.
    pub collector_bottom: f64,
    /// Cells of the seed collector.
    pub seed_cells: usize,
    pub steps: Vec<MergeStep>,
}

/// Builds, aligns and merges the stack described by `layout`.
///
/// Collective: every rank builds the same replica. Cells are then spread over
/// the ranks in equal contiguous runs along the stack; boundary ids are all
/// default until [`recover_terminal_boundaries`] runs.
pub fn assemble_stack<C: Communicator>(
    layout: &StackLayout,
    catalog: &LayerCatalog,
    comm: &C,
) -> Result<StackAssembly, MeshError> {
    layout.validate()?;
    let mut components = build_components(layout, catalog)?;
    let (collector_top, collector_bottom) = align_collectors(&mut components)?;

    let seed_cells = components.collector_anode.mesh().n_cells();
    let mut engine = StackMergeEngine::seeded(&components.collector_anode);
    engine.run(&mut components, layout.n_repetitions)?;
    let (mut mesh, steps) = engine.into_parts();

    mesh.set_owners(&uniform_partition(&mesh, comm.size()))?;
    info!(
        "assembled stack: {} merges, {} cells, {} vertices, extent {:.6e} along the stack",
        steps.len(),
        mesh.n_cells(),
        mesh.n_vertices(),
        steps.last().map_or(0.0, |s| s.offset_after)
    );
    Ok(StackAssembly {
        mesh,
        collector_top,
        collector_bottom,
        seed_cells,
        steps,
    })
}

/// One component per role, stamped with the primary material of its class.
pub fn build_components(
    layout: &StackLayout,
    catalog: &LayerCatalog,
) -> Result<StackComponents, MeshError> {
    let build = |spec: &ComponentSpec, role: StackRole| -> Result<Component, MeshError> {
        Component::build(spec, catalog.primary_material(role.material_class())?)
    };
    Ok(StackComponents {
        anode: build(&layout.anode, StackRole::Anode)?,
        separator: build(&layout.separator, StackRole::Separator)?,
        cathode: build(&layout.cathode, StackRole::Cathode)?,
        collector_cathode: build(&layout.collector_cathode, StackRole::CathodeCollector)?,
        collector_anode: build(&layout.collector_anode, StackRole::AnodeCollector)?,
    })
}

/// Stretches both collectors to the anode's rows and stores the cathode
/// collector's tab drop in its shift vector.
///
/// Returns the terminal coordinates `(collector_top, collector_bottom)`.
pub fn align_collectors(components: &mut StackComponents) -> Result<(f64, f64), MeshError> {
    let axis = alignment_axis(components.anode.mesh().dimension());
    let electrode_height = components.anode.extent(axis);

    let anode_side = CollectorAlignment::new(
        electrode_height,
        components.collector_anode.extent(axis),
        components.collector_anode.repetitions()[axis],
    )?;
    anode_side
        .scale_only()
        .align(&mut components.collector_anode, axis)?;

    let cathode_side = CollectorAlignment::new(
        electrode_height,
        components.collector_cathode.extent(axis),
        components.collector_cathode.repetitions()[axis],
    )?;
    cathode_side
        .scale_and_shift()
        .align(&mut components.collector_cathode, axis)?;
    components.collector_cathode.shift_vector[axis] = cathode_side.tab_drop();

    Ok((anode_side.collector_height, cathode_side.tab_drop()))
}
