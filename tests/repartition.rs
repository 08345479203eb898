use proptest::prelude::*;
use serial_test::serial;

use stack_mesh::algs::communicator::{NoComm, run_on_local_ranks};
use stack_mesh::algs::partition::PartitionMethod;
use stack_mesh::mesh_error::MeshError;
use stack_mesh::stack::{
    BASE_CELL_WEIGHT, CellWeight, ComponentSpec, LayerWeights, StackLayout, WeightFunction,
    assemble_stack, repartition,
};
use stack_mesh::topology::catalog::LayerCatalog;
use stack_mesh::topology::point::CellId;

fn layout() -> StackLayout {
    let spec = |x: f64, h: f64, r: [usize; 2]| ComponentSpec::from_extent(&[x, h], &r);
    StackLayout {
        anode: spec(50e-6, 1e-3, [4, 5]),
        separator: spec(25e-6, 1e-3, [2, 5]),
        cathode: spec(50e-6, 1e-3, [4, 5]),
        collector_anode: spec(20e-6, 1.25e-3, [1, 6]),
        collector_cathode: spec(20e-6, 1.25e-3, [1, 6]),
        n_repetitions: 1,
    }
}

const WEIGHTS: LayerWeights = LayerWeights {
    anode: 1000,
    cathode: 1000,
    separator: 0,
    collector: 0,
};

#[test]
fn unregistered_material_is_unmatched() {
    let catalog = LayerCatalog::default();
    let f = WeightFunction::new(&catalog, WEIGHTS);
    assert_eq!(f.weight(0), CellWeight::Known(1000));
    assert_eq!(f.weight(3), CellWeight::Known(0));
    assert_eq!(f.weight(42), CellWeight::Unmatched);
    assert_eq!(f.weight(42).partition_weight(), None);
    assert_eq!(f.weight(1).partition_weight(), Some(BASE_CELL_WEIGHT));
}

proptest! {
    #[test]
    fn weights_are_deterministic(material in 0u8..16, extra in 0u32..5000) {
        let catalog = LayerCatalog::default();
        let weights = LayerWeights { anode: extra, cathode: extra, separator: extra, collector: extra };
        let a = WeightFunction::new(&catalog, weights).weight(material);
        let b = WeightFunction::new(&catalog, weights).weight(material);
        prop_assert_eq!(a, b);
        if material <= 4 {
            prop_assert_eq!(a, CellWeight::Known(extra));
        } else {
            prop_assert_eq!(a, CellWeight::Unmatched);
        }
    }
}

#[test]
fn serial_repartition_covers_the_mesh() {
    let catalog = LayerCatalog::default();
    let mut mesh = assemble_stack(&layout(), &catalog, &NoComm).unwrap().mesh;
    let summary = repartition(&mut mesh, &catalog, WEIGHTS, PartitionMethod::Contiguous, &NoComm)
        .unwrap();
    // 40 electrode cells per cycle at double weight
    let electrode = 2 * (20 + 20) as u64;
    let other = (mesh.n_cells() as u64) - electrode;
    assert_eq!(summary.loads, vec![electrode * 2000 + other * 1000]);
    assert_eq!(mesh.n_locally_owned_cells(0), mesh.n_cells());
}

#[test]
#[serial]
fn ranks_agree_on_a_balanced_partition() {
    let nparts = 3;
    let results = run_on_local_ranks(nparts, |comm| {
        let catalog = LayerCatalog::default();
        let mut mesh = assemble_stack(&layout(), &catalog, &comm).unwrap().mesh;
        let summary =
            repartition(&mut mesh, &catalog, WEIGHTS, PartitionMethod::Contiguous, &comm).unwrap();
        let owners: Vec<usize> = mesh.cells().iter().map(|c| c.owner()).collect();
        (summary, owners)
    });

    let (summary, owners) = &results[0];
    for (other_summary, other_owners) in &results[1..] {
        assert_eq!(other_summary, summary);
        assert_eq!(other_owners, owners);
    }

    let total: u64 = summary.loads.iter().sum();
    let target = total / nparts as u64;
    for (rank, &load) in summary.loads.iter().enumerate() {
        assert!(summary.cells[rank] > 0);
        assert!(
            load.abs_diff(target) <= 2000,
            "rank {rank} load {load} is far from {target}"
        );
    }
}

#[test]
#[serial]
fn unmatched_material_fails_identically_everywhere() {
    let results = run_on_local_ranks(3, |comm| {
        let catalog = LayerCatalog::default();
        let mut mesh = assemble_stack(&layout(), &catalog, &comm).unwrap().mesh;
        let last = CellId::new(mesh.n_cells() - 1);
        mesh.set_material(last, 9);
        (
            mesh.owner(last),
            repartition(&mut mesh, &catalog, WEIGHTS, PartitionMethod::Contiguous, &comm),
        )
    });
    for (owner, result) in results {
        // only the last rank sees the offending cell among its own
        assert_eq!(owner, 2);
        assert_eq!(
            result,
            Err(MeshError::UnmatchedMaterial {
                cell: CellId::new(117),
                material: 9
            })
        );
    }
}
