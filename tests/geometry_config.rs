use std::path::PathBuf;

use serial_test::serial;

use stack_mesh::algs::communicator::{NoComm, run_on_local_ranks};
use stack_mesh::config::{GeometryConfig, MeshSource};
use stack_mesh::geometry::Geometry;
use stack_mesh::mesh::Mesh;
use stack_mesh::mesh_error::MeshError;
use stack_mesh::stack::LayerWeights;
use stack_mesh::topology::point::BoundaryId;

const GEOMETRY: &str = r#"
[geometry]
anode_collector_thickness = 5.0e-4
anode_electrode_thickness = 50.0e-4
separator_thickness = 25.0e-4
cathode_electrode_thickness = 50.0e-4
cathode_collector_thickness = 5.0e-4
geometric_area = 25.0e-2
tab_height = 5.0e-4
"#;

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("stack-mesh-{}-{name}", std::process::id()))
}

fn faces_tagged(mesh: &Mesh, id: BoundaryId) -> usize {
    mesh.cells()
        .iter()
        .flat_map(|cell| cell.boundary_ids())
        .filter(|&&b| b == id)
        .count()
}

fn supercapacitor() -> GeometryConfig {
    GeometryConfig::from_toml_str(&format!("type = \"supercapacitor\"\n{GEOMETRY}")).unwrap()
}

#[test]
fn supercapacitor_pipeline() {
    let geometry = Geometry::new(&supercapacitor(), NoComm).unwrap();
    // 6 + 50 + 25 + 50 + 6 coarse cells, refined once
    assert_eq!(geometry.mesh().n_cells(), 137 * 4);
    assert_eq!(geometry.merge_steps().len(), 4);
    let report = geometry.recovery().unwrap();
    assert_eq!((report.anode_faces, report.cathode_faces), (1, 1));
    // each terminal face is split in two by the refinement
    assert_eq!(faces_tagged(geometry.mesh(), 1), 2);
    assert_eq!(faces_tagged(geometry.mesh(), 2), 2);
    assert_eq!(geometry.last_partition().unwrap().loads, vec![137 * 4 * 1000]);
    assert_eq!(geometry.materials().len(), 6);
    assert_eq!(geometry.boundaries().len(), 2);
}

#[test]
fn generate_pipeline_in_three_dimensions() {
    let text = r#"
        type = "generate"
        dimension = 3
        n_repetitions = 1

        [geometry]
        anode_collector_thickness = 5.0e-4
        anode_electrode_thickness = 50.0e-4
        separator_thickness = 25.0e-4
        cathode_electrode_thickness = 50.0e-4
        cathode_collector_thickness = 5.0e-4
        geometric_area = 1.0e-2
        tab_height = 2.0e-2

        [divisions]
        collector = [3, 4, 3]
        anode = [5, 4, 2]
        separator = [4, 4, 2]
        cathode = [5, 4, 2]

        [weights]
        anode = 500
        cathode = 500
    "#;
    let config = GeometryConfig::from_toml_str(text).unwrap();
    assert_eq!(config.source, MeshSource::Generate);
    assert_eq!(config.refinements(), 0);

    let geometry = Geometry::new(&config, NoComm).unwrap();
    let mesh = geometry.mesh();
    assert_eq!(mesh.dimension(), 3);
    assert_eq!(mesh.n_cells(), 36 + 40 + 32 + 40 + 36 + 40 + 32 + 40 + 36);
    assert_eq!(mesh.face_topology().n_overfull_faces(), 0);
    // two anode collectors and one cathode collector, 3 x 4 top faces each
    let report = geometry.recovery().unwrap();
    assert_eq!((report.anode_faces, report.cathode_faces), (24, 12));
    let electrode_cells = 4 * 40;
    let expected = electrode_cells * 1500 + (mesh.n_cells() as u64 - electrode_cells) * 1000;
    assert_eq!(geometry.last_partition().unwrap().loads, vec![expected]);
}

#[test]
fn checkpoint_then_restart() {
    let path = scratch("geometry.ckpt");
    let mut config = supercapacitor();
    config.checkpoint.enabled = true;
    config.checkpoint.coarse_mesh_filename = Some(path.clone());
    let first = Geometry::new(&config, NoComm).unwrap();

    let restart = GeometryConfig::from_json_str(&format!(
        r#"{{ "type": "restart", "n_refinements": 1, "checkpoint": {{ "coarse_mesh_filename": {:?} }} }}"#,
        path.display().to_string()
    ))
    .unwrap();
    let second = Geometry::new(&restart, NoComm).unwrap();
    std::fs::remove_file(&path).unwrap();

    assert_eq!(second.mesh(), first.mesh());
    assert_eq!(second.catalog(), first.catalog());
    assert!(second.merge_steps().is_empty());
    assert!(second.recovery().is_none());
}

#[test]
fn restart_with_wrong_dimension_is_rejected() {
    let path = scratch("dim.ckpt");
    let mut config = supercapacitor();
    config.checkpoint.enabled = true;
    config.checkpoint.coarse_mesh_filename = Some(path.clone());
    Geometry::new(&config, NoComm).unwrap();

    let mut restart = config.clone();
    restart.source = MeshSource::Restart;
    restart.dimension = 3;
    let err = Geometry::new(&restart, NoComm).unwrap_err();
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(err, MeshError::Config(_)));
}

#[test]
#[serial]
fn distributed_geometry_is_replicated() {
    let results = run_on_local_ranks(2, |comm| {
        let mut geometry = Geometry::new(&supercapacitor(), comm).unwrap();
        let uniform = geometry.last_partition().unwrap().clone();
        let weighted = geometry
            .repartition(LayerWeights {
                anode: 3000,
                ..LayerWeights::default()
            })
            .unwrap()
            .clone();
        (uniform, weighted, geometry.into_mesh())
    });
    let (uniform, weighted, mesh) = &results[0];
    assert_eq!(uniform.cells.iter().sum::<usize>(), 548);
    assert_ne!(uniform.cells, weighted.cells);
    let (uniform_1, weighted_1, mesh_1) = &results[1];
    assert_eq!(uniform_1, uniform);
    assert_eq!(weighted_1, weighted);
    assert_eq!(mesh_1, mesh);
}

#[test]
fn unsupported_config_extension() {
    let path = scratch("geometry.yaml");
    std::fs::write(&path, "type: supercapacitor\n").unwrap();
    let err = GeometryConfig::from_path(&path).unwrap_err();
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(err, MeshError::Config(_)));
}

#[test]
fn config_file_round_trip() {
    let path = scratch("geometry.json");
    let config = supercapacitor();
    std::fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).unwrap();
    let loaded = GeometryConfig::from_path(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, config);
}
