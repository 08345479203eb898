//! Geometry configuration.
//!
//! A [`GeometryConfig`] is read from TOML or JSON and selects where the mesh
//! comes from:
//!
//! ```toml
//! type = "supercapacitor"      # or "generate", "file", "restart"
//! dimension = 2
//!
//! [geometry]                   # centimetres, area in cm^2
//! anode_collector_thickness = 5.0e-4
//! anode_electrode_thickness = 50.0e-4
//! separator_thickness = 25.0e-4
//! cathode_electrode_thickness = 50.0e-4
//! cathode_collector_thickness = 5.0e-4
//! geometric_area = 25.0e-2
//! tab_height = 5.0e-4
//!
//! [weights]
//! anode = 500
//! cathode = 500
//!
//! [checkpoint]
//! enabled = true
//! coarse_mesh_filename = "coarse.mesh"
//! ```
//!
//! `generate` additionally needs a `[divisions]` table (`collector`, `anode`,
//! `separator`, `cathode`, one count per axis); `file` needs `mesh_file` and
//! a `[catalog]` with `materials` and `boundaries` lists of `{ name, ids }`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::algs::partition::PartitionMethod;
use crate::mesh_error::MeshError;
use crate::stack::{ComponentSpec, LayerWeights, StackLayout};
use crate::topology::catalog::LayerCatalog;
use crate::topology::point::{BoundaryId, MaterialId};

/// Centimetres to metres.
pub const CM_TO_M: f64 = 1e-2;
/// Square centimetres to square metres.
pub const CM2_TO_M2: f64 = 1e-4;

/// Where the mesh comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeshSource {
    /// Stack assembly with built-in subdivisions.
    Supercapacitor,
    /// Stack assembly with user subdivisions.
    Generate,
    /// Import a `.ucd` or `.inp` file.
    File,
    /// Reload a coarse-mesh checkpoint.
    Restart,
}

/// Layer sizes in centimetres (area in cm²).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerGeometry {
    pub anode_collector_thickness: f64,
    pub anode_electrode_thickness: f64,
    pub separator_thickness: f64,
    pub cathode_electrode_thickness: f64,
    pub cathode_collector_thickness: f64,
    pub geometric_area: f64,
    pub tab_height: f64,
}

/// Box extents of each layer kind, in metres.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerExtents {
    pub collector: Vec<f64>,
    pub anode: Vec<f64>,
    pub separator: Vec<f64>,
    pub cathode: Vec<f64>,
}

impl LayerGeometry {
    /// Converts to SI box extents for a `dimension`-dimensional stack.
    ///
    /// In 2D the area is used as the electrode height; in 3D its square root
    /// is used for both cross-section sides. Collectors are taller by the tab.
    pub fn extents(&self, dimension: usize) -> Result<LayerExtents, MeshError> {
        let lengths = [
            ("anode_collector_thickness", self.anode_collector_thickness),
            ("anode_electrode_thickness", self.anode_electrode_thickness),
            ("separator_thickness", self.separator_thickness),
            ("cathode_electrode_thickness", self.cathode_electrode_thickness),
            ("cathode_collector_thickness", self.cathode_collector_thickness),
            ("geometric_area", self.geometric_area),
            ("tab_height", self.tab_height),
        ];
        if let Some((name, value)) = lengths.iter().find(|(_, v)| !(*v > 0.0)) {
            return Err(MeshError::Config(format!("`{name}` must be positive, got {value}")));
        }
        if self.anode_collector_thickness != self.cathode_collector_thickness {
            return Err(MeshError::Config(format!(
                "anode_collector_thickness ({}) and cathode_collector_thickness ({}) must be equal",
                self.anode_collector_thickness, self.cathode_collector_thickness
            )));
        }

        let collector = self.anode_collector_thickness * CM_TO_M;
        let anode = self.anode_electrode_thickness * CM_TO_M;
        let separator = self.separator_thickness * CM_TO_M;
        let cathode = self.cathode_electrode_thickness * CM_TO_M;
        let tab = self.tab_height * CM_TO_M;
        let area = self.geometric_area * CM2_TO_M2;

        match dimension {
            2 => Ok(LayerExtents {
                collector: vec![collector, area + tab],
                anode: vec![anode, area],
                separator: vec![separator, area],
                cathode: vec![cathode, area],
            }),
            3 => {
                let side = area.sqrt();
                Ok(LayerExtents {
                    collector: vec![collector, side, side + tab],
                    anode: vec![anode, side, side],
                    separator: vec![separator, side, side],
                    cathode: vec![cathode, side, side],
                })
            }
            other => Err(MeshError::Config(format!("unsupported dimension {other}"))),
        }
    }
}

/// Subdivisions per axis of each layer kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDivisions {
    pub collector: Vec<usize>,
    pub anode: Vec<usize>,
    pub separator: Vec<usize>,
    pub cathode: Vec<usize>,
}

impl LayerDivisions {
    /// Built-in subdivisions of the `supercapacitor` mesh.
    pub fn supercapacitor(dimension: usize) -> Result<Self, MeshError> {
        match dimension {
            2 => Ok(Self {
                collector: vec![1, 6],
                anode: vec![10, 5],
                separator: vec![5, 5],
                cathode: vec![10, 5],
            }),
            3 => Ok(Self {
                collector: vec![3, 4, 3],
                anode: vec![5, 4, 2],
                separator: vec![4, 4, 2],
                cathode: vec![5, 4, 2],
            }),
            other => Err(MeshError::Config(format!("unsupported dimension {other}"))),
        }
    }
}

/// Checkpoint settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    pub enabled: bool,
    pub coarse_mesh_filename: Option<PathBuf>,
}

/// One named tag list of a catalog override.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEntry<T> {
    pub name: String,
    pub ids: Vec<T>,
}

/// Explicit material and boundary catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub materials: Vec<TagEntry<MaterialId>>,
    pub boundaries: Vec<TagEntry<BoundaryId>>,
}

impl CatalogConfig {
    pub fn build(&self) -> Result<LayerCatalog, MeshError> {
        LayerCatalog::from_entries(
            self.materials.iter().map(|e| (e.name.clone(), e.ids.clone())),
            self.boundaries.iter().map(|e| (e.name.clone(), e.ids.clone())),
        )
    }
}

fn default_dimension() -> usize {
    2
}

/// Top-level geometry configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometryConfig {
    #[serde(rename = "type")]
    pub source: MeshSource,
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default)]
    pub mesh_file: Option<PathBuf>,
    #[serde(default)]
    pub n_repetitions: Option<usize>,
    /// Extra refinements; `supercapacitor` always adds one more.
    #[serde(default)]
    pub n_refinements: Option<usize>,
    #[serde(default)]
    pub geometry: Option<LayerGeometry>,
    #[serde(default)]
    pub divisions: Option<LayerDivisions>,
    #[serde(default)]
    pub weights: LayerWeights,
    #[serde(default)]
    pub checkpoint: CheckpointConfig,
    #[serde(default)]
    pub catalog: Option<CatalogConfig>,
    #[serde(default)]
    pub partition_method: PartitionMethod,
}

impl GeometryConfig {
    /// Reads a `.toml` or `.json` configuration file.
    pub fn from_path(path: &Path) -> Result<Self, MeshError> {
        let text = fs::read_to_string(path).map_err(|e| {
            MeshError::Config(format!(
                "cannot read configuration file {}: {e}",
                path.display()
            ))
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&text),
            Some("json") => Self::from_json_str(&text),
            _ => Err(MeshError::Config(format!(
                "configuration file {} must end in .toml or .json",
                path.display()
            ))),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, MeshError> {
        toml::from_str(text).map_err(|e| MeshError::Config(e.to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self, MeshError> {
        serde_json::from_str(text).map_err(|e| MeshError::Config(e.to_string()))
    }

    /// Layer catalog: the override if given, else the default one.
    ///
    /// Imported meshes carry arbitrary tags, so `file` requires an override.
    pub fn layer_catalog(&self) -> Result<LayerCatalog, MeshError> {
        match (&self.catalog, self.source) {
            (Some(catalog), _) => catalog.build(),
            (None, MeshSource::File) => Err(MeshError::Config(
                "a [catalog] with materials and boundaries is required for file meshes".into(),
            )),
            (None, _) => Ok(LayerCatalog::default()),
        }
    }

    pub fn divisions(&self) -> Result<LayerDivisions, MeshError> {
        match (self.source, &self.divisions) {
            (MeshSource::Supercapacitor, _) => LayerDivisions::supercapacitor(self.dimension),
            (_, Some(divisions)) => Ok(divisions.clone()),
            (_, None) => Err(MeshError::Config("missing [divisions] table".into())),
        }
    }

    /// Cycle repetitions of the assembled stack.
    pub fn repetitions(&self) -> usize {
        match self.source {
            MeshSource::Supercapacitor => 0,
            _ => self.n_repetitions.unwrap_or(1),
        }
    }

    /// Uniform refinements applied after assembly or restart.
    pub fn refinements(&self) -> usize {
        let requested = self.n_refinements.unwrap_or(0);
        match self.source {
            MeshSource::Supercapacitor => 1 + requested,
            MeshSource::File => 0,
            MeshSource::Generate | MeshSource::Restart => requested,
        }
    }

    pub fn mesh_file(&self) -> Result<&Path, MeshError> {
        self.mesh_file
            .as_deref()
            .ok_or_else(|| MeshError::Config("missing `mesh_file`".into()))
    }

    /// Checkpoint path when checkpointing is enabled.
    pub fn checkpoint_path(&self) -> Result<Option<&Path>, MeshError> {
        if !self.checkpoint.enabled {
            return Ok(None);
        }
        self.coarse_mesh_filename().map(Some)
    }

    pub fn coarse_mesh_filename(&self) -> Result<&Path, MeshError> {
        self.checkpoint
            .coarse_mesh_filename
            .as_deref()
            .ok_or_else(|| MeshError::Config("missing `checkpoint.coarse_mesh_filename`".into()))
    }

    /// Stack boxes in metres with their subdivisions.
    pub fn stack_layout(&self) -> Result<StackLayout, MeshError> {
        let geometry = self
            .geometry
            .as_ref()
            .ok_or_else(|| MeshError::Config("missing [geometry] table".into()))?;
        let extents = geometry.extents(self.dimension)?;
        let divisions = self.divisions()?;
        let collector = ComponentSpec::from_extent(&extents.collector, &divisions.collector);
        let layout = StackLayout {
            anode: ComponentSpec::from_extent(&extents.anode, &divisions.anode),
            separator: ComponentSpec::from_extent(&extents.separator, &divisions.separator),
            cathode: ComponentSpec::from_extent(&extents.cathode, &divisions.cathode),
            collector_anode: collector.clone(),
            collector_cathode: collector,
            n_repetitions: self.repetitions(),
        };
        layout.validate()?;
        Ok(layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn geometry() -> LayerGeometry {
        LayerGeometry {
            anode_collector_thickness: 5.0e-4,
            anode_electrode_thickness: 50.0e-4,
            separator_thickness: 25.0e-4,
            cathode_electrode_thickness: 50.0e-4,
            cathode_collector_thickness: 5.0e-4,
            geometric_area: 25.0e-2,
            tab_height: 5.0e-4,
        }
    }

    #[test]
    fn extents_convert_to_metres() {
        let e2 = geometry().extents(2).unwrap();
        assert_relative_eq!(e2.anode[0], 50.0e-6);
        assert_relative_eq!(e2.anode[1], 25.0e-6);
        assert_relative_eq!(e2.collector[1], 25.0e-6 + 5.0e-6);

        let e3 = geometry().extents(3).unwrap();
        assert_relative_eq!(e3.separator[1], 5.0e-3);
        assert_relative_eq!(e3.collector[2], 5.0e-3 + 5.0e-6);
        assert!(geometry().extents(4).is_err());
    }

    #[test]
    fn mismatched_collectors_are_rejected() {
        let mut g = geometry();
        g.cathode_collector_thickness = 6.0e-4;
        assert!(matches!(g.extents(2), Err(MeshError::Config(_))));
        g.cathode_collector_thickness = 5.0e-4;
        g.tab_height = 0.0;
        assert!(g.extents(2).is_err());
    }

    #[test]
    fn supercapacitor_defaults() {
        let cfg = GeometryConfig::from_toml_str(
            r#"
            type = "supercapacitor"
            n_refinements = 2
            [geometry]
            anode_collector_thickness = 5.0e-4
            anode_electrode_thickness = 50.0e-4
            separator_thickness = 25.0e-4
            cathode_electrode_thickness = 50.0e-4
            cathode_collector_thickness = 5.0e-4
            geometric_area = 25.0e-2
            tab_height = 5.0e-4
            "#,
        )
        .unwrap();
        assert_eq!(cfg.dimension, 2);
        assert_eq!(cfg.repetitions(), 0);
        assert_eq!(cfg.refinements(), 3);
        assert_eq!(cfg.divisions().unwrap().anode, vec![10, 5]);
        assert_eq!(cfg.layer_catalog().unwrap(), LayerCatalog::default());
        assert_eq!(cfg.checkpoint_path().unwrap(), None);
        let layout = cfg.stack_layout().unwrap();
        assert_eq!(layout.collector_anode.repetitions, vec![1, 6]);
        assert_eq!(layout.n_repetitions, 0);
    }

    #[test]
    fn file_mode_needs_catalog_and_path() {
        let cfg = GeometryConfig::from_json_str(r#"{ "type": "file" }"#).unwrap();
        assert!(cfg.layer_catalog().is_err());
        assert!(cfg.mesh_file().is_err());
        assert_eq!(cfg.refinements(), 0);

        let cfg = GeometryConfig::from_json_str(
            r#"{
                "type": "file",
                "mesh_file": "stack.ucd",
                "catalog": {
                    "materials": [{ "name": "anode", "ids": [0, 5] }],
                    "boundaries": [{ "name": "anode", "ids": [1] }]
                }
            }"#,
        )
        .unwrap();
        let catalog = cfg.layer_catalog().unwrap();
        assert!(catalog.material_contains("anode", 5));
        assert_eq!(cfg.mesh_file().unwrap(), Path::new("stack.ucd"));
    }

    #[test]
    fn generate_mode_requires_divisions() {
        let cfg = GeometryConfig::from_toml_str("type = \"generate\"\ndimension = 3\n").unwrap();
        assert!(cfg.divisions().is_err());
        assert_eq!(cfg.repetitions(), 1);
        assert!(cfg.stack_layout().is_err());
        assert!(GeometryConfig::from_toml_str("type = \"mystery\"").is_err());
    }

    #[test]
    fn missing_config_file_names_the_path() {
        let err = GeometryConfig::from_path(Path::new("/nonexistent/geometry.toml")).unwrap_err();
        assert!(matches!(err, MeshError::Config(_)));
        assert!(err.to_string().contains("/nonexistent/geometry.toml"));
    }
}
