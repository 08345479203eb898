//! Stack components: one structured slab each.

use serde::{Deserialize, Serialize};

use crate::algs::meshgen::subdivided_hyper_rectangle;
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::stack::MERGE_AXIS;
use crate::topology::point::MaterialId;

/// Box and subdivisions of one layer, in metres.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub origin: Vec<f64>,
    pub corner: Vec<f64>,
    pub repetitions: Vec<usize>,
}

impl ComponentSpec {
    /// Box anchored at the origin with the given extent.
    pub fn from_extent(extent: &[f64], repetitions: &[usize]) -> Self {
        Self {
            origin: vec![0.0; extent.len()],
            corner: extent.to_vec(),
            repetitions: repetitions.to_vec(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.origin.len()
    }
}

/// The five layer boxes of a stack plus its repetition count.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StackLayout {
    pub anode: ComponentSpec,
    pub separator: ComponentSpec,
    pub cathode: ComponentSpec,
    pub collector_anode: ComponentSpec,
    pub collector_cathode: ComponentSpec,
    /// Extra repetitions of the eight-slot cycle.
    pub n_repetitions: usize,
}

impl StackLayout {
    pub fn dimension(&self) -> usize {
        self.collector_anode.dimension()
    }

    fn specs(&self) -> [(&'static str, &ComponentSpec); 5] {
        [
            ("anode", &self.anode),
            ("separator", &self.separator),
            ("cathode", &self.cathode),
            ("collector_anode", &self.collector_anode),
            ("collector_cathode", &self.collector_cathode),
        ]
    }

    /// Checks dimensions and the collector thickness constraint.
    pub fn validate(&self) -> Result<(), MeshError> {
        let dim = self.dimension();
        if dim != 2 && dim != 3 {
            return Err(MeshError::Config(format!("unsupported dimension {dim}")));
        }
        for (name, spec) in self.specs() {
            if spec.origin.len() != dim || spec.corner.len() != dim || spec.repetitions.len() != dim
            {
                return Err(MeshError::Config(format!(
                    "layer `{name}` is not described in {dim} dimensions"
                )));
            }
        }
        let thickness = |spec: &ComponentSpec| spec.corner[MERGE_AXIS] - spec.origin[MERGE_AXIS];
        let anode_side = thickness(&self.collector_anode);
        let cathode_side = thickness(&self.collector_cathode);
        if anode_side != cathode_side {
            return Err(MeshError::Config(format!(
                "anode collector thickness {anode_side} differs from cathode collector thickness {cathode_side}"
            )));
        }
        Ok(())
    }
}

/// One slab before and during merging.
#[derive(Clone, Debug)]
pub struct Component {
    box_dimensions: [Vec<f64>; 2],
    repetitions: Vec<usize>,
    pub(crate) mesh: Mesh,
    pub(crate) offset: f64,
    pub(crate) shift_vector: Vec<f64>,
    pub(crate) merges: usize,
}

impl Component {
    /// Builds the structured mesh of `spec`, every cell tagged `material`.
    pub fn build(spec: &ComponentSpec, material: MaterialId) -> Result<Self, MeshError> {
        let mesh =
            subdivided_hyper_rectangle(&spec.repetitions, &spec.origin, &spec.corner, material)?;
        Ok(Self {
            box_dimensions: [spec.origin.clone(), spec.corner.clone()],
            repetitions: spec.repetitions.clone(),
            offset: spec.origin[MERGE_AXIS],
            shift_vector: vec![0.0; spec.dimension()],
            merges: 0,
            mesh,
        })
    }

    /// Origin and far corner of the slab as built.
    pub fn box_dimensions(&self) -> &[Vec<f64>; 2] {
        &self.box_dimensions
    }

    pub fn repetitions(&self) -> &[usize] {
        &self.repetitions
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Current position along the merge axis.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Last translation applied to the mesh.
    pub fn shift_vector(&self) -> &[f64] {
        &self.shift_vector
    }

    /// Extent along the merge axis; the running offset advances by this much.
    pub fn thickness(&self) -> f64 {
        self.box_dimensions[1][MERGE_AXIS]
    }

    /// Extent along `axis` of the box as built.
    pub fn extent(&self, axis: usize) -> f64 {
        self.box_dimensions[1][axis] - self.box_dimensions[0][axis]
    }

    /// Number of times this component has been merged into the global mesh.
    pub fn merges(&self) -> usize {
        self.merges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> StackLayout {
        let spec = |x: f64, h: f64, r: [usize; 2]| ComponentSpec::from_extent(&[x, h], &r);
        StackLayout {
            anode: spec(50e-6, 1.0, [4, 5]),
            separator: spec(25e-6, 1.0, [2, 5]),
            cathode: spec(50e-6, 1.0, [4, 5]),
            collector_anode: spec(20e-6, 1.5, [1, 6]),
            collector_cathode: spec(20e-6, 1.5, [1, 6]),
            n_repetitions: 0,
        }
    }

    #[test]
    fn component_records_its_box() {
        let spec = ComponentSpec::from_extent(&[2.0, 1.0], &[4, 2]);
        let c = Component::build(&spec, 4).unwrap();
        assert_eq!(c.mesh().n_cells(), 8);
        assert_eq!(c.thickness(), 2.0);
        assert_eq!(c.extent(1), 1.0);
        assert_eq!(c.offset(), 0.0);
        assert_eq!(c.shift_vector(), &[0.0, 0.0]);
        assert_eq!(c.repetitions(), &[4, 2]);
        assert_eq!(c.merges(), 0);
    }

    #[test]
    fn layout_validation() {
        assert!(layout().validate().is_ok());

        let mut bad = layout();
        bad.collector_cathode = ComponentSpec::from_extent(&[30e-6, 1.5], &[1, 6]);
        assert!(matches!(bad.validate(), Err(MeshError::Config(_))));

        let mut mixed = layout();
        mixed.separator = ComponentSpec::from_extent(&[25e-6, 1.0, 1.0], &[2, 5, 5]);
        assert!(mixed.validate().is_err());
    }
}
