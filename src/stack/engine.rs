//! Sequential merge of the stack into one mesh.
//!
//! The engine starts from a copy of the seed collector's mesh with the running
//! offset at the seed's thickness. Each step takes the component at the
//! current slot of [`STACK_ORDER`], translates it so that its low face sits at
//! the running offset, fuses it into the global mesh and advances the offset
//! by the component's thickness.
//!
//! A component's vertical shift (the cathode collector's tab drop) is part of
//! the translation of its first merge only: once a component has been merged,
//! the vertical entry of its shift vector is cleared before any later merge.

use log::debug;

use crate::algs::merge::merge_meshes;
use crate::algs::transform::shift_mesh;
use crate::mesh::Mesh;
use crate::mesh_error::MeshError;
use crate::stack::component::Component;
use crate::stack::order::{MERGES_PER_CYCLE, STACK_ORDER, StackComponents, StackRole};
use crate::stack::{MERGE_AXIS, alignment_axis};

/// Record of one merge.
#[derive(Clone, Debug, PartialEq)]
pub struct MergeStep {
    pub slot: usize,
    pub role: StackRole,
    /// Translation applied to the component's mesh.
    pub translation: Vec<f64>,
    pub offset_before: f64,
    pub offset_after: f64,
    pub cells_merged: usize,
}

/// Running state of a stack merge.
#[derive(Clone, Debug)]
pub struct StackMergeEngine {
    offset: f64,
    slot_index: usize,
    global: Mesh,
    steps: Vec<MergeStep>,
}

impl StackMergeEngine {
    /// Seeds the global mesh with a copy of `seed`'s mesh.
    pub fn seeded(seed: &Component) -> Self {
        Self {
            offset: seed.box_dimensions()[1][MERGE_AXIS],
            slot_index: 0,
            global: seed.mesh().clone(),
            steps: Vec::new(),
        }
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn slot_index(&self) -> usize {
        self.slot_index
    }

    pub fn mesh(&self) -> &Mesh {
        &self.global
    }

    pub fn steps(&self) -> &[MergeStep] {
        &self.steps
    }

    /// Merges the component at the current slot and advances the slot.
    pub fn merge_next(&mut self, components: &mut StackComponents) -> Result<&MergeStep, MeshError> {
        let slot = self.slot_index;
        let role = STACK_ORDER[slot];
        let component = components.get_mut(role);
        let vertical = alignment_axis(component.mesh.dimension());

        if component.merges > 0 {
            component.shift_vector[vertical] = 0.0;
        }
        let mut translation = component.shift_vector.clone();
        translation[MERGE_AXIS] = self.offset - component.offset;
        shift_mesh(&mut component.mesh, &translation)?;
        component.shift_vector.clone_from(&translation);
        component.offset = self.offset;
        component.merges += 1;

        self.global = merge_meshes(&self.global, &component.mesh)?;

        let offset_before = self.offset;
        self.offset += component.thickness();
        self.slot_index = (self.slot_index + 1) % STACK_ORDER.len();

        debug!(
            "slot {slot} ({role}): translated by {:?}, offset {offset_before} -> {}, {} cells total",
            translation,
            self.offset,
            self.global.n_cells()
        );
        self.steps.push(MergeStep {
            slot,
            role,
            translation,
            offset_before,
            offset_after: self.offset,
            cells_merged: component.mesh.n_cells(),
        });
        // just pushed
        Ok(&self.steps[self.steps.len() - 1])
    }

    /// Runs `n_repetitions + 1` cycles of [`MERGES_PER_CYCLE`] merges.
    pub fn run(
        &mut self,
        components: &mut StackComponents,
        n_repetitions: usize,
    ) -> Result<(), MeshError> {
        for _cycle in 0..=n_repetitions {
            for _ in 0..MERGES_PER_CYCLE {
                self.merge_next(components)?;
            }
        }
        Ok(())
    }

    /// Global mesh and merge log.
    pub fn into_parts(self) -> (Mesh, Vec<MergeStep>) {
        (self.global, self.steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::component::ComponentSpec;

    fn components() -> StackComponents {
        let build = |x: f64, h: f64, r: [usize; 2], m| {
            Component::build(&ComponentSpec::from_extent(&[x, h], &r), m).unwrap()
        };
        let mut collector_cathode = build(1.0, 2.0, [1, 2], 4);
        collector_cathode.shift_vector[1] = -0.5;
        StackComponents {
            anode: build(2.0, 2.0, [2, 2], 0),
            separator: build(1.0, 2.0, [1, 2], 1),
            cathode: build(2.0, 2.0, [2, 2], 2),
            collector_cathode,
            collector_anode: build(1.0, 2.0, [1, 2], 3),
        }
    }

    #[test]
    fn first_cycle_places_layers_end_to_end() {
        let mut parts = components();
        let mut engine = StackMergeEngine::seeded(&parts.collector_anode);
        assert_eq!(engine.offset(), 1.0);
        engine.run(&mut parts, 0).unwrap();
        let offsets: Vec<f64> = engine.steps().iter().map(|s| s.offset_after).collect();
        assert_eq!(offsets, vec![3.0, 4.0, 6.0, 7.0]);
        assert_eq!(engine.slot_index(), 4);
        assert_eq!(engine.mesh().n_cells(), 2 + 4 + 2 + 4 + 2);
        assert_eq!(parts.anode.offset(), 1.0);
        assert_eq!(engine.steps()[3].translation, vec![6.0, -0.5]);
    }

    #[test]
    fn vertical_shift_is_applied_once() {
        let mut parts = components();
        let mut engine = StackMergeEngine::seeded(&parts.collector_anode);
        engine.run(&mut parts, 1).unwrap();
        assert_eq!(engine.steps().len(), 8);
        assert_eq!(parts.collector_cathode.merges(), 1);
        assert_eq!(parts.collector_cathode.shift_vector()[1], -0.5);

        // a second pass over the collector drops the stale vertical entry
        engine.run(&mut parts, 0).unwrap();
        assert_eq!(parts.collector_cathode.merges(), 2);
        assert_eq!(parts.collector_cathode.shift_vector()[1], 0.0);
        let (lo, _) = parts.collector_cathode.mesh().bounding_box().unwrap();
        assert_eq!(lo[1], -0.5);
    }
}
