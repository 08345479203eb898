//! Collector alignment along the vertical axis.
//!
//! A collector is meshed with its own vertical subdivision count and is taller
//! than the electrodes by the tab height. The transforms below stretch its
//! interior vertex rows so that the rows facing an electrode line up with the
//! electrode's rows, while the two end faces stay exactly where they are:
//!
//! - [`AlignmentTransform::Scale`] maps an interior `y` to `y * scale_factor`;
//! - [`AlignmentTransform::ScaleShift`] maps it to `y * scale_factor + offset`.
//!
//! Points within [`ENDPOINT_TOLERANCE`] of `0` or of `max_value` are returned
//! unchanged.

use crate::algs::transform::transform_mesh;
use crate::mesh_error::MeshError;
use crate::stack::component::Component;

/// Distance from an end face below which a coordinate counts as on it.
pub const ENDPOINT_TOLERANCE: f64 = 1e-15;

/// Coordinate map applied along the alignment axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AlignmentTransform {
    Scale {
        scale_factor: f64,
        max_value: f64,
    },
    ScaleShift {
        scale_factor: f64,
        max_value: f64,
        offset: f64,
    },
}

impl AlignmentTransform {
    /// Image of the coordinate `x`.
    pub fn map(&self, x: f64) -> f64 {
        let (scale_factor, max_value, offset) = match *self {
            AlignmentTransform::Scale {
                scale_factor,
                max_value,
            } => (scale_factor, max_value, None),
            AlignmentTransform::ScaleShift {
                scale_factor,
                max_value,
                offset,
            } => (scale_factor, max_value, Some(offset)),
        };
        if x.abs() < ENDPOINT_TOLERANCE || (x - max_value).abs() < ENDPOINT_TOLERANCE {
            return x;
        }
        match offset {
            None => x * scale_factor,
            Some(offset) => x * scale_factor + offset,
        }
    }

    /// Rewrites `point[axis]` in place.
    pub fn apply(&self, point: &mut [f64], axis: usize) {
        point[axis] = self.map(point[axis]);
    }

    /// Applies the map to every vertex of `component`'s mesh.
    pub fn align(&self, component: &mut Component, axis: usize) -> Result<(), MeshError> {
        transform_mesh(&mut component.mesh, |point| {
            self.apply(point, axis);
            Ok(())
        })
    }
}

/// Parameters tying a collector's vertical rows to an electrode's.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollectorAlignment {
    pub electrode_height: f64,
    pub collector_height: f64,
    /// Height of one unstretched collector row.
    pub cell_width: f64,
    pub scale_factor: f64,
    pub offset: f64,
}

impl CollectorAlignment {
    pub fn new(
        electrode_height: f64,
        collector_height: f64,
        vertical_divisions: usize,
    ) -> Result<Self, MeshError> {
        if vertical_divisions < 2 {
            return Err(MeshError::InvalidGeometry(format!(
                "collector needs at least two vertical divisions, got {vertical_divisions}"
            )));
        }
        if !(collector_height > electrode_height) || !(electrode_height > 0.0) {
            return Err(MeshError::InvalidGeometry(format!(
                "collector height {collector_height} must exceed electrode height {electrode_height}"
            )));
        }
        let cell_width = collector_height / vertical_divisions as f64;
        let scale_factor = electrode_height / (collector_height - cell_width);
        let offset = collector_height - electrode_height - scale_factor * cell_width;
        Ok(Self {
            electrode_height,
            collector_height,
            cell_width,
            scale_factor,
            offset,
        })
    }

    /// Stretch used for the anode collector, whose tab sits on top.
    pub fn scale_only(&self) -> AlignmentTransform {
        AlignmentTransform::Scale {
            scale_factor: self.scale_factor,
            max_value: self.collector_height,
        }
    }

    /// Stretch used for the cathode collector, whose tab sits below.
    pub fn scale_and_shift(&self) -> AlignmentTransform {
        AlignmentTransform::ScaleShift {
            scale_factor: self.scale_factor,
            max_value: self.collector_height,
            offset: self.offset,
        }
    }

    /// Vertical shift that drops the cathode collector's tab below the stack.
    pub fn tab_drop(&self) -> f64 {
        -(self.collector_height - self.electrode_height)
    }
}
