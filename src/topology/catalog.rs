//! Layer catalog: symbolic names for material and boundary tags.
//!
//! The catalog maps a material class name (`"anode"`, `"collector"`, ...) to
//! the set of material ids carried by its cells, and a boundary name to the
//! set of boundary ids carried by its faces. It is built once and then shared
//! read-only by every assembly stage, so it exposes no mutation after
//! construction.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::mesh_error::MeshError;
use crate::topology::point::{BoundaryId, MaterialId};

/// Material class names the stack assembly relies on.
pub mod names {
    pub const ANODE: &str = "anode";
    pub const SEPARATOR: &str = "separator";
    pub const CATHODE: &str = "cathode";
    pub const COLLECTOR_ANODE: &str = "collector_anode";
    pub const COLLECTOR_CATHODE: &str = "collector_cathode";
    pub const COLLECTOR: &str = "collector";
}

/// Named tag sets for materials and boundaries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerCatalog {
    materials: BTreeMap<String, BTreeSet<MaterialId>>,
    boundaries: BTreeMap<String, BTreeSet<BoundaryId>>,
}

impl Default for LayerCatalog {
    /// Six material classes and two terminal boundaries.
    ///
    /// `collector` is the union of the two collector tags.
    fn default() -> Self {
        let materials = [
            (names::ANODE, vec![0]),
            (names::SEPARATOR, vec![1]),
            (names::CATHODE, vec![2]),
            (names::COLLECTOR_ANODE, vec![3]),
            (names::COLLECTOR_CATHODE, vec![4]),
            (names::COLLECTOR, vec![3, 4]),
        ];
        let boundaries = [(names::ANODE, vec![1]), (names::CATHODE, vec![2])];
        Self {
            materials: materials
                .into_iter()
                .map(|(name, ids)| (name.to_string(), ids.into_iter().collect()))
                .collect(),
            boundaries: boundaries
                .into_iter()
                .map(|(name, ids)| (name.to_string(), ids.into_iter().collect()))
                .collect(),
        }
    }
}

impl LayerCatalog {
    /// Builds a catalog from `(name, ids)` entries.
    ///
    /// Duplicate names and empty id lists are configuration errors.
    pub fn from_entries<M, B>(materials: M, boundaries: B) -> Result<Self, MeshError>
    where
        M: IntoIterator<Item = (String, Vec<MaterialId>)>,
        B: IntoIterator<Item = (String, Vec<BoundaryId>)>,
    {
        Ok(Self {
            materials: collect_entries(materials, "material")?,
            boundaries: collect_entries(boundaries, "boundary")?,
        })
    }

    /// Tag set of material class `name`.
    pub fn material(&self, name: &str) -> Result<&BTreeSet<MaterialId>, MeshError> {
        self.materials
            .get(name)
            .ok_or_else(|| MeshError::UnknownMaterialClass(name.to_string()))
    }

    /// Tag set of boundary `name`.
    pub fn boundary(&self, name: &str) -> Result<&BTreeSet<BoundaryId>, MeshError> {
        self.boundaries
            .get(name)
            .ok_or_else(|| MeshError::UnknownBoundaryClass(name.to_string()))
    }

    /// Smallest tag of material class `name`; the id stamped on freshly built
    /// component meshes.
    pub fn primary_material(&self, name: &str) -> Result<MaterialId, MeshError> {
        self.material(name)?
            .first()
            .copied()
            .ok_or_else(|| MeshError::EmptyTagSet(name.to_string()))
    }

    /// The single boundary id of `name`.
    ///
    /// Terminal boundaries must resolve to exactly one id.
    pub fn unique_boundary(&self, name: &str) -> Result<BoundaryId, MeshError> {
        let ids = self.boundary(name)?;
        match (ids.len(), ids.first()) {
            (1, Some(&id)) => Ok(id),
            (count, _) => Err(MeshError::AmbiguousBoundaryTag {
                name: name.to_string(),
                count,
            }),
        }
    }

    /// True when material class `name` contains `id`.
    pub fn material_contains(&self, name: &str, id: MaterialId) -> bool {
        self.materials.get(name).is_some_and(|set| set.contains(&id))
    }

    pub fn materials(&self) -> &BTreeMap<String, BTreeSet<MaterialId>> {
        &self.materials
    }

    pub fn boundaries(&self) -> &BTreeMap<String, BTreeSet<BoundaryId>> {
        &self.boundaries
    }
}

fn collect_entries<T, I>(entries: I, kind: &str) -> Result<BTreeMap<String, BTreeSet<T>>, MeshError>
where
    T: Ord,
    I: IntoIterator<Item = (String, Vec<T>)>,
{
    let mut out = BTreeMap::new();
    for (name, ids) in entries {
        if ids.is_empty() {
            return Err(MeshError::EmptyTagSet(name));
        }
        if out.contains_key(&name) {
            return Err(MeshError::Config(format!("duplicate {kind} name `{name}`")));
        }
        out.insert(name, ids.into_iter().collect());
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_contents() {
        let catalog = LayerCatalog::default();
        assert_eq!(catalog.materials().len(), 6);
        assert_eq!(catalog.boundaries().len(), 2);
        assert_eq!(catalog.primary_material(names::CATHODE).unwrap(), 2);
        let collector: Vec<_> = catalog.material(names::COLLECTOR).unwrap().iter().copied().collect();
        assert_eq!(collector, vec![3, 4]);
        assert_eq!(catalog.unique_boundary(names::ANODE).unwrap(), 1);
        assert_eq!(catalog.unique_boundary(names::CATHODE).unwrap(), 2);
    }

    #[test]
    fn multi_element_boundary_is_rejected() {
        let catalog = LayerCatalog::from_entries(
            vec![("anode".to_string(), vec![0])],
            vec![("anode".to_string(), vec![1, 5])],
        )
        .unwrap();
        assert_eq!(
            catalog.unique_boundary("anode"),
            Err(MeshError::AmbiguousBoundaryTag {
                name: "anode".into(),
                count: 2
            })
        );
    }

    #[test]
    fn duplicate_and_empty_entries_fail() {
        let dup = LayerCatalog::from_entries(
            vec![("a".to_string(), vec![0]), ("a".to_string(), vec![1])],
            Vec::<(String, Vec<BoundaryId>)>::new(),
        );
        assert!(matches!(dup, Err(MeshError::Config(_))));

        let empty = LayerCatalog::from_entries(
            vec![("a".to_string(), Vec::new())],
            Vec::<(String, Vec<BoundaryId>)>::new(),
        );
        assert_eq!(empty, Err(MeshError::EmptyTagSet("a".into())));
    }

    #[test]
    fn unknown_names() {
        let catalog = LayerCatalog::default();
        assert_eq!(
            catalog.material("electrolyte"),
            Err(MeshError::UnknownMaterialClass("electrolyte".into()))
        );
        assert!(!catalog.material_contains("electrolyte", 0));
        assert!(catalog.material_contains(names::COLLECTOR, 4));
    }
}
