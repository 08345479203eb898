//! Roles of the eight-slot merge cycle.

use std::fmt;

use crate::stack::component::Component;
use crate::topology::catalog::names;

/// Which physical layer a merge slot refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StackRole {
    Anode,
    Separator,
    Cathode,
    /// Collector whose terminal tab points down.
    CathodeCollector,
    /// Collector whose terminal tab points up; also seeds the global mesh.
    AnodeCollector,
}

impl StackRole {
    /// Catalog material class of the layer.
    pub fn material_class(self) -> &'static str {
        match self {
            StackRole::Anode => names::ANODE,
            StackRole::Separator => names::SEPARATOR,
            StackRole::Cathode => names::CATHODE,
            StackRole::CathodeCollector => names::COLLECTOR_CATHODE,
            StackRole::AnodeCollector => names::COLLECTOR_ANODE,
        }
    }
}

impl fmt::Display for StackRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.material_class())
    }
}

/// Merge order, starting right after the seed anode collector.
pub const STACK_ORDER: [StackRole; 8] = [
    StackRole::Anode,
    StackRole::Separator,
    StackRole::Cathode,
    StackRole::CathodeCollector,
    StackRole::Cathode,
    StackRole::Separator,
    StackRole::Anode,
    StackRole::AnodeCollector,
];

/// Merges performed per pass over the order.
pub const MERGES_PER_CYCLE: usize = 4;

/// One component per role. Slots sharing a role resolve to the same component.
#[derive(Clone, Debug)]
pub struct StackComponents {
    pub anode: Component,
    pub separator: Component,
    pub cathode: Component,
    pub collector_cathode: Component,
    pub collector_anode: Component,
}

impl StackComponents {
    pub fn get(&self, role: StackRole) -> &Component {
        match role {
            StackRole::Anode => &self.anode,
            StackRole::Separator => &self.separator,
            StackRole::Cathode => &self.cathode,
            StackRole::CathodeCollector => &self.collector_cathode,
            StackRole::AnodeCollector => &self.collector_anode,
        }
    }

    pub fn get_mut(&mut self, role: StackRole) -> &mut Component {
        match role {
            StackRole::Anode => &mut self.anode,
            StackRole::Separator => &mut self.separator,
            StackRole::Cathode => &mut self.cathode,
            StackRole::CathodeCollector => &mut self.collector_cathode,
            StackRole::AnodeCollector => &mut self.collector_anode,
        }
    }
}
