use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::value::Value;

/// A terminal expression node reachable from a declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Field(String),
    Literal(Value),
}

impl fmt::Display for Leaf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leaf::Field(name) => write!(f, "field:{name}"),
            Leaf::Literal(v) => write!(f, "{v}"),
        }
    }
}

/// Declaration name → names it references through binding expressions.
pub type DependencyGraph = BTreeMap<String, BTreeSet<String>>;

/// Declaration name → distinct terminal nodes found under it. Declarations
/// without leaves have no entry.
pub type LeafMap = BTreeMap<String, Vec<Leaf>>;

/// Outcome of a successful analysis run. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    dependency_graph: DependencyGraph,
    leaf_map: LeafMap,
    topo_order: Vec<String>,
}

impl Analysis {
    pub(crate) fn new(dependency_graph: DependencyGraph, leaf_map: LeafMap, topo_order: Vec<String>) -> Self {
        Self {
            dependency_graph,
            leaf_map,
            topo_order,
        }
    }

    #[must_use]
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.dependency_graph
    }

    #[must_use]
    pub fn leaf_map(&self) -> &LeafMap {
        &self.leaf_map
    }

    /// Every declared name, dependencies before dependents.
    #[must_use]
    pub fn topo_order(&self) -> &[String] {
        &self.topo_order
    }

    /// Names directly referenced by `name`, or `None` if it is not declared.
    #[must_use]
    pub fn dependencies_of(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.dependency_graph.get(name)
    }

    /// Leaves reachable from `name`; empty when it has none.
    #[must_use]
    pub fn leaves_of(&self, name: &str) -> &[Leaf] {
        self.leaf_map.get(name).map_or(&[], Vec::as_slice)
    }
}
