//! Build prerequisites as a directed acyclic graph.
//!
//! Edges point from prerequisite to dependent: `Gateway → CyberneticsCore`
//! means a finished gateway is needed before a cybernetics core can start.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Reversed, Walker};
use petgraph::Direction;

use super::state::WorldState;
use super::types::UnitKind;

#[derive(Debug, Clone)]
pub struct TechTree {
    graph: DiGraph<UnitKind, ()>,
    node_by_kind: HashMap<UnitKind, NodeIndex>,
}

impl TechTree {
    /// Prerequisites of the controlled faction.
    pub fn protoss() -> Self {
        use UnitKind::*;
        let mut tree = Self::empty();
        tree.require(Nexus, Probe);
        tree.require(Nexus, Assimilator);
        tree.require(Pylon, Gateway);
        tree.require(Gateway, CyberneticsCore);
        tree.require(Pylon, Stargate);
        tree.require(CyberneticsCore, Stargate);
        tree.require(Stargate, VoidRay);
        tree
    }

    fn empty() -> Self {
        let mut graph = DiGraph::new();
        let node_by_kind = UnitKind::all()
            .into_iter()
            .map(|kind| (kind, graph.add_node(kind)))
            .collect();
        Self {
            graph,
            node_by_kind,
        }
    }

    fn require(&mut self, prerequisite: UnitKind, dependent: UnitKind) {
        let from = self.node_by_kind[&prerequisite];
        let to = self.node_by_kind[&dependent];
        self.graph.update_edge(from, to, ());
    }

    /// Direct prerequisites of `kind`.
    pub fn prerequisites(&self, kind: UnitKind) -> Vec<UnitKind> {
        let mut direct: Vec<UnitKind> = self
            .graph
            .neighbors_directed(self.node_by_kind[&kind], Direction::Incoming)
            .map(|n| self.graph[n])
            .collect();
        direct.sort();
        direct
    }

    /// First direct prerequisite of `kind` with no finished structure in `world`.
    pub fn missing_prerequisite(&self, kind: UnitKind, world: &WorldState) -> Option<UnitKind> {
        self.prerequisites(kind)
            .into_iter()
            .find(|&p| world.ready_structures_of(p).next().is_none())
    }

    /// True when every direct prerequisite of `kind` has a finished structure.
    pub fn is_unlocked(&self, kind: UnitKind, world: &WorldState) -> bool {
        self.missing_prerequisite(kind, world).is_none()
    }

    /// All transitive prerequisites of `kind`, then `kind` itself, in a valid build order.
    pub fn build_order(&self, kind: UnitKind) -> Vec<UnitKind> {
        let target = self.node_by_kind[&kind];
        let reversed = Reversed(&self.graph);
        let ancestors: HashSet<NodeIndex> = petgraph::visit::Dfs::new(reversed, target)
            .iter(reversed)
            .collect();
        // The graph is built acyclic above.
        let order = toposort(&self.graph, None).unwrap_or_default();
        order
            .into_iter()
            .filter(|n| ancestors.contains(n))
            .map(|n| self.graph[n])
            .collect()
    }
}

impl Default for TechTree {
    fn default() -> Self {
        Self::protoss()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::state::Unit;
    use crate::world::types::Position;

    #[test]
    fn stargate_needs_pylon_and_core() {
        let tree = TechTree::protoss();
        assert_eq!(
            tree.prerequisites(UnitKind::Stargate),
            vec![UnitKind::Pylon, UnitKind::CyberneticsCore]
        );
        assert!(tree.prerequisites(UnitKind::Pylon).is_empty());
    }

    #[test]
    fn build_order_is_topological() {
        let tree = TechTree::protoss();
        let order = tree.build_order(UnitKind::VoidRay);
        let at = |k| order.iter().position(|&x| x == k).unwrap();
        assert_eq!(order.last(), Some(&UnitKind::VoidRay));
        assert!(at(UnitKind::Pylon) < at(UnitKind::Gateway));
        assert!(at(UnitKind::Gateway) < at(UnitKind::CyberneticsCore));
        assert!(at(UnitKind::CyberneticsCore) < at(UnitKind::Stargate));
        assert!(!order.contains(&UnitKind::Nexus));
    }

    #[test]
    fn unfinished_structures_do_not_unlock() {
        let tree = TechTree::protoss();
        let mut world = WorldState::default();
        let mut gateway = Unit::new(1, UnitKind::Gateway, Position::new(5.0, 5.0));
        gateway.ready = false;
        world.own_structures.push(gateway);
        assert_eq!(
            tree.missing_prerequisite(UnitKind::CyberneticsCore, &world),
            Some(UnitKind::Gateway)
        );

        world.own_structures[0].ready = true;
        assert!(tree.is_unlocked(UnitKind::CyberneticsCore, &world));
    }
}
