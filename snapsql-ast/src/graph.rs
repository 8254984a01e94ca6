use core::fmt;

use indexmap::IndexMap;

use crate::table::DerivedTableInfo;

/// A stable identifier for a node in a [`DependencyGraph`].
///
/// Nodes are looked up by this ID through the graph's arena, never by
/// pointer, so that the graph can represent its naturally cyclic-looking
/// consumer/producer relationships without circular ownership.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which role a [`DependencyNode`] plays.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    /// The statement being compiled.
    Main,
    /// A `WITH`-defined CTE.
    Cte,
    /// A derived (`FROM (SELECT ...)`) subquery.
    DerivedSubquery,
}

/// One node of the dependency graph: a statement that either is the main
/// query or produces rows consumed by another node.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DependencyNode {
    /// This node's stable ID.
    pub id: NodeId,
    /// The CTE/alias name, or a synthetic name for the main statement.
    pub name: String,
    /// Which role this node plays.
    pub kind: NodeKind,
    /// The extracted shape, absent for the main node.
    pub info: Option<DerivedTableInfo>,
}

/// An error produced while building or analyzing a [`DependencyGraph`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// A cycle was found among the named nodes (consumer-to-producer order).
    #[error("circular dependency: {}", .path.iter().map(ToString::to_string).collect::<Vec<_>>().join(" -> "))]
    CircularDependency {
        /// The cycle, starting and ending at the same node.
        path: Vec<NodeId>,
    },
    /// A node ID referenced by an edge does not exist in the graph.
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
}

/// Nodes are statements (one main, one per CTE/derived subquery); edges
/// point from a consumer to the producer it depends on.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DependencyGraph {
    nodes: IndexMap<NodeId, DependencyNode>,
    edges: Vec<(NodeId, NodeId)>,
    next_id: u32,
}

impl DependencyGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new node, returning its freshly allocated ID.
    pub fn add_node(&mut self, name: impl Into<String>, kind: NodeKind, info: Option<DerivedTableInfo>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, DependencyNode { id, name: name.into(), kind, info });
        id
    }

    /// Records that `consumer` depends on `producer`.
    pub fn add_edge(&mut self, consumer: NodeId, producer: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&consumer) {
            return Err(GraphError::NodeNotFound(consumer));
        }
        if !self.nodes.contains_key(&producer) {
            return Err(GraphError::NodeNotFound(producer));
        }
        self.edges.push((consumer, producer));
        Ok(())
    }

    /// Looks up a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&DependencyNode> {
        self.nodes.get(&id)
    }

    /// Backfills a node's name, role, and extracted shape once they become
    /// known (nodes are allocated before their CTE/subquery is re-parsed).
    pub fn set_info(&mut self, id: NodeId, name: String, kind: NodeKind, info: DerivedTableInfo) {
        if let Some(node) = self.nodes.get_mut(&id) {
            node.name = name;
            node.kind = kind;
            node.info = Some(info);
        }
    }

    /// All node IDs, in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    fn producers_of(&self, consumer: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.edges.iter().filter(move |(c, _)| *c == consumer).map(|(_, p)| *p)
    }

    /// Detects a cycle via tri-color depth-first search.
    pub fn detect_cycle(&self) -> Result<(), GraphError> {
        #[derive(Copy, Clone, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }
        let mut color: IndexMap<NodeId, Color> =
            self.nodes.keys().map(|&id| (id, Color::White)).collect();
        let mut stack = vec![];

        fn visit(
            id: NodeId,
            graph: &DependencyGraph,
            color: &mut IndexMap<NodeId, Color>,
            stack: &mut Vec<NodeId>,
        ) -> Result<(), GraphError> {
            color.insert(id, Color::Gray);
            stack.push(id);
            for producer in graph.producers_of(id) {
                match color.get(&producer).copied().unwrap_or(Color::White) {
                    Color::White => visit(producer, graph, color, stack)?,
                    Color::Gray => {
                        let start = stack.iter().position(|n| *n == producer).unwrap_or(0);
                        let mut path = stack[start..].to_vec();
                        path.push(producer);
                        return Err(GraphError::CircularDependency { path });
                    }
                    Color::Black => {}
                }
            }
            stack.pop();
            color.insert(id, Color::Black);
            Ok(())
        }

        for id in self.node_ids() {
            if color.get(&id).copied() == Some(Color::White) {
                visit(id, self, &mut color, &mut stack)?;
            }
        }
        Ok(())
    }

    /// Computes a topological order (producer-first) via Kahn's algorithm.
    /// Ties among simultaneously-ready nodes resolve in definition order.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
        self.detect_cycle()?;

        let mut remaining_deps: IndexMap<NodeId, usize> = self
            .node_ids()
            .map(|id| (id, self.producers_of(id).count()))
            .collect();
        // Consumers of a node; processing a producer decrements its consumers.
        let mut consumers_of: IndexMap<NodeId, Vec<NodeId>> =
            self.node_ids().map(|id| (id, vec![])).collect();
        for &(consumer, producer) in &self.edges {
            consumers_of.entry(producer).or_default().push(consumer);
        }

        let mut ready: Vec<NodeId> =
            self.node_ids().filter(|id| remaining_deps[id] == 0).collect();
        let mut order = vec![];
        while !ready.is_empty() {
            ready.sort_by_key(|id| id.0);
            let id = ready.remove(0);
            order.push(id);
            if let Some(consumers) = consumers_of.get(&id) {
                for &consumer in consumers {
                    let left = remaining_deps.get_mut(&consumer).unwrap();
                    *left -= 1;
                    if *left == 0 {
                        ready.push(consumer);
                    }
                }
            }
        }
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topo_order_is_producer_first() {
        let mut g = DependencyGraph::new();
        let main = g.add_node("main", NodeKind::Main, None);
        let cte = g.add_node("c", NodeKind::Cte, None);
        g.add_edge(main, cte).unwrap();
        assert_eq!(g.topological_order().unwrap(), vec![cte, main]);
    }

    #[test]
    fn detects_cycle() {
        let mut g = DependencyGraph::new();
        let a = g.add_node("a", NodeKind::Cte, None);
        let b = g.add_node("b", NodeKind::Cte, None);
        let c = g.add_node("c", NodeKind::Cte, None);
        g.add_edge(a, b).unwrap();
        g.add_edge(b, c).unwrap();
        g.add_edge(c, a).unwrap();
        assert!(matches!(g.detect_cycle(), Err(GraphError::CircularDependency { .. })));
        assert!(g.topological_order().is_err());
    }

    #[test]
    fn deterministic_among_multiple_roots() {
        let mut g = DependencyGraph::new();
        let a = g.add_node("a", NodeKind::Cte, None);
        let b = g.add_node("b", NodeKind::Cte, None);
        assert_eq!(g.topological_order().unwrap(), vec![a, b]);
    }
}
