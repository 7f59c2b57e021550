//! Typed graph nodes and the lookups graph-based algorithms rely on.
//!
//! Algorithms only see the [`Graph`] trait. [`InteractionGraph`] is an
//! in-memory implementation backed by petgraph, mostly useful for building
//! a user-item graph straight from a [`Ratings`] collection.
use std::collections::HashMap;
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;

use super::{ItemId, UserId};
use data::Ratings;

/// A node of a recommendation graph. Identity is the pair of kind and id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Node {
    /// A user.
    User(UserId),
    /// An item.
    Item(ItemId),
    /// Any other entity, such as an item property.
    Property(String),
}

/// The kind of a [`Node`], without its id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    /// User nodes.
    User,
    /// Item nodes.
    Item,
    /// Property nodes.
    Property,
}

impl Node {
    /// The node's kind.
    pub fn kind(&self) -> NodeKind {
        match *self {
            Node::User(_) => NodeKind::User,
            Node::Item(_) => NodeKind::Item,
            Node::Property(_) => NodeKind::Property,
        }
    }

    /// The node's id, without its kind.
    pub fn id(&self) -> &str {
        match *self {
            Node::User(ref id) | Node::Item(ref id) | Node::Property(ref id) => id.as_str(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Node::User(ref id) => write!(f, "user:{}", id),
            Node::Item(ref id) => write!(f, "item:{}", id),
            Node::Property(ref id) => write!(f, "property:{}", id),
        }
    }
}

/// Read access to a directed graph with weighted edges.
///
/// Lookups on nodes or edges the graph does not contain are not errors:
/// they return an empty list or `None`.
pub trait Graph {
    /// Nodes reachable from `node` through a single outgoing edge.
    fn successors(&self, node: &Node) -> Vec<Node>;
    /// Weight of the edge from `from` to `to`.
    fn edge_weight(&self, from: &Node, to: &Node) -> Option<f32>;
}

/// A directed graph over [`Node`]s with `f32` edge weights.
///
/// There is at most one edge between an ordered pair of nodes; adding a
/// link twice overwrites its weight.
#[derive(Clone, Debug, Default)]
pub struct InteractionGraph {
    graph: DiGraph<Node, f32>,
    node_index: HashMap<Node, NodeIndex>,
}

impl InteractionGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        InteractionGraph::default()
    }

    /// Build a user-item graph with one `user -> item` edge per interaction,
    /// weighted by the interaction score. Repeated user-item pairs keep the
    /// last score.
    pub fn from_ratings(ratings: &Ratings) -> Self {
        let mut graph = InteractionGraph::new();

        for interaction in ratings.data() {
            graph.add_link(
                Node::User(interaction.user_id().to_owned()),
                Node::Item(interaction.item_id().to_owned()),
                interaction.score(),
            );
        }

        graph
    }

    /// Add `node` unless it is already present.
    pub fn add_node(&mut self, node: Node) {
        self.get_or_insert(node);
    }

    /// Add or overwrite the edge from `from` to `to`, inserting missing nodes.
    pub fn add_link(&mut self, from: Node, to: Node, weight: f32) {
        let from = self.get_or_insert(from);
        let to = self.get_or_insert(to);

        self.graph.update_edge(from, to, weight);
    }

    fn get_or_insert(&mut self, node: Node) -> NodeIndex {
        if let Some(&idx) = self.node_index.get(&node) {
            return idx;
        }

        let idx = self.graph.add_node(node.clone());
        self.node_index.insert(node, idx);
        idx
    }

    /// Whether the graph contains `node`.
    pub fn contains(&self, node: &Node) -> bool {
        self.node_index.contains_key(node)
    }

    /// Nodes with an edge pointing at `node`.
    pub fn predecessors(&self, node: &Node) -> Vec<Node> {
        self.neighbors(node, Direction::Incoming)
    }

    /// All user nodes.
    pub fn user_nodes(&self) -> Vec<&Node> {
        self.nodes_of_kind(NodeKind::User)
    }

    /// All item nodes.
    pub fn item_nodes(&self) -> Vec<&Node> {
        self.nodes_of_kind(NodeKind::Item)
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn nodes_of_kind(&self, kind: NodeKind) -> Vec<&Node> {
        self.graph
            .node_indices()
            .map(|idx| &self.graph[idx])
            .filter(|node| node.kind() == kind)
            .collect()
    }

    fn neighbors(&self, node: &Node, direction: Direction) -> Vec<Node> {
        match self.node_index.get(node) {
            Some(&idx) => self.graph
                .neighbors_directed(idx, direction)
                .map(|neighbor| self.graph[neighbor].clone())
                .collect(),
            None => Vec::new(),
        }
    }
}

impl Graph for InteractionGraph {
    fn successors(&self, node: &Node) -> Vec<Node> {
        self.neighbors(node, Direction::Outgoing)
    }

    fn edge_weight(&self, from: &Node, to: &Node) -> Option<f32> {
        let from = *self.node_index.get(from)?;
        let to = *self.node_index.get(to)?;

        self.graph
            .find_edge(from, to)
            .and_then(|edge| self.graph.edge_weight(edge))
            .cloned()
    }
}
