//! Directed road multigraph keyed by OSM node id

pub mod components;
pub mod simplify;
pub mod speed;
pub mod storage;

pub use components::{ComponentReport, ComponentSummary, reduce_to_largest_component};
pub use simplify::simplify_graph;
pub use speed::{SpeedTable, TravelTimeReport, annotate_travel_times};

use crate::domain::TagValue;
use geo::{Distance, Haversine, Point};
use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Unknown node id: {0}")]
    UnknownNode(u64),
}

/// An intersection or dead end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadNode {
    /// OSM node id
    pub id: u64,
    pub lat: f64,
    pub lon: f64,
}

impl RoadNode {
    pub fn new(id: u64, lat: f64, lon: f64) -> Self {
        Self { id, lat, lon }
    }

    /// Position as a geo point (x = lon, y = lat)
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }
}

/// A directed road segment
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RoadEdge {
    /// OSM ways this edge was built from
    #[serde(default)]
    pub ways: Vec<u64>,
    /// Length in meters
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub highway: TagValue,
    #[serde(default)]
    pub maxspeed: TagValue,
    #[serde(default)]
    pub name: TagValue,
    #[serde(default)]
    pub oneway: bool,
    /// Intermediate (lat, lon) points including both ends, set on merged edges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Vec<(f64, f64)>>,
    /// Estimated traversal time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_time: Option<f64>,
}

/// Great-circle distance between two nodes in meters
pub fn great_circle_length(a: &RoadNode, b: &RoadNode) -> f64 {
    Haversine::distance(a.point(), b.point())
}

/// Directed multigraph of road segments.
///
/// Nodes are addressed by their OSM id from the outside; petgraph indices
/// stay internal to the crate since they change whenever the graph is
/// rebuilt.
#[derive(Debug, Clone, Default)]
pub struct RoadGraph {
    graph: DiGraph<RoadNode, RoadEdge>,
    index: HashMap<u64, NodeIndex>,
}

impl RoadGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node, returning the existing index if the id is already present
    pub fn add_node(&mut self, node: RoadNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.id) {
            return idx;
        }
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.index.insert(id, idx);
        idx
    }

    /// Insert a directed edge between two existing nodes
    pub fn add_edge(&mut self, from: u64, to: u64, edge: RoadEdge) -> Result<EdgeIndex, GraphError> {
        let a = self.node_index(from).ok_or(GraphError::UnknownNode(from))?;
        let b = self.node_index(to).ok_or(GraphError::UnknownNode(to))?;
        Ok(self.graph.add_edge(a, b, edge))
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains_node(&self, id: u64) -> bool {
        self.index.contains_key(&id)
    }

    pub fn node(&self, id: u64) -> Option<&RoadNode> {
        self.node_index(id).map(|idx| &self.graph[idx])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &RoadNode> {
        self.graph.node_weights()
    }

    /// All edges as (from, to, edge)
    pub fn edges(&self) -> impl Iterator<Item = (&RoadNode, &RoadNode, &RoadEdge)> {
        self.graph.edge_indices().filter_map(|e| {
            let (a, b) = self.graph.edge_endpoints(e)?;
            Some((&self.graph[a], &self.graph[b], &self.graph[e]))
        })
    }

    pub fn edges_mut(&mut self) -> impl Iterator<Item = &mut RoadEdge> {
        self.graph.edge_weights_mut()
    }

    /// Ids of the nodes reachable over one outgoing edge
    pub fn successors(&self, id: u64) -> Vec<u64> {
        match self.node_index(id) {
            Some(idx) => self
                .graph
                .neighbors_directed(idx, Direction::Outgoing)
                .map(|n| self.graph[n].id)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Keep only the nodes in `keep` and the edges between them
    pub fn retain_nodes(&mut self, keep: &HashSet<NodeIndex>) {
        let graph = self.graph.filter_map(
            |idx, node| keep.contains(&idx).then(|| node.clone()),
            |_, edge| Some(edge.clone()),
        );
        *self = Self::from_petgraph(graph);
    }

    pub(crate) fn node_index(&self, id: u64) -> Option<NodeIndex> {
        self.index.get(&id).copied()
    }

    pub(crate) fn inner(&self) -> &DiGraph<RoadNode, RoadEdge> {
        &self.graph
    }

    pub(crate) fn from_petgraph(graph: DiGraph<RoadNode, RoadEdge>) -> Self {
        let index = graph
            .node_indices()
            .map(|idx| (graph[idx].id, idx))
            .collect();
        Self { graph, index }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a graph from (id, lat, lon) nodes and (from, to, length) edges
    pub(crate) fn graph_from(nodes: &[(u64, f64, f64)], edges: &[(u64, u64, f64)]) -> RoadGraph {
        let mut graph = RoadGraph::new();
        for &(id, lat, lon) in nodes {
            graph.add_node(RoadNode::new(id, lat, lon));
        }
        for &(from, to, length) in edges {
            let edge = RoadEdge {
                ways: vec![1],
                length: Some(length),
                highway: TagValue::Text("residential".to_string()),
                ..Default::default()
            };
            graph.add_edge(from, to, edge).unwrap();
        }
        graph
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let mut graph = RoadGraph::new();
        let a = graph.add_node(RoadNode::new(7, 14.6, 121.1));
        let b = graph.add_node(RoadNode::new(7, 0.0, 0.0));
        assert_eq!(a, b);
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.node(7).unwrap().lat, 14.6);
    }

    #[test]
    fn test_add_edge_unknown_node() {
        let mut graph = graph_from(&[(1, 0.0, 0.0)], &[]);
        let err = graph.add_edge(1, 2, RoadEdge::default()).unwrap_err();
        assert!(matches!(err, GraphError::UnknownNode(2)));
    }

    #[test]
    fn test_parallel_edges_are_kept() {
        let graph = graph_from(
            &[(1, 0.0, 0.0), (2, 0.0, 0.001)],
            &[(1, 2, 100.0), (1, 2, 120.0)],
        );
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.successors(1), vec![2, 2]);
    }

    #[test]
    fn test_retain_nodes_drops_dangling_edges() {
        let mut graph = graph_from(
            &[(1, 0.0, 0.0), (2, 0.0, 0.001), (3, 0.0, 0.002)],
            &[(1, 2, 100.0), (2, 3, 100.0), (3, 1, 200.0)],
        );
        let keep: HashSet<NodeIndex> = [1, 2]
            .iter()
            .filter_map(|&id| graph.node_index(id))
            .collect();
        graph.retain_nodes(&keep);

        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert!(!graph.contains_node(3));
        assert_eq!(graph.successors(1), vec![2]);
    }

    #[test]
    fn test_great_circle_length() {
        let a = RoadNode::new(1, 14.65, 121.10);
        let b = RoadNode::new(2, 14.66, 121.10);
        // 0.01 degrees of latitude is roughly 1.1 km
        let d = great_circle_length(&a, &b);
        assert!((d - 1112.0).abs() < 5.0);
    }
}
