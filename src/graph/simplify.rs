//! Topological simplification of the raw OSM graph
//!
//! A raw graph has one edge per pair of consecutive way nodes, so a curved
//! street is a long chain of interstitial nodes. Simplification keeps only
//! endpoints (intersections, dead ends, loop points) and replaces each chain
//! between them with a single edge carrying the chain's geometry.

use super::{RoadEdge, RoadGraph, RoadNode};
use crate::domain::TagValue;
use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Counts before and after simplification
#[derive(Debug, Default, Clone)]
pub struct SimplifyReport {
    pub nodes_before: usize,
    pub nodes_after: usize,
    pub edges_before: usize,
    pub edges_after: usize,
    /// Chains collapsed into a single edge
    pub merged_paths: usize,
}

impl SimplifyReport {
    pub fn summary(&self) -> String {
        format!(
            "Simplified {} -> {} nodes, {} -> {} edges ({} chains merged)",
            self.nodes_before, self.nodes_after, self.edges_before, self.edges_after, self.merged_paths
        )
    }
}

/// Whether a node must survive simplification.
///
/// With `strict`, a node where two different OSM ways meet is always kept,
/// so merged edges never span more than one way.
fn is_endpoint(g: &DiGraph<RoadNode, RoadEdge>, node: NodeIndex, strict: bool) -> bool {
    let preds: Vec<NodeIndex> = g.neighbors_directed(node, Direction::Incoming).collect();
    let succs: Vec<NodeIndex> = g.neighbors_directed(node, Direction::Outgoing).collect();

    if succs.contains(&node) {
        return true;
    }
    if preds.is_empty() || succs.is_empty() {
        return true;
    }

    let neighbors: HashSet<NodeIndex> = preds.iter().chain(succs.iter()).copied().collect();
    let degree = preds.len() + succs.len();
    if !(neighbors.len() == 2 && (degree == 2 || degree == 4)) {
        return true;
    }

    if strict {
        let ways: HashSet<u64> = g
            .edges_directed(node, Direction::Incoming)
            .chain(g.edges_directed(node, Direction::Outgoing))
            .flat_map(|e| e.weight().ways.iter().copied())
            .collect();
        return ways.len() > 1;
    }

    false
}

/// Follow interstitial nodes from `first` until an endpoint is reached.
///
/// Returns `None` when the walk dead-ends on a node that is not an endpoint,
/// which leaves that chain unsimplified.
fn walk_chain(
    g: &DiGraph<RoadNode, RoadEdge>,
    start: NodeIndex,
    first: EdgeIndex,
    endpoints: &HashSet<NodeIndex>,
) -> Option<Vec<EdgeIndex>> {
    let mut path = vec![first];
    let mut prev = start;
    let (_, mut current) = g.edge_endpoints(first)?;

    while !endpoints.contains(&current) && current != start {
        let next = g
            .edges_directed(current, Direction::Outgoing)
            .find(|e| e.target() != prev)?;
        path.push(next.id());
        prev = current;
        current = next.target();

        if path.len() > g.edge_count() {
            return None;
        }
    }

    Some(path)
}

fn merge_chain(g: &DiGraph<RoadNode, RoadEdge>, path: &[EdgeIndex]) -> Option<(NodeIndex, NodeIndex, RoadEdge)> {
    let (from, _) = g.edge_endpoints(*path.first()?)?;
    let (_, to) = g.edge_endpoints(*path.last()?)?;
    let edges: Vec<&RoadEdge> = path.iter().map(|&e| &g[e]).collect();

    let mut geometry = vec![(g[from].lat, g[from].lon)];
    for &e in path {
        let (_, target) = g.edge_endpoints(e)?;
        geometry.push((g[target].lat, g[target].lon));
    }

    let mut ways: Vec<u64> = Vec::new();
    for way in edges.iter().flat_map(|e| e.ways.iter()) {
        if !ways.contains(way) {
            ways.push(*way);
        }
    }

    let lengths: Vec<f64> = edges.iter().filter_map(|e| e.length).collect();
    let length: Option<f64> = (!lengths.is_empty()).then(|| lengths.iter().sum());
    let travel_time = edges
        .iter()
        .map(|e| e.travel_time)
        .sum::<Option<f64>>();

    let merged = RoadEdge {
        ways,
        length,
        highway: TagValue::merge(edges.iter().map(|e| &e.highway)),
        maxspeed: TagValue::merge(edges.iter().map(|e| &e.maxspeed)),
        name: TagValue::merge(edges.iter().map(|e| &e.name)),
        oneway: edges.iter().all(|e| e.oneway),
        geometry: Some(geometry),
        travel_time,
    };
    Some((from, to, merged))
}

/// Drop chains that would lose edges when merged.
///
/// A chain survives only if none of its edges belongs to another chain and
/// every edge touching its interior nodes is part of some surviving chain.
/// Dropping a chain can invalidate another, so this runs to a fixpoint.
fn retain_disjoint_chains(g: &DiGraph<RoadNode, RoadEdge>, chains: &mut Vec<Vec<EdgeIndex>>) {
    loop {
        let before = chains.len();

        let mut usage: HashMap<EdgeIndex, usize> = HashMap::new();
        for &e in chains.iter().flatten() {
            *usage.entry(e).or_default() += 1;
        }

        chains.retain(|path| {
            let exclusive = path.iter().all(|e| usage.get(e) == Some(&1));
            let covered = path[..path.len() - 1].iter().all(|&e| {
                g.edge_endpoints(e).is_some_and(|(_, node)| {
                    g.edges_directed(node, Direction::Incoming)
                        .chain(g.edges_directed(node, Direction::Outgoing))
                        .all(|incident| usage.contains_key(&incident.id()))
                })
            });
            exclusive && covered
        });

        if chains.len() == before {
            break;
        }
    }
}

/// Collapse chains of interstitial nodes into single edges
pub fn simplify_graph(graph: &mut RoadGraph, strict: bool) -> SimplifyReport {
    let g = graph.inner();
    let mut report = SimplifyReport {
        nodes_before: g.node_count(),
        edges_before: g.edge_count(),
        ..Default::default()
    };

    let endpoints: HashSet<NodeIndex> = g
        .node_indices()
        .filter(|&n| is_endpoint(g, n, strict))
        .collect();
    debug!("Identified {} endpoint nodes", endpoints.len());

    let mut chains: Vec<Vec<EdgeIndex>> = Vec::new();
    for start in g.node_indices().filter(|n| endpoints.contains(n)) {
        for edge in g.edges_directed(start, Direction::Outgoing) {
            if let Some(path) = walk_chain(g, start, edge.id(), &endpoints)
                && path.len() >= 2
            {
                chains.push(path);
            }
        }
    }

    retain_disjoint_chains(g, &mut chains);

    let mut interstitial: HashSet<NodeIndex> = HashSet::new();
    let mut consumed: HashSet<EdgeIndex> = HashSet::new();
    for path in &chains {
        for &e in &path[..path.len() - 1] {
            if let Some((_, target)) = g.edge_endpoints(e) {
                interstitial.insert(target);
            }
        }
        consumed.extend(path.iter().copied());
    }

    let mut simplified: DiGraph<RoadNode, RoadEdge> = DiGraph::new();
    let mut remap: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    for idx in g.node_indices() {
        if !interstitial.contains(&idx) {
            remap.insert(idx, simplified.add_node(g[idx].clone()));
        }
    }

    for edge in g.edge_references() {
        if consumed.contains(&edge.id()) {
            continue;
        }
        if let (Some(&a), Some(&b)) = (remap.get(&edge.source()), remap.get(&edge.target())) {
            simplified.add_edge(a, b, edge.weight().clone());
        }
    }

    for path in &chains {
        if let Some((from, to, merged)) = merge_chain(g, path)
            && let (Some(&a), Some(&b)) = (remap.get(&from), remap.get(&to))
        {
            simplified.add_edge(a, b, merged);
            report.merged_paths += 1;
        }
    }

    *graph = RoadGraph::from_petgraph(simplified);
    report.nodes_after = graph.node_count();
    report.edges_after = graph.edge_count();
    info!("{}", report.summary());
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::graph_from;

    fn set_way(graph: &mut RoadGraph, way: u64) {
        for edge in graph.edges_mut() {
            edge.ways = vec![way];
        }
    }

    #[test]
    fn test_two_way_chain_collapses() {
        // 1 - 2 - 3 - 4 as a two-way street, 1 and 4 are dead ends
        let mut graph = graph_from(
            &[(1, 0.0, 0.0), (2, 0.0, 0.001), (3, 0.0, 0.002), (4, 0.0, 0.003)],
            &[
                (1, 2, 100.0),
                (2, 1, 100.0),
                (2, 3, 110.0),
                (3, 2, 110.0),
                (3, 4, 120.0),
                (4, 3, 120.0),
            ],
        );

        let report = simplify_graph(&mut graph, true);
        assert_eq!(report.merged_paths, 2);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.contains_node(1));
        assert!(graph.contains_node(4));

        for (from, to, edge) in graph.edges() {
            assert_eq!(edge.length, Some(330.0));
            let geometry = edge.geometry.as_ref().unwrap();
            assert_eq!(geometry.len(), 4);
            assert_eq!(geometry[0], (from.lat, from.lon));
            assert_eq!(geometry[3], (to.lat, to.lon));
        }
    }

    #[test]
    fn test_one_way_chain_collapses() {
        // 1 -> 2 -> 3 -> 1 would be a ring; add 3 -> 4 so 3 is an endpoint
        let mut graph = graph_from(
            &[(1, 0.0, 0.0), (2, 0.0, 0.001), (3, 0.0, 0.002), (4, 0.0, 0.003)],
            &[(1, 2, 10.0), (2, 3, 10.0), (3, 1, 10.0), (3, 4, 10.0), (4, 3, 10.0)],
        );
        simplify_graph(&mut graph, true);

        // Node 2 sits in the middle of 1 -> 2 -> 3; node 1 does too (3 -> 1 -> 2)
        assert!(!graph.contains_node(2));
        assert!(graph.contains_node(3));
        assert!(graph.contains_node(4));
    }

    #[test]
    fn test_intersection_is_kept() {
        // Star around node 1
        let mut graph = graph_from(
            &[(1, 0.0, 0.0), (2, 0.0, 0.001), (3, 0.001, 0.0), (4, -0.001, 0.0)],
            &[
                (1, 2, 10.0),
                (2, 1, 10.0),
                (1, 3, 10.0),
                (3, 1, 10.0),
                (1, 4, 10.0),
                (4, 1, 10.0),
            ],
        );
        let report = simplify_graph(&mut graph, true);
        assert_eq!(report.merged_paths, 0);
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 6);
    }

    #[test]
    fn test_attributes_merge_into_lists() {
        let mut graph = graph_from(
            &[(1, 0.0, 0.0), (2, 0.0, 0.001), (3, 0.0, 0.002)],
            &[(1, 2, 50.0), (2, 3, 70.0)],
        );
        let mut way = 10;
        for edge in graph.edges_mut() {
            edge.ways = vec![way];
            edge.maxspeed = TagValue::Text(format!("{}", way * 2));
            way += 1;
        }

        // Non-strict lets the chain span both ways
        let report = simplify_graph(&mut graph, false);
        assert_eq!(report.merged_paths, 1);
        let (_, _, edge) = graph.edges().next().unwrap();
        assert_eq!(edge.length, Some(120.0));
        assert_eq!(edge.highway, TagValue::Text("residential".to_string()));
        assert!(matches!(edge.maxspeed, TagValue::List(ref v) if v.len() == 2));
        assert_eq!(edge.ways.len(), 2);
    }

    #[test]
    fn test_strict_splits_on_way_change() {
        let mut graph = graph_from(
            &[(1, 0.0, 0.0), (2, 0.0, 0.001), (3, 0.0, 0.002)],
            &[(1, 2, 50.0), (2, 3, 70.0)],
        );
        let mut way = 10;
        for edge in graph.edges_mut() {
            edge.ways = vec![way];
            way += 1;
        }
        let report = simplify_graph(&mut graph, true);
        assert_eq!(report.merged_paths, 0);
        assert_eq!(graph.node_count(), 3);
    }

    #[test]
    fn test_parallel_edges_into_two_way_street_keep_every_edge() {
        // Two parallel edges 1 -> 2 feed the two-way street 2 - 3
        let mut graph = graph_from(
            &[(1, 0.0, 0.0), (2, 0.0, 0.001), (3, 0.0, 0.002)],
            &[(1, 2, 10.0), (1, 2, 12.0), (2, 3, 10.0), (3, 2, 10.0)],
        );
        let report = simplify_graph(&mut graph, false);

        assert_eq!(report.merged_paths, 0);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.successors(3), vec![2]);
        assert_eq!(graph.successors(2), vec![3]);
    }

    #[test]
    fn test_isolated_ring_is_untouched() {
        let mut graph = graph_from(
            &[(1, 0.0, 0.0), (2, 0.0, 0.001), (3, 0.001, 0.0)],
            &[(1, 2, 10.0), (2, 3, 10.0), (3, 1, 10.0)],
        );
        set_way(&mut graph, 5);
        simplify_graph(&mut graph, true);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
    }
}
