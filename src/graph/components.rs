use super::RoadGraph;
use petgraph::algo::tarjan_scc;
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use std::collections::HashSet;
use tracing::{debug, info};

/// Size of one strongly connected component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentSummary {
    pub nodes: usize,
    /// Edges with both endpoints inside the component
    pub edges: usize,
}

/// Result of component analysis, taken before any reduction
#[derive(Debug, Clone, Default)]
pub struct ComponentReport {
    /// Every component in enumeration order
    pub components: Vec<ComponentSummary>,
    /// Position of the largest component in `components`
    pub largest: Option<usize>,
    /// True when the graph was a single component and was left untouched
    pub already_connected: bool,
    /// Nodes dropped by the reduction
    pub removed_nodes: usize,
    /// Edges dropped by the reduction
    pub removed_edges: usize,
}

impl ComponentReport {
    pub fn count(&self) -> usize {
        self.components.len()
    }

    pub fn largest_size(&self) -> usize {
        self.largest
            .map(|i| self.components[i].nodes)
            .unwrap_or(0)
    }

    pub fn summary(&self) -> String {
        if self.components.is_empty() {
            "Graph is empty: 0 strongly connected components".to_string()
        } else if self.already_connected {
            format!(
                "Graph is strongly connected ({} nodes, {} edges)",
                self.components[0].nodes, self.components[0].edges
            )
        } else {
            format!(
                "{} strongly connected components; kept largest with {} nodes, removed {} nodes and {} edges",
                self.count(),
                self.largest_size(),
                self.removed_nodes,
                self.removed_edges
            )
        }
    }
}

/// Partition the graph into strongly connected components
pub fn strongly_connected_components(graph: &RoadGraph) -> Vec<Vec<NodeIndex>> {
    tarjan_scc(graph.inner())
}

/// Enumerate components and their sizes without modifying the graph
pub fn component_report(graph: &RoadGraph) -> ComponentReport {
    let components = strongly_connected_components(graph);
    summarize(graph, &components)
}

/// Reduce the graph to its largest strongly connected component.
///
/// Ties go to the component enumerated first. A graph that is already
/// strongly connected, or empty, is left as is.
pub fn reduce_to_largest_component(graph: &mut RoadGraph) -> ComponentReport {
    let components = strongly_connected_components(graph);
    let mut report = summarize(graph, &components);

    for (i, component) in report.components.iter().enumerate() {
        debug!(
            "Component {}: {} nodes, {} edges",
            i, component.nodes, component.edges
        );
    }

    let Some(largest) = report.largest else {
        info!("Graph is empty, nothing to reduce");
        return report;
    };

    if report.already_connected {
        info!("Graph is strongly connected");
        return report;
    }

    info!(
        "Graph is not strongly connected ({} components), using largest component",
        report.count()
    );

    let before_nodes = graph.node_count();
    let before_edges = graph.edge_count();
    let keep: HashSet<NodeIndex> = components[largest].iter().copied().collect();
    graph.retain_nodes(&keep);

    report.removed_nodes = before_nodes - graph.node_count();
    report.removed_edges = before_edges - graph.edge_count();
    report
}

fn summarize(graph: &RoadGraph, components: &[Vec<NodeIndex>]) -> ComponentReport {
    let inner = graph.inner();
    let mut membership = vec![usize::MAX; inner.node_count()];
    for (i, component) in components.iter().enumerate() {
        for node in component {
            membership[node.index()] = i;
        }
    }

    let mut summaries: Vec<ComponentSummary> = components
        .iter()
        .map(|c| ComponentSummary {
            nodes: c.len(),
            edges: 0,
        })
        .collect();

    for edge in inner.edge_references() {
        let a = membership[edge.source().index()];
        if a == membership[edge.target().index()] {
            summaries[a].edges += 1;
        }
    }

    // First maximum wins on ties
    let mut largest: Option<usize> = None;
    for (i, summary) in summaries.iter().enumerate() {
        match largest {
            Some(best) if summaries[best].nodes >= summary.nodes => {}
            _ => largest = Some(i),
        }
    }

    ComponentReport {
        already_connected: summaries.len() == 1,
        components: summaries,
        largest,
        removed_nodes: 0,
        removed_edges: 0,
    }
}
