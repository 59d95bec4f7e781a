use crate::graph::RoadGraph;
use geo::{Contains, MultiPolygon};

/// How many graph nodes fall inside a place boundary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageReport {
    pub within: usize,
    pub total: usize,
}

impl CoverageReport {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.within as f64 / self.total as f64 * 100.0
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} of {} nodes within boundary ({:.2}%)",
            self.within,
            self.total,
            self.percent()
        )
    }
}

/// Count the nodes of `graph` strictly inside `boundary`
pub fn boundary_coverage(graph: &RoadGraph, boundary: &MultiPolygon<f64>) -> CoverageReport {
    let within = graph
        .nodes()
        .filter(|node| boundary.contains(&node.point()))
        .count();
    CoverageReport {
        within,
        total: graph.node_count(),
    }
}
