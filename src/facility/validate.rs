use crate::domain::SnappedFacility;
use crate::graph::RoadGraph;
use tracing::{info, warn};

/// Whether one snapped facility still points at a graph node
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCheck {
    pub name: String,
    pub node_id: u64,
    pub valid: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ConnectivityReport {
    pub checks: Vec<NodeCheck>,
}

impl ConnectivityReport {
    pub fn valid_count(&self) -> usize {
        self.checks.iter().filter(|c| c.valid).count()
    }

    pub fn invalid_count(&self) -> usize {
        self.checks.len() - self.valid_count()
    }

    pub fn all_valid(&self) -> bool {
        self.checks.iter().all(|c| c.valid)
    }

    pub fn invalid(&self) -> impl Iterator<Item = &NodeCheck> {
        self.checks.iter().filter(|c| !c.valid)
    }
}

/// Confirm every snapped facility references a node of `graph`
pub fn validate_connectivity(
    facilities: &[SnappedFacility],
    graph: &RoadGraph,
) -> ConnectivityReport {
    let checks: Vec<NodeCheck> = facilities
        .iter()
        .map(|facility| {
            let valid = graph.contains_node(facility.node_id);
            if valid {
                info!(
                    "Valid: facility '{}' mapped to node {}",
                    facility.name, facility.node_id
                );
            } else {
                warn!(
                    "Invalid: facility '{}' node {} not in graph",
                    facility.name, facility.node_id
                );
            }
            NodeCheck {
                name: facility.name.clone(),
                node_id: facility.node_id,
                valid,
            }
        })
        .collect();

    ConnectivityReport { checks }
}
