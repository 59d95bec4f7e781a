use crate::domain::{Facility, SnappedFacility};
use crate::geometry::Projector;
use crate::graph::RoadGraph;
use rstar::RTree;
use rstar::primitives::GeomWithData;
use std::fmt;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SnapError {
    #[error("Invalid coordinates ({lat}, {lon})")]
    InvalidCoordinates { lat: f64, lon: f64 },
    #[error("Road graph has no nodes to snap to")]
    EmptyGraph,
}

/// Lookup of the graph node closest to a coordinate
pub trait NearestNode {
    /// OSM id of the node nearest to (lat, lon)
    fn nearest(&self, lat: f64, lon: f64) -> Result<u64, SnapError>;
}

type IndexedNode = GeomWithData<[f64; 2], u64>;

/// R-tree of graph nodes in a local planar projection
pub struct NodeLocator {
    projector: Projector,
    tree: RTree<IndexedNode>,
}

impl NodeLocator {
    /// Index every node of the graph, projected around the graph's mean position
    pub fn new(graph: &RoadGraph) -> Self {
        let positions: Vec<(f64, f64)> = graph.nodes().map(|n| (n.lat, n.lon)).collect();
        let projector = Projector::centered_on(&positions);

        let items: Vec<IndexedNode> = graph
            .nodes()
            .map(|n| {
                let (x, y) = projector.project(n.lat, n.lon);
                GeomWithData::new([x, y], n.id)
            })
            .collect();

        Self {
            projector,
            tree: RTree::bulk_load(items),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

impl NearestNode for NodeLocator {
    fn nearest(&self, lat: f64, lon: f64) -> Result<u64, SnapError> {
        let valid = lat.is_finite()
            && lon.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lon);
        if !valid {
            return Err(SnapError::InvalidCoordinates { lat, lon });
        }

        let (x, y) = self.projector.project(lat, lon);
        self.tree
            .nearest_neighbor(&[x, y])
            .map(|node| node.data)
            .ok_or(SnapError::EmptyGraph)
    }
}

/// A facility whose nearest node is not part of the graph
#[derive(Debug, Clone, PartialEq)]
pub struct SnapWarning {
    pub name: String,
    pub node_id: u64,
}

impl fmt::Display for SnapWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Facility '{}' maps to node {} outside graph",
            self.name, self.node_id
        )
    }
}

/// A facility that could not be snapped at all
#[derive(Debug, Clone, PartialEq)]
pub struct SnapFailure {
    pub name: String,
    pub error: SnapError,
}

/// Outcome of snapping a batch of facilities
#[derive(Debug, Default)]
pub struct SnapReport {
    pub snapped: Vec<SnappedFacility>,
    /// One entry per facility excluded for mapping outside the graph
    pub warnings: Vec<SnapWarning>,
    pub failures: Vec<SnapFailure>,
}

impl SnapReport {
    pub fn summary(&self) -> String {
        format!(
            "{} snapped, {} outside graph, {} failed",
            self.snapped.len(),
            self.warnings.len(),
            self.failures.len()
        )
    }
}

/// Snap each facility to its nearest graph node.
///
/// A facility whose nearest node is missing from `graph` is excluded with a
/// warning; a facility that fails to snap is logged and skipped. Neither
/// stops the batch.
pub fn snap_facilities<L: NearestNode + ?Sized>(
    facilities: &[Facility],
    locator: &L,
    graph: &RoadGraph,
) -> SnapReport {
    let mut report = SnapReport::default();

    for facility in facilities {
        match locator.nearest(facility.latitude, facility.longitude) {
            Ok(node_id) if graph.contains_node(node_id) => {
                report.snapped.push(SnappedFacility::new(facility, node_id));
            }
            Ok(node_id) => {
                let warning = SnapWarning {
                    name: facility.name.clone(),
                    node_id,
                };
                warn!("{}", warning);
                report.warnings.push(warning);
            }
            Err(e) => {
                error!("Error snapping facility '{}': {}", facility.name, e);
                report.failures.push(SnapFailure {
                    name: facility.name.clone(),
                    error: e,
                });
            }
        }
    }

    info!("{}", report.summary());
    report
}
