use crate::api::{Element, OverpassResponse};
use crate::domain::{Facility, TagValue};
use crate::graph::{RoadEdge, RoadGraph, RoadNode, great_circle_length};
use std::collections::HashMap;

/// Travel direction permitted on a way
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WayDirection {
    Forward,
    Backward,
    Both,
}

impl WayDirection {
    /// Derive the direction from `oneway` and `junction` tags
    pub fn from_element(element: &Element) -> Self {
        match element.tag("oneway") {
            Some("yes" | "true" | "1") => WayDirection::Forward,
            Some("-1" | "reverse") => WayDirection::Backward,
            Some("no" | "false" | "0") => WayDirection::Both,
            _ if element.tag("junction") == Some("roundabout") => WayDirection::Forward,
            _ => WayDirection::Both,
        }
    }
}

fn build_node_lookup(response: &OverpassResponse) -> HashMap<u64, (f64, f64)> {
    response
        .elements
        .iter()
        .filter(|e| e.type_ == "node")
        .filter_map(|e| {
            let lat = e.lat?;
            let lon = e.lon?;
            Some((e.id, (lat, lon)))
        })
        .collect()
}

/// Parse Overpass response into a raw directed road graph
///
/// # Algorithm
/// 1. Build node_id → (lat, lon) lookup map from all node elements
/// 2. For each way element with a highway tag, add one edge per pair of
///    consecutive resolvable nodes, in the directions the way allows
///
/// Edge length is the great-circle distance between the two nodes.
pub fn parse_drive_network(response: &OverpassResponse) -> RoadGraph {
    let nodes = build_node_lookup(response);
    let mut graph = RoadGraph::new();

    for element in &response.elements {
        if element.type_ != "way" {
            continue;
        }

        let Some(highway) = element.tag("highway") else {
            continue;
        };

        let node_refs = match &element.nodes {
            Some(n) => n,
            None => continue,
        };

        let direction = WayDirection::from_element(element);
        let template = RoadEdge {
            ways: vec![element.id],
            highway: TagValue::Text(highway.to_string()),
            maxspeed: TagValue::from_tag(element.tag("maxspeed")),
            name: TagValue::from_tag(element.tag("name")),
            oneway: direction != WayDirection::Both,
            ..Default::default()
        };

        for window in node_refs.windows(2) {
            let (u, v) = (window[0], window[1]);
            if u == v {
                continue;
            }
            let (Some(&(lat_u, lon_u)), Some(&(lat_v, lon_v))) = (nodes.get(&u), nodes.get(&v))
            else {
                continue;
            };

            let a = RoadNode::new(u, lat_u, lon_u);
            let b = RoadNode::new(v, lat_v, lon_v);
            let edge = RoadEdge {
                length: Some(great_circle_length(&a, &b)),
                ..template.clone()
            };
            graph.add_node(a);
            graph.add_node(b);

            // Both nodes were just inserted, so these cannot fail
            let added = match direction {
                WayDirection::Forward => graph.add_edge(u, v, edge).map(|_| ()),
                WayDirection::Backward => graph.add_edge(v, u, edge).map(|_| ()),
                WayDirection::Both => graph
                    .add_edge(u, v, edge.clone())
                    .and_then(|_| graph.add_edge(v, u, edge))
                    .map(|_| ()),
            };
            if let Err(e) = added {
                tracing::warn!("Skipping segment {} -> {} of way {}: {}", u, v, element.id, e);
            }
        }
    }

    graph
}

/// Parse Overpass amenity elements into facilities.
///
/// Nodes carry coordinates directly, ways and relations through their
/// `center`. Elements without coordinates are dropped.
pub fn parse_facilities(response: &OverpassResponse) -> Vec<Facility> {
    response
        .elements
        .iter()
        .filter_map(|element| {
            let (lat, lon) = match (element.lat, element.lon, element.center) {
                (Some(lat), Some(lon), _) => (lat, lon),
                (_, _, Some(center)) => (center.lat, center.lon),
                _ => return None,
            };
            let name = element.tag("name").unwrap_or("Unnamed");
            Some(Facility::new(name, lat, lon))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::overpass::Center;

    fn node(id: u64, lat: f64, lon: f64) -> Element {
        Element {
            type_: "node".to_string(),
            id,
            lat: Some(lat),
            lon: Some(lon),
            nodes: None,
            tags: None,
            center: None,
        }
    }

    fn way(id: u64, nodes: Vec<u64>, tags: &[(&str, &str)]) -> Element {
        Element {
            type_: "way".to_string(),
            id,
            lat: None,
            lon: None,
            nodes: Some(nodes),
            tags: Some(
                tags.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            center: None,
        }
    }

    #[test]
    fn test_parse_two_way_road() {
        let response = OverpassResponse {
            elements: vec![
                node(1, 14.650, 121.100),
                node(2, 14.651, 121.100),
                node(3, 14.652, 121.100),
                way(100, vec![1, 2, 3], &[("highway", "primary"), ("maxspeed", "50")]),
            ],
        };

        let graph = parse_drive_network(&response);
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 4);

        for (_, _, edge) in graph.edges() {
            assert_eq!(edge.ways, vec![100]);
            assert_eq!(edge.highway, TagValue::Text("primary".to_string()));
            assert_eq!(edge.maxspeed, TagValue::Text("50".to_string()));
            assert!(!edge.oneway);
            let length = edge.length.unwrap();
            assert!((length - 111.2).abs() < 1.0);
        }
    }

    #[test]
    fn test_oneway_directions() {
        let response = OverpassResponse {
            elements: vec![
                node(1, 0.0, 0.0),
                node(2, 0.0, 0.001),
                node(3, 0.0, 0.002),
                way(10, vec![1, 2], &[("highway", "residential"), ("oneway", "yes")]),
                way(11, vec![2, 3], &[("highway", "residential"), ("oneway", "-1")]),
            ],
        };

        let graph = parse_drive_network(&response);
        assert_eq!(graph.edge_count(), 2);
        assert_eq!(graph.successors(1), vec![2]);
        assert_eq!(graph.successors(3), vec![2]);
        assert!(graph.successors(2).is_empty());
        assert!(graph.edges().all(|(_, _, e)| e.oneway));
    }

    #[test]
    fn test_roundabout_is_oneway() {
        let mut roundabout = way(20, vec![1, 2], &[("highway", "tertiary"), ("junction", "roundabout")]);
        assert_eq!(WayDirection::from_element(&roundabout), WayDirection::Forward);

        roundabout.tags.as_mut().unwrap().insert("oneway".to_string(), "no".to_string());
        assert_eq!(WayDirection::from_element(&roundabout), WayDirection::Both);
    }

    #[test]
    fn test_missing_nodes_skip_segments() {
        let response = OverpassResponse {
            elements: vec![
                node(1, 0.0, 0.0),
                node(3, 0.0, 0.002),
                way(30, vec![1, 2, 3], &[("highway", "primary")]),
                way(31, vec![1, 3], &[("building", "yes")]),
            ],
        };
        let graph = parse_drive_network(&response);
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.node_count(), 0);
    }

    #[test]
    fn test_parse_facilities() {
        let mut hospital = node(1, 14.63, 121.10);
        hospital.tags = Some(
            [("amenity", "hospital"), ("name", "Marikina Valley Medical Center")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        let mut campus = way(2, vec![], &[("amenity", "hospital")]);
        campus.center = Some(Center {
            lat: 14.64,
            lon: 121.11,
        });
        let relation_without_center = Element {
            type_: "relation".to_string(),
            id: 3,
            lat: None,
            lon: None,
            nodes: None,
            tags: None,
            center: None,
        };

        let response = OverpassResponse {
            elements: vec![hospital, campus, relation_without_center],
        };

        let facilities = parse_facilities(&response);
        assert_eq!(facilities.len(), 2);
        assert_eq!(facilities[0].name, "Marikina Valley Medical Center");
        assert_eq!(facilities[1], Facility::new("Unnamed", 14.64, 121.11));
    }
}
