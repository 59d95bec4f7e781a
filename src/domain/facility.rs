use serde::{Deserialize, Serialize};

/// A named point of interest, e.g. a hospital
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Facility {
    pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
        }
    }
}

/// A facility mapped onto the road graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnappedFacility {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// OSM id of the nearest graph node
    pub node_id: u64,
}

impl SnappedFacility {
    pub fn new(facility: &Facility, node_id: u64) -> Self {
        Self {
            name: facility.name.clone(),
            latitude: facility.latitude,
            longitude: facility.longitude,
            node_id,
        }
    }
}
