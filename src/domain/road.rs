/// Road classification based on OSM highway tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoadClass {
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Residential,
    Unclassified,
}

impl RoadClass {
    /// Classify a highway tag value into a RoadClass.
    ///
    /// Only exact class names are recognised; link roads and other highway
    /// values return `None` and use the fallback speed.
    pub fn from_highway_tag(tag: &str) -> Option<RoadClass> {
        match tag {
            "motorway" => Some(RoadClass::Motorway),
            "trunk" => Some(RoadClass::Trunk),
            "primary" => Some(RoadClass::Primary),
            "secondary" => Some(RoadClass::Secondary),
            "tertiary" => Some(RoadClass::Tertiary),
            "residential" => Some(RoadClass::Residential),
            "unclassified" => Some(RoadClass::Unclassified),
            _ => None,
        }
    }
}

/// Highway values accepted into the drivable network.
///
/// Mirrors the usual "drive" filter: everything tagged `highway` except
/// paths, tracks, construction and similar non-motorised or abandoned ways.
pub const EXCLUDED_HIGHWAYS: &[&str] = &[
    "abandoned",
    "bridleway",
    "bus_guideway",
    "construction",
    "corridor",
    "cycleway",
    "elevator",
    "escalator",
    "footway",
    "no",
    "path",
    "pedestrian",
    "planned",
    "platform",
    "proposed",
    "raceway",
    "razed",
    "service",
    "steps",
    "track",
];
