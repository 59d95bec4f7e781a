use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::OverpassConfig;
use crate::domain::road::EXCLUDED_HIGHWAYS;

const USER_AGENT: &str = concat!("roadpoi/", env!("CARGO_PKG_VERSION"));

/// Raw Overpass API response
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    pub elements: Vec<Element>,
}

/// A single element from Overpass (node, way or relation)
#[derive(Debug, Deserialize)]
pub struct Element {
    #[serde(rename = "type")]
    pub type_: String,
    pub id: u64,
    #[serde(default)]
    pub nodes: Option<Vec<u64>>,
    #[serde(default)]
    pub tags: Option<HashMap<String, String>>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    /// Centroid of ways and relations, present with `out center`
    #[serde(default)]
    pub center: Option<Center>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Center {
    pub lat: f64,
    pub lon: f64,
}

impl Element {
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.as_ref()?.get(key).map(String::as_str)
    }
}

/// The area a query is restricted to
#[derive(Debug, Clone, PartialEq)]
pub enum AreaSelector {
    /// Overpass area id, usually derived from a geocoded place
    Id(u64),
    /// Administrative boundary looked up by name
    Named { name: String, admin_level: Option<u8> },
}

impl AreaSelector {
    /// Overpass QL statement storing the area in `.searchArea`
    fn to_ql(&self) -> String {
        match self {
            AreaSelector::Id(id) => format!("area(id:{})->.searchArea;", id),
            AreaSelector::Named { name, admin_level } => {
                let level = admin_level
                    .map(|l| format!("[\"admin_level\"=\"{}\"]", l))
                    .unwrap_or_default();
                format!(
                    "area[\"name\"=\"{}\"][\"boundary\"=\"administrative\"]{}->.searchArea;",
                    escape_ql(name),
                    level
                )
            }
        }
    }
}

fn escape_ql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Query for the drivable road network inside an area.
///
/// The way filter excludes non-motorised, abandoned and private ways, and
/// service roads such as driveways and parking aisles.
pub fn drive_network_query(area: &AreaSelector, timeout_secs: u64) -> String {
    format!(
        r#"[out:json][timeout:{timeout}];
{area}
(
  way["highway"]["area"!~"yes"]["highway"!~"{excluded}"]["motor_vehicle"!~"no"]["motorcar"!~"no"]["access"!~"private"]["service"!~"alley|driveway|emergency_access|parking|parking_aisle|private"](area.searchArea);
);
(._;>;);
out body;"#,
        timeout = timeout_secs,
        area = area.to_ql(),
        excluded = EXCLUDED_HIGHWAYS.join("|"),
    )
}

/// Query for active amenities of one kind inside an area
pub fn amenity_query(area: &AreaSelector, amenity: &str, timeout_secs: u64) -> String {
    let filter = format!(
        "[\"amenity\"=\"{}\"][\"disused\"!=\"yes\"][\"closed\"!=\"yes\"](area.searchArea);",
        escape_ql(amenity)
    );
    format!(
        r#"[out:json][timeout:{timeout}];
{area}
(
  node{filter}
  way{filter}
  relation{filter}
);
out center;"#,
        timeout = timeout_secs,
        area = area.to_ql(),
        filter = filter,
    )
}

/// Fetch the drivable road network for an area
pub fn fetch_drive_network(area: &AreaSelector, config: &OverpassConfig) -> Result<OverpassResponse> {
    // Server-side timeout slightly below the client's
    let query = drive_network_query(area, config.timeout_secs.saturating_sub(20).max(25));
    execute_overpass_query(&query, config)
}

/// Fetch amenities (e.g. hospitals) for an area
pub fn fetch_amenities(
    area: &AreaSelector,
    amenity: &str,
    config: &OverpassConfig,
) -> Result<OverpassResponse> {
    let query = amenity_query(area, amenity, config.timeout_secs.saturating_sub(20).max(25));
    execute_overpass_query(&query, config)
}

/// Execute an Overpass API query once; any failure ends the run
fn execute_overpass_query(query: &str, config: &OverpassConfig) -> Result<OverpassResponse> {
    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()
        .context("Failed to create HTTP client")?;

    tracing::debug!("Overpass query:\n{}", query);

    // Overpass expects form-encoded POST data: data=<query>
    let response = client
        .post(&config.url)
        .form(&[("data", query)])
        .send()
        .with_context(|| format!("Failed to send request to Overpass API at {}", config.url))?;

    let status = response.status();
    if !status.is_success() {
        bail!("Overpass API returned error status: {}", status);
    }

    let result: OverpassResponse = response
        .json()
        .context("Failed to parse Overpass JSON response")?;
    tracing::info!("Downloaded {} OSM elements", result.elements.len());
    Ok(result)
}
