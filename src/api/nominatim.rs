use anyhow::{Context, Result, bail};
use geo::{LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use std::thread;
use std::time::Duration;

use crate::config::NominatimConfig;

const USER_AGENT: &str = concat!("roadpoi/", env!("CARGO_PKG_VERSION"));

/// Offsets Overpass adds to OSM ids to form area ids
const RELATION_AREA_OFFSET: u64 = 3_600_000_000;
const WAY_AREA_OFFSET: u64 = 2_400_000_000;

#[derive(Debug, Deserialize)]
struct NominatimResult {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    osm_type: Option<String>,
    #[serde(default)]
    osm_id: Option<u64>,
    #[serde(default)]
    geojson: Option<BoundaryGeometry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum BoundaryGeometry {
    Polygon {
        coordinates: Vec<Vec<[f64; 2]>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<[f64; 2]>>>,
    },
    #[serde(other)]
    Other,
}

fn ring(coords: &[[f64; 2]]) -> LineString<f64> {
    LineString::from(coords.iter().map(|&[x, y]| (x, y)).collect::<Vec<_>>())
}

fn polygon(rings: &[Vec<[f64; 2]>]) -> Option<Polygon<f64>> {
    let (exterior, interiors) = rings.split_first()?;
    Some(Polygon::new(
        ring(exterior),
        interiors.iter().map(|r| ring(r)).collect(),
    ))
}

impl BoundaryGeometry {
    fn into_multipolygon(self) -> Option<MultiPolygon<f64>> {
        let polygons: Vec<Polygon<f64>> = match self {
            BoundaryGeometry::Polygon { coordinates } => polygon(&coordinates).into_iter().collect(),
            BoundaryGeometry::MultiPolygon { coordinates } => {
                coordinates.iter().filter_map(|p| polygon(p)).collect()
            }
            BoundaryGeometry::Other => Vec::new(),
        };
        (!polygons.is_empty()).then(|| MultiPolygon::new(polygons))
    }
}

/// A geocoded place
#[derive(Debug, Clone)]
pub struct Place {
    pub display_name: String,
    pub lat: f64,
    pub lon: f64,
    pub osm_type: Option<String>,
    pub osm_id: Option<u64>,
    /// Administrative boundary, when Nominatim returned a polygon
    pub boundary: Option<MultiPolygon<f64>>,
}

impl Place {
    /// Overpass area id of the OSM object behind this place
    pub fn area_id(&self) -> Result<u64> {
        let Some(id) = self.osm_id else {
            bail!("Place '{}' has no OSM id", self.display_name);
        };
        match self.osm_type.as_deref() {
            Some("relation") => Ok(RELATION_AREA_OFFSET + id),
            Some("way") => Ok(WAY_AREA_OFFSET + id),
            other => bail!(
                "Place '{}' is a {} and has no area; use a more specific place name",
                self.display_name,
                other.unwrap_or("unknown object")
            ),
        }
    }
}

fn parse_place(result: NominatimResult) -> Result<Place> {
    let lat: f64 = result
        .lat
        .parse()
        .context("Failed to parse latitude from Nominatim response")?;
    let lon: f64 = result
        .lon
        .parse()
        .context("Failed to parse longitude from Nominatim response")?;

    Ok(Place {
        display_name: result.display_name,
        lat,
        lon,
        osm_type: result.osm_type,
        osm_id: result.osm_id,
        boundary: result.geojson.and_then(BoundaryGeometry::into_multipolygon),
    })
}

/// Geocode a place name to its centre, OSM object and boundary.
///
/// Includes a 1 second delay for rate limiting (Nominatim ToS).
pub fn geocode_place(place: &str, config: &NominatimConfig) -> Result<Place> {
    // Rate limiting - Nominatim requires max 1 request per second
    thread::sleep(Duration::from_secs(1));

    let client = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")?;

    let response = client
        .get(&config.url)
        .query(&[
            ("q", place),
            ("format", "json"),
            ("limit", "1"),
            ("polygon_geojson", "1"),
        ])
        .send()
        .context("Failed to send request to Nominatim API")?;

    if !response.status().is_success() {
        bail!("Nominatim API returned error status: {}", response.status());
    }

    let results: Vec<NominatimResult> = response
        .json()
        .context("Failed to parse Nominatim JSON response")?;

    let result = results
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("Place not found: {}", place))?;

    parse_place(result)
}
