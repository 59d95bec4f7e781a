use serde::Deserialize;
use std::path::PathBuf;

use crate::graph::speed::{SpeedOverrides, SpeedTable};

pub const DEFAULT_PLACE: &str = "Marikina, Metro Manila, Philippines";
pub const DEFAULT_AMENITY: &str = "hospital";

fn default_simplify() -> bool {
    true
}
fn default_verbose() -> bool {
    false
}

#[derive(Debug, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub place: Option<String>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default = "default_simplify")]
    pub simplify: bool,
    /// Keep nodes where two OSM ways meet during simplification
    #[serde(default)]
    pub strict_simplify: bool,
    #[serde(default = "default_verbose")]
    pub verbose: bool,
    #[serde(default)]
    pub facilities: Option<FacilityConfig>,
    #[serde(default)]
    pub overpass: Option<OverpassConfig>,
    #[serde(default)]
    pub nominatim: Option<NominatimConfig>,
    #[serde(default)]
    pub speeds: Option<SpeedOverrides>,
    #[serde(default)]
    pub render: Option<RenderConfig>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            place: None,
            output_dir: None,
            simplify: default_simplify(),
            strict_simplify: false,
            verbose: default_verbose(),
            facilities: None,
            overpass: None,
            nominatim: None,
            speeds: None,
            render: None,
        }
    }
}

fn default_amenity() -> String {
    DEFAULT_AMENITY.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct FacilityConfig {
    /// OSM `amenity` value to look for
    #[serde(default = "default_amenity")]
    pub amenity: String,
    /// Named administrative area to search instead of the geocoded place
    #[serde(default)]
    pub area_name: Option<String>,
    #[serde(default)]
    pub admin_level: Option<u8>,
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self {
            amenity: default_amenity(),
            area_name: None,
            admin_level: None,
        }
    }
}

fn default_overpass_url() -> String {
    "https://overpass-api.de/api/interpreter".to_string()
}

fn default_timeout_secs() -> u64 {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct OverpassConfig {
    #[serde(default = "default_overpass_url")]
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            url: default_overpass_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_nominatim_url() -> String {
    "https://nominatim.openstreetmap.org/search".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct NominatimConfig {
    #[serde(default = "default_nominatim_url")]
    pub url: String,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            url: default_nominatim_url(),
        }
    }
}

fn default_size_px() -> u32 {
    1200
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    /// Width and height of the square output image in pixels
    #[serde(default = "default_size_px")]
    pub size_px: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            size_px: default_size_px(),
        }
    }
}

impl FileConfig {
    pub fn load() -> Option<Self> {
        let config_paths = get_config_paths();

        for path in config_paths {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(&path)
            {
                match toml::from_str(&contents) {
                    Ok(config) => return Some(config),
                    Err(e) => {
                        tracing::warn!("Failed to parse config file {:?}: {}", path, e);
                    }
                }
            }
        }
        None
    }

    /// Default speed table with any `[speeds]` overrides applied
    pub fn speed_table(&self) -> SpeedTable {
        match &self.speeds {
            Some(overrides) => SpeedTable::default().with_overrides(overrides),
            None => SpeedTable::default(),
        }
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("roadpoi.toml"));
    paths.push(PathBuf::from(".roadpoi.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("roadpoi").join("config.toml"));
        paths.push(config_dir.join("roadpoi.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".roadpoi.toml"));
        paths.push(home.join(".config").join("roadpoi").join("config.toml"));
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.place.is_none());
        assert!(config.simplify);
        assert!(!config.strict_simplify);
        assert_eq!(config.speed_table(), SpeedTable::default());
    }

    #[test]
    fn test_default_matches_empty_file() {
        let config = FileConfig::default();
        assert!(config.simplify);
        assert!(!config.verbose);
        assert!(config.facilities.is_none());
    }

    #[test]
    fn test_full_config() {
        let config: FileConfig = toml::from_str(
            r#"
            place = "Pasig, Metro Manila, Philippines"
            output_dir = "out"
            simplify = false

            [facilities]
            area_name = "Pasig"
            admin_level = 6

            [overpass]
            url = "https://overpass.example/api/interpreter"

            [speeds]
            residential = 25
            fallback = 20.0

            [render]
            size_px = 800
            "#,
        )
        .unwrap();

        assert_eq!(config.place.as_deref(), Some("Pasig, Metro Manila, Philippines"));
        assert!(!config.simplify);

        let facilities = config.facilities.clone().unwrap();
        assert_eq!(facilities.amenity, "hospital");
        assert_eq!(facilities.area_name.as_deref(), Some("Pasig"));
        assert_eq!(facilities.admin_level, Some(6));

        let overpass = config.overpass.clone().unwrap();
        assert_eq!(overpass.timeout_secs, 200);

        let table = config.speed_table();
        assert_eq!(table.residential, 25.0);
        assert_eq!(table.fallback, 20.0);
        assert_eq!(table.primary, 50.0);

        assert_eq!(config.render.unwrap().size_px, 800);
    }
}
