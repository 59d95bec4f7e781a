use super::RoadGraph;
use crate::domain::{RoadClass, TagValue};
use serde::Deserialize;
use std::borrow::Cow;
use tracing::{info, warn};

/// Default speeds in km/h per road class, used when `maxspeed` is unusable
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedTable {
    pub motorway: f64,
    pub trunk: f64,
    pub primary: f64,
    pub secondary: f64,
    pub tertiary: f64,
    pub residential: f64,
    pub unclassified: f64,
    /// Speed for any other highway value
    pub fallback: f64,
}

impl Default for SpeedTable {
    fn default() -> Self {
        Self {
            motorway: 80.0,
            trunk: 60.0,
            primary: 50.0,
            secondary: 40.0,
            tertiary: 35.0,
            residential: 30.0,
            unclassified: 30.0,
            fallback: 30.0,
        }
    }
}

/// Per-class speed overrides from the config file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpeedOverrides {
    pub motorway: Option<f64>,
    pub trunk: Option<f64>,
    pub primary: Option<f64>,
    pub secondary: Option<f64>,
    pub tertiary: Option<f64>,
    pub residential: Option<f64>,
    pub unclassified: Option<f64>,
    pub fallback: Option<f64>,
}

impl SpeedTable {
    /// Apply overrides on top of this table; non-positive values are ignored
    pub fn with_overrides(mut self, overrides: &SpeedOverrides) -> Self {
        let apply = |slot: &mut f64, value: Option<f64>| {
            if let Some(v) = value.filter(|v| is_usable_speed(*v)) {
                *slot = v;
            }
        };
        apply(&mut self.motorway, overrides.motorway);
        apply(&mut self.trunk, overrides.trunk);
        apply(&mut self.primary, overrides.primary);
        apply(&mut self.secondary, overrides.secondary);
        apply(&mut self.tertiary, overrides.tertiary);
        apply(&mut self.residential, overrides.residential);
        apply(&mut self.unclassified, overrides.unclassified);
        apply(&mut self.fallback, overrides.fallback);
        self
    }

    pub fn get(&self, class: RoadClass) -> f64 {
        match class {
            RoadClass::Motorway => self.motorway,
            RoadClass::Trunk => self.trunk,
            RoadClass::Primary => self.primary,
            RoadClass::Secondary => self.secondary,
            RoadClass::Tertiary => self.tertiary,
            RoadClass::Residential => self.residential,
            RoadClass::Unclassified => self.unclassified,
        }
    }

    /// Default speed for a raw highway value
    pub fn for_highway(&self, highway: &str) -> f64 {
        RoadClass::from_highway_tag(highway)
            .map(|class| self.get(class))
            .unwrap_or(self.fallback)
    }
}

/// Outcome of travel time annotation
#[derive(Debug, Default)]
pub struct TravelTimeReport {
    /// Edges that received a travel time
    pub annotated: usize,
    /// Edges left without one (zero or missing length)
    pub missing: usize,
}

impl TravelTimeReport {
    pub fn summary(&self) -> String {
        if self.missing == 0 {
            "All edges have travel_time assigned".to_string()
        } else {
            format!("{} edges missing travel_time", self.missing)
        }
    }
}

fn is_usable_speed(v: f64) -> bool {
    v.is_finite() && v > 0.0
}

fn parse_speed(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| is_usable_speed(*v))
}

/// Road class used for the default speed lookup
pub fn resolve_highway(highway: &TagValue) -> Cow<'_, str> {
    match highway {
        TagValue::Text(s) => Cow::Borrowed(s.as_str()),
        TagValue::List(items) => items
            .first()
            .map(|s| Cow::Borrowed(s.as_str()))
            .unwrap_or(Cow::Borrowed("unclassified")),
        TagValue::Number(n) => Cow::Owned(n.to_string()),
        TagValue::Absent => Cow::Borrowed("unclassified"),
    }
}

/// Effective speed in km/h for an edge.
///
/// A posted `maxspeed` wins when it yields a positive number: a string
/// contributes its leading token ("30 km/h" -> 30), a list its first
/// parseable element, a number itself. Anything else falls back to the
/// default for the road class.
pub fn resolve_speed(maxspeed: &TagValue, highway: &str, table: &SpeedTable) -> f64 {
    let posted = match maxspeed {
        TagValue::Absent => None,
        TagValue::Text(s) => s.split_whitespace().next().and_then(parse_speed),
        TagValue::List(items) => items.iter().find_map(|s| parse_speed(s)),
        TagValue::Number(n) => Some(*n).filter(|v| is_usable_speed(*v)),
    };
    posted.unwrap_or_else(|| table.for_highway(highway))
}

/// Seconds needed to cover `length_m` meters at `speed_kmh`
pub fn travel_time_secs(length_m: f64, speed_kmh: f64) -> f64 {
    (length_m / 1000.0) / speed_kmh * 3600.0
}

/// Assign `travel_time` to every edge with a positive length.
///
/// Edges with zero or missing length are left without a travel time and
/// counted in the report.
pub fn annotate_travel_times(graph: &mut RoadGraph, table: &SpeedTable) -> TravelTimeReport {
    let mut report = TravelTimeReport::default();

    for edge in graph.edges_mut() {
        let length = match edge.length {
            Some(l) if l.is_finite() && l > 0.0 => l,
            _ => continue,
        };
        let highway = resolve_highway(&edge.highway);
        let speed = resolve_speed(&edge.maxspeed, &highway, table);
        edge.travel_time = Some(travel_time_secs(length, speed));
    }

    for (_, _, edge) in graph.edges() {
        if edge.travel_time.is_some() {
            report.annotated += 1;
        } else {
            report.missing += 1;
        }
    }

    if report.missing > 0 {
        warn!("{} edges missing travel_time", report.missing);
    } else {
        info!("All {} edges have travel_time assigned", report.annotated);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::tests::graph_from;

    fn text(s: &str) -> TagValue {
        TagValue::Text(s.to_string())
    }

    fn list(items: &[&str]) -> TagValue {
        TagValue::List(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_travel_time_formula() {
        assert_eq!(travel_time_secs(1000.0, 50.0), 72.0);
        assert!((travel_time_secs(500.0, 30.0) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_speed_from_string_with_unit() {
        let table = SpeedTable::default();
        assert_eq!(resolve_speed(&text("30 km/h"), "primary", &table), 30.0);
        assert_eq!(resolve_speed(&text("60"), "residential", &table), 60.0);
    }

    #[test]
    fn test_unparseable_string_uses_default() {
        let table = SpeedTable::default();
        assert_eq!(resolve_speed(&text("PH:urban"), "primary", &table), 50.0);
        assert_eq!(resolve_speed(&text(""), "secondary", &table), 40.0);
        assert_eq!(resolve_speed(&text("0"), "tertiary", &table), 35.0);
    }

    #[test]
    fn test_speed_from_list() {
        let table = SpeedTable::default();
        assert_eq!(
            resolve_speed(&list(&["20", "not-a-number"]), "primary", &table),
            20.0
        );
        assert_eq!(
            resolve_speed(&list(&["bad", "40"]), "primary", &table),
            40.0
        );
        assert_eq!(
            resolve_speed(&list(&["bad", "worse"]), "residential", &table),
            30.0
        );
        assert_eq!(resolve_speed(&list(&[]), "motorway", &table), 80.0);
    }

    #[test]
    fn test_speed_from_number() {
        let table = SpeedTable::default();
        assert_eq!(
            resolve_speed(&TagValue::Number(45.0), "primary", &table),
            45.0
        );
        assert_eq!(
            resolve_speed(&TagValue::Number(f64::NAN), "primary", &table),
            50.0
        );
    }

    #[test]
    fn test_absent_speed_uses_table() {
        let table = SpeedTable::default();
        assert_eq!(resolve_speed(&TagValue::Absent, "motorway", &table), 80.0);
        assert_eq!(resolve_speed(&TagValue::Absent, "trunk", &table), 60.0);
        assert_eq!(resolve_speed(&TagValue::Absent, "living_street", &table), 30.0);
    }

    #[test]
    fn test_resolve_highway() {
        assert_eq!(resolve_highway(&text("primary")), "primary");
        assert_eq!(resolve_highway(&list(&["secondary", "primary"])), "secondary");
        assert_eq!(resolve_highway(&TagValue::Absent), "unclassified");
    }

    #[test]
    fn test_overrides() {
        let overrides = SpeedOverrides {
            residential: Some(20.0),
            fallback: Some(25.0),
            motorway: Some(-1.0),
            ..Default::default()
        };
        let table = SpeedTable::default().with_overrides(&overrides);
        assert_eq!(table.residential, 20.0);
        assert_eq!(table.for_highway("service"), 25.0);
        assert_eq!(table.motorway, 80.0);
    }

    #[test]
    fn test_annotate_skips_zero_length() {
        let mut graph = graph_from(
            &[(1, 0.0, 0.0), (2, 0.0, 0.001)],
            &[(1, 2, 1000.0), (2, 1, 0.0)],
        );
        for edge in graph.edges_mut() {
            edge.highway = text("primary");
        }

        let report = annotate_travel_times(&mut graph, &SpeedTable::default());
        assert_eq!(report.annotated, 1);
        assert_eq!(report.missing, 1);

        for (from, _, edge) in graph.edges() {
            if from.id == 1 {
                assert_eq!(edge.travel_time, Some(72.0));
            } else {
                assert_eq!(edge.travel_time, None);
            }
        }
    }

    #[test]
    fn test_annotate_missing_length() {
        let mut graph = graph_from(&[(1, 0.0, 0.0), (2, 0.0, 0.001)], &[(1, 2, 10.0)]);
        for edge in graph.edges_mut() {
            edge.length = None;
        }
        let report = annotate_travel_times(&mut graph, &SpeedTable::default());
        assert_eq!(report.missing, 1);
        assert!(graph.edges().all(|(_, _, e)| e.travel_time.is_none()));
    }
}
