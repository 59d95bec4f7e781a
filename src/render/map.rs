use crate::domain::Facility;
use crate::geometry::{Bounds, Projector, Scaler};
use crate::graph::RoadGraph;
use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::Path;
use svg::Document;
use svg::node::element::{Circle, Group, Polyline, Rectangle as Rect, Text};

const TITLE_MARGIN_PX: f64 = 48.0;
const EDGE_COLOR: &str = "#808080";
const EDGE_WIDTH: f64 = 0.5;
const MARKER_COLOR: &str = "#ff0000";
const MARKER_RADIUS: f64 = 5.0;
const LABEL_OFFSET: (f64, f64) = (5.0, -5.0);
const LABEL_FONT_SIZE: f64 = 8.0;

/// Options shared by both maps
#[derive(Debug, Clone)]
pub struct MapOptions {
    pub title: String,
    pub size_px: u32,
}

impl MapOptions {
    pub fn new(title: impl Into<String>, size_px: u32) -> Self {
        Self {
            title: title.into(),
            size_px,
        }
    }
}

/// Projection plus pixel fit for one map
struct Canvas {
    projector: Projector,
    scaler: Scaler,
}

impl Canvas {
    fn fit(graph: &RoadGraph, facilities: &[Facility], size_px: f64) -> Self {
        let positions: Vec<(f64, f64)> = graph
            .nodes()
            .map(|n| (n.lat, n.lon))
            .chain(facilities.iter().map(|f| (f.latitude, f.longitude)))
            .collect();

        let projector = Projector::centered_on(&positions);
        let projected = projector.project_points(&positions);
        let bounds = Bounds::from_points(&projected).unwrap_or(Bounds {
            min_x: 0.0,
            max_x: 0.0,
            min_y: 0.0,
            max_y: 0.0,
        });
        let scaler = Scaler::from_bounds_with_margin(&bounds, size_px, TITLE_MARGIN_PX);

        Self { projector, scaler }
    }

    fn to_px(&self, lat: f64, lon: f64) -> (f64, f64) {
        let (x, y) = self.projector.project(lat, lon);
        self.scaler.scale(x, y)
    }
}

fn road_layer(graph: &RoadGraph, canvas: &Canvas) -> Group {
    let mut group = Group::new()
        .set("stroke", EDGE_COLOR)
        .set("stroke-width", EDGE_WIDTH)
        .set("fill", "none")
        .set("stroke-linecap", "round");

    for (from, to, edge) in graph.edges() {
        let path: Vec<(f64, f64)> = match &edge.geometry {
            Some(points) if points.len() >= 2 => points.clone(),
            _ => vec![(from.lat, from.lon), (to.lat, to.lon)],
        };
        let points: Vec<String> = path
            .iter()
            .map(|&(lat, lon)| {
                let (x, y) = canvas.to_px(lat, lon);
                format!("{:.2},{:.2}", x, y)
            })
            .collect();
        group = group.add(Polyline::new().set("points", points.join(" ")));
    }
    group
}

fn facility_layers(facilities: &[Facility], canvas: &Canvas) -> (Group, Group) {
    let mut markers = Group::new().set("fill", MARKER_COLOR);
    let mut labels = Group::new()
        .set("font-family", "sans-serif")
        .set("font-size", LABEL_FONT_SIZE)
        .set("fill", "#000000");

    for facility in facilities {
        let (x, y) = canvas.to_px(facility.latitude, facility.longitude);
        markers = markers.add(
            Circle::new()
                .set("cx", format!("{:.2}", x))
                .set("cy", format!("{:.2}", y))
                .set("r", MARKER_RADIUS),
        );
        labels = labels.add(
            Text::new(facility.name.as_str())
                .set("x", format!("{:.2}", x + LABEL_OFFSET.0))
                .set("y", format!("{:.2}", y + LABEL_OFFSET.1)),
        );
    }
    (markers, labels)
}

fn legend(label: &str, size: f64) -> Group {
    let x = size - 120.0;
    let y = TITLE_MARGIN_PX + 16.0;
    Group::new()
        .set("font-family", "sans-serif")
        .set("font-size", 12)
        .add(
            Rect::new()
                .set("x", x)
                .set("y", y - 16.0)
                .set("width", 110)
                .set("height", 24)
                .set("fill", "#ffffff")
                .set("stroke", "#cccccc"),
        )
        .add(
            Circle::new()
                .set("cx", x + 12.0)
                .set("cy", y - 4.0)
                .set("r", MARKER_RADIUS)
                .set("fill", MARKER_COLOR),
        )
        .add(Text::new(label).set("x", x + 24.0).set("y", y))
}

/// Build the road network map, optionally overlaid with facility markers
pub fn build_map(
    graph: &RoadGraph,
    facilities: &[Facility],
    legend_label: Option<&str>,
    options: &MapOptions,
) -> Document {
    let size = f64::from(options.size_px);
    let canvas = Canvas::fit(graph, facilities, size);

    let mut document = Document::new()
        .set("width", size)
        .set("height", size)
        .set("viewBox", format!("0 0 {0} {0}", options.size_px))
        .add(
            Rect::new()
                .set("width", "100%")
                .set("height", "100%")
                .set("fill", "#ffffff"),
        )
        .add(
            Text::new(options.title.as_str())
                .set("x", size / 2.0)
                .set("y", (TITLE_MARGIN_PX * 0.66).round())
                .set("text-anchor", "middle")
                .set("font-family", "sans-serif")
                .set("font-size", 20),
        )
        .add(road_layer(graph, &canvas));

    if !facilities.is_empty() {
        let (markers, labels) = facility_layers(facilities, &canvas);
        document = document.add(markers).add(labels);
        if let Some(label) = legend_label {
            document = document.add(legend(label, size));
        }
    }

    document
}

fn save_document(path: &Path, document: &Document) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    svg::save(path, document)
        .with_context(|| format!("Failed to write SVG file: {}", path.display()))
}

/// Write the plain road network map
pub fn write_network_map(path: &Path, graph: &RoadGraph, options: &MapOptions) -> Result<()> {
    save_document(path, &build_map(graph, &[], None, options))
}

/// Write the road network with labelled facility markers and a legend
pub fn write_facility_map(
    path: &Path,
    graph: &RoadGraph,
    facilities: &[Facility],
    legend_label: &str,
    options: &MapOptions,
) -> Result<()> {
    save_document(path, &build_map(graph, facilities, Some(legend_label), options))
}

/// Serialize a map to any writer
pub fn render_map<W: io::Write>(w: W, document: &Document) -> io::Result<()> {
    svg::write(w, document)
}
