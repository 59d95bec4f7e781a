use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use roadpoi::api::{AreaSelector, fetch_amenities, fetch_drive_network, geocode_place};
use roadpoi::config::{DEFAULT_PLACE, FacilityConfig, FileConfig};
use roadpoi::coverage::boundary_coverage;
use roadpoi::facility::{
    NodeLocator, snap_facilities, validate_connectivity, write_facilities, write_snapped,
};
use roadpoi::graph::{
    ComponentReport, annotate_travel_times, reduce_to_largest_component, simplify_graph, storage,
};
use roadpoi::osm::{parse_drive_network, parse_facilities};
use roadpoi::render::{MapOptions, write_facility_map, write_network_map};

/// Build drivable road graphs from OpenStreetMap and locate facilities on them
///
/// Examples:
///   # Build the Marikina road network with default settings
///   roadpoi network
///
///   # Build another city without chain simplification
///   roadpoi --place "Pasig, Metro Manila, Philippines" network --no-simplify
///
///   # Snap hospitals onto the previously built network
///   roadpoi facilities
///
///   # Look up clinics within a named administrative area
///   roadpoi facilities --amenity clinic --area-name Marikina --admin-level 6
///
///   # Use a config file
///   roadpoi --config my-settings.toml network
#[derive(Parser, Debug)]
#[command(name = "roadpoi")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to config file (optional, auto-searches roadpoi.toml if not provided)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Place name to geocode
    #[arg(short = 'p', long, global = true)]
    place: Option<String>,

    /// Directory for graph, CSV and SVG outputs
    #[arg(short = 'o', long, global = true)]
    output_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download, reduce and annotate the drivable road network
    Network {
        /// Keep every OSM node instead of merging road chains
        #[arg(long)]
        no_simplify: bool,
    },
    /// Fetch facilities and snap them onto a saved road network
    Facilities {
        /// OSM amenity value to search for
        #[arg(short = 'a', long)]
        amenity: Option<String>,

        /// Search a named administrative area instead of the geocoded place
        #[arg(long)]
        area_name: Option<String>,

        /// Admin level of the named area
        #[arg(long, requires = "area_name")]
        admin_level: Option<u8>,

        /// Road network file (defaults to the one `network` writes)
        #[arg(long)]
        graph: Option<PathBuf>,
    },
}

/// Settings shared by both pipelines after merging CLI and config file
struct Settings {
    place: String,
    output_dir: PathBuf,
    verbose: bool,
    config: FileConfig,
}

impl Settings {
    fn slug(&self) -> String {
        place_slug(&self.place)
    }

    fn output(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{}_{}", self.slug(), suffix))
    }

    fn map_options(&self, title: String) -> MapOptions {
        let size_px = self.config.render.clone().unwrap_or_default().size_px;
        MapOptions::new(title, size_px)
    }
}

/// File name prefix derived from the first component of a place name
fn place_slug(place: &str) -> String {
    let head = place.split(',').next().unwrap_or(place).trim();
    let slug = head.to_lowercase().replace(char::is_whitespace, "_");
    if slug.is_empty() { "place".to_string() } else { slug }
}

/// Short display name of a place, e.g. "Marikina"
fn place_title(place: &str) -> &str {
    place.split(',').next().unwrap_or(place).trim()
}

fn main() -> Result<()> {
    let args = Args::parse();
    let total_start = Instant::now();

    let file_config: Option<FileConfig> = if let Some(ref config_path) = args.config {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .context(format!("Failed to read config file: {:?}", config_path))?;
            Some(toml::from_str(&contents).context("Failed to parse config file")?)
        } else {
            bail!("Config file not found: {:?}", config_path);
        }
    } else {
        FileConfig::load()
    };
    let config = file_config.unwrap_or_default();

    let settings = Settings {
        place: args
            .place
            .clone()
            .or_else(|| config.place.clone())
            .unwrap_or_else(|| DEFAULT_PLACE.to_string()),
        output_dir: args
            .output_dir
            .clone()
            .or_else(|| config.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(".")),
        verbose: args.verbose || config.verbose,
        config,
    };

    init_tracing(settings.verbose);

    println!("roadpoi - Road Network & Facility Locator");
    println!("=========================================");
    println!();

    if settings.verbose {
        println!("Configuration:");
        println!("  Place: {}", settings.place);
        println!("  Output directory: {}", settings.output_dir.display());
        println!();
    }

    match args.command {
        Command::Network { no_simplify } => run_network(&settings, no_simplify)?,
        Command::Facilities {
            amenity,
            area_name,
            admin_level,
            graph,
        } => {
            let file = settings.config.facilities.clone().unwrap_or_default();
            let facilities = FacilityConfig {
                amenity: amenity.unwrap_or(file.amenity),
                admin_level: if area_name.is_some() {
                    admin_level
                } else {
                    file.admin_level
                },
                area_name: area_name.or(file.area_name),
            };
            run_facilities(&settings, &facilities, graph.as_deref())?
        }
    }

    println!();
    println!(
        "Done! Total time: {:.1}s",
        total_start.elapsed().as_secs_f32()
    );

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "roadpoi=debug" } else { "roadpoi=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_network(settings: &Settings, no_simplify: bool) -> Result<()> {
    let config = &settings.config;
    let overpass = config.overpass.clone().unwrap_or_default();
    let nominatim = config.nominatim.clone().unwrap_or_default();

    let spinner = create_spinner("Geocoding place...");
    let start = Instant::now();
    let place = geocode_place(&settings.place, &nominatim).context("Failed to geocode place")?;
    let area_id = place.area_id()?;
    spinner.finish_with_message(format!(
        "Geocoded: {} -> ({:.4}, {:.4}) [{:.1}s]",
        place.display_name,
        place.lat,
        place.lon,
        start.elapsed().as_secs_f32()
    ));

    let spinner = create_spinner("Fetching drivable roads from OpenStreetMap...");
    let start = Instant::now();
    let response = fetch_drive_network(&AreaSelector::Id(area_id), &overpass)
        .context("Failed to fetch roads from Overpass API")?;
    spinner.finish_with_message(format!(
        "Fetched {} OSM elements [{:.1}s]",
        response.elements.len(),
        start.elapsed().as_secs_f32()
    ));

    let spinner = create_spinner("Building road graph...");
    let mut graph = parse_drive_network(&response);
    if graph.is_empty() {
        bail!("No drivable roads found for '{}'", settings.place);
    }
    spinner.finish_with_message(format!(
        "Built graph with {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    ));

    if config.simplify && !no_simplify {
        let spinner = create_spinner("Simplifying road chains...");
        let report = simplify_graph(&mut graph, config.strict_simplify);
        spinner.finish_with_message(report.summary());
    }

    let spinner = create_spinner("Finding strongly connected components...");
    let report = reduce_to_largest_component(&mut graph);
    spinner.finish_with_message(report.summary());
    for line in component_lines(&report) {
        println!("{}", line);
    }

    let spinner = create_spinner("Annotating travel times...");
    let table = config.speed_table();
    let report = annotate_travel_times(&mut graph, &table);
    spinner.finish_with_message(format!(
        "{} edges annotated; {}",
        report.annotated,
        report.summary()
    ));

    let graph_path = settings.output("road_network.json");
    storage::save(&graph_path, &graph)
        .with_context(|| format!("Failed to save graph to {}", graph_path.display()))?;
    println!("Saved road network: {}", graph_path.display());

    let map_path = settings.output("road_network.svg");
    let title = format!("{} Road Network", place_title(&settings.place));
    write_network_map(&map_path, &graph, &settings.map_options(title))?;
    println!("Saved map: {}", map_path.display());

    match &place.boundary {
        Some(boundary) => {
            let coverage = boundary_coverage(&graph, boundary);
            println!("Coverage: {}", coverage.summary());
        }
        None => println!("Coverage: skipped (no boundary returned for this place)"),
    }

    Ok(())
}

fn run_facilities(
    settings: &Settings,
    facility_config: &FacilityConfig,
    graph_path: Option<&Path>,
) -> Result<()> {
    let config = &settings.config;
    let overpass = config.overpass.clone().unwrap_or_default();
    let amenity = facility_config.amenity.as_str();

    let area = match &facility_config.area_name {
        Some(name) => AreaSelector::Named {
            name: name.clone(),
            admin_level: facility_config.admin_level,
        },
        None => {
            let nominatim = config.nominatim.clone().unwrap_or_default();
            let spinner = create_spinner("Geocoding place...");
            let place =
                geocode_place(&settings.place, &nominatim).context("Failed to geocode place")?;
            spinner.finish_with_message(format!("Geocoded: {}", place.display_name));
            AreaSelector::Id(place.area_id()?)
        }
    };

    let spinner = create_spinner(&format!("Fetching {} locations...", amenity));
    let start = Instant::now();
    let response = fetch_amenities(&area, amenity, &overpass)
        .with_context(|| format!("Failed to fetch {} data from Overpass API", amenity))?;
    let facilities = parse_facilities(&response);
    if facilities.is_empty() {
        bail!("No {} found for '{}'", amenity, settings.place);
    }
    spinner.finish_with_message(format!(
        "Found {} {} locations [{:.1}s]",
        facilities.len(),
        amenity,
        start.elapsed().as_secs_f32()
    ));

    let facilities_path = settings.output("facilities.csv");
    write_facilities(&facilities_path, &facilities)?;
    println!("Saved facilities: {}", facilities_path.display());

    let graph_path = graph_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| settings.output("road_network.json"));
    let spinner = create_spinner("Loading road network...");
    let graph = storage::load(&graph_path).with_context(|| {
        format!(
            "Failed to load road network from {} (run `roadpoi network` first)",
            graph_path.display()
        )
    })?;
    if graph.is_empty() {
        bail!("Road network {} has no nodes", graph_path.display());
    }
    spinner.finish_with_message(format!(
        "Loaded graph with {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    ));

    let spinner = create_spinner("Snapping facilities to nearest nodes...");
    let locator = NodeLocator::new(&graph);
    let report = snap_facilities(&facilities, &locator, &graph);
    spinner.finish_with_message(report.summary());
    if report.snapped.is_empty() {
        bail!("No facilities could be mapped onto the road network");
    }

    let nodes_path = settings.output("facility_nodes.csv");
    write_snapped(&nodes_path, &report.snapped)?;
    println!("Saved facility nodes: {}", nodes_path.display());

    let validation = validate_connectivity(&report.snapped, &graph);
    println!(
        "Connectivity: {} valid, {} invalid",
        validation.valid_count(),
        validation.invalid_count()
    );
    if settings.verbose {
        for check in &validation.checks {
            println!(
                "  {} -> node {} [{}]",
                check.name,
                check.node_id,
                if check.valid { "ok" } else { "missing" }
            );
        }
    }

    let map_path = settings.output("facilities_plot.svg");
    let title = format!(
        "{} Road Network with {} Locations",
        place_title(&settings.place),
        capitalize(amenity)
    );
    let legend = format!("{}s", capitalize(amenity));
    write_facility_map(
        &map_path,
        &graph,
        &facilities,
        &legend,
        &settings.map_options(title),
    )?;
    println!("Saved map: {}", map_path.display());

    Ok(())
}

/// One line per component found before reduction
fn component_lines(report: &ComponentReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Number of strongly connected components: {}",
        report.count()
    )];
    lines.extend(report.components.iter().enumerate().map(|(i, component)| {
        format!(
            "  Component {}: {} nodes, {} edges",
            i + 1,
            component.nodes,
            component.edges
        )
    }));
    lines
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_slug() {
        assert_eq!(place_slug("Marikina, Metro Manila, Philippines"), "marikina");
        assert_eq!(place_slug("San Juan City, Metro Manila"), "san_juan_city");
        assert_eq!(place_slug(""), "place");
    }

    #[test]
    fn test_place_title() {
        assert_eq!(place_title("Marikina, Metro Manila, Philippines"), "Marikina");
    }

    #[test]
    fn test_every_component_is_listed() {
        use roadpoi::graph::{RoadEdge, RoadGraph, RoadNode};

        let mut graph = RoadGraph::new();
        for id in 1..=3 {
            graph.add_node(RoadNode::new(id, 0.0, id as f64 * 0.001));
        }
        for (from, to) in [(1, 2), (2, 1), (2, 3)] {
            graph.add_edge(from, to, RoadEdge::default()).unwrap();
        }

        let report = reduce_to_largest_component(&mut graph);
        let lines = component_lines(&report);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Number of strongly connected components: 2");
        assert!(lines.iter().any(|l| l.ends_with(": 1 nodes, 0 edges")));
        assert!(lines.iter().any(|l| l.ends_with(": 2 nodes, 2 edges")));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("hospital"), "Hospital");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let args = Args::try_parse_from(["roadpoi", "--place", "Pasig", "network", "--no-simplify"])
            .unwrap();
        assert_eq!(args.place.as_deref(), Some("Pasig"));
        assert!(matches!(args.command, Command::Network { no_simplify: true }));

        let args = Args::try_parse_from([
            "roadpoi",
            "facilities",
            "--area-name",
            "Marikina",
            "--admin-level",
            "6",
            "-v",
        ])
        .unwrap();
        assert!(args.verbose);
        match args.command {
            Command::Facilities {
                area_name,
                admin_level,
                ..
            } => {
                assert_eq!(area_name.as_deref(), Some("Marikina"));
                assert_eq!(admin_level, Some(6));
            }
            _ => panic!("expected facilities"),
        }
    }
}
