//! SVG maps of the road network and facility overlay

pub mod map;

pub use map::{MapOptions, build_map, render_map, write_facility_map, write_network_map};
