//! roadpoi - Build drivable road graphs from OpenStreetMap and snap facilities onto them

pub mod api;
pub mod config;
pub mod coverage;
pub mod domain;
pub mod facility;
pub mod geometry;
pub mod graph;
pub mod osm;
pub mod render;
