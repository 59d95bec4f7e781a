pub mod parser;

pub use parser::{WayDirection, parse_drive_network, parse_facilities};
