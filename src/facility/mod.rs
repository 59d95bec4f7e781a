//! Mapping facilities onto the road graph

pub mod snap;
pub mod table;
pub mod validate;

pub use snap::{NearestNode, NodeLocator, SnapError, SnapReport, SnapWarning, snap_facilities};
pub use table::{read_snapped, write_facilities, write_snapped};
pub use validate::{ConnectivityReport, NodeCheck, validate_connectivity};
