pub mod facility;
pub mod road;
pub mod tag;

pub use facility::{Facility, SnappedFacility};
pub use road::RoadClass;
pub use tag::TagValue;
