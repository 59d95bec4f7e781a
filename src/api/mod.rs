pub mod nominatim;
pub mod overpass;

pub use nominatim::{Place, geocode_place};
pub use overpass::{AreaSelector, Element, OverpassResponse, fetch_amenities, fetch_drive_network};
