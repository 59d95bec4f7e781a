pub mod projection;
pub mod scaling;

pub use projection::Projector;
pub use scaling::{Bounds, Scaler};
