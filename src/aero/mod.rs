pub mod surface;
pub mod wing;
pub mod fuselage;

pub use fuselage::{Fuselage, FuselageBuilder};
pub use surface::Surface;
pub use wing::{ControlSpan, Side, Stall, Wing, WingBuilder};
