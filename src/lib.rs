pub mod units;
pub mod error;
pub mod physics;
pub mod dynamics;
pub mod aero;
pub mod propulsion;
pub mod ground;
pub mod vehicle;
pub mod sim;
pub mod io;

pub use error::{FdmError, Result, SolveError};
pub use vehicle::{Airplane, AirplaneBuilder};
