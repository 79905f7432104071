pub mod atmosphere;
pub mod gravity;

pub use atmosphere::{isa, Atmo};
pub use gravity::{gravity_accel, gravity_force};
