pub mod piston;
pub mod turbine;
pub mod engine;
pub mod propeller;
pub mod prop_engine;
pub mod thruster;

pub use engine::{Engine, EngineControls};
pub use piston::PistonEngine;
pub use prop_engine::{PropEngine, PropEngineBuilder};
pub use propeller::Propeller;
pub use thruster::{EngineReadout, MountedThruster, SimpleJet, Thruster};
pub use turbine::TurbineEngine;
