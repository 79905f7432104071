pub mod control;
pub mod mass;
pub mod model;
pub mod airplane;
pub mod solver;
pub mod presets;

pub use airplane::{Airplane, AirplaneBuilder, Approach, ControlInput, Cruise};
pub use control::{AxisId, ControlKind, ControlMap, ControlOptions, ControlSetting, ControlTarget};
pub use mass::{Condition, MassModel, Payload, Tank};
pub use model::{Model, Parts};
pub use solver::{solve_gear, Trim};
