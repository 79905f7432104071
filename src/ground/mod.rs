pub mod query;
pub mod gear;
pub mod hook;
pub mod launchbar;

pub use gear::{Gear, GearBuilder, GearReadout};
pub use hook::{Hook, HookReadout};
pub use launchbar::{Launchbar, LaunchbarReadout};
pub use query::{ArrestingWire, Catapult, FlatGround, GroundQuery, GroundSample, LocalGround, NoGround};
