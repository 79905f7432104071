pub mod config;
pub mod runner;

pub use config::{SimConfig, StartCondition};
pub use runner::{
    initial_state, simulate, simulate_with, AirSource, ControlSource, FixedControls, OutputSink, Recorder, Sample,
    StandardAir,
};
