use thiserror::Error;

/// Failures of the trim solver or of a thruster's equilibrium search.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("solution failed to converge after {0} iterations")]
    NoConvergence(usize),

    #[error("insufficient elevator to trim for approach")]
    InsufficientElevator,

    #[error("drag factor beyond reasonable bounds: {0}")]
    DragFactor(f64),

    #[error("lift ratio beyond reasonable bounds: {0}")]
    LiftRatio(f64),

    #[error("cruise AoA > 10 degrees")]
    CruiseAoa,

    #[error("tail incidence > 10 degrees")]
    TailIncidence,

    #[error("propeller failed to stabilize after {0} iterations")]
    Stabilize(usize),

    #[error("airplane has no {0} to trim")]
    MissingSurface(&'static str),
}

#[derive(Error, Debug)]
pub enum FdmError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("unknown control type: {0}")]
    UnknownControl(String),

    #[error("unknown control axis: {0}")]
    UnknownAxis(String),

    #[error("{kind} cannot drive {target}")]
    ControlTarget { kind: String, target: String },

    #[error("inertia tensor is singular")]
    SingularInertia,

    #[error("solve failed: {0}")]
    Solve(#[from] SolveError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FdmError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        FdmError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FdmError>;
