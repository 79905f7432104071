pub mod state;
pub mod rigid_body;
pub mod forces;
pub mod integrator;

pub use forces::{BodyEnvironment, ForceContext, ForceContributor, ForceSum};
pub use integrator::Integrator;
pub use rigid_body::{MassId, PointMass, RigidBody};
pub use state::{Deriv, State};
