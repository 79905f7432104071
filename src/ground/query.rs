use nalgebra::Vector3;

use crate::dynamics::State;

// ---------------------------------------------------------------------------
// Ground query capability
// ---------------------------------------------------------------------------

/// Ground under a world point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundSample {
    pub point: Vector3<f64>,    // a point on the surface, world
    pub normal: Vector3<f64>,   // unit, world
    pub velocity: Vector3<f64>, // surface velocity (carrier deck, current), world
    pub friction_factor: f64,
    pub solid: bool,
}

/// An arresting cable stretched between two deck points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArrestingWire {
    pub ends: [Vector3<f64>; 2], // world
    pub spring: f64,             // N/m of payout
    pub damping: f64,            // N·s/m
    pub max_force: f64,          // N
}

/// A catapult shuttle track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Catapult {
    pub start: Vector3<f64>, // shuttle rest position, world
    pub dir: Vector3<f64>,   // unit launch direction, world
    pub stroke: f64,         // m
    pub force: f64,          // N
    pub holdback: f64,       // holdback spring, N/m
}

/// Terrain, water and deck gear provided by the host.
pub trait GroundQuery {
    /// The surface below `point`, or `None` where there is no ground.
    fn ground_at(&self, point: &Vector3<f64>) -> Option<GroundSample>;

    fn arresting_wire(&self, _point: &Vector3<f64>) -> Option<ArrestingWire> {
        None
    }

    fn catapult(&self, _point: &Vector3<f64>) -> Option<Catapult> {
        None
    }
}

/// No terrain anywhere; used for free flight and trim.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGround;

impl GroundQuery for NoGround {
    fn ground_at(&self, _point: &Vector3<f64>) -> Option<GroundSample> {
        None
    }
}

/// How close the hook tip must pass to a cable to catch it, m.
const WIRE_CATCH_DISTANCE: f64 = 0.3;
/// How close the launch bar must be to the shuttle to engage, m.
const SHUTTLE_ENGAGE_DISTANCE: f64 = 1.0;

/// A level plane at `elevation`, optionally with deck gear.
#[derive(Debug, Clone, Default)]
pub struct FlatGround {
    pub elevation: f64,
    pub friction_factor: f64,
    pub solid: bool,
    pub wires: Vec<ArrestingWire>,
    pub catapults: Vec<Catapult>,
}

impl FlatGround {
    pub fn new(elevation: f64) -> Self {
        Self {
            elevation,
            friction_factor: 1.0,
            solid: true,
            ..Self::default()
        }
    }

    pub fn water(elevation: f64) -> Self {
        Self {
            solid: false,
            ..Self::new(elevation)
        }
    }

    pub fn with_wire(mut self, wire: ArrestingWire) -> Self {
        self.wires.push(wire);
        self
    }

    pub fn with_catapult(mut self, cat: Catapult) -> Self {
        self.catapults.push(cat);
        self
    }
}

impl GroundQuery for FlatGround {
    fn ground_at(&self, point: &Vector3<f64>) -> Option<GroundSample> {
        Some(GroundSample {
            point: Vector3::new(point.x, point.y, self.elevation),
            normal: Vector3::z(),
            velocity: Vector3::zeros(),
            friction_factor: self.friction_factor,
            solid: self.solid,
        })
    }

    fn arresting_wire(&self, point: &Vector3<f64>) -> Option<ArrestingWire> {
        if point.z - self.elevation > WIRE_CATCH_DISTANCE {
            return None;
        }
        self.wires
            .iter()
            .find(|w| horizontal_distance_to_segment(point, &w.ends[0], &w.ends[1]) < WIRE_CATCH_DISTANCE)
            .copied()
    }

    fn catapult(&self, point: &Vector3<f64>) -> Option<Catapult> {
        self.catapults
            .iter()
            .find(|c| (c.start - point).norm() < SHUTTLE_ENGAGE_DISTANCE)
            .copied()
    }
}

fn horizontal_distance_to_segment(p: &Vector3<f64>, a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let flat = |v: &Vector3<f64>| Vector3::new(v.x, v.y, 0.0);
    let (p, a, b) = (flat(p), flat(a), flat(b));
    let ab = b - a;
    let len2 = ab.norm_squared();
    let t = if len2 > 0.0 { ((p - a).dot(&ab) / len2).clamp(0.0, 1.0) } else { 0.0 };
    (p - (a + ab * t)).norm()
}

// ---------------------------------------------------------------------------
// Ground plane in the body frame
// ---------------------------------------------------------------------------

/// A ground sample re-expressed relative to the body at `state`.
#[derive(Debug, Clone, Copy)]
pub struct LocalGround {
    pub point: Vector3<f64>,    // body
    pub normal: Vector3<f64>,   // unit, body
    pub velocity: Vector3<f64>, // body
    pub friction_factor: f64,
    pub solid: bool,
}

impl LocalGround {
    pub fn new(sample: &GroundSample, state: &State) -> Self {
        Self {
            point: state.local_point(&sample.point),
            normal: state.local_vector(&sample.normal),
            velocity: state.local_vector(&sample.velocity),
            friction_factor: sample.friction_factor,
            solid: sample.solid,
        }
    }

    /// Sample the ground under body point `p`.
    pub fn under(ground: &dyn GroundQuery, state: &State, p: &Vector3<f64>) -> Option<Self> {
        ground
            .ground_at(&state.global_point(p))
            .map(|s| Self::new(&s, state))
    }

    /// Signed height of body point `p` above the plane.
    pub fn height(&self, p: &Vector3<f64>) -> f64 {
        self.normal.dot(&(p - self.point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn flat_ground_height_in_body_frame() {
        let ground = FlatGround::new(10.0);
        let state = State::pitched(Vector3::new(0.0, 0.0, 12.0), 0.2);
        let lg = LocalGround::under(&ground, &state, &Vector3::zeros()).unwrap();
        assert_relative_eq!(lg.height(&Vector3::zeros()), 2.0, epsilon = 1e-12);
        assert_relative_eq!(lg.normal.norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn wire_caught_only_near_the_deck() {
        let wire = ArrestingWire {
            ends: [Vector3::new(0.0, -10.0, 0.0), Vector3::new(0.0, 10.0, 0.0)],
            spring: 5e4,
            damping: 1e4,
            max_force: 3e5,
        };
        let g = FlatGround::new(0.0).with_wire(wire);
        assert!(g.arresting_wire(&Vector3::new(0.1, 2.0, 0.1)).is_some());
        assert!(g.arresting_wire(&Vector3::new(0.1, 2.0, 2.0)).is_none());
        assert!(g.arresting_wire(&Vector3::new(5.0, 2.0, 0.0)).is_none());
        assert!(NoGround.arresting_wire(&Vector3::zeros()).is_none());
    }
}
