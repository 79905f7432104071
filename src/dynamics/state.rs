use nalgebra::{Matrix3, Vector3};

// ---------------------------------------------------------------------------
// Rigid-body state: position, orientation, velocity, rotation rate
// ---------------------------------------------------------------------------

/// Kinematic state of the airframe.
///
/// World frame is a local flat-earth frame with +z up. Body frame is
/// +x forward, +y left, +z up. `orient` maps body vectors into the world
/// frame. `acc` and `racc` are outputs of the last force evaluation and are
/// ignored as initial conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct State {
    pub time: f64,
    pub pos: Vector3<f64>,    // m, world
    pub orient: Matrix3<f64>, // body→world rotation
    pub vel: Vector3<f64>,    // m/s, world
    pub rot: Vector3<f64>,    // rad/s, body
    pub acc: Vector3<f64>,    // m/s^2, world
    pub racc: Vector3<f64>,   // rad/s^2, body
}

impl Default for State {
    fn default() -> Self {
        Self {
            time: 0.0,
            pos: Vector3::zeros(),
            orient: Matrix3::identity(),
            vel: Vector3::zeros(),
            rot: Vector3::zeros(),
            acc: Vector3::zeros(),
            racc: Vector3::zeros(),
        }
    }
}

impl State {
    /// A state at rest at `pos`, pitched nose-up by `pitch` radians.
    pub fn pitched(pos: Vector3<f64>, pitch: f64) -> Self {
        Self {
            pos,
            orient: pitch_matrix(pitch),
            ..Self::default()
        }
    }

    /// Advance by `dt` along the rates in `d`.
    ///
    /// Orientation is composed with the incremental rotation for the body
    /// rate, everything else is extrapolated linearly.
    pub fn extrapolate(&self, d: &Deriv, dt: f64) -> State {
        State {
            time: self.time + dt,
            pos: self.pos + d.vel * dt,
            orient: self.orient * rot_matrix(&d.rot, dt),
            vel: self.vel + d.acc * dt,
            rot: self.rot + d.racc * dt,
            acc: self.acc,
            racc: self.racc,
        }
    }

    /// World → body.
    pub fn local_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.orient.tr_mul(v)
    }

    /// Body → world.
    pub fn global_vector(&self, v: &Vector3<f64>) -> Vector3<f64> {
        self.orient * v
    }

    /// World position of a body-frame point.
    pub fn global_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.pos + self.orient * p
    }

    /// Body-frame point of a world position.
    pub fn local_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.orient.tr_mul(&(p - self.pos))
    }

    /// Velocity of a body-frame point, expressed in the body frame.
    pub fn point_velocity(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.local_vector(&self.vel) + self.rot.cross(p)
    }

    /// Pitch angle from local horizontal (rad). Positive = nose up.
    pub fn pitch(&self) -> f64 {
        self.orient[(2, 0)].clamp(-1.0, 1.0).asin()
    }

    /// Bank angle (rad). Positive = right wing down.
    pub fn roll(&self) -> f64 {
        self.orient[(2, 1)].atan2(self.orient[(2, 2)])
    }

    /// Heading of the body x axis, measured from world +x toward world +y.
    pub fn heading(&self) -> f64 {
        self.orient[(1, 0)].atan2(self.orient[(0, 0)])
    }

    /// Columns unit length and mutually perpendicular within `tol`.
    pub fn is_orthonormal(&self, tol: f64) -> bool {
        let m = &self.orient;
        let c = [m.column(0), m.column(1), m.column(2)];
        for i in 0..3 {
            if (c[i].norm() - 1.0).abs() > tol {
                return false;
            }
            for j in (i + 1)..3 {
                if c[i].dot(&c[j]).abs() > tol {
                    return false;
                }
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// State derivative
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Deriv {
    pub vel: Vector3<f64>,  // world
    pub rot: Vector3<f64>,  // body
    pub acc: Vector3<f64>,  // world
    pub racc: Vector3<f64>, // body
}

impl Deriv {
    /// Classical RK4 combination (1, 2, 2, 1) / 6.
    pub fn rk4_average(k1: &Deriv, k2: &Deriv, k3: &Deriv, k4: &Deriv) -> Deriv {
        let w = 1.0 / 6.0;
        Deriv {
            vel: (k1.vel + 2.0 * k2.vel + 2.0 * k3.vel + k4.vel) * w,
            rot: (k1.rot + 2.0 * k2.rot + 2.0 * k3.rot + k4.rot) * w,
            acc: (k1.acc + 2.0 * k2.acc + 2.0 * k3.acc + k4.acc) * w,
            racc: (k1.racc + 2.0 * k2.racc + 2.0 * k3.racc + k4.racc) * w,
        }
    }
}

// ---------------------------------------------------------------------------
// Rotation helpers
// ---------------------------------------------------------------------------

/// Rotations smaller than this are treated as identity.
const MIN_ROTATION: f64 = 1e-12;

/// Incremental rotation matrix for body rate `r` applied over `dt`
/// (Rodrigues' formula for exp([r·dt]×)).
pub fn rot_matrix(r: &Vector3<f64>, dt: f64) -> Matrix3<f64> {
    let rate = r.norm();
    let theta = rate * dt;
    if theta.abs() < MIN_ROTATION || rate == 0.0 {
        return Matrix3::identity();
    }
    let axis = r / rate;
    let k = axis.cross_matrix();
    Matrix3::identity() + k * theta.sin() + k * k * (1.0 - theta.cos())
}

/// Gram-Schmidt on the columns; the third column is rebuilt as a cross
/// product so the result is always right-handed.
pub fn orthonormalize(m: &mut Matrix3<f64>) {
    let c0 = m.column(0).normalize();
    let c1 = m.column(1).into_owned();
    let c1 = (c1 - c0 * c0.dot(&c1)).normalize();
    let c2 = c0.cross(&c1);
    m.set_column(0, &c0);
    m.set_column(1, &c1);
    m.set_column(2, &c2);
}

/// Body→world matrix for a nose-up pitch about the world y axis.
pub fn pitch_matrix(pitch: f64) -> Matrix3<f64> {
    let (s, c) = pitch.sin_cos();
    Matrix3::new(
        c, 0.0, -s, //
        0.0, 1.0, 0.0, //
        s, 0.0, c,
    )
}

/// Body→world matrix for a heading about the world z axis.
pub fn heading_matrix(heading: f64) -> Matrix3<f64> {
    let (s, c) = heading.sin_cos();
    Matrix3::new(
        c, -s, 0.0, //
        s, c, 0.0, //
        0.0, 0.0, 1.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn tiny_rotation_is_identity() {
        let m = rot_matrix(&Vector3::new(1e-15, 0.0, 0.0), 0.01);
        assert_eq!(m, Matrix3::identity());
        let z = rot_matrix(&Vector3::zeros(), 1.0);
        assert!(z.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn quarter_turn_about_z() {
        let m = rot_matrix(&Vector3::new(0.0, 0.0, std::f64::consts::FRAC_PI_2), 1.0);
        let x = m * Vector3::x();
        assert_relative_eq!(x, Vector3::y(), epsilon = 1e-12);
    }

    #[test]
    fn orthonormalize_repairs_drift() {
        let mut m = Matrix3::new(1.01, 0.02, 0.0, -0.01, 0.99, 0.03, 0.0, -0.02, 1.02);
        orthonormalize(&mut m);
        let s = State {
            orient: m,
            ..State::default()
        };
        assert!(s.is_orthonormal(1e-12));
        assert!(m.determinant() > 0.0, "must stay right-handed");
    }

    #[test]
    fn pitch_matrix_raises_nose() {
        let s = State::pitched(Vector3::zeros(), 0.1);
        assert_relative_eq!(s.pitch(), 0.1, epsilon = 1e-12);
        assert!(s.global_vector(&Vector3::x()).z > 0.0);
        assert!(s.is_orthonormal(1e-12));
    }

    #[test]
    fn point_velocity_includes_rotation() {
        let s = State {
            rot: Vector3::new(0.0, 0.0, 1.0),
            ..State::default()
        };
        // Yawing left: a point on the nose moves toward +y
        let v = s.point_velocity(&Vector3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(v, Vector3::new(0.0, 2.0, 0.0), epsilon = 1e-12);
    }
}
