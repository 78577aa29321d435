//! # Coordinate frames
//!
//! The controller works in two frames:
//!
//! - `World` - the autopilot's local frame, in which state estimates arrive and acceleration
//!   setpoints are sent.
//! - `Control` - the world frame rotated about Z by the vehicle heading captured at the start of
//!   the mission. All controller arithmetic happens in this frame.
//!
//! Vectors carry their frame as a type parameter, so adding a world vector to a control vector
//! does not compile. The only way between frames is a [`FrameTransform`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Matrix3, Rotation3, Vector3};
use serde::{Serialize, Serializer};
use std::fmt::{self, Debug, Display};
use std::marker::PhantomData;
use std::ops::{Add, AddAssign, Div, Index, Mul, Neg, Sub, SubAssign};

// Internal
use util::maths::wrap_to_pi;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Marker trait for a coordinate frame.
pub trait Frame: Debug + Copy + Clone + Default + PartialEq + 'static {
    /// Short name of the frame used in logs
    const NAME: &'static str;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The autopilot's local (world) frame.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct World;

/// The heading-aligned control frame fixed at mission start.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Control;

/// A 3D vector expressed in the frame `F`.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FrameVector<F: Frame> {
    v: Vector3<f64>,
    _frame: PhantomData<F>,
}

/// Rotation between the control and world frames built from a single heading.
///
/// The transform is computed once, from the heading at the start of the mission, and is never
/// updated afterwards. If the vehicle yaws during flight the control frame does not follow it.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FrameTransform {
    heading_rad: f64,

    /// Rotation taking control frame vectors into the world frame
    rot_world_control: Rotation3<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Frame for World {
    const NAME: &'static str = "world";
}

impl Frame for Control {
    const NAME: &'static str = "control";
}

impl<F: Frame> FrameVector<F> {
    /// Create a new vector from its components.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self::from_vector(Vector3::new(x, y, z))
    }

    /// Tag a raw vector as being in this frame.
    pub fn from_vector(v: Vector3<f64>) -> Self {
        Self {
            v,
            _frame: PhantomData,
        }
    }

    /// Tag a raw array as being in this frame.
    pub fn from_array(a: [f64; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    pub fn zeros() -> Self {
        Self::from_vector(Vector3::zeros())
    }

    pub fn x(&self) -> f64 {
        self.v[0]
    }

    pub fn y(&self) -> f64 {
        self.v[1]
    }

    pub fn z(&self) -> f64 {
        self.v[2]
    }

    pub fn to_array(&self) -> [f64; 3] {
        [self.v[0], self.v[1], self.v[2]]
    }

    pub fn norm(&self) -> f64 {
        self.v.norm()
    }

    /// Apply a frame-independent linear map, such as a diagonal drag matrix, in this frame.
    pub fn transform_by(&self, m: &Matrix3<f64>) -> Self {
        Self::from_vector(m * self.v)
    }

    /// True if all components are finite.
    pub fn is_finite(&self) -> bool {
        self.v.iter().all(|c| c.is_finite())
    }
}

impl<F: Frame> Add for FrameVector<F> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::from_vector(self.v + rhs.v)
    }
}

impl<F: Frame> AddAssign for FrameVector<F> {
    fn add_assign(&mut self, rhs: Self) {
        self.v += rhs.v;
    }
}

impl<F: Frame> Sub for FrameVector<F> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::from_vector(self.v - rhs.v)
    }
}

impl<F: Frame> SubAssign for FrameVector<F> {
    fn sub_assign(&mut self, rhs: Self) {
        self.v -= rhs.v;
    }
}

impl<F: Frame> Neg for FrameVector<F> {
    type Output = Self;

    fn neg(self) -> Self {
        Self::from_vector(-self.v)
    }
}

impl<F: Frame> Mul<f64> for FrameVector<F> {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::from_vector(self.v * rhs)
    }
}

impl<F: Frame> Mul<FrameVector<F>> for f64 {
    type Output = FrameVector<F>;

    fn mul(self, rhs: FrameVector<F>) -> FrameVector<F> {
        FrameVector::from_vector(rhs.v * self)
    }
}

impl<F: Frame> Div<f64> for FrameVector<F> {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::from_vector(self.v / rhs)
    }
}

impl<F: Frame> Index<usize> for FrameVector<F> {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.v[index]
    }
}

/// Formats as `[x, y, z] (frame)`, so logs always say which frame a vector is in.
impl<F: Frame> Display for FrameVector<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.4}, {:.4}, {:.4}] ({})",
            self.v[0],
            self.v[1],
            self.v[2],
            F::NAME
        )
    }
}

impl<F: Frame> Serialize for FrameVector<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_array().serialize(serializer)
    }
}

impl FrameTransform {
    /// Build the transform from the vehicle heading (yaw about world Z).
    ///
    /// The rotation is
    ///
    /// ```text
    /// R(psi) = [[cos psi, -sin psi, 0],
    ///           [sin psi,  cos psi, 0],
    ///           [      0,        0, 1]]
    /// ```
    ///
    /// The stored heading is wrapped into `[-pi, pi)`.
    pub fn from_heading(heading_rad: f64) -> Self {
        Self {
            heading_rad: wrap_to_pi(heading_rad),
            rot_world_control: Rotation3::from_axis_angle(&Vector3::z_axis(), heading_rad),
        }
    }

    /// The heading this transform was built from.
    pub fn heading_rad(&self) -> f64 {
        self.heading_rad
    }

    /// Rotate a control frame vector into the world frame, `R v`.
    pub fn forward(&self, v: FrameVector<Control>) -> FrameVector<World> {
        FrameVector::from_vector(self.rot_world_control * v.v)
    }

    /// Rotate a world frame vector into the control frame, `R^T v`.
    pub fn inverse(&self, v: FrameVector<World>) -> FrameVector<Control> {
        FrameVector::from_vector(self.rot_world_control.transpose() * v.v)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn assert_vec_eq<F: Frame>(a: FrameVector<F>, b: FrameVector<F>) {
        for i in 0..3 {
            assert_relative_eq!(a[i], b[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_round_trip() {
        let vecs = [
            (1.0, 0.0, 0.0),
            (0.3, -2.7, 9.81),
            (-1e3, 4e-3, 0.0),
            (0.0, 0.0, 0.0),
        ];

        for &heading in &[0.0, 0.7, -2.1, PI, 5.0 * PI / 3.0] {
            let t = FrameTransform::from_heading(heading);

            for &(x, y, z) in vecs.iter() {
                let w = FrameVector::<World>::new(x, y, z);
                assert_vec_eq(t.forward(t.inverse(w)), w);

                let c = FrameVector::<Control>::new(x, y, z);
                assert_vec_eq(t.inverse(t.forward(c)), c);
            }
        }
    }

    #[test]
    fn test_zero_heading_is_identity() {
        let t = FrameTransform::from_heading(0.0);
        let c = FrameVector::<Control>::new(1.0, 2.0, 3.0);
        assert_eq!(t.forward(c).to_array(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_quarter_turn() {
        // With the vehicle facing +Y the control +X axis points along world +Y
        let t = FrameTransform::from_heading(FRAC_PI_2);

        assert_vec_eq(
            t.forward(FrameVector::new(1.0, 0.0, 0.5)),
            FrameVector::new(0.0, 1.0, 0.5),
        );
        assert_vec_eq(
            t.inverse(FrameVector::new(0.0, 1.0, -0.5)),
            FrameVector::new(1.0, 0.0, -0.5),
        );
    }

    #[test]
    fn test_heading_wrapped() {
        let t = FrameTransform::from_heading(5.0 * PI / 3.0);
        assert_relative_eq!(t.heading_rad(), -PI / 3.0, epsilon = 1e-12);

        let c = FrameVector::<Control>::new(1.0, 0.0, 0.0);
        let w = t.forward(c);
        assert_relative_eq!(w.x(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(w.y(), -(3.0f64.sqrt()) / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_vertical_untouched() {
        let t = FrameTransform::from_heading(1.234);
        let w = t.forward(FrameVector::new(0.0, 0.0, -9.8));
        assert_relative_eq!(w.x(), 0.0);
        assert_relative_eq!(w.y(), 0.0);
        assert_relative_eq!(w.z(), -9.8);
    }

    #[test]
    fn test_arithmetic() {
        let a = FrameVector::<Control>::new(1.0, 2.0, 3.0);
        let b = FrameVector::<Control>::new(0.5, -1.0, 2.0);

        assert_eq!((a + b).to_array(), [1.5, 1.0, 5.0]);
        assert_eq!((a - b).to_array(), [0.5, 3.0, 1.0]);
        assert_eq!((2.0 * a).to_array(), [2.0, 4.0, 6.0]);
        assert_eq!((a / 2.0).to_array(), [0.5, 1.0, 1.5]);
        assert_eq!((-a).to_array(), [-1.0, -2.0, -3.0]);

        let d = Matrix3::from_diagonal(&Vector3::new(2.0, 0.0, -1.0));
        assert_eq!(a.transform_by(&d).to_array(), [2.0, 0.0, -3.0]);
    }

    #[test]
    fn test_display_names_frame() {
        let c = FrameVector::<Control>::new(1.0, -0.5, 0.25);
        let w = FrameVector::<World>::new(0.0, 2.0, -9.8);

        assert_eq!(format!("{}", c), "[1.0000, -0.5000, 0.2500] (control)");
        assert_eq!(format!("{}", w), "[0.0000, 2.0000, -9.8000] (world)");
    }
}
