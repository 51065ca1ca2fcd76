//! Simple zero-overhead unit of measure types
//!
//! Lengths are carried as [`dimensioned`] SI meters throughout the crate. This
//! module adds the handful of units `dimensioned` doesn't give us directly:
//! angular degrees for coordinates, and kilometers and miles for reporting.

use std::fmt::{Display, Formatter};
use std::ops::{Add, Mul, Sub};

use approx::{AbsDiffEq, RelativeEq, relative_eq};
use dimensioned::si::Meter;
use num_traits::{Float, Num};

macro_rules! unit_of_measure {
    (@base $u:ident) => {
        #[derive(Clone, Copy, Default, PartialEq, PartialOrd, Debug)]
        pub struct $u<N: Num>(pub N);

        // Relative equality traits for appox support

        impl<N> AbsDiffEq for $u<N>
        where
            N: Num + Float + AbsDiffEq<N, Epsilon = N>,
        {
            type Epsilon = N;

            fn default_epsilon() -> Self::Epsilon {
                N::epsilon()
            }

            fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
                self.0.abs_diff_eq(&other.0, epsilon)
            }
        }

        impl<N> RelativeEq for $u<N>
        where
            N: Num + Float + AbsDiffEq<N, Epsilon = N> + RelativeEq<N>,
        {
            fn default_max_relative() -> Self::Epsilon {
                N::epsilon()
            }

            fn relative_eq(
                &self,
                other: &Self,
                epsilon: Self::Epsilon,
                max_relative: Self::Epsilon,
            ) -> bool {
                relative_eq!(
                    self.0,
                    other.0,
                    epsilon = epsilon,
                    max_relative = max_relative
                )
            }
        }
    };

    ($u:ident) => {
        unit_of_measure!(@base $u);

        impl<N> Add for $u<N>
        where
            N: Num + Add,
        {
            type Output = Self;

            fn add(self, rhs: Self) -> Self {
                Self(self.0 + rhs.0)
            }
        }

        impl<N> Sub for $u<N>
        where
            N: Num + Sub,
        {
            type Output = Self;

            fn sub(self, rhs: Self) -> Self {
                Self(self.0 - rhs.0)
            }
        }
    };

    ($u:ident, $symbol:literal, $meters:expr) => {
        unit_of_measure!(@base $u);

        impl From<Meter<f64>> for $u<f64> {
            fn from(value: Meter<f64>) -> Self {
                Self(value.value_unsafe / ($meters as f64))
            }
        }

        impl<N> Display for $u<N>
        where
            N: Num + Display,
        {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                match f.precision() {
                    Some(p) => write!(f, "{:.*}{}", p, self.0, $symbol),
                    None => write!(f, "{:.1}{}", self.0, $symbol),
                }
            }
        }
    };
}

// Angular units:
unit_of_measure![Degrees];

// Distance units, for reporting:
unit_of_measure![Kilometers, "km", 1000.0];
unit_of_measure![Miles, "mi", 1609.344];

/// One degree, for writing angles as `12.5 * DEG`.
pub const DEG: Degrees<f64> = Degrees(1.0);

impl Mul<Degrees<f64>> for f64 {
    type Output = Degrees<f64>;

    fn mul(self, rhs: Degrees<f64>) -> Degrees<f64> {
        Degrees(self * rhs.0)
    }
}
