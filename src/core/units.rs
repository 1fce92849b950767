use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

pub const DEGREES_PER_TURN: f64 = 360.;
pub const DAYS_PER_YEAR: u32 = 365;
/// Solar constant, in W/m2
pub const SOLAR_CONSTANT: f64 = 1366.1;

pub(crate) fn sind(angle_deg: f64) -> f64 {
    angle_deg.to_radians().sin()
}

pub(crate) fn cosd(angle_deg: f64) -> f64 {
    angle_deg.to_radians().cos()
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, PartialOrd, Serialize, Validate)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Orientation360(
    #[validate(minimum = 0.)]
    #[validate(maximum = 360.)]
    f64,
);

impl Orientation360 {
    pub fn new(angle: f64) -> Result<Self, Orientation360Error> {
        if !(0. ..=DEGREES_PER_TURN).contains(&angle) {
            return Err(Orientation360Error::InvalidAngle);
        }

        Ok(Self(angle))
    }

    pub fn angle(&self) -> f64 {
        self.0
    }

    /// Angle swept clockwise from this orientation to `azimuth`, in [0, 360)
    pub(crate) fn clockwise_offset_to(&self, azimuth: f64) -> f64 {
        (azimuth - self.0).rem_euclid(DEGREES_PER_TURN)
    }
}

impl Display for Orientation360 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Orientation360 {
    type Err = Orientation360Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let angle = s
            .parse::<f64>()
            .map_err(|_| Orientation360Error::InvalidAngle)?;
        Self::new(angle)
    }
}

#[derive(Clone, Copy, Debug, Error)]
pub enum Orientation360Error {
    #[error("Angle must be between 0 and 360 degrees inclusive")]
    InvalidAngle,
}
