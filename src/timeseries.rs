use crate::errors::PvError;
use chrono::{Datelike, NaiveDateTime};
use strum::Display;

/// An input that is either constant over the simulation or given for every timestamp
#[derive(Clone, Debug, PartialEq)]
pub enum TimeseriesInput {
    Scalar(f64),
    Series(Vec<f64>),
}

impl TimeseriesInput {
    /// Expand to one value per timestamp
    pub(crate) fn broadcast(
        self,
        name: &'static str,
        n_timesteps: usize,
    ) -> Result<Vec<f64>, PvError> {
        match self {
            TimeseriesInput::Scalar(value) => Ok(vec![value; n_timesteps]),
            TimeseriesInput::Series(values) if values.len() == n_timesteps => Ok(values),
            TimeseriesInput::Series(values) => Err(PvError::InputLengthMismatch {
                name,
                expected: n_timesteps,
                found: values.len(),
            }),
        }
    }
}

impl From<f64> for TimeseriesInput {
    fn from(value: f64) -> Self {
        TimeseriesInput::Scalar(value)
    }
}

impl From<Vec<f64>> for TimeseriesInput {
    fn from(values: Vec<f64>) -> Self {
        TimeseriesInput::Series(values)
    }
}

impl From<&[f64]> for TimeseriesInput {
    fn from(values: &[f64]) -> Self {
        TimeseriesInput::Series(values.to_vec())
    }
}

/// Why a timestep produces no geometry
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    SunBelowHorizon,
    NegativeIrradiance,
    NoIrradiance,
    NonFiniteInput,
}

/// Sun position, row orientation and irradiance for every timestamp, in degrees and W/m2.
#[derive(Clone, Debug)]
pub struct FittedInputs {
    pub(crate) timestamps: Vec<NaiveDateTime>,
    pub(crate) dni: Vec<f64>,
    pub(crate) dhi: Vec<f64>,
    pub(crate) solar_zenith: Vec<f64>,
    pub(crate) solar_azimuth: Vec<f64>,
    pub(crate) surface_tilt: Vec<f64>,
    pub(crate) surface_azimuth: Vec<f64>,
    pub(crate) albedo: Vec<f64>,
}

impl FittedInputs {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        timestamps: &[NaiveDateTime],
        dni: impl Into<TimeseriesInput>,
        dhi: impl Into<TimeseriesInput>,
        solar_zenith: impl Into<TimeseriesInput>,
        solar_azimuth: impl Into<TimeseriesInput>,
        surface_tilt: impl Into<TimeseriesInput>,
        surface_azimuth: impl Into<TimeseriesInput>,
        albedo: impl Into<TimeseriesInput>,
    ) -> Result<Self, PvError> {
        let n_timesteps = timestamps.len();

        Ok(Self {
            timestamps: timestamps.to_vec(),
            dni: dni.into().broadcast("dni", n_timesteps)?,
            dhi: dhi.into().broadcast("dhi", n_timesteps)?,
            solar_zenith: solar_zenith.into().broadcast("solar_zenith", n_timesteps)?,
            solar_azimuth: solar_azimuth.into().broadcast("solar_azimuth", n_timesteps)?,
            surface_tilt: surface_tilt.into().broadcast("surface_tilt", n_timesteps)?,
            surface_azimuth: surface_azimuth
                .into()
                .broadcast("surface_azimuth", n_timesteps)?,
            albedo: albedo.into().broadcast("albedo", n_timesteps)?,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub(crate) fn day_of_year(&self, index: usize) -> u32 {
        self.timestamps[index].ordinal()
    }

    /// Whether timestep `index` must be skipped, and why
    pub fn skip_reason(&self, index: usize) -> Option<SkipReason> {
        let (dni, dhi) = (self.dni[index], self.dhi[index]);
        let solar_zenith = self.solar_zenith[index];

        let inputs = [
            dni,
            dhi,
            solar_zenith,
            self.solar_azimuth[index],
            self.surface_tilt[index],
            self.surface_azimuth[index],
            self.albedo[index],
        ];
        if inputs.iter().any(|value| !value.is_finite()) {
            Some(SkipReason::NonFiniteInput)
        } else if solar_zenith >= 90. {
            Some(SkipReason::SunBelowHorizon)
        } else if dni < 0. || dhi < 0. {
            Some(SkipReason::NegativeIrradiance)
        } else if dni == 0. && dhi == 0. {
            Some(SkipReason::NoIrradiance)
        } else {
            None
        }
    }
}
