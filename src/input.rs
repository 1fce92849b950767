use crate::core::units::Orientation360;
use anyhow::{anyhow, Context};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::io::{BufReader, Read};

pub const DEFAULT_X_MIN_GROUND: f64 = -100.;
pub const DEFAULT_X_MAX_GROUND: f64 = 100.;

pub fn ingest_parameters(json: impl Read) -> Result<PVArrayParameters, anyhow::Error> {
    PVArrayParameters::init_with_json(json)
}

/// Layout of a row of identical, parallel PV rows of equal height, evenly spaced across the
/// ground.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PVArrayParameters {
    #[validate(minimum = 1)]
    pub n_pvrows: usize,
    /// Height of the centre of each row above the ground, in m
    #[validate(exclusive_minimum = 0.)]
    pub pvrow_height: f64,
    /// Width of each row across the array, in m
    #[validate(exclusive_minimum = 0.)]
    pub pvrow_width: f64,
    /// Azimuth of the row axis, in degrees clockwise from north
    #[validate]
    pub axis_azimuth: Orientation360,
    /// Ground coverage ratio: row width divided by row pitch
    #[validate(exclusive_minimum = 0.)]
    #[validate(maximum = 1.)]
    pub gcr: f64,
    #[validate(minimum = 0.)]
    #[validate(exclusive_maximum = 1.)]
    pub rho_front_pvrow: f64,
    #[validate(minimum = 0.)]
    #[validate(exclusive_maximum = 1.)]
    pub rho_back_pvrow: f64,
    /// Number of equal segments each side of a given row (by index) is discretized into
    #[serde(default)]
    pub cut: IndexMap<usize, SideCut>,
    #[serde(default = "default_x_min_ground")]
    pub x_min_ground: f64,
    #[serde(default = "default_x_max_ground")]
    pub x_max_ground: f64,
}

fn default_x_min_ground() -> f64 {
    DEFAULT_X_MIN_GROUND
}

fn default_x_max_ground() -> f64 {
    DEFAULT_X_MAX_GROUND
}

fn default_segment_count() -> usize {
    1
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SideCut {
    #[serde(default = "default_segment_count")]
    pub front: usize,
    #[serde(default = "default_segment_count")]
    pub back: usize,
}

impl Default for SideCut {
    fn default() -> Self {
        Self { front: 1, back: 1 }
    }
}

impl PVArrayParameters {
    pub fn new(
        n_pvrows: usize,
        pvrow_height: f64,
        pvrow_width: f64,
        axis_azimuth: Orientation360,
        gcr: f64,
        rho_front_pvrow: f64,
        rho_back_pvrow: f64,
    ) -> Self {
        Self {
            n_pvrows,
            pvrow_height,
            pvrow_width,
            axis_azimuth,
            gcr,
            rho_front_pvrow,
            rho_back_pvrow,
            cut: Default::default(),
            x_min_ground: DEFAULT_X_MIN_GROUND,
            x_max_ground: DEFAULT_X_MAX_GROUND,
        }
    }

    pub fn init_with_json(json: impl Read) -> Result<Self, anyhow::Error> {
        let reader = BufReader::new(json);

        let parameters: Self =
            serde_json::from_reader(reader).context("could not parse PV array parameters")?;
        parameters.check()?;

        Ok(parameters)
    }

    /// Validate field ranges along with the constraints between fields
    pub fn check(&self) -> Result<(), anyhow::Error> {
        self.validate()
            .map_err(|errors| anyhow!("PV array parameters failed validation: {errors}"))?;

        if self.x_max_ground <= self.x_min_ground {
            return Err(anyhow!(
                "x_max_ground ({}) must be greater than x_min_ground ({})",
                self.x_max_ground,
                self.x_min_ground
            ));
        }
        if let Some((index, _)) = self
            .cut
            .iter()
            .find(|(_, cut)| cut.front == 0 || cut.back == 0)
        {
            return Err(anyhow!(
                "cut for PV row {index} must split each side into at least one segment"
            ));
        }

        Ok(())
    }

    /// Distance between the centres of neighbouring rows, in m
    pub fn pitch(&self) -> f64 {
        self.pvrow_width / self.gcr
    }

    pub fn cut_for(&self, pvrow_index: usize) -> SideCut {
        self.cut.get(&pvrow_index).copied().unwrap_or_default()
    }
}
