use crate::compare_floats::{clip, max_of_2};
use crate::core::geometry::{OrderedPVArray, Side, SurfaceLocation};
use crate::core::irradiance::sky::{circumsolar_projection, uniform_disk_shading, PerezLuminance};
use crate::core::irradiance::{
    cos_angle_of_incidence, FittedIrradiance, IrradianceModel, SurfaceCategory,
};
use crate::core::units::sind;
use crate::errors::PvError;
use crate::input::PVArrayParameters;
use crate::timeseries::FittedInputs;
use nalgebra::Point2;

const DEFAULT_HORIZON_BAND_ANGLE: f64 = 6.5;
const DEFAULT_CIRCUMSOLAR_ANGLE: f64 = 30.;

/// Perez sky split into isotropic, circumsolar and horizon diffuse light. The horizon band seen
/// by the back of a row and the circumsolar disk seen by its illuminated side can be partly
/// hidden by the neighbouring row.
#[derive(Clone, Copy, Debug)]
pub struct HybridPerezOrdered {
    /// Elevation of the top of the bright horizon band, in degrees
    horizon_band_angle: f64,
    /// Angular diameter of the circumsolar disk, in degrees
    circumsolar_angle: f64,
}

impl Default for HybridPerezOrdered {
    fn default() -> Self {
        Self::new(DEFAULT_HORIZON_BAND_ANGLE, DEFAULT_CIRCUMSOLAR_ANGLE)
    }
}

impl HybridPerezOrdered {
    pub fn new(horizon_band_angle: f64, circumsolar_angle: f64) -> Self {
        Self {
            horizon_band_angle,
            circumsolar_angle,
        }
    }

    pub fn horizon_band_angle(&self) -> f64 {
        self.horizon_band_angle
    }

    pub fn circumsolar_angle(&self) -> f64 {
        self.circumsolar_angle
    }

    /// Percentage of the horizon band hidden from `point` by the row `blocking`
    fn horizon_shading_pct(&self, point: Point2<f64>, blocking: [Point2<f64>; 2]) -> f64 {
        if self.horizon_band_angle <= 0. {
            return 0.;
        }
        let obstruction = clip(
            highest_elevation(point, blocking),
            0.,
            self.horizon_band_angle,
        );
        100. * sind(obstruction) / sind(self.horizon_band_angle)
    }

    /// Percentage of the circumsolar disk, centred on the sun at elevation `solar_elevation`
    /// in the 2D plane, hidden from `point` by the row `blocking`
    fn circumsolar_shading_pct(
        &self,
        point: Point2<f64>,
        blocking: [Point2<f64>; 2],
        solar_elevation: f64,
    ) -> f64 {
        if self.circumsolar_angle <= 0. {
            return 0.;
        }
        let lowest_visible = solar_elevation - 0.5 * self.circumsolar_angle;
        let covered_fraction =
            (highest_elevation(point, blocking) - lowest_visible) / self.circumsolar_angle;
        100. * uniform_disk_shading(covered_fraction)
    }

    /// Horizon and circumsolar shading percentages of every surface of the array, in the order
    /// of its surfaces
    fn shading_pcts(&self, pvarray: &OrderedPVArray) -> Vec<(f64, f64)> {
        let sun = pvarray.solar_2d_vector();
        let solar_elevation = sun.y.atan2(sun.x.abs()).to_degrees();
        let endpoints = |index: usize| {
            let line = pvarray.pvrows()[index].geometry();
            [line.a(), line.b()]
        };

        pvarray
            .surfaces()
            .zip(pvarray.surface_locations())
            .map(|(surface, location)| match location {
                SurfaceLocation::Ground => (0., 0.),
                SurfaceLocation::PVRow { index, side } => {
                    let centroid = surface.centroid();
                    let horizon_pct = match pvarray.facing_neighbour(index, side) {
                        Some(neighbour) if side == Side::Back => {
                            self.horizon_shading_pct(centroid, endpoints(neighbour))
                        }
                        _ => 0.,
                    };
                    let circumsolar_pct = match pvarray.sun_side_neighbour(index) {
                        Some(neighbour)
                            if pvarray.illuminated_side() == Some(side) && !surface.is_shaded() =>
                        {
                            self.circumsolar_shading_pct(
                                centroid,
                                endpoints(neighbour),
                                solar_elevation,
                            )
                        }
                        _ => 0.,
                    };
                    (horizon_pct, circumsolar_pct)
                }
            })
            .collect()
    }
}

/// Largest elevation angle of the `points` seen from `from`, in degrees
fn highest_elevation(from: Point2<f64>, points: [Point2<f64>; 2]) -> f64 {
    points
        .iter()
        .map(|point| {
            let offset = point - from;
            offset.y.atan2(offset.x.abs()).to_degrees()
        })
        .fold(f64::NEG_INFINITY, max_of_2)
}

impl IrradianceModel for HybridPerezOrdered {
    fn source_components(&self) -> &'static [&'static str] {
        &["direct", "circumsolar", "horizon"]
    }

    fn fit(&self, inputs: &FittedInputs, params: &PVArrayParameters) -> FittedIrradiance {
        let n_timesteps = inputs.len();
        let luminances: Vec<PerezLuminance> = (0..n_timesteps)
            .map(|index| {
                PerezLuminance::new(
                    inputs.dni[index],
                    inputs.dhi[index],
                    inputs.solar_zenith[index],
                    inputs.day_of_year(index),
                )
            })
            .collect();

        let mut fitted = FittedIrradiance::new(inputs, params);
        // the sky dome radiates the circumsolar share and the sunlit ground receives the
        // isotropic share
        fitted.insert_component("circumsolar", n_timesteps, |category, index| match category {
            SurfaceCategory::Ground => luminances[index].isotropic,
            SurfaceCategory::FrontPvrow | SurfaceCategory::BackPvrow => {
                let cos_incidence = cos_angle_of_incidence(inputs, category, index);
                luminances[index].circumsolar
                    * circumsolar_projection(cos_incidence, inputs.solar_zenith[index])
            }
        });
        // negative in overcast skies, where the horizon band is darker than the dome
        fitted.insert_component("horizon", n_timesteps, |category, index| match category {
            SurfaceCategory::Ground => 0.,
            SurfaceCategory::FrontPvrow | SurfaceCategory::BackPvrow => {
                luminances[index].horizon * sind(inputs.surface_tilt[index])
            }
        });
        fitted.set_isotropic_luminance(
            luminances
                .iter()
                .map(|luminance| luminance.circumsolar)
                .collect(),
        );
        fitted
    }

    fn transform(
        &self,
        fitted: &FittedIrradiance,
        pvarray: &mut OrderedPVArray,
        index: usize,
    ) -> Result<(), PvError> {
        fitted.apply_rho_and_direct(pvarray, index)?;

        let shading_pcts = self.shading_pcts(pvarray);
        let locations = pvarray.surface_locations();
        for ((surface, location), (horizon_pct, circumsolar_pct)) in
            pvarray.surfaces_mut().zip(locations).zip(shading_pcts)
        {
            let category = SurfaceCategory::from(location);
            let circumsolar = if surface.is_shaded() {
                0.
            } else {
                fitted.value("circumsolar", category, index)? * (1. - circumsolar_pct / 100.)
            };
            let horizon = fitted.value("horizon", category, index)? * (1. - horizon_pct / 100.);

            surface.set_param("circumsolar", circumsolar);
            surface.set_param("horizon", horizon);
            surface.set_param("horizon_shading_pct", horizon_pct);
            surface.set_param("circumsolar_shading_pct", circumsolar_pct);
        }
        Ok(())
    }
}
