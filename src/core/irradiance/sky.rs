use crate::compare_floats::{clip, max_of_2};
use crate::core::units::{cosd, sind, DAYS_PER_YEAR, SOLAR_CONSTANT};
use std::f64::consts::PI;

/// Constant of the Perez clearness formula, applied to the zenith angle in radians
const CLEARNESS_FORMULA_K: f64 = 1.041;

/// Beyond this zenith angle the circumsolar region is treated as at the horizon, in degrees
const CIRCUMSOLAR_ZENITH_LIMIT: f64 = 85.;

/// Cosine of the angle between the sun and the normal of a surface with the given tilt and
/// azimuth, all in degrees. Negative when the sun is behind the surface.
pub(crate) fn cos_angle_of_incidence(
    surface_tilt: f64,
    surface_azimuth: f64,
    solar_zenith: f64,
    solar_azimuth: f64,
) -> f64 {
    cosd(solar_zenith) * cosd(surface_tilt)
        + sind(solar_zenith) * sind(surface_tilt) * cosd(solar_azimuth - surface_azimuth)
}

/// Relative optical air mass for the given solar zenith in degrees, after Kasten and Young
/// (1989). Stays finite up to and slightly beyond the horizon.
pub(crate) fn relative_air_mass(solar_zenith: f64) -> f64 {
    1.0 / (cosd(solar_zenith) + 0.50572 * (96.07995 - solar_zenith).powf(-1.6364))
}

/// Extra-terrestrial normal irradiance on the given day of the year, in W/m2, using the
/// Fourier series of Spencer (1971) for the earth-sun distance
pub(crate) fn extra_terrestrial_radiation(day_of_year: u32) -> f64 {
    let day_angle = 2. * PI * (day_of_year as f64 - 1.) / DAYS_PER_YEAR as f64;
    SOLAR_CONSTANT
        * (1.00011
            + 0.034221 * day_angle.cos()
            + 0.00128 * day_angle.sin()
            + 0.000719 * (2. * day_angle).cos()
            + 0.000077 * (2. * day_angle).sin())
}

#[derive(Debug, PartialEq)]
pub(crate) struct BrightnessCoefficientsRow {
    f11: f64,
    f12: f64,
    f13: f64,
    f21: f64,
    f22: f64,
    f23: f64,
}

// composite of all sites, Perez et al. (1990)
static BRIGHTNESS_COEFFICIENTS: [BrightnessCoefficientsRow; 8] = [
    BrightnessCoefficientsRow {
        f11: -0.008,
        f12: 0.588,
        f13: -0.062,
        f21: -0.06,
        f22: 0.072,
        f23: -0.022,
    },
    BrightnessCoefficientsRow {
        f11: 0.13,
        f12: 0.683,
        f13: -0.151,
        f21: -0.019,
        f22: 0.066,
        f23: -0.029,
    },
    BrightnessCoefficientsRow {
        f11: 0.33,
        f12: 0.487,
        f13: -0.221,
        f21: 0.055,
        f22: -0.064,
        f23: -0.026,
    },
    BrightnessCoefficientsRow {
        f11: 0.568,
        f12: 0.187,
        f13: -0.295,
        f21: 0.109,
        f22: -0.152,
        f23: -0.014,
    },
    BrightnessCoefficientsRow {
        f11: 0.873,
        f12: -0.392,
        f13: -0.362,
        f21: 0.226,
        f22: -0.462,
        f23: 0.001,
    },
    BrightnessCoefficientsRow {
        f11: 1.132,
        f12: -1.237,
        f13: -0.412,
        f21: 0.288,
        f22: -0.823,
        f23: 0.056,
    },
    BrightnessCoefficientsRow {
        f11: 1.06,
        f12: -1.6,
        f13: -0.359,
        f21: 0.264,
        f22: -1.127,
        f23: 0.131,
    },
    BrightnessCoefficientsRow {
        f11: 0.678,
        f12: -0.327,
        f13: -0.25,
        f21: 0.156,
        f22: -1.377,
        f23: 0.251,
    },
];

/// Upper bounds of the clearness bins; anything clearer falls in the last bin
const CLEARNESS_BIN_UPPER_BOUNDS: [f64; 7] = [1.065, 1.23, 1.5, 1.95, 2.8, 4.5, 6.2];

pub(crate) fn brightness_coefficients(clearness: f64) -> &'static BrightnessCoefficientsRow {
    let bin = CLEARNESS_BIN_UPPER_BOUNDS
        .iter()
        .position(|upper_bound| clearness < *upper_bound)
        .unwrap_or(CLEARNESS_BIN_UPPER_BOUNDS.len());
    &BRIGHTNESS_COEFFICIENTS[bin]
}

/// Circumsolar brightness coefficient, F1, never negative
pub(crate) fn circumsolar_brightness_coefficient(
    clearness: f64,
    delta: f64,
    solar_zenith: f64,
) -> f64 {
    let row = brightness_coefficients(clearness);
    let f1 = row.f11 + row.f12 * delta + row.f13 * solar_zenith.to_radians();
    max_of_2(f1, 0.0)
}

/// Horizon brightness coefficient, F2, which may be negative
pub(crate) fn horizon_brightness_coefficient(clearness: f64, delta: f64, solar_zenith: f64) -> f64 {
    let row = brightness_coefficients(clearness);
    row.f21 + row.f22 * delta + row.f23 * solar_zenith.to_radians()
}

/// Dimensionless clearness parameter, epsilon, of the Perez model
pub(crate) fn clearness_parameter(
    diffuse_horizontal_radiation: f64,
    direct_beam_radiation: f64,
    solar_zenith: f64,
) -> f64 {
    if diffuse_horizontal_radiation == 0.0 {
        999.0
    } else {
        let zenith_term = CLEARNESS_FORMULA_K * solar_zenith.to_radians().powi(3);
        (((diffuse_horizontal_radiation + direct_beam_radiation) / diffuse_horizontal_radiation)
            + zenith_term)
            / (1.0 + zenith_term)
    }
}

/// Dimensionless sky brightness parameter, delta, of the Perez model
pub(crate) fn sky_brightness_parameter(
    air_mass: f64,
    diffuse_horizontal_radiation: f64,
    extra_terrestrial_radiation: f64,
) -> f64 {
    air_mass * diffuse_horizontal_radiation / extra_terrestrial_radiation
}

/// Ratio of the circumsolar irradiance on a surface to the circumsolar luminance, given the
/// cosine of the angle of incidence
pub(crate) fn circumsolar_projection(cos_incidence: f64, solar_zenith: f64) -> f64 {
    max_of_2(cos_incidence, 0.) / max_of_2(cosd(CIRCUMSOLAR_ZENITH_LIMIT), cosd(solar_zenith))
}

/// Fraction of the area of a uniform disk hidden behind a straight edge that covers
/// `covered_fraction` of its diameter
pub(crate) fn uniform_disk_shading(covered_fraction: f64) -> f64 {
    let h = 1. - 2. * clip(covered_fraction, 0., 1.);
    (h.acos() - h * (1. - h * h).sqrt()) / PI
}

/// Split of diffuse horizontal irradiance into sky luminances for one timestep
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PerezLuminance {
    pub(crate) isotropic: f64,
    pub(crate) circumsolar: f64,
    /// Horizon brightening on a vertical surface, which scales with the sine of the tilt
    pub(crate) horizon: f64,
}

impl PerezLuminance {
    pub(crate) fn new(
        direct_normal: f64,
        diffuse_horizontal: f64,
        solar_zenith: f64,
        day_of_year: u32,
    ) -> Self {
        if diffuse_horizontal <= 0. || solar_zenith >= 90. {
            return Self {
                isotropic: max_of_2(diffuse_horizontal, 0.),
                circumsolar: 0.,
                horizon: 0.,
            };
        }

        let delta = sky_brightness_parameter(
            relative_air_mass(solar_zenith),
            diffuse_horizontal,
            extra_terrestrial_radiation(day_of_year),
        );
        let clearness = clearness_parameter(diffuse_horizontal, direct_normal, solar_zenith);
        let f1 = circumsolar_brightness_coefficient(clearness, delta, solar_zenith);
        let f2 = horizon_brightness_coefficient(clearness, delta, solar_zenith);

        Self {
            isotropic: diffuse_horizontal * (1. - f1),
            circumsolar: diffuse_horizontal * f1,
            horizon: diffuse_horizontal * f2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case(1.0, -0.008)]
    #[case(1.1, 0.13)]
    #[case(1.5, 0.568)]
    #[case(6.1, 1.06)]
    #[case(10.5, 0.678)]
    #[case(999.0, 0.678)]
    fn test_brightness_coefficient_bins(#[case] clearness: f64, #[case] expected_f11: f64) {
        assert_eq!(brightness_coefficients(clearness).f11, expected_f11);
    }

    #[rstest]
    fn test_circumsolar_coefficient_is_clipped_at_zero() {
        // first bin with a large zenith gives a negative raw value
        assert_eq!(circumsolar_brightness_coefficient(1.0, 0.0, 89.), 0.0);
        assert!(horizon_brightness_coefficient(1.0, 0.0, 89.) < 0.0);
    }

    #[rstest]
    fn test_clearness_parameter() {
        assert_eq!(clearness_parameter(0.0, 500.0, 30.0), 999.0);
        let zenith_term = 1.041 * 20_f64.to_radians().powi(3);
        assert_relative_eq!(
            clearness_parameter(100.0, 1000.0, 20.0),
            (11.0 + zenith_term) / (1.0 + zenith_term)
        );
    }

    #[rstest]
    fn test_relative_air_mass() {
        assert_relative_eq!(relative_air_mass(0.), 0.9997119918558381, max_relative = 1e-12);
        assert_relative_eq!(relative_air_mass(60.), 1.9942928525292494, max_relative = 1e-12);
    }

    #[rstest]
    fn test_relative_air_mass_near_horizon_stays_finite() {
        let low = relative_air_mass(89.);
        assert!(low.is_finite() && low > 20.);
        assert!(relative_air_mass(90.).is_finite());
    }

    #[rstest]
    fn test_extra_terrestrial_radiation() {
        assert_relative_eq!(
            extra_terrestrial_radiation(1),
            1366.1 * (1.00011 + 0.034221 + 0.000719),
            max_relative = 1e-12
        );
        // aphelion in early July
        assert!(extra_terrestrial_radiation(185) < 1330.);
        assert!(extra_terrestrial_radiation(3) > 1400.);
    }

    #[rstest]
    fn test_cos_angle_of_incidence() {
        assert_relative_eq!(cos_angle_of_incidence(20., 90., 20., 90.), 1.);
        assert_relative_eq!(cos_angle_of_incidence(0., 180., 60., 90.), 0.5, epsilon = 1e-12);
        assert!(cos_angle_of_incidence(90., 270., 30., 90.) < 0.);
    }

    #[rstest]
    fn test_perez_luminance_for_clear_sky() {
        let luminance = PerezLuminance::new(1000., 100., 20., 162);

        let delta = relative_air_mass(20.) * 100. / extra_terrestrial_radiation(162);
        let f1 = 0.678 - 0.327 * delta - 0.25 * 20_f64.to_radians();
        let f2 = 0.156 - 1.377 * delta + 0.251 * 20_f64.to_radians();
        assert_relative_eq!(luminance.circumsolar, 100. * f1, max_relative = 1e-12);
        assert_relative_eq!(luminance.isotropic, 100. * (1. - f1), max_relative = 1e-12);
        assert_relative_eq!(luminance.horizon, 100. * f2, max_relative = 1e-12);
        assert_relative_eq!(luminance.isotropic + luminance.circumsolar, 100.);
    }

    #[rstest]
    fn test_perez_luminance_without_diffuse_light() {
        let luminance = PerezLuminance::new(800., 0., 30., 100);
        assert_eq!(
            luminance,
            PerezLuminance {
                isotropic: 0.,
                circumsolar: 0.,
                horizon: 0.
            }
        );
    }

    #[rstest]
    fn test_circumsolar_projection() {
        assert_relative_eq!(circumsolar_projection(1., 20.), 1. / cosd(20.));
        assert_eq!(circumsolar_projection(-0.5, 20.), 0.);
        assert_relative_eq!(circumsolar_projection(0.5, 89.), 0.5 / cosd(85.));
    }

    #[rstest]
    #[case(-0.2, 0.)]
    #[case(0., 0.)]
    #[case(0.5, 0.5)]
    #[case(1., 1.)]
    #[case(1.3, 1.)]
    fn test_uniform_disk_shading(#[case] covered_fraction: f64, #[case] expected: f64) {
        assert_relative_eq!(uniform_disk_shading(covered_fraction), expected, epsilon = 1e-12);
    }

    #[rstest]
    fn test_uniform_disk_shading_grows_slowly_at_the_edge() {
        // a thin sliver of the diameter hides much less than that share of the area
        assert!(uniform_disk_shading(0.1) < 0.1);
        assert!(uniform_disk_shading(0.9) > 0.9);
    }
}
