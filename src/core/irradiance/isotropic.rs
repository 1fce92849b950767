use crate::core::geometry::OrderedPVArray;
use crate::core::irradiance::{FittedIrradiance, IrradianceModel};
use crate::errors::PvError;
use crate::input::PVArrayParameters;
use crate::timeseries::FittedInputs;

/// Sky of uniform diffuse luminance plus the direct beam
#[derive(Clone, Copy, Debug, Default)]
pub struct IsotropicOrdered;

impl IrradianceModel for IsotropicOrdered {
    fn source_components(&self) -> &'static [&'static str] {
        &["direct"]
    }

    fn fit(&self, inputs: &FittedInputs, params: &PVArrayParameters) -> FittedIrradiance {
        let mut fitted = FittedIrradiance::new(inputs, params);
        fitted.set_isotropic_luminance(inputs.dhi.clone());
        fitted
    }

    fn transform(
        &self,
        fitted: &FittedIrradiance,
        pvarray: &mut OrderedPVArray,
        index: usize,
    ) -> Result<(), PvError> {
        fitted.apply_rho_and_direct(pvarray, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::irradiance::SurfaceCategory;
    use crate::core::units::{cosd, Orientation360};
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn params() -> PVArrayParameters {
        PVArrayParameters::new(3, 2.5, 2., Orientation360::new(0.).unwrap(), 0.4, 0.01, 0.03)
    }

    #[fixture]
    fn inputs() -> FittedInputs {
        let timestamp = NaiveDate::from_ymd_opt(2019, 6, 11)
            .unwrap()
            .and_hms_opt(11, 0, 0)
            .unwrap();
        FittedInputs::new(&[timestamp], 1000., 100., 20., 90., 20., 90., 0.2).unwrap()
    }

    #[rstest]
    fn test_fit_projects_direct_beam(params: PVArrayParameters, inputs: FittedInputs) {
        let fitted = IsotropicOrdered.fit(&inputs, &params);

        assert_relative_eq!(
            fitted.direct(SurfaceCategory::FrontPvrow).unwrap()[0],
            1000.,
            epsilon = 1e-9
        );
        assert_relative_eq!(fitted.direct(SurfaceCategory::Ground).unwrap()[0], 1000. * cosd(20.));
        assert_eq!(fitted.direct(SurfaceCategory::BackPvrow).unwrap()[0], 0.);
        assert_eq!(fitted.isotropic_luminance(), &[100.]);
        assert_eq!(fitted.rho(SurfaceCategory::Ground).unwrap(), &[0.2]);
        assert_eq!(fitted.component_names().collect::<Vec<_>>(), vec!["direct"]);
    }

    #[rstest]
    fn test_transform_sets_rho_and_direct(params: PVArrayParameters, inputs: FittedInputs) {
        let fitted = IsotropicOrdered.fit(&inputs, &params);
        let mut pvarray = OrderedPVArray::build(&params, 20., 90., 20., 90.)
            .unwrap()
            .unwrap();
        IsotropicOrdered.transform(&fitted, &mut pvarray, 0).unwrap();

        let front = pvarray.pvrows()[1].front();
        assert_relative_eq!(front.get_param_weighted("direct").unwrap(), 1000., epsilon = 1e-9);
        assert_relative_eq!(front.get_param_weighted("rho").unwrap(), 0.01);
        assert_relative_eq!(pvarray.pvrows()[1].back().get_param_weighted("rho").unwrap(), 0.03);
        for surface in pvarray.ground().surfaces() {
            let expected = if surface.is_shaded() { 0. } else { 1000. * cosd(20.) };
            assert_relative_eq!(surface.get_param("direct").unwrap(), expected);
            assert_relative_eq!(surface.get_param("rho").unwrap(), 0.2);
        }
    }
}
