use crate::core::geometry::OrderedPVArray;
use crate::core::irradiance::{FittedIrradiance, IrradianceModel};
use crate::core::radiosity::solve_radiosity;
use crate::core::view_factors::VFCalculator;
use crate::errors::PvError;
use crate::input::PVArrayParameters;
use crate::timeseries::{FittedInputs, TimeseriesInput};
use chrono::NaiveDateTime;
use rayon::prelude::*;
use tracing::{debug, info, trace};

/// Runs the irradiance simulation of a PV array. The engine is fitted once with timeseries of
/// sun positions and irradiance, after which every timestep can be simulated independently of
/// the others.
#[derive(Debug)]
pub struct PVEngine<M: IrradianceModel> {
    params: PVArrayParameters,
    irradiance_model: M,
    vf_calculator: VFCalculator,
    fitted: Option<(FittedInputs, FittedIrradiance)>,
}

impl<M: IrradianceModel> PVEngine<M> {
    pub fn new(params: PVArrayParameters, irradiance_model: M) -> Result<Self, PvError> {
        params
            .check()
            .map_err(|err| PvError::InvalidParameters(format!("{err:#}")))?;

        Ok(Self {
            params,
            irradiance_model,
            vf_calculator: Default::default(),
            fitted: None,
        })
    }

    pub fn with_vf_calculator(mut self, vf_calculator: VFCalculator) -> Self {
        self.vf_calculator = vf_calculator;
        self
    }

    pub fn params(&self) -> &PVArrayParameters {
        &self.params
    }

    pub fn irradiance_model(&self) -> &M {
        &self.irradiance_model
    }

    /// Store the timeseries to simulate. Every input other than `timestamps` may be a single
    /// value for all timestamps or one value per timestamp. Angles are in degrees and
    /// irradiance in W/m2.
    pub fn fit(
        &mut self,
        timestamps: &[NaiveDateTime],
        dni: impl Into<TimeseriesInput>,
        dhi: impl Into<TimeseriesInput>,
        solar_zenith: impl Into<TimeseriesInput>,
        solar_azimuth: impl Into<TimeseriesInput>,
        surface_tilt: impl Into<TimeseriesInput>,
        surface_azimuth: impl Into<TimeseriesInput>,
        albedo: impl Into<TimeseriesInput>,
    ) -> Result<(), PvError> {
        let inputs = FittedInputs::new(
            timestamps,
            dni,
            dhi,
            solar_zenith,
            solar_azimuth,
            surface_tilt,
            surface_azimuth,
            albedo,
        )?;
        let irradiance = self.irradiance_model.fit(&inputs, &self.params);

        let n_skipped = (0..inputs.len())
            .filter(|&index| inputs.skip_reason(index).is_some())
            .count();
        info!(
            "Fitted {} timesteps, of which {n_skipped} will be skipped",
            inputs.len()
        );

        self.fitted = Some((inputs, irradiance));
        Ok(())
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn n_timesteps(&self) -> usize {
        self.fitted
            .as_ref()
            .map_or(0, |(inputs, _)| inputs.len())
    }

    pub fn inputs(&self) -> Option<&FittedInputs> {
        self.fitted.as_ref().map(|(inputs, _)| inputs)
    }

    /// Irradiance components per surface category for every fitted timestep
    pub fn irradiance(&self) -> Option<&FittedIrradiance> {
        self.fitted.as_ref().map(|(_, irradiance)| irradiance)
    }

    /// Build and solve the array at timestep `index`. Returns `None` for timesteps without sun.
    pub fn run_timestep(&self, index: usize) -> Result<Option<OrderedPVArray>, PvError> {
        let (inputs, irradiance) = self.fitted.as_ref().ok_or(PvError::NotFitted)?;
        if index >= inputs.len() {
            return Err(PvError::TimestepOutOfRange {
                index,
                n_timesteps: inputs.len(),
            });
        }
        if let Some(reason) = inputs.skip_reason(index) {
            debug!("Skipping timestep {index}: {reason}");
            return Ok(None);
        }

        let Some(mut pvarray) = OrderedPVArray::build(
            &self.params,
            inputs.solar_zenith[index],
            inputs.solar_azimuth[index],
            inputs.surface_tilt[index],
            inputs.surface_azimuth[index],
        )?
        else {
            return Ok(None);
        };

        self.irradiance_model
            .transform(irradiance, &mut pvarray, index)?;
        let vf_matrix = self.vf_calculator.get_vf_matrix(&pvarray)?;
        solve_radiosity(
            &mut pvarray,
            &vf_matrix,
            irradiance.isotropic_luminance()[index],
            self.irradiance_model.source_components(),
        )?;
        pvarray.set_vf_matrix(vf_matrix);

        trace!(
            "Solved timestep {index} with {} surfaces",
            pvarray.n_surfaces()
        );
        Ok(Some(pvarray))
    }

    /// Run every fitted timestep in order, folding the results with `reporter`. The reporter is
    /// given the report so far (`None` on the first call) and the solved array, or `None` for a
    /// timestep without sun. Returns the last report, or `None` if no timesteps were fitted.
    pub fn run_all_timesteps<R>(
        &self,
        mut reporter: impl FnMut(Option<R>, Option<OrderedPVArray>) -> R,
    ) -> Result<Option<R>, PvError> {
        let n_timesteps = self
            .fitted
            .as_ref()
            .ok_or(PvError::NotFitted)?
            .0
            .len();

        let mut report = None;
        for index in 0..n_timesteps {
            let pvarray = self.run_timestep(index)?;
            report = Some(reporter(report, pvarray));
        }
        Ok(report)
    }

    /// Run every fitted timestep in parallel and map each with `f`, which is given the timestep
    /// index and its solved array. Results are in timestep order.
    pub fn par_run_timesteps<T: Send>(
        &self,
        f: impl Fn(usize, Option<OrderedPVArray>) -> T + Send + Sync,
    ) -> Result<Vec<T>, PvError> {
        let n_timesteps = self
            .fitted
            .as_ref()
            .ok_or(PvError::NotFitted)?
            .0
            .len();

        (0..n_timesteps)
            .into_par_iter()
            .map(|index| Ok(f(index, self.run_timestep(index)?)))
            .collect::<Result<Vec<T>, PvError>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::irradiance::{IsotropicOrdered, SurfaceCategory};
    use crate::core::units::Orientation360;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn params() -> PVArrayParameters {
        PVArrayParameters::new(3, 2.5, 2., Orientation360::new(0.).unwrap(), 0.4, 0.01, 0.03)
    }

    #[fixture]
    fn timestamps() -> Vec<NaiveDateTime> {
        let day = NaiveDate::from_ymd_opt(2019, 6, 11).unwrap();
        vec![
            day.and_hms_opt(11, 0, 0).unwrap(),
            day.and_hms_opt(22, 0, 0).unwrap(),
        ]
    }

    #[rstest]
    fn test_invalid_parameters_are_rejected(mut params: PVArrayParameters) {
        params.gcr = 1.5;
        assert!(matches!(
            PVEngine::new(params, IsotropicOrdered),
            Err(PvError::InvalidParameters(_))
        ));
    }

    #[rstest]
    fn test_running_before_fit_is_an_error(params: PVArrayParameters) {
        let engine = PVEngine::new(params, IsotropicOrdered).unwrap();

        assert!(!engine.is_fitted());
        assert!(matches!(engine.run_timestep(0), Err(PvError::NotFitted)));
        assert!(matches!(
            engine.run_all_timesteps(|_: Option<()>, _| ()),
            Err(PvError::NotFitted)
        ));
    }

    #[rstest]
    fn test_fit_rejects_mismatched_series(
        params: PVArrayParameters,
        timestamps: Vec<NaiveDateTime>,
    ) {
        let mut engine = PVEngine::new(params, IsotropicOrdered).unwrap();
        let result = engine.fit(&timestamps, vec![1000.], 100., 20., 90., 20., 90., 0.2);

        assert!(matches!(
            result,
            Err(PvError::InputLengthMismatch { name: "dni", .. })
        ));
        assert!(!engine.is_fitted());
    }

    #[rstest]
    fn test_run_timestep(params: PVArrayParameters, timestamps: Vec<NaiveDateTime>) {
        let mut engine = PVEngine::new(params, IsotropicOrdered).unwrap();
        engine
            .fit(&timestamps, 1000., 100., vec![20., 100.], 90., 20., 90., 0.2)
            .unwrap();

        assert_eq!(engine.n_timesteps(), 2);
        let pvarray = engine.run_timestep(0).unwrap().unwrap();
        assert_eq!(
            pvarray.vf_matrix().unwrap().nrows(),
            pvarray.n_surfaces() + 1
        );
        assert!(pvarray.pvrows()[1].front().get_param_weighted("qinc").unwrap() > 1000.);

        assert!(engine.run_timestep(1).unwrap().is_none());
        assert!(matches!(
            engine.run_timestep(2),
            Err(PvError::TimestepOutOfRange {
                index: 2,
                n_timesteps: 2
            })
        ));
        assert_eq!(
            engine.irradiance().unwrap().rho(SurfaceCategory::FrontPvrow),
            Some(&[0.01, 0.01][..])
        );
    }
}
