pub mod isotropic;
pub mod perez;
pub(crate) mod sky;

use crate::compare_floats::max_of_2;
use crate::core::geometry::{OrderedPVArray, Side, SurfaceLocation};
use crate::errors::PvError;
use crate::input::PVArrayParameters;
use crate::timeseries::FittedInputs;
use indexmap::IndexMap;
use strum::{Display, EnumIter, IntoEnumIterator};

pub use isotropic::IsotropicOrdered;
pub use perez::HybridPerezOrdered;

/// Kinds of surface that share the same irradiance before shading is applied
#[derive(Clone, Copy, Debug, Display, EnumIter, Eq, Hash, PartialEq)]
#[strum(serialize_all = "snake_case")]
pub enum SurfaceCategory {
    Ground,
    FrontPvrow,
    BackPvrow,
}

impl From<SurfaceLocation> for SurfaceCategory {
    fn from(location: SurfaceLocation) -> Self {
        match location {
            SurfaceLocation::Ground => SurfaceCategory::Ground,
            SurfaceLocation::PVRow {
                side: Side::Front, ..
            } => SurfaceCategory::FrontPvrow,
            SurfaceLocation::PVRow {
                side: Side::Back, ..
            } => SurfaceCategory::BackPvrow,
        }
    }
}

/// Timeseries of irradiance components per surface category, calculated once when an engine
/// is fitted and applied to the geometry of each timestep.
#[derive(Clone, Debug, Default)]
pub struct FittedIrradiance {
    components: IndexMap<&'static str, IndexMap<SurfaceCategory, Vec<f64>>>,
    rho: IndexMap<SurfaceCategory, Vec<f64>>,
    isotropic_luminance: Vec<f64>,
}

impl FittedIrradiance {
    /// Starts with the direct beam on every category and the reflectivities of the surfaces
    pub(crate) fn new(inputs: &FittedInputs, params: &PVArrayParameters) -> Self {
        let n_timesteps = inputs.len();
        let rho = IndexMap::from([
            (SurfaceCategory::Ground, inputs.albedo.clone()),
            (
                SurfaceCategory::FrontPvrow,
                vec![params.rho_front_pvrow; n_timesteps],
            ),
            (
                SurfaceCategory::BackPvrow,
                vec![params.rho_back_pvrow; n_timesteps],
            ),
        ]);

        let mut fitted = Self {
            components: Default::default(),
            rho,
            isotropic_luminance: vec![0.; n_timesteps],
        };
        fitted.insert_component("direct", n_timesteps, |category, index| {
            inputs.dni[index] * max_of_2(cos_angle_of_incidence(inputs, category, index), 0.)
        });
        fitted
    }

    /// Add a component calculated for every category and timestep
    pub(crate) fn insert_component(
        &mut self,
        name: &'static str,
        n_timesteps: usize,
        value: impl Fn(SurfaceCategory, usize) -> f64,
    ) {
        let series = SurfaceCategory::iter()
            .map(|category| {
                let values = (0..n_timesteps).map(|index| value(category, index)).collect();
                (category, values)
            })
            .collect();
        self.components.insert(name, series);
    }

    pub(crate) fn set_isotropic_luminance(&mut self, isotropic_luminance: Vec<f64>) {
        self.isotropic_luminance = isotropic_luminance;
    }

    /// Names of the fitted components, in the order they were calculated
    pub fn component_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.components.keys().copied()
    }

    pub fn component(&self, name: &str, category: SurfaceCategory) -> Option<&[f64]> {
        self.components
            .get(name)
            .and_then(|series| series.get(&category))
            .map(Vec::as_slice)
    }

    /// Direct beam irradiance on an unshaded surface of the category, in W/m2
    pub fn direct(&self, category: SurfaceCategory) -> Option<&[f64]> {
        self.component("direct", category)
    }

    pub fn rho(&self, category: SurfaceCategory) -> Option<&[f64]> {
        self.rho.get(&category).map(Vec::as_slice)
    }

    /// Luminance of the uniform part of the sky dome, in W/m2
    pub fn isotropic_luminance(&self) -> &[f64] {
        &self.isotropic_luminance
    }

    pub(crate) fn value(
        &self,
        name: &str,
        category: SurfaceCategory,
        index: usize,
    ) -> Result<f64, PvError> {
        self.component(name, category)
            .and_then(|series| series.get(index))
            .copied()
            .ok_or_else(|| PvError::ParameterNotFound(name.into()))
    }

    pub(crate) fn rho_value(
        &self,
        category: SurfaceCategory,
        index: usize,
    ) -> Result<f64, PvError> {
        self.rho(category)
            .and_then(|series| series.get(index))
            .copied()
            .ok_or_else(|| PvError::ParameterNotFound("rho".into()))
    }

    /// Write the reflectivity and unshaded direct beam onto every surface of the array
    pub(crate) fn apply_rho_and_direct(
        &self,
        pvarray: &mut OrderedPVArray,
        index: usize,
    ) -> Result<(), PvError> {
        let locations = pvarray.surface_locations();
        for (surface, location) in pvarray.surfaces_mut().zip(locations) {
            let category = SurfaceCategory::from(location);
            surface.set_param("rho", self.rho_value(category, index)?);
            let direct = if surface.is_shaded() {
                0.
            } else {
                self.value("direct", category, index)?
            };
            surface.set_param("direct", direct);
        }
        Ok(())
    }
}

/// Cosine of the angle of incidence of the sun on a surface of the category at timestep `index`.
/// The back of a row faces the opposite way to its front.
pub(crate) fn cos_angle_of_incidence(
    inputs: &FittedInputs,
    category: SurfaceCategory,
    index: usize,
) -> f64 {
    let (tilt, azimuth) = match category {
        SurfaceCategory::Ground => (0., 0.),
        SurfaceCategory::FrontPvrow => (inputs.surface_tilt[index], inputs.surface_azimuth[index]),
        SurfaceCategory::BackPvrow => (
            180. - inputs.surface_tilt[index],
            inputs.surface_azimuth[index] + 180.,
        ),
    };
    sky::cos_angle_of_incidence(
        tilt,
        azimuth,
        inputs.solar_zenith[index],
        inputs.solar_azimuth[index],
    )
}

/// Sky irradiance model. An implementation splits the irradiance inputs into components when
/// an engine is fitted, and projects them onto the surfaces of every timestep's geometry.
pub trait IrradianceModel: Send + Sync {
    /// Surface parameters that make up the irradiance reaching a surface straight from the sky,
    /// apart from the isotropic diffuse light
    fn source_components(&self) -> &'static [&'static str];

    fn fit(&self, inputs: &FittedInputs, params: &PVArrayParameters) -> FittedIrradiance;

    /// Set the reflectivity and source components of every surface of the array for timestep
    /// `index`
    fn transform(
        &self,
        fitted: &FittedIrradiance,
        pvarray: &mut OrderedPVArray,
        index: usize,
    ) -> Result<(), PvError>;
}
