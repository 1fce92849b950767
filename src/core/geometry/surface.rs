use crate::core::geometry::base::LineSegment;
use crate::errors::PvError;
use indexmap::IndexMap;
use nalgebra::{Point2, Vector2};
use smartstring::alias::String;

/// Smallest surface length kept when splitting geometry, in m
pub(crate) const MIN_SURFACE_LENGTH: f64 = 1e-8;

/// A flat surface of the array, one unit of array depth deep, so its length is also its area.
#[derive(Clone, Debug)]
pub struct PVSurface {
    geometry: LineSegment,
    normal: Vector2<f64>,
    shaded: bool,
    // ordered so that reports enumerate parameters the same way every timestep
    params: IndexMap<String, f64>,
}

impl PVSurface {
    pub(crate) fn new(geometry: LineSegment, normal: Vector2<f64>, shaded: bool) -> Self {
        Self {
            geometry,
            normal,
            shaded,
            params: Default::default(),
        }
    }

    pub fn geometry(&self) -> &LineSegment {
        &self.geometry
    }

    pub fn length(&self) -> f64 {
        self.geometry.length()
    }

    pub fn centroid(&self) -> Point2<f64> {
        self.geometry.centroid()
    }

    /// Unit vector pointing away from the face that receives irradiance
    pub fn normal(&self) -> Vector2<f64> {
        self.normal
    }

    pub fn is_shaded(&self) -> bool {
        self.shaded
    }

    pub fn get_param(&self, name: &str) -> Result<f64, PvError> {
        self.params
            .get(name)
            .copied()
            .ok_or_else(|| PvError::ParameterNotFound(name.into()))
    }

    pub fn set_param(&mut self, name: &str, value: f64) {
        self.params.insert(name.into(), value);
    }

    pub fn params(&self) -> &IndexMap<String, f64> {
        &self.params
    }
}

/// Sum of value * length of parameter `name` over `surfaces`, along with their total length
pub(crate) fn param_ww_and_length<'a>(
    mut surfaces: impl Iterator<Item = &'a PVSurface>,
    name: &str,
) -> Result<(f64, f64), PvError> {
    surfaces.try_fold((0., 0.), |(sum_ww, sum_length), surface| {
        let length = surface.length();
        Ok((sum_ww + surface.get_param(name)? * length, sum_length + length))
    })
}

pub(crate) fn param_weighted<'a>(
    surfaces: impl Iterator<Item = &'a PVSurface>,
    name: &str,
) -> Result<f64, PvError> {
    let (sum_ww, sum_length) = param_ww_and_length(surfaces, name)?;
    if sum_length == 0. {
        return Err(PvError::ZeroArea);
    }
    Ok(sum_ww / sum_length)
}

/// An ordered run of surfaces covering one discretized part of a row side, split where shadows
/// begin and end.
#[derive(Clone, Debug, Default)]
pub struct PVSegment {
    surfaces: Vec<PVSurface>,
}

impl PVSegment {
    pub(crate) fn new(surfaces: Vec<PVSurface>) -> Self {
        Self { surfaces }
    }

    pub fn surfaces(&self) -> &[PVSurface] {
        &self.surfaces
    }

    pub(crate) fn surfaces_mut(&mut self) -> &mut [PVSurface] {
        &mut self.surfaces
    }

    pub fn illuminated_surfaces(&self) -> impl Iterator<Item = &PVSurface> {
        self.surfaces.iter().filter(|surface| !surface.is_shaded())
    }

    pub fn shaded_surfaces(&self) -> impl Iterator<Item = &PVSurface> {
        self.surfaces.iter().filter(|surface| surface.is_shaded())
    }

    pub fn length(&self) -> f64 {
        self.surfaces.iter().map(PVSurface::length).sum()
    }

    pub fn shaded_length(&self) -> f64 {
        self.shaded_surfaces().map(PVSurface::length).sum()
    }

    /// Area-weighted mean of parameter `name` over the surfaces of this segment
    pub fn get_param_weighted(&self, name: &str) -> Result<f64, PvError> {
        param_weighted(self.surfaces.iter(), name)
    }

    /// Sum of parameter `name` weighted by surface area
    pub fn get_param_ww(&self, name: &str) -> Result<f64, PvError> {
        Ok(param_ww_and_length(self.surfaces.iter(), name)?.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::*;

    fn horizontal_surface(x_start: f64, x_end: f64, qinc: f64, shaded: bool) -> PVSurface {
        let mut surface = PVSurface::new(
            LineSegment::new(Point2::new(x_start, 1.), Point2::new(x_end, 1.)),
            Vector2::new(0., 1.),
            shaded,
        );
        surface.set_param("qinc", qinc);
        surface
    }

    #[fixture]
    fn segment() -> PVSegment {
        PVSegment::new(vec![
            horizontal_surface(0., 1., 10., true),
            horizontal_surface(1., 4., 20., false),
        ])
    }

    #[rstest]
    fn test_get_param_weighted(segment: PVSegment) {
        assert_relative_eq!(segment.get_param_weighted("qinc").unwrap(), 17.5);
        assert_relative_eq!(segment.get_param_ww("qinc").unwrap(), 70.);
    }

    #[rstest]
    fn test_lengths(segment: PVSegment) {
        assert_relative_eq!(segment.length(), 4.);
        assert_relative_eq!(segment.shaded_length(), 1.);
        assert_eq!(segment.illuminated_surfaces().count(), 1);
    }

    #[rstest]
    fn test_missing_param_is_an_error(segment: PVSegment) {
        assert!(matches!(
            segment.get_param_weighted("horizon"),
            Err(PvError::ParameterNotFound(name)) if name == "horizon"
        ));
    }

    #[rstest]
    fn test_weighted_param_over_no_area_is_an_error() {
        let empty = PVSegment::default();
        assert!(matches!(
            empty.get_param_weighted("qinc"),
            Err(PvError::ZeroArea)
        ));
    }

    #[rstest]
    fn test_params_keep_insertion_order() {
        let mut surface = horizontal_surface(0., 1., 1., false);
        surface.set_param("direct", 2.);
        surface.set_param("isotropic", 3.);
        surface.set_param("qinc", 4.);
        let names: Vec<&str> = surface.params().keys().map(|name| name.as_str()).collect();
        assert_eq!(names, vec!["qinc", "direct", "isotropic"]);
        assert_relative_eq!(surface.get_param("qinc").unwrap(), 4.);
    }
}
