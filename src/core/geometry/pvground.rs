use crate::compare_floats::{clip, DISTANCE_TOLERANCE};
use crate::core::geometry::base::LineSegment;
use crate::core::geometry::surface::{
    param_weighted, param_ww_and_length, PVSurface, MIN_SURFACE_LENGTH,
};
use crate::errors::PvError;
use itertools::Itertools;
use nalgebra::{Point2, Vector2};
use ordered_float::OrderedFloat;

/// Horizontal ground between `x_min` and `x_max`, split at shadow edges and at every cut point so
/// that each ground surface lies entirely on one side of every row plane.
#[derive(Clone, Debug)]
pub struct PVGround {
    x_min: f64,
    x_max: f64,
    shadows: Vec<(f64, f64)>,
    surfaces: Vec<PVSurface>,
}

impl PVGround {
    /// `shadows` must be sorted and non-overlapping, as produced by `merge_shadows`
    pub(crate) fn build(
        x_min: f64,
        x_max: f64,
        shadows: Vec<(f64, f64)>,
        cut_points: &[f64],
    ) -> Result<Self, PvError> {
        if !(x_min.is_finite() && x_max.is_finite()) || x_max <= x_min {
            return Err(PvError::InvalidGeometry(format!(
                "ground extent [{x_min}, {x_max}] is empty"
            )));
        }

        let shadows: Vec<(f64, f64)> = shadows
            .into_iter()
            .map(|(start, end)| (clip(start, x_min, x_max), clip(end, x_min, x_max)))
            .filter(|(start, end)| end - start > MIN_SURFACE_LENGTH)
            .collect();

        let breakpoints = [x_min, x_max]
            .into_iter()
            .chain(shadows.iter().flat_map(|(start, end)| [*start, *end]))
            .chain(
                cut_points
                    .iter()
                    .copied()
                    .filter(|x| *x > x_min && *x < x_max),
            )
            .sorted_by(|a, b| OrderedFloat(*a).cmp(&OrderedFloat(*b)))
            .dedup_by(|a, b| (*a - *b).abs() < DISTANCE_TOLERANCE);

        let normal = Vector2::new(0., 1.);
        let surfaces = breakpoints
            .tuple_windows()
            .filter(|(start, end)| end - start > MIN_SURFACE_LENGTH)
            .map(|(start, end)| {
                let x_mid = 0.5 * (start + end);
                let shaded = shadows
                    .iter()
                    .any(|(shadow_start, shadow_end)| x_mid > *shadow_start && x_mid < *shadow_end);
                PVSurface::new(
                    LineSegment::new(Point2::new(start, 0.), Point2::new(end, 0.)),
                    normal,
                    shaded,
                )
            })
            .collect();

        Ok(Self {
            x_min,
            x_max,
            shadows,
            surfaces,
        })
    }

    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    pub fn x_max(&self) -> f64 {
        self.x_max
    }

    /// Shadow intervals cast by the rows, clipped to the ground extent
    pub fn shadows(&self) -> &[(f64, f64)] {
        &self.shadows
    }

    pub fn surfaces(&self) -> &[PVSurface] {
        &self.surfaces
    }

    pub(crate) fn surfaces_mut(&mut self) -> &mut [PVSurface] {
        &mut self.surfaces
    }

    pub fn length(&self) -> f64 {
        self.surfaces.iter().map(PVSurface::length).sum()
    }

    pub fn shaded_length(&self) -> f64 {
        self.surfaces
            .iter()
            .filter(|surface| surface.is_shaded())
            .map(PVSurface::length)
            .sum()
    }

    pub fn get_param_weighted(&self, name: &str) -> Result<f64, PvError> {
        param_weighted(self.surfaces.iter(), name)
    }

    pub fn get_param_ww(&self, name: &str) -> Result<f64, PvError> {
        Ok(param_ww_and_length(self.surfaces.iter(), name)?.0)
    }
}

/// Sort shadow intervals and merge those that touch or overlap. Also reports whether any two
/// intervals strictly overlapped, which means one row shades another.
pub(crate) fn merge_shadows(shadows: Vec<(f64, f64)>) -> (Vec<(f64, f64)>, bool) {
    let mut overlapping = false;
    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(shadows.len());
    for (start, end) in shadows
        .into_iter()
        .sorted_by(|a, b| OrderedFloat(a.0).cmp(&OrderedFloat(b.0)))
    {
        match merged.last_mut() {
            Some(last) if start <= last.1 + DISTANCE_TOLERANCE => {
                if start < last.1 - DISTANCE_TOLERANCE {
                    overlapping = true;
                }
                last.1 = last.1.max(end);
            }
            _ => merged.push((start, end)),
        }
    }

    (merged, overlapping)
}
