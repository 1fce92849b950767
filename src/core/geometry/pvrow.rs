use crate::compare_floats::clip;
use crate::core::geometry::base::LineSegment;
use crate::core::geometry::surface::{
    param_weighted, param_ww_and_length, PVSegment, PVSurface, MIN_SURFACE_LENGTH,
};
use crate::errors::PvError;
use nalgebra::{Point2, Vector2};
use strum::Display;

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
#[strum(serialize_all = "lowercase")]
pub enum Side {
    Front,
    Back,
}

/// Part of a row side that receives no direct beam, as fractions along the row from its first
/// end to its second
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum SideShading {
    Unshaded,
    Full,
    Partial { start: f64, end: f64 },
}

impl SideShading {
    fn interval(&self) -> Option<(f64, f64)> {
        match self {
            SideShading::Unshaded => None,
            SideShading::Full => Some((0., 1.)),
            SideShading::Partial { start, end } => Some((*start, *end)),
        }
    }
}

/// One face of a PV row, discretized into segments of equal length
#[derive(Clone, Debug)]
pub struct PVRowSide {
    side: Side,
    normal: Vector2<f64>,
    segments: Vec<PVSegment>,
}

impl PVRowSide {
    pub(crate) fn build(
        side: Side,
        line: &LineSegment,
        normal: Vector2<f64>,
        n_segments: usize,
        shading: SideShading,
    ) -> Self {
        let n_segments = n_segments.max(1);
        let shaded_interval = shading.interval();

        let segments = (0..n_segments)
            .map(|i_segment| {
                let u_start = i_segment as f64 / n_segments as f64;
                let u_end = (i_segment + 1) as f64 / n_segments as f64;

                let mut breakpoints = vec![u_start, u_end];
                if let Some((shade_start, shade_end)) = shaded_interval {
                    breakpoints.push(clip(shade_start, u_start, u_end));
                    breakpoints.push(clip(shade_end, u_start, u_end));
                }
                breakpoints.sort_by(f64::total_cmp);

                let surfaces = breakpoints
                    .windows(2)
                    .filter(|pair| (pair[1] - pair[0]) * line.length() > MIN_SURFACE_LENGTH)
                    .map(|pair| {
                        let u_mid = 0.5 * (pair[0] + pair[1]);
                        let shaded = shaded_interval
                            .is_some_and(|(start, end)| u_mid >= start && u_mid <= end);
                        PVSurface::new(line.sub_segment(pair[0], pair[1]), normal, shaded)
                    })
                    .collect();

                PVSegment::new(surfaces)
            })
            .collect();

        Self {
            side,
            normal,
            segments,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn normal(&self) -> Vector2<f64> {
        self.normal
    }

    pub fn segments(&self) -> &[PVSegment] {
        &self.segments
    }

    pub fn surfaces(&self) -> impl Iterator<Item = &PVSurface> {
        self.segments.iter().flat_map(|segment| segment.surfaces())
    }

    pub(crate) fn surfaces_mut(&mut self) -> impl Iterator<Item = &mut PVSurface> {
        self.segments
            .iter_mut()
            .flat_map(|segment| segment.surfaces_mut().iter_mut())
    }

    pub fn length(&self) -> f64 {
        self.segments.iter().map(PVSegment::length).sum()
    }

    pub fn shaded_length(&self) -> f64 {
        self.segments.iter().map(PVSegment::shaded_length).sum()
    }

    /// Area-weighted mean of parameter `name` over the whole side
    pub fn get_param_weighted(&self, name: &str) -> Result<f64, PvError> {
        param_weighted(self.surfaces(), name)
    }

    pub fn get_param_ww(&self, name: &str) -> Result<f64, PvError> {
        Ok(param_ww_and_length(self.surfaces(), name)?.0)
    }
}

#[derive(Clone, Debug)]
pub struct PVRow {
    index: usize,
    geometry: LineSegment,
    front: PVRowSide,
    back: PVRowSide,
}

impl PVRow {
    pub(crate) fn new(
        index: usize,
        geometry: LineSegment,
        front: PVRowSide,
        back: PVRowSide,
    ) -> Self {
        Self {
            index,
            geometry,
            front,
            back,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn geometry(&self) -> &LineSegment {
        &self.geometry
    }

    pub fn front(&self) -> &PVRowSide {
        &self.front
    }

    pub fn back(&self) -> &PVRowSide {
        &self.back
    }

    pub fn side(&self, side: Side) -> &PVRowSide {
        match side {
            Side::Front => &self.front,
            Side::Back => &self.back,
        }
    }

    pub(crate) fn sides_mut(&mut self) -> (&mut PVRowSide, &mut PVRowSide) {
        (&mut self.front, &mut self.back)
    }

    pub fn highest_point(&self) -> Point2<f64> {
        self.geometry.highest_point()
    }

    pub fn lowest_point(&self) -> Point2<f64> {
        self.geometry.lowest_point()
    }
}
