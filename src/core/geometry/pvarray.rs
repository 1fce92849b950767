use crate::compare_floats::DISTANCE_TOLERANCE;
use crate::core::geometry::base::{project_onto_ground, LineSegment};
use crate::core::geometry::pvground::{merge_shadows, PVGround};
use crate::core::geometry::pvrow::{PVRow, PVRowSide, Side, SideShading};
use crate::core::geometry::surface::PVSurface;
use crate::core::units::{cosd, sind};
use crate::errors::PvError;
use crate::input::PVArrayParameters;
use nalgebra::{DMatrix, Point2, Vector2};
use tracing::trace;

/// Components of a direction smaller than this are treated as zero
const DIRECTION_TOLERANCE: f64 = 1e-10;

/// Where a surface of the array sits, used to decide which surfaces can see each other
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SurfaceLocation {
    Ground,
    PVRow { index: usize, side: Side },
}

/// Snapshot of the array geometry for one timestep: rows ordered along the x axis, plus the
/// ground split by the shadows the rows cast.
#[derive(Clone, Debug)]
pub struct OrderedPVArray {
    pvrows: Vec<PVRow>,
    ground: PVGround,
    solar_2d_vector: Vector2<f64>,
    rotation: f64,
    surface_tilt: f64,
    illuminated_side: Option<Side>,
    has_direct_shading: bool,
    vf_matrix: Option<DMatrix<f64>>,
}

impl OrderedPVArray {
    /// Build the array for the given sun and row angles, in degrees. Returns `None` when the sun
    /// is below the horizon or an angle is undefined, since no shadows can be cast.
    pub fn build(
        params: &PVArrayParameters,
        solar_zenith: f64,
        solar_azimuth: f64,
        surface_tilt: f64,
        surface_azimuth: f64,
    ) -> Result<Option<Self>, PvError> {
        if [solar_zenith, solar_azimuth, surface_tilt, surface_azimuth]
            .iter()
            .any(|angle| !angle.is_finite())
            || solar_zenith >= 90.
        {
            return Ok(None);
        }
        if params.n_pvrows == 0 {
            return Err(PvError::InvalidGeometry(
                "an array needs at least one PV row".into(),
            ));
        }

        let pitch = params.pitch();
        if !pitch.is_finite() || pitch < params.pvrow_width - DISTANCE_TOLERANCE {
            return Err(PvError::InvalidGeometry(format!(
                "rows of width {} m overlap at a pitch of {pitch} m",
                params.pvrow_width
            )));
        }

        let rotation = rotation_from_tilt_and_azimuth(params, surface_tilt, surface_azimuth);
        let solar_2d_vector =
            solar_2d_vector(solar_zenith, solar_azimuth, params.axis_azimuth.angle());

        let lines = pvrow_lines(params, pitch, rotation)?;
        let front_normal = lines[0].normal();
        let illuminated_side = match front_normal.dot(&solar_2d_vector) {
            cos_aoi if cos_aoi > DIRECTION_TOLERANCE => Some(Side::Front),
            cos_aoi if cos_aoi < -DIRECTION_TOLERANCE => Some(Side::Back),
            _ => None,
        };

        let shadows = lines
            .iter()
            .map(|line| {
                let x_a = project_onto_ground(&line.a(), &solar_2d_vector);
                let x_b = project_onto_ground(&line.b(), &solar_2d_vector);
                (x_a.min(x_b), x_a.max(x_b))
            })
            .collect();
        let (shadows, has_direct_shading) = merge_shadows(shadows);
        if has_direct_shading {
            trace!("Rows shade each other at rotation {rotation} degrees");
        }

        let sun_side_step = direction_step(solar_2d_vector.x);
        let pvrows = lines
            .iter()
            .enumerate()
            .map(|(index, line)| {
                let sun_side_neighbour = neighbour_index(index, sun_side_step, lines.len());
                let illuminated_shading = match sun_side_neighbour {
                    Some(neighbour) if has_direct_shading => {
                        shadow_on_line(line, &lines[neighbour], &solar_2d_vector)
                    }
                    _ => SideShading::Unshaded,
                };
                let shading_for = |side: Side| {
                    if illuminated_side == Some(side) {
                        illuminated_shading
                    } else {
                        SideShading::Full
                    }
                };
                let cut = params.cut_for(index);

                let front = PVRowSide::build(
                    Side::Front,
                    line,
                    front_normal,
                    cut.front,
                    shading_for(Side::Front),
                );
                let back = PVRowSide::build(
                    Side::Back,
                    line,
                    -front_normal,
                    cut.back,
                    shading_for(Side::Back),
                );
                PVRow::new(index, *line, front, back)
            })
            .collect();

        let cut_points: Vec<f64> = lines
            .iter()
            .filter_map(LineSegment::ground_intercept)
            .collect();
        let ground = PVGround::build(
            params.x_min_ground,
            params.x_max_ground,
            shadows,
            &cut_points,
        )?;

        Ok(Some(Self {
            pvrows,
            ground,
            solar_2d_vector,
            rotation,
            surface_tilt,
            illuminated_side,
            has_direct_shading,
            vf_matrix: None,
        }))
    }

    pub fn pvrows(&self) -> &[PVRow] {
        &self.pvrows
    }

    pub fn ground(&self) -> &PVGround {
        &self.ground
    }

    /// Unit vector pointing at the sun, projected onto the plane normal to the row axis
    pub fn solar_2d_vector(&self) -> Vector2<f64> {
        self.solar_2d_vector
    }

    /// Signed row rotation around its axis, in degrees. Positive rotations raise the end of the
    /// row with the larger x.
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn surface_tilt(&self) -> f64 {
        self.surface_tilt
    }

    /// The row side facing the sun, if the sun is not in the plane of the rows
    pub fn illuminated_side(&self) -> Option<Side> {
        self.illuminated_side
    }

    /// Whether a row casts a shadow on its neighbour
    pub fn has_direct_shading(&self) -> bool {
        self.has_direct_shading
    }

    /// View factors between every surface, in the order of `surfaces`, with the sky as the last
    /// index. Set once the array has been solved.
    pub fn vf_matrix(&self) -> Option<&DMatrix<f64>> {
        self.vf_matrix.as_ref()
    }

    pub(crate) fn set_vf_matrix(&mut self, vf_matrix: DMatrix<f64>) {
        self.vf_matrix = Some(vf_matrix);
    }

    /// All surfaces: the ground first, then for each row its front and then its back surfaces
    pub fn surfaces(&self) -> impl Iterator<Item = &PVSurface> {
        self.ground.surfaces().iter().chain(
            self.pvrows
                .iter()
                .flat_map(|pvrow| pvrow.front().surfaces().chain(pvrow.back().surfaces())),
        )
    }

    pub(crate) fn surfaces_mut(&mut self) -> impl Iterator<Item = &mut PVSurface> {
        self.ground.surfaces_mut().iter_mut().chain(self.pvrows.iter_mut().flat_map(|pvrow| {
            let (front, back) = pvrow.sides_mut();
            front.surfaces_mut().chain(back.surfaces_mut())
        }))
    }

    /// Locations of the surfaces, in the order of `surfaces`
    pub fn surface_locations(&self) -> Vec<SurfaceLocation> {
        std::iter::repeat(SurfaceLocation::Ground)
            .take(self.ground.surfaces().len())
            .chain(self.pvrows.iter().flat_map(|pvrow| {
                let index = pvrow.index();
                std::iter::repeat(SurfaceLocation::PVRow {
                    index,
                    side: Side::Front,
                })
                .take(pvrow.front().surfaces().count())
                .chain(
                    std::iter::repeat(SurfaceLocation::PVRow {
                        index,
                        side: Side::Back,
                    })
                    .take(pvrow.back().surfaces().count()),
                )
            }))
            .collect()
    }

    pub fn n_surfaces(&self) -> usize {
        self.surfaces().count()
    }

    /// Index of the row that the given side of row `index` looks towards
    pub fn facing_neighbour(&self, index: usize, side: Side) -> Option<usize> {
        let normal = self.pvrows.get(index)?.side(side).normal();
        neighbour_index(index, direction_step(normal.x), self.pvrows.len())
    }

    /// Index of the neighbour of row `index` that lies towards the sun
    pub fn sun_side_neighbour(&self, index: usize) -> Option<usize> {
        neighbour_index(index, direction_step(self.solar_2d_vector.x), self.pvrows.len())
    }
}

/// Rows rotate clockwise (seen looking along the axis azimuth) to face a surface azimuth
/// clockwise from the axis, and anticlockwise otherwise
fn rotation_from_tilt_and_azimuth(
    params: &PVArrayParameters,
    surface_tilt: f64,
    surface_azimuth: f64,
) -> f64 {
    if params.axis_azimuth.clockwise_offset_to(surface_azimuth) > 180. {
        surface_tilt
    } else {
        -surface_tilt
    }
}

/// The x axis points 90 degrees clockwise from the row axis azimuth, and y points up
pub(crate) fn solar_2d_vector(
    solar_zenith: f64,
    solar_azimuth: f64,
    axis_azimuth: f64,
) -> Vector2<f64> {
    Vector2::new(
        sind(solar_zenith) * cosd(solar_azimuth - axis_azimuth - 90.),
        cosd(solar_zenith),
    )
}

fn pvrow_lines(
    params: &PVArrayParameters,
    pitch: f64,
    rotation: f64,
) -> Result<Vec<LineSegment>, PvError> {
    let half_width = 0.5 * params.pvrow_width;
    let to_second_end = Vector2::new(cosd(rotation), sind(rotation)) * half_width;

    (0..params.n_pvrows)
        .map(|index| {
            let centre = Point2::new(index as f64 * pitch, params.pvrow_height);
            let line = LineSegment::new(centre - to_second_end, centre + to_second_end);

            if !(line.a().coords.iter().chain(line.b().coords.iter())).all(|c| c.is_finite()) {
                return Err(PvError::InvalidGeometry(format!(
                    "PV row {index} has non-finite coordinates"
                )));
            }
            if line.lowest_point().y < -DISTANCE_TOLERANCE {
                return Err(PvError::InvalidGeometry(format!(
                    "PV row {index} reaches {} m below the ground",
                    -line.lowest_point().y
                )));
            }
            Ok(line)
        })
        .collect()
}

fn direction_step(x: f64) -> i8 {
    if x > DIRECTION_TOLERANCE {
        1
    } else if x < -DIRECTION_TOLERANCE {
        -1
    } else {
        0
    }
}

fn neighbour_index(index: usize, step: i8, n_pvrows: usize) -> Option<usize> {
    match step {
        1 if index + 1 < n_pvrows => Some(index + 1),
        -1 if index > 0 => Some(index - 1),
        _ => None,
    }
}

/// Part of `line` that does not see the sun because `caster` is in the way
fn shadow_on_line(line: &LineSegment, caster: &LineSegment, sun: &Vector2<f64>) -> SideShading {
    let direction = line.direction();
    let det = direction.perp(sun);
    if det.abs() < DIRECTION_TOLERANCE {
        return SideShading::Unshaded;
    }

    // solve line.a + u * direction = point - t * sun, where t > 0 puts the caster towards the sun
    let projections: Vec<(f64, f64)> = [caster.a(), caster.b()]
        .iter()
        .map(|point| {
            let offset = point - line.a();
            (offset.perp(sun) / det, direction.perp(&offset) / det)
        })
        .collect();
    if projections.iter().all(|(_, t)| *t <= 0.) {
        return SideShading::Unshaded;
    }

    let start = projections
        .iter()
        .map(|(u, _)| *u)
        .fold(f64::INFINITY, f64::min)
        .max(0.);
    let end = projections
        .iter()
        .map(|(u, _)| *u)
        .fold(f64::NEG_INFINITY, f64::max)
        .min(1.);
    if end - start <= DISTANCE_TOLERANCE / line.length() {
        SideShading::Unshaded
    } else if start <= 0. && end >= 1. {
        SideShading::Full
    } else {
        SideShading::Partial { start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::units::Orientation360;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn params() -> PVArrayParameters {
        PVArrayParameters::new(3, 2.5, 2., Orientation360::new(0.).unwrap(), 0.4, 0.01, 0.03)
    }

    #[rstest]
    fn test_rows_face_the_sun_in_the_east(params: PVArrayParameters) {
        let pvarray = OrderedPVArray::build(&params, 20., 90., 20., 90.)
            .unwrap()
            .unwrap();

        assert_relative_eq!(pvarray.rotation(), -20.);
        assert_eq!(pvarray.illuminated_side(), Some(Side::Front));
        assert!(!pvarray.has_direct_shading());

        let first = pvarray.pvrows()[0].geometry();
        assert_relative_eq!(first.a().x, -cosd(20.), epsilon = 1e-12);
        assert_relative_eq!(first.a().y, 2.5 + sind(20.), epsilon = 1e-12);
        assert_relative_eq!(pvarray.pvrows()[2].geometry().centroid().x, 10., epsilon = 1e-12);

        let sun = pvarray.solar_2d_vector();
        assert_relative_eq!(sun.x, sind(20.), epsilon = 1e-12);
        assert_relative_eq!(sun.y, cosd(20.), epsilon = 1e-12);
        assert_relative_eq!(
            pvarray.pvrows()[1].front().normal().dot(&sun),
            1.,
            epsilon = 1e-12
        );
    }

    #[rstest]
    fn test_unshaded_array_has_one_shadow_per_row(params: PVArrayParameters) {
        let pvarray = OrderedPVArray::build(&params, 20., 90., 20., 90.)
            .unwrap()
            .unwrap();

        assert_eq!(pvarray.ground().shadows().len(), 3);
        assert!(pvarray
            .pvrows()
            .iter()
            .all(|pvrow| pvrow.front().shaded_length() == 0.
                && pvrow.back().surfaces().all(PVSurface::is_shaded)));
        assert_relative_eq!(pvarray.ground().length(), 200., epsilon = 1e-9);
    }

    #[rstest]
    fn test_low_sun_causes_inter_row_shading(params: PVArrayParameters) {
        let pvarray = OrderedPVArray::build(&params, 80., 90., 20., 90.)
            .unwrap()
            .unwrap();

        assert!(pvarray.has_direct_shading());
        assert_eq!(pvarray.ground().shadows().len(), 1);
        // the row furthest towards the sun is never shaded
        assert_relative_eq!(pvarray.pvrows()[2].front().shaded_length(), 0.);
        for index in 0..2 {
            let shaded = pvarray.pvrows()[index].front().shaded_length();
            assert!(shaded > 0. && shaded < 2., "row {index} shaded length {shaded}");
        }
        // shading starts from the low end of the row
        let surfaces = pvarray.pvrows()[0].front().surfaces().collect::<Vec<_>>();
        assert_eq!(surfaces.len(), 2);
        assert!(!surfaces[0].is_shaded());
        assert!(surfaces[1].is_shaded());
    }

    #[rstest]
    fn test_sun_below_horizon_gives_no_geometry(params: PVArrayParameters) {
        assert!(OrderedPVArray::build(&params, 95., 90., 20., 90.)
            .unwrap()
            .is_none());
        assert!(OrderedPVArray::build(&params, f64::NAN, 90., 20., 90.)
            .unwrap()
            .is_none());
    }

    #[rstest]
    fn test_row_below_ground_is_invalid(mut params: PVArrayParameters) {
        params.pvrow_height = 0.5;
        assert!(matches!(
            OrderedPVArray::build(&params, 20., 90., 60., 90.),
            Err(PvError::InvalidGeometry(_))
        ));
    }

    #[rstest]
    fn test_facing_neighbours(params: PVArrayParameters) {
        let pvarray = OrderedPVArray::build(&params, 20., 90., 20., 90.)
            .unwrap()
            .unwrap();

        assert_eq!(pvarray.facing_neighbour(0, Side::Front), Some(1));
        assert_eq!(pvarray.facing_neighbour(0, Side::Back), None);
        assert_eq!(pvarray.facing_neighbour(2, Side::Front), None);
        assert_eq!(pvarray.facing_neighbour(2, Side::Back), Some(1));
        assert_eq!(pvarray.sun_side_neighbour(1), Some(2));
    }

    #[rstest]
    fn test_west_facing_rows_rotate_the_other_way(params: PVArrayParameters) {
        let pvarray = OrderedPVArray::build(&params, 30., 270., 25., 270.)
            .unwrap()
            .unwrap();

        assert_relative_eq!(pvarray.rotation(), 25.);
        assert!(pvarray.solar_2d_vector().x < 0.);
        assert_eq!(pvarray.illuminated_side(), Some(Side::Front));
        assert_eq!(pvarray.sun_side_neighbour(1), Some(0));
    }

    #[rstest]
    fn test_cut_discretizes_row_sides(mut params: PVArrayParameters) {
        params.cut.insert(
            1,
            crate::input::SideCut {
                front: 3,
                back: 2,
            },
        );
        let pvarray = OrderedPVArray::build(&params, 20., 90., 20., 90.)
            .unwrap()
            .unwrap();

        assert_eq!(pvarray.pvrows()[1].front().segments().len(), 3);
        assert_eq!(pvarray.pvrows()[1].back().segments().len(), 2);
        assert_eq!(pvarray.pvrows()[0].front().segments().len(), 1);
        assert_eq!(pvarray.surface_locations().len(), pvarray.n_surfaces());
    }

    #[rstest]
    fn test_ground_is_cut_where_row_planes_meet_it(params: PVArrayParameters) {
        let pvarray = OrderedPVArray::build(&params, 20., 90., 20., 90.)
            .unwrap()
            .unwrap();

        let intercept = pvarray.pvrows()[0].geometry().ground_intercept().unwrap();
        assert!(pvarray
            .ground()
            .surfaces()
            .iter()
            .any(|surface| (surface.geometry().a().x - intercept).abs() < 1e-9));
    }
}
