use crate::compare_floats::min_of_2;
use crate::core::geometry::base::LineSegment;
use crate::core::geometry::{OrderedPVArray, PVSurface, SurfaceLocation};
use crate::errors::PvError;
use nalgebra::{DMatrix, Point2};
use tracing::trace;

/// How far the view factors leaving a surface may sum above 1 before the geometry is rejected
pub const VF_CONSERVATION_TOLERANCE: f64 = 1e-6;

/// Ground surfaces closer than this to the plane of a row side are not seen by it, in m
const VISIBILITY_TOLERANCE: f64 = 1e-9;

/// Calculates 2D view factors between the surfaces of an array with Hottel's crossed strings.
#[derive(Clone, Copy, Debug)]
pub struct VFCalculator {
    conservation_tolerance: f64,
}

impl Default for VFCalculator {
    fn default() -> Self {
        Self {
            conservation_tolerance: VF_CONSERVATION_TOLERANCE,
        }
    }
}

impl VFCalculator {
    pub fn new(conservation_tolerance: f64) -> Self {
        Self {
            conservation_tolerance,
        }
    }

    /// Square matrix of view factors from each surface (row) to each surface (column), in the
    /// order of `OrderedPVArray::surfaces`, with the sky appended as the last index. The sky
    /// receives whatever fraction leaving a surface reaches no other surface, and its own row is
    /// zero.
    pub fn get_vf_matrix(&self, pvarray: &OrderedPVArray) -> Result<DMatrix<f64>, PvError> {
        let surfaces: Vec<&PVSurface> = pvarray.surfaces().collect();
        let locations = pvarray.surface_locations();
        let obstacles: Vec<LineSegment> = pvarray
            .pvrows()
            .iter()
            .map(|pvrow| *pvrow.geometry())
            .collect();

        let n_surfaces = surfaces.len();
        let sky_index = n_surfaces;
        let mut vf_matrix = DMatrix::<f64>::zeros(n_surfaces + 1, n_surfaces + 1);

        for i in 0..n_surfaces {
            for j in (i + 1)..n_surfaces {
                if !can_see(pvarray, (surfaces[i], locations[i]), (surfaces[j], locations[j])) {
                    continue;
                }
                let excluded = [owner(locations[i]), owner(locations[j])];
                let exchange = hottel_exchange(
                    surfaces[i].geometry(),
                    surfaces[j].geometry(),
                    |from, to| taut_string_length(from, to, &obstacles, &excluded),
                );
                // the same exchange term on both sides keeps L_i * F_ij = L_j * F_ji exact
                vf_matrix[(i, j)] = exchange / surfaces[i].length();
                vf_matrix[(j, i)] = exchange / surfaces[j].length();
            }
        }

        for i in 0..n_surfaces {
            let sum = vf_matrix.row(i).sum();
            if sum > 1. + self.conservation_tolerance {
                return Err(PvError::ViewFactorConservation { index: i, sum });
            }
            vf_matrix[(i, sky_index)] = (1. - sum).max(0.);
        }

        trace!("Calculated view factors between {n_surfaces} surfaces and the sky");
        Ok(vf_matrix)
    }
}

fn owner(location: SurfaceLocation) -> Option<usize> {
    match location {
        SurfaceLocation::Ground => None,
        SurfaceLocation::PVRow { index, .. } => Some(index),
    }
}

/// Only the ground in front of a row side, and the facing side of the adjacent row, can be seen
/// from a row side. Rows of equal height never see past their neighbours.
fn can_see(
    pvarray: &OrderedPVArray,
    (surface_i, location_i): (&PVSurface, SurfaceLocation),
    (surface_j, location_j): (&PVSurface, SurfaceLocation),
) -> bool {
    match (location_i, location_j) {
        (SurfaceLocation::Ground, SurfaceLocation::Ground) => false,
        (SurfaceLocation::PVRow { .. }, SurfaceLocation::Ground) => {
            is_in_front_of(surface_i, surface_j)
        }
        (SurfaceLocation::Ground, SurfaceLocation::PVRow { .. }) => {
            is_in_front_of(surface_j, surface_i)
        }
        (
            SurfaceLocation::PVRow {
                index: index_i,
                side: side_i,
            },
            SurfaceLocation::PVRow {
                index: index_j,
                side: side_j,
            },
        ) => {
            index_i != index_j
                && pvarray.facing_neighbour(index_i, side_i) == Some(index_j)
                && pvarray.facing_neighbour(index_j, side_j) == Some(index_i)
        }
    }
}

fn is_in_front_of(pvrow_surface: &PVSurface, other: &PVSurface) -> bool {
    (other.centroid() - pvrow_surface.geometry().a()).dot(&pvrow_surface.normal())
        > VISIBILITY_TOLERANCE
}

/// Hottel's crossed strings for two segments AB and CD: L_1 * F_12 = (crossed - uncrossed) / 2.
/// The crossed pair is the one with the larger straight length; strings may then wrap around
/// obstructions, which can only reduce the exchange.
pub(crate) fn hottel_exchange(
    first: &LineSegment,
    second: &LineSegment,
    string: impl Fn(Point2<f64>, Point2<f64>) -> f64,
) -> f64 {
    let (a, b) = (first.a(), first.b());
    let (c, d) = (second.a(), second.b());

    let straight_ad_bc = (d - a).norm() + (c - b).norm();
    let straight_ac_bd = (c - a).norm() + (d - b).norm();
    let (crossed, uncrossed) = if straight_ad_bc >= straight_ac_bd {
        (string(a, d) + string(b, c), string(a, c) + string(b, d))
    } else {
        (string(a, c) + string(b, d), string(a, d) + string(b, c))
    };

    (0.5 * (crossed - uncrossed)).max(0.)
}

/// Length of the string from `from` to `to` pulled tight beneath the rows in the way. Wrapping
/// greedily from one end can catch on a row the tight string clears, so both ends are tried.
fn taut_string_length(
    from: Point2<f64>,
    to: Point2<f64>,
    obstacles: &[LineSegment],
    excluded: &[Option<usize>],
) -> f64 {
    min_of_2(
        string_length(from, to, obstacles, excluded, obstacles.len()),
        string_length(to, from, obstacles, excluded, obstacles.len()),
    )
}

/// Length of a string from `from` to `to` that passes beneath any row in the way.
/// Rows of equal height can only be seen past from underneath, so a blocked string wraps around
/// the lowest point of the first row it meets.
fn string_length(
    from: Point2<f64>,
    to: Point2<f64>,
    obstacles: &[LineSegment],
    excluded: &[Option<usize>],
    depth: usize,
) -> f64 {
    let path = LineSegment::new(from, to);
    if depth == 0 {
        return path.length();
    }

    let first_obstacle = obstacles
        .iter()
        .enumerate()
        .filter(|(index, _)| !excluded.contains(&Some(*index)))
        .filter(|(_, obstacle)| path.properly_intersects(obstacle))
        .filter_map(|(_, obstacle)| {
            path.crossing_fraction(obstacle)
                .map(|fraction| (fraction, obstacle))
        })
        .min_by(|(fraction_a, _), (fraction_b, _)| fraction_a.total_cmp(fraction_b));

    match first_obstacle {
        None => path.length(),
        Some((_, obstacle)) => {
            let corner = obstacle.lowest_point();
            string_length(from, corner, obstacles, excluded, depth - 1)
                + string_length(corner, to, obstacles, excluded, depth - 1)
        }
    }
}
