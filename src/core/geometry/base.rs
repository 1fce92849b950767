use crate::compare_floats::{max_of_2, min_of_2};
use nalgebra::{Point2, Vector2};

/// Orientation values smaller than this are treated as collinear
const COLLINEARITY_TOLERANCE: f64 = 1e-12;

/// Twice the signed area of the triangle (p, q, r): positive when r lies to the left of p -> q
pub(crate) fn orientation(p: &Point2<f64>, q: &Point2<f64>, r: &Point2<f64>) -> f64 {
    (q - p).perp(&(r - p))
}

/// A straight 2D segment from `a` to `b`, in metres, lying in the plane normal to the row axis.
/// x runs across the rows and y is the height above the ground.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineSegment {
    a: Point2<f64>,
    b: Point2<f64>,
}

impl LineSegment {
    pub fn new(a: Point2<f64>, b: Point2<f64>) -> Self {
        Self { a, b }
    }

    pub fn a(&self) -> Point2<f64> {
        self.a
    }

    pub fn b(&self) -> Point2<f64> {
        self.b
    }

    pub fn length(&self) -> f64 {
        (self.b - self.a).norm()
    }

    pub fn direction(&self) -> Vector2<f64> {
        self.b - self.a
    }

    pub fn centroid(&self) -> Point2<f64> {
        nalgebra::center(&self.a, &self.b)
    }

    /// Point at fraction `u` of the way from `a` to `b`
    pub fn point_at(&self, u: f64) -> Point2<f64> {
        self.a + self.direction() * u
    }

    /// Unit normal obtained by rotating a -> b a quarter turn anticlockwise
    pub fn normal(&self) -> Vector2<f64> {
        let direction = self.direction();
        Vector2::new(-direction.y, direction.x).normalize()
    }

    pub fn lowest_point(&self) -> Point2<f64> {
        if self.a.y <= self.b.y {
            self.a
        } else {
            self.b
        }
    }

    pub fn highest_point(&self) -> Point2<f64> {
        if self.a.y >= self.b.y {
            self.a
        } else {
            self.b
        }
    }

    pub fn min_x(&self) -> f64 {
        min_of_2(self.a.x, self.b.x)
    }

    pub fn max_x(&self) -> f64 {
        max_of_2(self.a.x, self.b.x)
    }

    /// Sub-segment between fractions `u_start` and `u_end` of this segment
    pub fn sub_segment(&self, u_start: f64, u_end: f64) -> Self {
        Self::new(self.point_at(u_start), self.point_at(u_end))
    }

    /// Whether the two segments cross at a single point interior to both.
    /// Touching at an endpoint or overlapping collinearly does not count.
    pub fn properly_intersects(&self, other: &LineSegment) -> bool {
        let o1 = orientation(&self.a, &self.b, &other.a);
        let o2 = orientation(&self.a, &self.b, &other.b);
        let o3 = orientation(&other.a, &other.b, &self.a);
        let o4 = orientation(&other.a, &other.b, &self.b);

        [o1, o2, o3, o4]
            .iter()
            .all(|o| o.abs() > COLLINEARITY_TOLERANCE)
            && o1.signum() != o2.signum()
            && o3.signum() != o4.signum()
    }

    /// Fraction along this segment at which it crosses the line through `other`, if the two are
    /// not parallel
    pub fn crossing_fraction(&self, other: &LineSegment) -> Option<f64> {
        let denominator = self.direction().perp(&other.direction());
        if denominator.abs() < COLLINEARITY_TOLERANCE {
            return None;
        }
        Some((other.a - self.a).perp(&other.direction()) / denominator)
    }

    /// Where the infinite line through this segment reaches the ground (y = 0), if it is not
    /// horizontal
    pub fn ground_intercept(&self) -> Option<f64> {
        let direction = self.direction();
        if direction.y.abs() < COLLINEARITY_TOLERANCE {
            return None;
        }
        Some(self.a.x - self.a.y * direction.x / direction.y)
    }

    /// Signed distance of `point` from the line through this segment, positive on the side the
    /// normal points to
    pub fn signed_distance(&self, point: &Point2<f64>) -> f64 {
        (point - self.a).dot(&self.normal())
    }
}

/// Project `point` along `ray` onto the ground (y = 0)
pub(crate) fn project_onto_ground(point: &Point2<f64>, ray: &Vector2<f64>) -> f64 {
    point.x - point.y * ray.x / ray.y
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn segment() -> LineSegment {
        LineSegment::new(Point2::new(0., 1.), Point2::new(2., 3.))
    }

    #[rstest]
    fn test_length_and_centroid(segment: LineSegment) {
        assert_relative_eq!(segment.length(), 8_f64.sqrt());
        assert_eq!(segment.centroid(), Point2::new(1., 2.));
        assert_eq!(segment.point_at(0.25), Point2::new(0.5, 1.5));
    }

    #[rstest]
    fn test_normal_points_left_of_direction(segment: LineSegment) {
        let normal = segment.normal();
        assert_relative_eq!(normal.x, -(0.5_f64.sqrt()));
        assert_relative_eq!(normal.y, 0.5_f64.sqrt());
        assert!(segment.signed_distance(&Point2::new(0., 3.)) > 0.);
    }

    #[rstest]
    fn test_lowest_and_highest_points(segment: LineSegment) {
        assert_eq!(segment.lowest_point(), Point2::new(0., 1.));
        assert_eq!(segment.highest_point(), Point2::new(2., 3.));
    }

    #[rstest]
    fn test_ground_intercept(segment: LineSegment) {
        assert_relative_eq!(segment.ground_intercept().unwrap(), -1.);
        let horizontal = LineSegment::new(Point2::new(0., 1.), Point2::new(1., 1.));
        assert_eq!(horizontal.ground_intercept(), None);
    }

    #[rstest]
    fn test_proper_intersection() {
        let first = LineSegment::new(Point2::new(0., 0.), Point2::new(2., 2.));
        let crossing = LineSegment::new(Point2::new(0., 2.), Point2::new(2., 0.));
        let touching = LineSegment::new(Point2::new(2., 2.), Point2::new(3., 0.));
        let apart = LineSegment::new(Point2::new(3., 0.), Point2::new(4., 1.));

        assert!(first.properly_intersects(&crossing));
        assert!(!first.properly_intersects(&touching));
        assert!(!first.properly_intersects(&apart));

        assert_relative_eq!(first.crossing_fraction(&crossing).unwrap(), 0.5);
        let parallel = LineSegment::new(Point2::new(0., 1.), Point2::new(1., 2.));
        assert_eq!(first.crossing_fraction(&parallel), None);
    }

    #[rstest]
    fn test_project_onto_ground() {
        let sun = Vector2::new(1., 1.);
        assert_relative_eq!(project_onto_ground(&Point2::new(2., 1.5), &sun), 0.5);
    }
}
