/// Absolute tolerance used when comparing positions along a row or the ground, in m
pub(crate) const DISTANCE_TOLERANCE: f64 = 1e-9;

pub fn min_of_2<T: PartialOrd + Copy>(first: T, second: T) -> T {
    if first < second {
        first
    } else {
        second
    }
}

pub fn max_of_2<T: PartialOrd + Copy>(first: T, second: T) -> T {
    if first > second {
        first
    } else {
        second
    }
}

/// Clamp a value into the closed interval [lower, upper]
pub(crate) fn clip(value: f64, lower: f64, upper: f64) -> f64 {
    max_of_2(lower, min_of_2(value, upper))
}

/// Whether two positions are the same to within `DISTANCE_TOLERANCE`
pub(crate) fn is_same_position(a: f64, b: f64) -> bool {
    is_close!(a, b, abs_tol = DISTANCE_TOLERANCE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    pub fn should_calc_2_as_min_of_2_and_4_ints() {
        assert_eq!(min_of_2(2, 4), 2);
    }

    #[rstest]
    pub fn should_calc_2_as_min_of_4_and_2_floats() {
        assert_eq!(min_of_2(4., 2.), 2.);
    }

    #[rstest]
    pub fn should_calc_4_as_max_of_4_and_2_ints() {
        assert_eq!(max_of_2(4, 2), 4);
    }

    #[rstest]
    #[case(-0.5, 0.)]
    #[case(0.25, 0.25)]
    #[case(1.5, 1.)]
    fn should_clip_into_unit_interval(#[case] value: f64, #[case] expected: f64) {
        assert_eq!(clip(value, 0., 1.), expected);
    }

    #[test]
    fn should_treat_nearby_positions_as_same() {
        assert!(is_same_position(1.0, 1.0 + 1e-12));
        assert!(!is_same_position(1.0, 1.0 + 1e-6));
    }
}
