//! Bearing, angle normalization and smoothing helpers.
//!
//! All angles are degrees. Nothing here holds state.

use crate::types::Coordinate;

/// Mean Earth radius in meters (IUGG).
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Initial great-circle bearing from `from` to `to`, in [0, 360).
pub fn bearing_degrees(from: &Coordinate, to: &Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    normalize_360(y.atan2(x).to_degrees())
}

/// Haversine distance in meters.
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Floored modulo into [0, 360).
pub fn normalize_360(degrees: f64) -> f64 {
    let d = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Reduce into (-180, 180].
pub fn normalize_180(degrees: f64) -> f64 {
    let d = normalize_360(degrees);
    if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Exponential low-pass filter on a circular quantity.
///
/// Moves `previous` toward `next` along the shorter arc by a factor of
/// `1 - exp(-delta_time / smoothing_time)`. Without a previous value, or with a
/// non-positive time step or time constant, `next` is returned unfiltered.
/// Result is in (-180, 180].
pub fn smooth_angle_degrees(
    previous: Option<f64>,
    next: f64,
    delta_time: f64,
    smoothing_time: f64,
) -> f64 {
    let Some(previous) = previous else {
        return normalize_180(next);
    };
    if delta_time <= 0.0 || smoothing_time <= 0.0 {
        return normalize_180(next);
    }

    let alpha = 1.0 - (-delta_time / smoothing_time).exp();
    let delta = normalize_180(next - previous);
    normalize_180(previous + delta * alpha)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = Coordinate::new(0.0, 0.0);
        let north = bearing_degrees(&origin, &Coordinate::new(1.0, 0.0));
        let east = bearing_degrees(&origin, &Coordinate::new(0.0, 1.0));
        let south = bearing_degrees(&origin, &Coordinate::new(-1.0, 0.0));
        let west = bearing_degrees(&origin, &Coordinate::new(0.0, -1.0));

        assert!(north.abs() < 0.1, "expected ~0, got {north}");
        assert!((east - 90.0).abs() < 0.1, "expected ~90, got {east}");
        assert!((south - 180.0).abs() < 0.1, "expected ~180, got {south}");
        assert!((west - 270.0).abs() < 0.1, "expected ~270, got {west}");
    }

    #[test]
    fn bearing_to_same_point_is_in_range() {
        let p = Coordinate::new(35.68, 139.76);
        let b = bearing_degrees(&p, &p);
        assert!((0.0..360.0).contains(&b));
    }

    #[test]
    fn distance_one_degree_of_latitude() {
        let d = distance_meters(&Coordinate::new(0.0, 0.0), &Coordinate::new(1.0, 0.0));
        assert!((d - 111_195.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let a = Coordinate::new(35.6812, 139.7671);
        let b = Coordinate::new(35.6586, 139.7454);
        assert!(approx(distance_meters(&a, &b), distance_meters(&b, &a)));
        assert_eq!(distance_meters(&a, &a), 0.0);
    }

    #[test]
    fn normalize_360_handles_negatives() {
        assert!(approx(normalize_360(-10.0), 350.0));
        assert!(approx(normalize_360(-370.0), 350.0));
        assert!(approx(normalize_360(720.0), 0.0));
        assert!(approx(normalize_360(359.5), 359.5));
    }

    #[test]
    fn normalize_180_boundaries() {
        assert!(approx(normalize_180(180.0), 180.0));
        assert!(approx(normalize_180(-180.0), 180.0));
        assert!(approx(normalize_180(181.0), -179.0));
        assert!(approx(normalize_180(-190.0), 170.0));
        assert!(approx(normalize_180(0.0), 0.0));
    }

    #[test]
    fn normalize_ranges_hold_for_many_inputs() {
        let mut x = -10_000.0;
        while x <= 10_000.0 {
            let n360 = normalize_360(x);
            let n180 = normalize_180(x);
            assert!((0.0..360.0).contains(&n360), "normalize_360({x}) = {n360}");
            assert!(n180 > -180.0 && n180 <= 180.0, "normalize_180({x}) = {n180}");
            assert!(approx(normalize_360(n360), n360), "not idempotent at {x}");
            assert!(approx(normalize_180(n180), n180), "not idempotent at {x}");
            x += 7.3;
        }
    }

    #[test]
    fn normalize_360_never_returns_360_for_tiny_negatives() {
        let n = normalize_360(-1e-20);
        assert!((0.0..360.0).contains(&n), "got {n}");
    }

    #[test]
    fn smoothing_takes_the_short_way_around() {
        let smoothed = smooth_angle_degrees(Some(10.0), 350.0, 1.0, 1.0);
        // Shortest arc from 10 to 350 is -20 degrees through 0.
        let expected = 10.0 - 20.0 * (1.0 - (-1.0f64).exp());
        assert!(approx(smoothed, expected), "got {smoothed}");
        assert!(smoothed < 10.0 && smoothed > -10.0);
    }

    #[test]
    fn smoothing_without_previous_returns_next() {
        assert!(approx(smooth_angle_degrees(None, 270.0, 1.0, 1.0), -90.0));
    }

    #[test]
    fn smoothing_with_degenerate_times_returns_next() {
        assert!(approx(smooth_angle_degrees(Some(0.0), 45.0, 0.0, 1.0), 45.0));
        assert!(approx(smooth_angle_degrees(Some(0.0), 45.0, -1.0, 1.0), 45.0));
        assert!(approx(smooth_angle_degrees(Some(0.0), 45.0, 1.0, 0.0), 45.0));
    }

    #[test]
    fn smoothing_converges_with_long_time_steps() {
        let smoothed = smooth_angle_degrees(Some(170.0), -170.0, 100.0, 0.1);
        assert!(approx(smoothed.abs(), 170.0), "got {smoothed}");
        assert!(smoothed < 0.0);
    }
}
