//! Pure angle arithmetic for the carousel ring.
//!
//! All functions here are pure and work in degrees. Every rotation entry point
//! in [`crate::carousel`] goes through [`shortest_delta`] or
//! [`forward_delta`], so there is exactly one definition of "how far to turn".

/// Tolerance used when comparing accumulated angles.
pub const EPSILON: f64 = 1e-6;

/// Reduce an angle to `[0, 360)`.
///
/// ```
/// # use card_gallery::angle::normalize;
/// assert_eq!(normalize(370.0), 10.0);
/// assert_eq!(normalize(-90.0), 270.0);
/// ```
pub fn normalize(degrees: f64) -> f64 {
    let r = degrees.rem_euclid(360.0);
    // rem_euclid rounds tiny negative inputs up to exactly 360.0
    if r >= 360.0 { 0.0 } else { r }
}

/// Signed rotation that carries `from` onto `to` with the least travel.
///
/// The result lies in `(-180, 180]`. A half-turn (within [`EPSILON`]) is
/// always reported as `+180`, so ties break in the positive direction.
///
/// ```
/// # use card_gallery::angle::shortest_delta;
/// assert_eq!(shortest_delta(0.0, 90.0), 90.0);
/// assert_eq!(shortest_delta(0.0, 270.0), -90.0);
/// assert_eq!(shortest_delta(720.0, -180.0), 180.0);
/// ```
pub fn shortest_delta(from: f64, to: f64) -> f64 {
    let d = normalize(to - from);
    if (d - 180.0).abs() < EPSILON {
        180.0
    } else if d > 180.0 {
        d - 360.0
    } else {
        d
    }
}

/// Non-negative rotation in `[0, 360)` that carries `from` onto `to`.
pub fn forward_delta(from: f64, to: f64) -> f64 {
    let d = normalize(to - from);
    if 360.0 - d < EPSILON { 0.0 } else { d }
}

/// Whether two angles point the same way, modulo full turns.
pub fn congruent(a: f64, b: f64) -> bool {
    shortest_delta(a, b).abs() < EPSILON
}

/// Angular step between neighbours on a ring of `n` items.
///
/// Zero for an empty ring.
pub fn ring_step(n: usize) -> f64 {
    if n == 0 { 0.0 } else { 360.0 / n as f64 }
}

/// Distance from the ring's center to each item so that `n` items of
/// `item_width` sit edge to edge around the circle.
///
/// Rings of fewer than three items have no closed polygon; they get a fixed
/// depth of one item width.
pub fn ring_radius(n: usize, item_width: f64) -> f64 {
    if n < 3 {
        return item_width;
    }
    let half_angle = std::f64::consts::PI / n as f64;
    ((item_width / 2.0) / half_angle.tan()).round()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_wraps_both_ways() {
        assert_eq!(normalize(0.0), 0.0);
        assert_eq!(normalize(360.0), 0.0);
        assert_eq!(normalize(725.0), 5.0);
        assert_eq!(normalize(-30.0), 330.0);
        assert_eq!(normalize(-720.0), 0.0);
    }

    #[test]
    fn normalize_never_returns_360() {
        assert!(normalize(-1e-15) < 360.0);
    }

    #[test]
    fn shortest_delta_stays_within_half_turn() {
        for from in (-1080..1080).step_by(7) {
            for to in (-720..720).step_by(11) {
                let d = shortest_delta(from as f64, to as f64);
                assert!(d > -180.0 && d <= 180.0, "{from} -> {to} gave {d}");
                assert!(congruent(from as f64 + d, to as f64));
            }
        }
    }

    #[test]
    fn half_turn_breaks_positive() {
        assert_eq!(shortest_delta(0.0, 180.0), 180.0);
        assert_eq!(shortest_delta(0.0, -180.0), 180.0);
        assert_eq!(shortest_delta(90.0, -90.0), 180.0);
        assert_eq!(shortest_delta(0.0, 180.0 + 1e-9), 180.0);
    }

    #[test]
    fn shortest_delta_ignores_accumulated_turns() {
        assert_eq!(shortest_delta(1440.0 + 10.0, 20.0), 10.0);
        assert_eq!(shortest_delta(-1440.0 + 20.0, 10.0), -10.0);
    }

    #[test]
    fn forward_delta_is_non_negative() {
        assert_eq!(forward_delta(0.0, -90.0), 270.0);
        assert_eq!(forward_delta(10.0, 10.0), 0.0);
        assert_eq!(forward_delta(720.0, 0.0), 0.0);
    }

    #[test]
    fn ring_step_divides_circle() {
        assert_eq!(ring_step(0), 0.0);
        assert_eq!(ring_step(4), 90.0);
        assert!((ring_step(7) - 51.428_571).abs() < 1e-5);
    }

    #[test]
    fn ring_radius_grows_with_count() {
        assert_eq!(ring_radius(1, 220.0), 220.0);
        assert_eq!(ring_radius(4, 220.0), 110.0);
        assert!(ring_radius(7, 220.0) > ring_radius(5, 220.0));
    }
}
