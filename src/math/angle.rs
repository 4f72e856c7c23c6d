//! Scalar helpers for angles in degrees and clamped interpolation

/// Wrap `t` into `0..length`
#[inline]
pub fn repeat(t: f32, length: f32) -> f32 {
    (t - (t / length).floor() * length).clamp(0.0, length)
}

/// Shortest signed difference between two angles in degrees
pub fn delta_angle(current: f32, target: f32) -> f32 {
    let mut delta = repeat(target - current, 360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    delta
}

/// Move `current` towards `target` by at most `max_delta`
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        return target;
    }
    current + (target - current).signum() * max_delta
}

/// Like [`move_towards`] but takes the shortest way around the circle
pub fn move_towards_angle(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = delta_angle(current, target);
    if -max_delta < delta && delta < max_delta {
        return target;
    }
    move_towards(current, current + delta, max_delta)
}

/// Interpolate between two angles along the shortest arc, `t` clamped to 0..1
pub fn lerp_angle(a: f32, b: f32, t: f32) -> f32 {
    let mut delta = repeat(b - a, 360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    a + delta * t.clamp(0.0, 1.0)
}

/// Where `value` sits between `a` and `b`, clamped to 0..1. Equal ends yield 0.
#[inline]
pub fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if a != b {
        ((value - a) / (b - a)).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Double precision [`inverse_lerp`] for track percents
#[inline]
pub fn inverse_lerp_f64(a: f64, b: f64, value: f64) -> f64 {
    if a != b {
        ((value - a) / (b - a)).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Clamp an angle to the 0..360 range by wrapping whole turns
#[inline]
pub fn wrap_degrees(angle: f32) -> f32 {
    angle - (angle / 360.0).floor() * 360.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_angle_wraps() {
        assert_eq!(delta_angle(350.0, 10.0), 20.0);
        assert_eq!(delta_angle(10.0, 350.0), -20.0);
    }

    #[test]
    fn test_move_towards_snaps() {
        assert_eq!(move_towards(0.0, 0.5, 1.0), 0.5);
        assert_eq!(move_towards(0.0, 5.0, 1.0), 1.0);
        assert_eq!(move_towards(0.0, -5.0, 2.0), -2.0);
    }

    #[test]
    fn test_move_towards_angle_shortest_way() {
        assert_eq!(move_towards_angle(350.0, 20.0, 5.0), 355.0);
        assert_eq!(move_towards_angle(0.0, 3.0, 5.0), 3.0);
    }

    #[test]
    fn test_lerp_angle_crosses_zero() {
        assert!((lerp_angle(350.0, 10.0, 0.5) - 360.0).abs() < 1e-4);
    }

    #[test]
    fn test_inverse_lerp_degenerate() {
        assert_eq!(inverse_lerp(2.0, 2.0, 5.0), 0.0);
        assert_eq!(inverse_lerp_f64(0.0, 4.0, 1.0), 0.25);
        assert_eq!(inverse_lerp(0.0, 1.0, 3.0), 1.0);
    }

    #[test]
    fn test_wrap_degrees() {
        assert_eq!(wrap_degrees(370.0), 10.0);
        assert_eq!(wrap_degrees(-10.0), 350.0);
    }
}
