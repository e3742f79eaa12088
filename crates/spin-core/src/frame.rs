//! Frame index arithmetic
//!
//! Maps continuous drag distance onto a discrete, wrapping frame number.
//! Rotation loops forever in both directions, so every result is taken
//! modulo the frame count and is never negative.

/// Wrap an arbitrary integer into `[0, total)`
///
/// A `total` of zero yields 0 so callers never divide by zero.
pub fn wrap_frame(x: i64, total: usize) -> usize {
    if total == 0 {
        return 0;
    }
    let n = total as i64;
    (((x % n) + n) % n) as usize
}

/// Wrap a continuous rotation position into `[0, total)`
pub fn wrap_position(p: f64, total: usize) -> f64 {
    if total == 0 || !p.is_finite() {
        return 0.0;
    }
    let n = total as f64;
    ((p % n) + n) % n
}

/// Frame displayed for a continuous position
pub fn frame_at(position: f64, total: usize) -> usize {
    if total <= 1 || !position.is_finite() {
        return 0;
    }
    wrap_frame(position.round() as i64, total)
}

/// Sanitized pixels-per-frame; anything unusable falls back to 1px per frame
pub(crate) fn effective_sensitivity(sensitivity: f64) -> f64 {
    if sensitivity.is_finite() && sensitivity > 0.0 {
        sensitivity
    } else {
        1.0
    }
}

/// Next frame after dragging `pixel_delta` pixels from `current`
///
/// `frame_delta = pixel_delta / sensitivity` is added to the current frame,
/// rounded to the nearest integer and wrapped. With one frame or fewer the
/// viewer is static and this always returns 0.
pub fn frame_for_delta(current: usize, pixel_delta: f64, sensitivity: f64, total: usize) -> usize {
    if total <= 1 {
        return 0;
    }
    let frame_delta = pixel_delta / effective_sensitivity(sensitivity);
    frame_at(current as f64 + frame_delta, total)
}

/// Slider thumb position for a frame, in `[0, 1]`
pub fn progress_for_frame(frame: usize, total: usize) -> f64 {
    if total <= 1 {
        return 0.0;
    }
    (frame.min(total - 1)) as f64 / (total - 1) as f64
}

/// Frame under a slider thumb at `progress`
pub fn frame_for_progress(progress: f64, total: usize) -> usize {
    if total <= 1 || !progress.is_finite() {
        return 0;
    }
    let p = progress.clamp(0.0, 1.0);
    (p * (total - 1) as f64).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_drag_wraps_backwards() {
        // -90px at 2px/frame is -45 frames from 0 on a 36-frame set
        assert_eq!(frame_for_delta(0, -90.0, 2.0, 36), 27);
    }

    #[test]
    fn test_forward_drag_wraps_past_end() {
        // +5 frames from 8 on a 10-frame set
        assert_eq!(frame_for_delta(8, 10.0, 2.0, 10), 3);
    }

    #[test]
    fn test_result_always_in_range() {
        for total in 2..40usize {
            for current in 0..total {
                for delta in (-2000..2000).step_by(37) {
                    let next = frame_for_delta(current, delta as f64, 3.0, total);
                    assert!(next < total, "{} out of range for {} frames", next, total);
                }
            }
        }
    }

    #[test]
    fn test_wrap_frame() {
        assert_eq!(wrap_frame(-1, 36), 35);
        assert_eq!(wrap_frame(-36, 36), 0);
        assert_eq!(wrap_frame(73, 36), 1);
        assert_eq!(wrap_frame(5, 0), 0);
    }

    #[test]
    fn test_wrap_position() {
        assert_eq!(wrap_position(-0.5, 10), 9.5);
        assert_eq!(wrap_position(10.25, 10), 0.25);
        assert_eq!(wrap_position(f64::NAN, 10), 0.0);
        assert!(wrap_position(-1e-17, 10) < 10.0);
    }

    #[test]
    fn test_single_frame_is_static() {
        assert_eq!(frame_for_delta(0, 500.0, 2.0, 1), 0);
        assert_eq!(frame_for_delta(0, -500.0, 2.0, 0), 0);
    }

    #[test]
    fn test_bad_sensitivity_falls_back() {
        assert_eq!(frame_for_delta(0, 3.0, 0.0, 36), 3);
        assert_eq!(frame_for_delta(0, 3.0, f64::NAN, 36), 3);
    }

    #[test]
    fn test_progress_mapping() {
        assert_eq!(progress_for_frame(0, 36), 0.0);
        assert_eq!(progress_for_frame(35, 36), 1.0);
        assert_eq!(progress_for_frame(0, 1), 0.0);
        assert_eq!(frame_for_progress(1.0, 36), 35);
        assert_eq!(frame_for_progress(0.5, 11), 5);
        assert_eq!(frame_for_progress(-3.0, 36), 0);
        assert_eq!(frame_for_progress(7.0, 36), 35);
    }
}
