//! Pointer and touch drag tracking
//!
//! Mouse, pen and touch input collapse into one drag session. The rotation
//! position is derived from the cumulative horizontal distance since the
//! press, so replaying the same deltas always lands on the same frame no
//! matter how many move events carried them.

use serde::{Deserialize, Serialize};

use crate::frame::effective_sensitivity;

/// Input device behind a drag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Mouse,
    Pen,
    Touch,
}

impl PointerKind {
    /// Map a DOM `pointerType` string
    pub fn from_pointer_type(s: &str) -> Self {
        match s {
            "touch" => PointerKind::Touch,
            "pen" => PointerKind::Pen,
            _ => PointerKind::Mouse,
        }
    }
}

/// State of one press-move-release gesture
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    pub kind: PointerKind,
    pub start_x: f64,
    pub start_y: f64,
    /// Rotation position when the press happened
    pub start_position: f64,
    pub last_x: f64,
    pub last_sample_ms: f64,
    /// Last sampled speed, px per animation tick
    pub velocity: f64,
    /// Touch gesture judged vertical; the page scrolls instead
    pub scroll_locked: bool,
}

/// What a move event means for the viewer
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// Rotate to this (unwrapped) position
    Rotate { position: f64 },
    /// Vertical touch; leave the event to the browser
    Scroll,
    /// No drag in progress
    Idle,
}

#[derive(Debug, Clone)]
pub struct DragTracker {
    sensitivity: f64,
    tick_ms: f64,
    release_stale_ms: f64,
    session: Option<DragSession>,
}

impl DragTracker {
    pub fn new(sensitivity: f64, tick_ms: f64, release_stale_ms: f64) -> Self {
        Self {
            sensitivity: effective_sensitivity(sensitivity),
            tick_ms: if tick_ms > 0.0 { tick_ms } else { 16.0 },
            release_stale_ms,
            session: None,
        }
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Begin a gesture, replacing any session still open
    pub fn press(&mut self, x: f64, y: f64, t_ms: f64, kind: PointerKind, start_position: f64) {
        self.session = Some(DragSession {
            kind,
            start_x: x,
            start_y: y,
            start_position,
            last_x: x,
            last_sample_ms: t_ms,
            velocity: 0.0,
            scroll_locked: false,
        });
    }

    pub fn motion(&mut self, x: f64, y: f64, t_ms: f64) -> Motion {
        let sensitivity = self.sensitivity;
        let tick_ms = self.tick_ms;
        let Some(session) = self.session.as_mut() else {
            return Motion::Idle;
        };
        if session.scroll_locked {
            return Motion::Scroll;
        }

        let dx = x - session.start_x;
        let dy = y - session.start_y;
        if session.kind == PointerKind::Touch && dy.abs() > dx.abs() {
            session.scroll_locked = true;
            return Motion::Scroll;
        }

        let dt = (t_ms - session.last_sample_ms).max(1.0);
        session.velocity = (x - session.last_x) / dt * tick_ms;
        session.last_x = x;
        session.last_sample_ms = t_ms;

        Motion::Rotate {
            position: session.start_position + dx / sensitivity,
        }
    }

    /// End the gesture and hand back the release velocity (px/tick)
    ///
    /// A sample older than `release_stale_ms` means the pointer rested
    /// before lifting, so the release carries no momentum.
    pub fn release(&mut self, t_ms: f64) -> Option<f64> {
        let session = self.session.take()?;
        if session.scroll_locked || t_ms - session.last_sample_ms > self.release_stale_ms {
            return Some(0.0);
        }
        Some(session.velocity)
    }

    pub fn cancel(&mut self) {
        self.session = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> DragTracker {
        DragTracker::new(2.0, 16.0, 100.0)
    }

    #[test]
    fn test_position_follows_cumulative_delta() {
        let mut t = tracker();
        t.press(100.0, 50.0, 0.0, PointerKind::Mouse, 0.0);
        t.motion(80.0, 50.0, 16.0);
        let motion = t.motion(10.0, 52.0, 32.0);
        assert_eq!(motion, Motion::Rotate { position: -45.0 });
    }

    #[test]
    fn test_event_count_does_not_matter() {
        let mut coarse = tracker();
        coarse.press(0.0, 0.0, 0.0, PointerKind::Mouse, 3.0);
        let a = coarse.motion(60.0, 0.0, 50.0);

        let mut fine = tracker();
        fine.press(0.0, 0.0, 0.0, PointerKind::Mouse, 3.0);
        let mut b = Motion::Idle;
        for i in 1..=12 {
            b = fine.motion(i as f64 * 5.0, 0.0, i as f64 * 4.0);
        }
        assert_eq!(a, b);
    }

    #[test]
    fn test_velocity_is_normalized_to_tick() {
        let mut t = tracker();
        t.press(0.0, 0.0, 0.0, PointerKind::Mouse, 0.0);
        t.motion(10.0, 0.0, 8.0);
        // 10px in 8ms is 20px per 16ms tick
        assert_eq!(t.session().unwrap().velocity, 20.0);
    }

    #[test]
    fn test_zero_elapsed_is_clamped() {
        let mut t = tracker();
        t.press(0.0, 0.0, 5.0, PointerKind::Mouse, 0.0);
        t.motion(3.0, 0.0, 5.0);
        assert_eq!(t.session().unwrap().velocity, 48.0);
    }

    #[test]
    fn test_vertical_touch_locks_to_scroll() {
        let mut t = tracker();
        t.press(0.0, 0.0, 0.0, PointerKind::Touch, 0.0);
        assert_eq!(t.motion(2.0, 20.0, 16.0), Motion::Scroll);
        // sticky even once the finger moves sideways
        assert_eq!(t.motion(200.0, 20.0, 32.0), Motion::Scroll);
        assert_eq!(t.release(40.0), Some(0.0));
    }

    #[test]
    fn test_vertical_mouse_still_rotates() {
        let mut t = tracker();
        t.press(0.0, 0.0, 0.0, PointerKind::Mouse, 0.0);
        assert!(matches!(t.motion(2.0, 20.0, 16.0), Motion::Rotate { .. }));
    }

    #[test]
    fn test_release_hands_back_velocity() {
        let mut t = tracker();
        t.press(0.0, 0.0, 0.0, PointerKind::Touch, 0.0);
        t.motion(32.0, 0.0, 16.0);
        assert_eq!(t.release(20.0), Some(32.0));
        assert!(!t.is_active());
        assert_eq!(t.release(30.0), None);
    }

    #[test]
    fn test_stale_release_has_no_velocity() {
        let mut t = tracker();
        t.press(0.0, 0.0, 0.0, PointerKind::Mouse, 0.0);
        t.motion(32.0, 0.0, 16.0);
        assert_eq!(t.release(500.0), Some(0.0));
    }

    #[test]
    fn test_huge_stale_window_keeps_last_sample() {
        let mut t = DragTracker::new(2.0, 16.0, 1e12);
        t.press(0.0, 0.0, 0.0, PointerKind::Mouse, 0.0);
        t.motion(32.0, 0.0, 16.0);
        assert_eq!(t.release(5_000.0), Some(32.0));
    }

    #[test]
    fn test_motion_without_session() {
        let mut t = tracker();
        assert_eq!(t.motion(1.0, 1.0, 1.0), Motion::Idle);
    }

    #[test]
    fn test_pointer_type_mapping() {
        assert_eq!(PointerKind::from_pointer_type("touch"), PointerKind::Touch);
        assert_eq!(PointerKind::from_pointer_type("pen"), PointerKind::Pen);
        assert_eq!(PointerKind::from_pointer_type(""), PointerKind::Mouse);
    }
}
