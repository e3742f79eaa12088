//! Inertial coasting after a flick
//!
//! Velocity decays geometrically each animation tick, so fast flicks travel
//! further before stopping. The loop ends on its own once the speed drops
//! below `stop_threshold`.

use crate::frame::{effective_sensitivity, wrap_position};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MomentumState {
    Idle,
    /// Animation loop running; velocity in px per tick
    Coasting { velocity: f64 },
}

#[derive(Debug, Clone)]
pub struct MomentumIntegrator {
    decay: f64,
    min_velocity: f64,
    stop_threshold: f64,
    state: MomentumState,
}

impl MomentumIntegrator {
    pub fn new(decay: f64, min_velocity: f64, stop_threshold: f64) -> Self {
        Self {
            decay,
            min_velocity,
            stop_threshold,
            state: MomentumState::Idle,
        }
    }

    pub fn state(&self) -> MomentumState {
        self.state
    }

    pub fn is_coasting(&self) -> bool {
        matches!(self.state, MomentumState::Coasting { .. })
    }

    pub fn velocity(&self) -> f64 {
        match self.state {
            MomentumState::Idle => 0.0,
            MomentumState::Coasting { velocity } => velocity,
        }
    }

    /// Start coasting if the release was fast enough; returns whether the
    /// animation loop needs scheduling
    pub fn launch(&mut self, velocity: f64) -> bool {
        if !velocity.is_finite() || velocity.abs() <= self.min_velocity {
            return false;
        }
        tracing::debug!(velocity, "momentum started");
        self.state = MomentumState::Coasting { velocity };
        true
    }

    /// Advance one tick from `position`
    ///
    /// Returns the new wrapped position, or None when idle. After the call
    /// [`is_coasting`](Self::is_coasting) says whether to schedule another tick.
    pub fn tick(&mut self, position: f64, sensitivity: f64, total: usize) -> Option<f64> {
        let MomentumState::Coasting { velocity } = self.state else {
            return None;
        };

        let next = wrap_position(position + velocity / effective_sensitivity(sensitivity), total);
        let decayed = velocity * self.decay;
        self.state = if decayed.abs() < self.stop_threshold {
            tracing::debug!("momentum settled");
            MomentumState::Idle
        } else {
            MomentumState::Coasting { velocity: decayed }
        };
        Some(next)
    }

    /// Cancel immediately; returns whether a loop was running
    pub fn stop(&mut self) -> bool {
        let was_coasting = self.is_coasting();
        self.state = MomentumState::Idle;
        was_coasting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn integrator() -> MomentumIntegrator {
        MomentumIntegrator::new(0.92, 1.0, 0.1)
    }

    #[test]
    fn test_slow_release_does_not_coast() {
        let mut m = integrator();
        assert!(!m.launch(1.0));
        assert!(!m.launch(-0.5));
        assert!(!m.launch(f64::NAN));
        assert_eq!(m.state(), MomentumState::Idle);
        assert_eq!(m.tick(4.0, 2.0, 36), None);
    }

    #[test]
    fn test_tick_moves_then_decays() {
        let mut m = integrator();
        assert!(m.launch(10.0));
        let next = m.tick(0.0, 2.0, 36).unwrap();
        assert_eq!(next, 5.0);
        assert!((m.velocity() - 9.2).abs() < 1e-9);
    }

    #[test]
    fn test_negative_velocity_wraps() {
        let mut m = integrator();
        m.launch(-4.0);
        let next = m.tick(0.0, 2.0, 36).unwrap();
        assert_eq!(next, 34.0);
    }

    #[test]
    fn test_converges_in_finite_ticks() {
        for v0 in [1.5, -3.0, 40.0, -250.0, 10_000.0] {
            let mut m = integrator();
            assert!(m.launch(v0));
            let mut position = 0.0;
            let mut ticks = 0;
            while m.is_coasting() {
                position = m.tick(position, 5.0, 36).unwrap();
                ticks += 1;
                assert!(ticks < 1000, "no convergence from {}", v0);
            }
            assert_eq!(m.velocity(), 0.0);
            assert!((0.0..36.0).contains(&position));
        }
    }

    #[test]
    fn test_faster_flicks_travel_further() {
        let travel = |v0: f64| {
            let mut m = integrator();
            m.launch(v0);
            let mut position = 0.0;
            let mut distance = 0.0;
            while m.is_coasting() {
                distance += m.velocity() / 5.0;
                position = m.tick(position, 5.0, 1000).unwrap();
            }
            distance
        };
        assert!(travel(30.0) > travel(10.0));
    }

    #[test]
    fn test_stop_cancels() {
        let mut m = integrator();
        m.launch(20.0);
        assert!(m.stop());
        assert!(!m.stop());
        assert_eq!(m.velocity(), 0.0);
    }
}
