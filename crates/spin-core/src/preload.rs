//! Preload planning
//!
//! Decides which frames the host should start fetching and when. The host
//! performs the fetches and reports back with [`Preloader::on_loaded`] or
//! [`Preloader::on_failed`]; nothing here awaits them.
//!
//! Two passes:
//! 1. On every frame change, the frames nearest the current one (out to
//!    `window` in each direction, wrapping) are requested at high priority.
//! 2. Once the viewer has been quiet for `idle_delay_ms`, everything still
//!    missing is requested at low priority so later spins never miss cache.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::cache::FrameCache;

/// Fetch urgency hint for the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Low,
}

/// A frame the host should start loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PreloadRequest {
    pub frame: usize,
    pub priority: Priority,
}

/// Tolerance for hosts whose timer clock runs slightly behind the event clock
const DEADLINE_SLACK_MS: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct Preloader {
    total: usize,
    window: usize,
    idle_delay_ms: f64,
    current: usize,
    cache: FrameCache,
    in_flight: BTreeSet<usize>,
    /// Failed frames are never retried
    failed: BTreeSet<usize>,
    idle_deadline: Option<f64>,
    disposed: bool,
}

impl Preloader {
    pub fn new(total: usize, window: usize, idle_delay_ms: u32) -> Self {
        Self {
            total,
            window,
            idle_delay_ms: idle_delay_ms as f64,
            current: 0,
            cache: FrameCache::new(),
            in_flight: BTreeSet::new(),
            failed: BTreeSet::new(),
            idle_deadline: None,
            disposed: false,
        }
    }

    pub fn cache(&self) -> &FrameCache {
        &self.cache
    }

    pub fn is_loaded(&self, frame: usize) -> bool {
        self.cache.contains(frame)
    }

    pub fn has_failed(&self, frame: usize) -> bool {
        self.failed.contains(&frame)
    }

    pub fn idle_deadline(&self) -> Option<f64> {
        self.idle_deadline
    }

    pub fn idle_delay_ms(&self) -> f64 {
        self.idle_delay_ms
    }

    fn wants(&self, frame: usize) -> bool {
        !self.cache.contains(frame) && !self.in_flight.contains(&frame) && !self.failed.contains(&frame)
    }

    /// Frames ordered by circular distance from `center`, forward before backward
    fn by_distance(&self, center: usize, max_distance: usize) -> Vec<usize> {
        let total = self.total;
        let mut seen = BTreeSet::new();
        let mut order = Vec::new();
        if total == 0 {
            return order;
        }
        for d in 0..=max_distance.min(total) {
            for frame in [(center + d) % total, (center + total - d % total) % total] {
                if seen.insert(frame) {
                    order.push(frame);
                }
            }
        }
        order
    }

    fn request(&mut self, frames: Vec<usize>, priority: Priority) -> Vec<PreloadRequest> {
        let mut requests = Vec::new();
        for frame in frames {
            if self.wants(frame) {
                self.in_flight.insert(frame);
                requests.push(PreloadRequest { frame, priority });
            }
        }
        requests
    }

    /// Plan the priority window around a newly displayed frame and push the
    /// idle deadline back
    pub fn on_frame_changed(&mut self, current: usize, now_ms: f64) -> Vec<PreloadRequest> {
        if self.disposed || self.total == 0 {
            return Vec::new();
        }
        self.current = current % self.total;

        let window = self.by_distance(self.current, self.window);
        let requests = self.request(window, Priority::High);

        self.idle_deadline = if (0..self.total).any(|f| self.wants(f)) {
            Some(now_ms + self.idle_delay_ms)
        } else {
            None
        };

        if !requests.is_empty() {
            tracing::debug!(current = self.current, count = requests.len(), "preloading window");
        }
        requests
    }

    /// Low-priority requests for everything still missing, once the viewer
    /// has been quiet long enough
    pub fn poll_idle(&mut self, now_ms: f64) -> Vec<PreloadRequest> {
        match self.idle_deadline {
            Some(deadline) if !self.disposed && now_ms + DEADLINE_SLACK_MS >= deadline => {
                self.idle_deadline = None;
                let all = self.by_distance(self.current, self.total);
                let requests = self.request(all, Priority::Low);
                tracing::debug!(count = requests.len(), "preloading remaining frames");
                requests
            }
            _ => Vec::new(),
        }
    }

    /// Record a completed load; returns true if it was news
    pub fn on_loaded(&mut self, frame: usize) -> bool {
        if self.disposed {
            return false;
        }
        self.in_flight.remove(&frame);
        self.cache.mark_loaded(frame)
    }

    pub fn on_failed(&mut self, frame: usize) {
        if self.disposed {
            return;
        }
        self.in_flight.remove(&frame);
        if self.failed.insert(frame) {
            tracing::debug!(frame, "frame failed to load, not retrying");
        }
    }

    /// Stop planning; later completions are ignored
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.idle_deadline = None;
        self.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frames(requests: &[PreloadRequest]) -> Vec<usize> {
        requests.iter().map(|r| r.frame).collect()
    }

    #[test]
    fn test_window_is_nearest_first_and_wraps() {
        let mut preloader = Preloader::new(36, 2, 500);
        let requests = preloader.on_frame_changed(0, 0.0);
        assert_eq!(frames(&requests), vec![0, 1, 35, 2, 34]);
        assert!(requests.iter().all(|r| r.priority == Priority::High));
    }

    #[test]
    fn test_skips_loaded_and_in_flight() {
        let mut preloader = Preloader::new(36, 2, 500);
        preloader.on_frame_changed(0, 0.0);
        preloader.on_loaded(1);
        let requests = preloader.on_frame_changed(1, 10.0);
        // 0, 2 and 35 are in flight, 1 is loaded
        assert_eq!(frames(&requests), vec![3]);
    }

    #[test]
    fn test_small_set_deduplicates() {
        let mut preloader = Preloader::new(3, 5, 500);
        let requests = preloader.on_frame_changed(1, 0.0);
        assert_eq!(frames(&requests), vec![1, 2, 0]);
    }

    #[test]
    fn test_idle_pass_is_debounced() {
        let mut preloader = Preloader::new(10, 1, 500);
        preloader.on_frame_changed(0, 0.0);
        assert_eq!(preloader.idle_deadline(), Some(500.0));

        preloader.on_frame_changed(1, 300.0);
        assert_eq!(preloader.idle_deadline(), Some(800.0));
        assert!(preloader.poll_idle(600.0).is_empty());

        let rest = preloader.poll_idle(800.0);
        assert!(rest.iter().all(|r| r.priority == Priority::Low));
        // window around 0 and 1 already covered 9, 0, 1, 2
        assert_eq!(frames(&rest), vec![3, 4, 8, 5, 7, 6]);
        assert_eq!(preloader.idle_deadline(), None);
        assert!(preloader.poll_idle(2000.0).is_empty());
    }

    #[test]
    fn test_failed_frames_are_not_retried() {
        let mut preloader = Preloader::new(5, 1, 500);
        preloader.on_frame_changed(0, 0.0);
        preloader.on_failed(1);
        assert!(preloader.has_failed(1));
        assert!(!preloader.is_loaded(1));
        let requests = preloader.on_frame_changed(1, 10.0);
        assert_eq!(frames(&requests), vec![2]);
        let rest = preloader.poll_idle(1000.0);
        assert!(!frames(&rest).contains(&1));
    }

    #[test]
    fn test_no_deadline_once_everything_requested() {
        let mut preloader = Preloader::new(3, 1, 500);
        preloader.on_frame_changed(0, 0.0);
        assert_eq!(preloader.idle_deadline(), None);
    }

    #[test]
    fn test_dispose_ignores_late_completions() {
        let mut preloader = Preloader::new(10, 1, 500);
        preloader.on_frame_changed(0, 0.0);
        preloader.dispose();
        assert!(!preloader.on_loaded(0));
        assert!(preloader.cache().is_empty());
        assert_eq!(preloader.idle_deadline(), None);
        assert!(preloader.on_frame_changed(3, 10.0).is_empty());
        assert!(preloader.poll_idle(10_000.0).is_empty());
    }
}
