//! The rotation engine
//!
//! One engine serves both viewer flavors: momentum and the slider thumb are
//! capability flags. It holds no browser handles. Each input returns the
//! [`Action`]s the host must carry out (redraw, start image loads, schedule
//! or cancel the animation tick, capture the pointer, ...), which keeps the
//! whole interaction testable without a DOM.

use serde::Serialize;

use crate::config::ViewerConfig;
use crate::frame::{frame_at, frame_for_progress, progress_for_frame, wrap_frame, wrap_position};
use crate::momentum::MomentumIntegrator;
use crate::preload::{PreloadRequest, Preloader};
use crate::tracker::{DragTracker, Motion, PointerKind};

/// Side effects requested from the host
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Action {
    /// Show this frame
    Render { frame: usize },
    /// Start loading these frames in the background
    Preload(Vec<PreloadRequest>),
    /// Request one animation tick (`requestAnimationFrame`)
    ScheduleTick,
    /// Drop any pending animation tick
    CancelTick,
    CapturePointer,
    ReleasePointer,
    /// Suppress the browser default (text selection, native scroll)
    PreventDefault,
    /// (Re)start the idle timer; replaces any timer already running
    ArmIdleTimer { delay_ms: u32 },
    ClearIdleTimer,
}

/// Optional behaviors of a viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub momentum: bool,
    pub slider: bool,
}

impl From<&ViewerConfig> for Capabilities {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            momentum: config.momentum,
            slider: config.slider,
        }
    }
}

/// Rotation of one viewer instance
#[derive(Debug, Clone, PartialEq)]
pub struct RotationState {
    /// Continuous position in `[0, total_frames)`; coasting moves it by fractions
    pub position: f64,
    pub current_frame: usize,
    pub total_frames: usize,
    pub is_dragging: bool,
}

pub struct SpinEngine {
    config: ViewerConfig,
    capabilities: Capabilities,
    state: RotationState,
    initial_frame: usize,
    tracker: DragTracker,
    momentum: MomentumIntegrator,
    preloader: Preloader,
    tick_pending: bool,
    mounted: bool,
}

impl SpinEngine {
    pub fn new(config: ViewerConfig, total_frames: usize) -> Self {
        Self::with_start_frame(config, total_frames, 0)
    }

    pub fn with_start_frame(config: ViewerConfig, total_frames: usize, start_frame: usize) -> Self {
        let frame = wrap_frame(start_frame as i64, total_frames);
        Self {
            capabilities: Capabilities::from(&config),
            state: RotationState {
                position: frame as f64,
                current_frame: frame,
                total_frames,
                is_dragging: false,
            },
            initial_frame: frame,
            tracker: DragTracker::new(config.sensitivity, config.tick_ms, config.release_stale_ms),
            momentum: MomentumIntegrator::new(config.decay, config.min_velocity, config.stop_threshold),
            preloader: Preloader::new(total_frames, config.preload_window, config.idle_preload_delay_ms),
            config,
            tick_pending: false,
            mounted: false,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn state(&self) -> &RotationState {
        &self.state
    }

    pub fn current_frame(&self) -> usize {
        self.state.current_frame
    }

    /// A single frame (or none) is shown as a static image
    pub fn is_interactive(&self) -> bool {
        self.state.total_frames > 1
    }

    pub fn is_coasting(&self) -> bool {
        self.momentum.is_coasting()
    }

    pub fn tick_pending(&self) -> bool {
        self.tick_pending
    }

    pub fn preloader(&self) -> &Preloader {
        &self.preloader
    }

    /// Thumb position for the slider capability
    pub fn slider_progress(&self) -> f64 {
        progress_for_frame(self.state.current_frame, self.state.total_frames)
    }

    /// Whether the first frame shown has finished loading (or given up)
    pub fn first_frame_settled(&self) -> bool {
        self.preloader.is_loaded(self.initial_frame) || self.preloader.has_failed(self.initial_frame)
    }

    fn plan_preload(&mut self, now_ms: f64, actions: &mut Vec<Action>) {
        let requests = self.preloader.on_frame_changed(self.state.current_frame, now_ms);
        if !requests.is_empty() {
            actions.push(Action::Preload(requests));
        }
        match self.preloader.idle_deadline() {
            Some(deadline) => actions.push(Action::ArmIdleTimer {
                delay_ms: (deadline - now_ms).max(0.0).round() as u32,
            }),
            None => actions.push(Action::ClearIdleTimer),
        }
    }

    fn move_to(&mut self, position: f64, now_ms: f64, actions: &mut Vec<Action>) {
        let total = self.state.total_frames;
        self.state.position = wrap_position(position, total);
        let frame = frame_at(self.state.position, total);
        if frame != self.state.current_frame {
            self.state.current_frame = frame;
            actions.push(Action::Render { frame });
            self.plan_preload(now_ms, actions);
        }
    }

    /// Stop coasting before any other input takes over the rotation
    fn halt(&mut self, actions: &mut Vec<Action>) {
        self.momentum.stop();
        if self.tick_pending {
            self.tick_pending = false;
            actions.push(Action::CancelTick);
        }
    }

    pub fn mount(&mut self, now_ms: f64) -> Vec<Action> {
        self.mounted = true;
        let mut actions = vec![Action::Render {
            frame: self.state.current_frame,
        }];
        self.plan_preload(now_ms, &mut actions);
        actions
    }

    pub fn pointer_down(&mut self, x: f64, y: f64, t_ms: f64, kind: PointerKind) -> Vec<Action> {
        let mut actions = Vec::new();
        if !self.mounted || !self.is_interactive() {
            return actions;
        }
        self.halt(&mut actions);

        // Drags start from the displayed frame, not a fractional coasting position
        self.state.position = self.state.current_frame as f64;
        self.tracker.press(x, y, t_ms, kind, self.state.position);
        self.state.is_dragging = true;
        actions.push(Action::CapturePointer);
        if kind != PointerKind::Touch {
            actions.push(Action::PreventDefault);
        }
        actions
    }

    pub fn pointer_move(&mut self, x: f64, y: f64, t_ms: f64) -> Vec<Action> {
        let mut actions = Vec::new();
        if !self.mounted {
            return actions;
        }
        match self.tracker.motion(x, y, t_ms) {
            Motion::Rotate { position } => {
                actions.push(Action::PreventDefault);
                self.move_to(position, t_ms, &mut actions);
            }
            Motion::Scroll | Motion::Idle => {}
        }
        actions
    }

    pub fn pointer_up(&mut self, t_ms: f64) -> Vec<Action> {
        let mut actions = Vec::new();
        let Some(velocity) = self.tracker.release(t_ms) else {
            return actions;
        };
        self.state.is_dragging = false;
        actions.push(Action::ReleasePointer);

        if self.mounted && self.capabilities.momentum && self.momentum.launch(velocity) {
            self.tick_pending = true;
            actions.push(Action::ScheduleTick);
        }
        actions
    }

    /// Gesture aborted by the browser; no momentum
    pub fn pointer_cancel(&mut self) -> Vec<Action> {
        if !self.tracker.is_active() {
            return Vec::new();
        }
        self.tracker.cancel();
        self.state.is_dragging = false;
        vec![Action::ReleasePointer]
    }

    /// One repaint-synchronized step of the coasting loop
    pub fn animation_tick(&mut self, now_ms: f64) -> Vec<Action> {
        let mut actions = Vec::new();
        self.tick_pending = false;
        if !self.mounted {
            return actions;
        }
        let total = self.state.total_frames;
        if let Some(position) = self.momentum.tick(self.state.position, self.config.sensitivity, total) {
            self.move_to(position, now_ms, &mut actions);
            if self.momentum.is_coasting() {
                self.tick_pending = true;
                actions.push(Action::ScheduleTick);
            }
        }
        actions
    }

    /// The idle timer fired; queue the rest of the frame set
    pub fn idle_elapsed(&mut self, now_ms: f64) -> Vec<Action> {
        let requests = self.preloader.poll_idle(now_ms);
        if requests.is_empty() {
            Vec::new()
        } else {
            vec![Action::Preload(requests)]
        }
    }

    pub fn frame_loaded(&mut self, frame: usize) -> bool {
        self.preloader.on_loaded(frame)
    }

    pub fn frame_failed(&mut self, frame: usize) {
        self.preloader.on_failed(frame);
    }

    /// Jump to the frame under the slider thumb
    pub fn slider_input(&mut self, progress: f64, now_ms: f64) -> Vec<Action> {
        let mut actions = Vec::new();
        if !self.mounted || !self.capabilities.slider || !self.is_interactive() {
            return actions;
        }
        self.halt(&mut actions);
        let frame = frame_for_progress(progress, self.state.total_frames);
        self.move_to(frame as f64, now_ms, &mut actions);
        actions
    }

    /// Step by whole frames (keyboard arrows)
    pub fn step(&mut self, delta: i64, now_ms: f64) -> Vec<Action> {
        let mut actions = Vec::new();
        if !self.mounted || !self.is_interactive() || self.state.is_dragging {
            return actions;
        }
        self.halt(&mut actions);
        let frame = wrap_frame(self.state.current_frame as i64 + delta, self.state.total_frames);
        self.move_to(frame as f64, now_ms, &mut actions);
        actions
    }

    /// Tear down; pending ticks and timers must not outlive the viewer
    pub fn unmount(&mut self) -> Vec<Action> {
        self.mounted = false;
        self.momentum.stop();
        self.tick_pending = false;
        self.preloader.dispose();
        let mut actions = vec![Action::CancelTick, Action::ClearIdleTimer];
        if self.tracker.is_active() {
            self.tracker.cancel();
            self.state.is_dragging = false;
            actions.push(Action::ReleasePointer);
        }
        actions
    }
}
