//! Drag trace replay
//!
//! Feeds a recorded sequence of pointer events through a [`SpinEngine`],
//! interleaving synthetic animation ticks at `tick_ms` spacing, and reports
//! where the rotation came to rest.

use serde::{Deserialize, Serialize};

use crate::config::ViewerConfig;
use crate::engine::{Action, SpinEngine};
use crate::error::Result;
use crate::tracker::PointerKind;

/// Upper bound on ticks drained after the last event
const MAX_DRAIN_TICKS: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceEventKind {
    Down,
    Move,
    Up,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub kind: TraceEventKind,
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Timestamp in ms
    pub t: f64,
    #[serde(default = "default_pointer")]
    pub pointer: PointerKind,
}

fn default_pointer() -> PointerKind {
    PointerKind::Mouse
}

impl TraceEvent {
    pub fn new(kind: TraceEventKind, x: f64, t: f64) -> Self {
        Self {
            kind,
            x,
            y: 0.0,
            t,
            pointer: PointerKind::Mouse,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DragTrace {
    pub events: Vec<TraceEvent>,
}

impl DragTrace {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplayReport {
    pub total_frames: usize,
    pub start_frame: usize,
    pub final_frame: usize,
    /// Frame showing when the last pointer was released
    pub release_frame: Option<usize>,
    pub coasted_ticks: usize,
    pub renders: usize,
}

struct Clock {
    now: f64,
    tick_ms: f64,
}

fn count_renders(actions: &[Action]) -> usize {
    actions.iter().filter(|a| matches!(a, Action::Render { .. })).count()
}

/// Run `trace` against a fresh engine starting at `start_frame`
pub fn replay(config: ViewerConfig, total_frames: usize, start_frame: usize, trace: &DragTrace) -> ReplayReport {
    let tick_ms = config.tick_ms;
    let mut engine = SpinEngine::with_start_frame(config, total_frames, start_frame);
    let mut clock = Clock {
        now: trace.events.first().map(|e| e.t).unwrap_or(0.0),
        tick_ms,
    };
    engine.mount(clock.now);

    let mut report = ReplayReport {
        total_frames,
        start_frame: engine.current_frame(),
        final_frame: engine.current_frame(),
        release_frame: None,
        coasted_ticks: 0,
        renders: 0,
    };

    for event in &trace.events {
        // Ticks that would have fired before this event
        while engine.tick_pending() && clock.now + clock.tick_ms <= event.t {
            clock.now += clock.tick_ms;
            report.renders += count_renders(&engine.animation_tick(clock.now));
            report.coasted_ticks += 1;
        }
        clock.now = clock.now.max(event.t);

        let actions = match event.kind {
            TraceEventKind::Down => engine.pointer_down(event.x, event.y, event.t, event.pointer),
            TraceEventKind::Move => engine.pointer_move(event.x, event.y, event.t),
            TraceEventKind::Up => {
                report.release_frame = Some(engine.current_frame());
                engine.pointer_up(event.t)
            }
            TraceEventKind::Cancel => engine.pointer_cancel(),
        };
        report.renders += count_renders(&actions);
    }

    let mut drained = 0;
    while engine.tick_pending() && drained < MAX_DRAIN_TICKS {
        clock.now += clock.tick_ms;
        report.renders += count_renders(&engine.animation_tick(clock.now));
        report.coasted_ticks += 1;
        drained += 1;
    }
    if drained == MAX_DRAIN_TICKS {
        tracing::warn!("momentum did not settle within {} ticks", MAX_DRAIN_TICKS);
    }

    report.final_frame = engine.current_frame();
    report
}
