//! 360° product viewer
//!
//! Shows one photograph per rotation angle and lets the shopper spin the
//! product by dragging. All rotation math lives in [`SpinEngine`]; this
//! component forwards DOM input to it and carries out the returned actions:
//! - redraw via the `frame` signal
//! - background image loads through detached `HtmlImageElement`s
//! - the `requestAnimationFrame` coasting loop
//! - the idle timer that preloads the rest of the set

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use gloo_timers::callback::Timeout;
use leptos::html;
use leptos::prelude::*;
use spin_core::{Action, PointerKind, PreloadRequest, Priority, SpinEngine, ViewerConfig};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{console, AddEventListenerOptions, Element, Event, HtmlImageElement, TouchEvent};

use super::FrameSlider;

type Shared = Rc<RefCell<ViewerHost>>;

const TOUCH_EVENTS: [&str; 4] = ["touchstart", "touchmove", "touchend", "touchcancel"];

/// Milliseconds on the same clock as DOM event timestamps
fn now() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

/// The DOM event an action list was produced for
struct EventContext {
    event: Event,
    /// Element that captures the pointer (pointer events only)
    target: Option<Element>,
    pointer_id: Option<i32>,
}

impl EventContext {
    fn pointer(ev: &web_sys::PointerEvent) -> Self {
        Self {
            event: ev.clone().into(),
            target: ev.current_target().and_then(|t| t.dyn_into::<Element>().ok()),
            pointer_id: Some(ev.pointer_id()),
        }
    }

    fn plain(ev: &Event) -> Self {
        Self {
            event: ev.clone(),
            target: None,
            pointer_id: None,
        }
    }

    // Capture failures (unsupported, pointer already gone) are harmless:
    // the drag keeps working while the cursor stays over the surface.
    fn capture(&self) {
        if let (Some(target), Some(id)) = (&self.target, self.pointer_id) {
            let _ = target.set_pointer_capture(id);
        }
    }

    fn release(&self) {
        if let (Some(target), Some(id)) = (&self.target, self.pointer_id) {
            let _ = target.release_pointer_capture(id);
        }
    }
}

/// Browser-side state of one mounted viewer
struct ViewerHost {
    engine: SpinEngine,
    urls: Vec<String>,
    set_frame: WriteSignal<usize>,
    set_first_ready: WriteSignal<bool>,
    set_dragging: WriteSignal<bool>,
    raf_id: Option<i32>,
    tick_loop: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>,
    idle_timer: Option<Timeout>,
    /// Images still loading, kept alive until their load or error event
    pending: HashMap<usize, HtmlImageElement>,
    on_image_load: Option<Closure<dyn FnMut(Event)>>,
    on_image_error: Option<Closure<dyn FnMut(Event)>>,
    touch_target: Option<Element>,
    touch_listeners: Vec<(&'static str, Closure<dyn FnMut(TouchEvent)>)>,
}

impl ViewerHost {
    /// Carry out engine actions; the caller must not hold a borrow
    fn apply(shared: &Shared, actions: Vec<Action>, ctx: Option<&EventContext>) {
        for action in actions {
            match action {
                Action::Render { frame } => shared.borrow().set_frame.set(frame),
                Action::Preload(requests) => {
                    for request in requests {
                        Self::start_preload(shared, request);
                    }
                }
                Action::ScheduleTick => Self::schedule_tick(shared),
                Action::CancelTick => Self::cancel_tick(shared),
                Action::CapturePointer => {
                    shared.borrow().set_dragging.set(true);
                    if let Some(ctx) = ctx {
                        ctx.capture();
                    }
                }
                Action::ReleasePointer => {
                    shared.borrow().set_dragging.set(false);
                    if let Some(ctx) = ctx {
                        ctx.release();
                    }
                }
                Action::PreventDefault => {
                    if let Some(ctx) = ctx {
                        ctx.event.prevent_default();
                    }
                }
                Action::ArmIdleTimer { delay_ms } => {
                    let weak = Rc::downgrade(shared);
                    let timer = Timeout::new(delay_ms, move || {
                        let Some(shared) = weak.upgrade() else { return };
                        let actions = shared.borrow_mut().engine.idle_elapsed(now());
                        ViewerHost::apply(&shared, actions, None);
                    });
                    // Replacing the handle cancels the previous timer
                    shared.borrow_mut().idle_timer = Some(timer);
                }
                Action::ClearIdleTimer => {
                    shared.borrow_mut().idle_timer = None;
                }
            }
        }
    }

    fn start_preload(shared: &Shared, request: PreloadRequest) {
        let host = shared.borrow();
        let Some(url) = host.urls.get(request.frame) else { return };
        let Ok(img) = HtmlImageElement::new() else { return };

        let _ = img.set_attribute("data-frame", &request.frame.to_string());
        if request.priority == Priority::Low {
            let _ = img.set_attribute("fetchpriority", "low");
        }
        if let (Some(onload), Some(onerror)) = (&host.on_image_load, &host.on_image_error) {
            img.set_onload(Some(onload.as_ref().unchecked_ref()));
            img.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        }
        img.set_src(url);
        drop(host);

        shared.borrow_mut().pending.insert(request.frame, img);
    }

    /// Load or error event from a preloading image
    fn finish_preload(weak: &Weak<RefCell<ViewerHost>>, ev: Event, loaded: bool) {
        let Some(shared) = weak.upgrade() else { return };
        let Some(frame) = ev
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .and_then(|el| el.get_attribute("data-frame"))
            .and_then(|s| s.parse::<usize>().ok())
        else {
            return;
        };

        let mut host = shared.borrow_mut();
        if let Some(img) = host.pending.remove(&frame) {
            img.set_onload(None);
            img.set_onerror(None);
        }
        if loaded {
            host.engine.frame_loaded(frame);
        } else {
            console::warn_1(&format!("SpinViewer: frame {} failed to load: {}", frame, host.urls[frame]).into());
            host.engine.frame_failed(frame);
        }
        if host.engine.first_frame_settled() {
            host.set_first_ready.set(true);
        }
    }

    fn schedule_tick(shared: &Shared) {
        let Some(window) = web_sys::window() else { return };
        let tick_loop = shared.borrow().tick_loop.clone();
        let id = match *tick_loop.borrow() {
            Some(ref closure) => window.request_animation_frame(closure.as_ref().unchecked_ref()).ok(),
            None => None,
        };
        shared.borrow_mut().raf_id = id;
    }

    fn cancel_tick(shared: &Shared) {
        let id = shared.borrow_mut().raf_id.take();
        if let (Some(id), Some(window)) = (id, web_sys::window()) {
            let _ = window.cancel_animation_frame(id);
        }
    }

    /// Wire up everything that needs a handle back to the host
    fn attach(shared: &Shared, surface: &Element) {
        let weak = Rc::downgrade(shared);
        let tick = Closure::<dyn FnMut(f64)>::new(move |_timestamp: f64| {
            let Some(shared) = weak.upgrade() else { return };
            shared.borrow_mut().raf_id = None;
            let actions = shared.borrow_mut().engine.animation_tick(now());
            ViewerHost::apply(&shared, actions, None);
        });

        let weak = Rc::downgrade(shared);
        let on_load = Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
            ViewerHost::finish_preload(&weak, ev, true);
        });
        let weak = Rc::downgrade(shared);
        let on_error = Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
            ViewerHost::finish_preload(&weak, ev, false);
        });

        // Touch listeners must be non-passive so horizontal drags can cancel scrolling
        let options = AddEventListenerOptions::new();
        options.set_passive(false);
        let mut listeners = Vec::new();
        for name in TOUCH_EVENTS {
            let weak = Rc::downgrade(shared);
            let listener = Closure::<dyn FnMut(TouchEvent)>::new(move |ev: TouchEvent| {
                if let Some(shared) = weak.upgrade() {
                    ViewerHost::on_touch(&shared, name, &ev);
                }
            });
            if let Err(e) = surface.add_event_listener_with_callback_and_add_event_listener_options(
                name,
                listener.as_ref().unchecked_ref(),
                &options,
            ) {
                console::warn_1(&format!("SpinViewer: could not listen for {}: {:?}", name, e).into());
            }
            listeners.push((name, listener));
        }

        let mut host = shared.borrow_mut();
        *host.tick_loop.borrow_mut() = Some(tick);
        host.on_image_load = Some(on_load);
        host.on_image_error = Some(on_error);
        host.touch_target = Some(surface.clone());
        host.touch_listeners = listeners;
    }

    fn on_touch(shared: &Shared, name: &str, ev: &TouchEvent) {
        let ctx = EventContext::plain(ev.as_ref());
        let t = now();
        let actions = match name {
            "touchstart" | "touchmove" => {
                // Second finger: leave pinch-zoom to the browser
                if ev.touches().length() != 1 {
                    return;
                }
                let Some(touch) = ev.touches().get(0) else { return };
                let (x, y) = (touch.client_x() as f64, touch.client_y() as f64);
                let mut host = shared.borrow_mut();
                if name == "touchstart" {
                    host.engine.pointer_down(x, y, t, PointerKind::Touch)
                } else {
                    host.engine.pointer_move(x, y, t)
                }
            }
            "touchend" => shared.borrow_mut().engine.pointer_up(t),
            _ => shared.borrow_mut().engine.pointer_cancel(),
        };
        ViewerHost::apply(shared, actions, Some(&ctx));
    }

    /// Stop every callback that could fire into a removed viewer
    fn teardown(shared: &Shared) {
        let actions = shared.borrow_mut().engine.unmount();
        ViewerHost::apply(shared, actions, None);

        let mut host = shared.borrow_mut();
        if let Some(target) = host.touch_target.take() {
            for (name, listener) in host.touch_listeners.drain(..) {
                let _ = target.remove_event_listener_with_callback(name, listener.as_ref().unchecked_ref());
            }
        }
        for (_, img) in host.pending.drain() {
            img.set_onload(None);
            img.set_onerror(None);
        }
        host.tick_loop.borrow_mut().take();
        host.on_image_load = None;
        host.on_image_error = None;
    }
}

/// Interactive 360° viewer for one product
#[component]
pub fn SpinViewer(
    /// Product id used to build frame URLs
    product_id: String,
    /// Number of frames in the set
    frame_count: usize,
    /// Viewer tunables (defaults if omitted)
    #[prop(optional)]
    config: Option<ViewerConfig>,
    /// Alt text for the product image
    #[prop(default = "".to_string())]
    alt: String,
) -> impl IntoView {
    let config = config.unwrap_or_default();
    let config = match config.validate() {
        Ok(()) => config,
        Err(e) => {
            console::warn_1(&format!("SpinViewer: {}; using defaults", e).into());
            ViewerConfig {
                url_scheme: config.url_scheme,
                ..ViewerConfig::default()
            }
        }
    };

    let scheme = config.url_scheme.clone();
    let urls: Vec<String> = (0..frame_count.max(1))
        .map(|frame| scheme.frame_url(&product_id, frame))
        .collect();

    if frame_count == 0 {
        return view! {
            <div class="spin-viewer spin-viewer-empty">"No 360° view available"</div>
        }
        .into_any();
    }

    if frame_count == 1 {
        return view! {
            <div class="spin-viewer spin-viewer-static">
                <img class="spin-frame" src=urls[0].clone() alt=alt draggable="false" />
            </div>
        }
        .into_any();
    }

    let show_slider = config.slider;
    let (frame, set_frame) = signal(0usize);
    let (first_ready, set_first_ready) = signal(false);
    let (dragging, set_dragging) = signal(false);

    let shared: Shared = Rc::new(RefCell::new(ViewerHost {
        engine: SpinEngine::new(config, frame_count),
        urls: urls.clone(),
        set_frame,
        set_first_ready,
        set_dragging,
        raf_id: None,
        tick_loop: Rc::new(RefCell::new(None)),
        idle_timer: None,
        pending: HashMap::new(),
        on_image_load: None,
        on_image_error: None,
        touch_target: None,
        touch_listeners: Vec::new(),
    }));
    let host = StoredValue::new_local(shared);

    let surface_ref = NodeRef::<html::Div>::new();

    // Mount once the surface is in the DOM
    Effect::new(move || {
        let Some(surface) = surface_ref.get() else { return };
        host.with_value(|shared| {
            if shared.borrow().touch_target.is_some() {
                return;
            }
            ViewerHost::attach(shared, &surface);
            let actions = shared.borrow_mut().engine.mount(now());
            ViewerHost::apply(shared, actions, None);
        });
    });

    on_cleanup(move || {
        host.try_with_value(ViewerHost::teardown);
    });

    // Touch input arrives through the non-passive listeners in `attach`
    let on_pointer_down = move |ev: web_sys::PointerEvent| {
        if ev.pointer_type() == "touch" || ev.button() != 0 {
            return;
        }
        let ctx = EventContext::pointer(&ev);
        host.with_value(|shared| {
            let kind = PointerKind::from_pointer_type(&ev.pointer_type());
            let actions = shared
                .borrow_mut()
                .engine
                .pointer_down(ev.client_x() as f64, ev.client_y() as f64, now(), kind);
            ViewerHost::apply(shared, actions, Some(&ctx));
        });
    };

    let on_pointer_move = move |ev: web_sys::PointerEvent| {
        if ev.pointer_type() == "touch" {
            return;
        }
        let ctx = EventContext::pointer(&ev);
        host.with_value(|shared| {
            let actions = shared
                .borrow_mut()
                .engine
                .pointer_move(ev.client_x() as f64, ev.client_y() as f64, now());
            ViewerHost::apply(shared, actions, Some(&ctx));
        });
    };

    let on_pointer_up = move |ev: web_sys::PointerEvent| {
        if ev.pointer_type() == "touch" {
            return;
        }
        let ctx = EventContext::pointer(&ev);
        host.with_value(|shared| {
            let actions = shared.borrow_mut().engine.pointer_up(now());
            ViewerHost::apply(shared, actions, Some(&ctx));
        });
    };

    let on_pointer_cancel = move |ev: web_sys::PointerEvent| {
        if ev.pointer_type() == "touch" {
            return;
        }
        let ctx = EventContext::pointer(&ev);
        host.with_value(|shared| {
            let actions = shared.borrow_mut().engine.pointer_cancel();
            ViewerHost::apply(shared, actions, Some(&ctx));
        });
    };

    let on_keydown = move |ev: web_sys::KeyboardEvent| {
        let delta = match ev.key().as_str() {
            "ArrowLeft" => -1,
            "ArrowRight" => 1,
            _ => return,
        };
        ev.prevent_default();
        host.with_value(|shared| {
            let actions = shared.borrow_mut().engine.step(delta, now());
            ViewerHost::apply(shared, actions, None);
        });
    };

    let on_slider_input = Callback::new(move |progress: f64| {
        host.with_value(|shared| {
            let actions = shared.borrow_mut().engine.slider_input(progress, now());
            ViewerHost::apply(shared, actions, None);
        });
    });

    let progress = Signal::derive(move || spin_core::progress_for_frame(frame.get(), frame_count));
    let src = move || urls[frame.get()].clone();

    view! {
        <div class="spin-viewer">
            <div
                class="spin-surface"
                class:dragging=move || dragging.get()
                node_ref=surface_ref
                tabindex="0"
                style="touch-action: pan-y"
                on:pointerdown=on_pointer_down
                on:pointermove=on_pointer_move
                on:pointerup=on_pointer_up
                on:pointercancel=on_pointer_cancel
                on:keydown=on_keydown
            >
                <img class="spin-frame" src=src alt=alt draggable="false" />
                <Show when=move || !first_ready.get()>
                    <div class="spin-loading">
                        <div class="loading-spinner"></div>
                    </div>
                </Show>
                <span class="spin-hint">"Drag to rotate"</span>
            </div>
            <Show when=move || show_slider>
                <FrameSlider progress=progress on_input=on_slider_input />
            </Show>
        </div>
    }
    .into_any()
}
