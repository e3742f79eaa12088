use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlInputElement;

/// Range input alternative to dragging
///
/// Reports progress in `0.0..=1.0`; the viewer maps it to a frame.
#[component]
pub fn FrameSlider(
    progress: Signal<f64>,
    on_input: Callback<f64>,
) -> impl IntoView {
    let handle_input = move |ev: web_sys::Event| {
        let Some(input) = ev.target().and_then(|t| t.dyn_into::<HtmlInputElement>().ok()) else {
            return;
        };
        if let Ok(value) = input.value().parse::<f64>() {
            on_input.run(value);
        }
    };

    view! {
        <input
            class="spin-slider"
            type="range"
            min="0"
            max="1"
            step="any"
            aria-label="Rotate product"
            prop:value=move || progress.get().to_string()
            on:input=handle_input
        />
    }
}
