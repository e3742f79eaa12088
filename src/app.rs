use leptos::prelude::*;
use leptos::task::spawn_local;
use spin_core::{FrameUrlScheme, SpinManifest};
use web_sys::{console, UrlSearchParams};

use crate::api;
use crate::components::SpinViewer;

/// Where the product page is in fetching its manifest
#[derive(Debug, Clone, PartialEq)]
enum ManifestState {
    Loading,
    Ready(SpinManifest),
    /// No manifest published; the product has no 360° view
    Missing(String),
}

/// `?product=<id>` from the page URL
fn product_from_location() -> Option<String> {
    let search = web_sys::window()?.location().search().ok()?;
    let params = UrlSearchParams::new_with_str(&search).ok()?;
    params.get("product").filter(|p| !p.is_empty())
}

#[component]
pub fn App() -> impl IntoView {
    let product_id = product_from_location();
    let (state, set_state) = signal(ManifestState::Loading);

    let requested = product_id.clone();
    Effect::new(move || {
        let Some(product_id) = requested.clone() else {
            set_state.set(ManifestState::Missing("No product selected".to_string()));
            return;
        };
        spawn_local(async move {
            match api::fetch_manifest(&product_id, &FrameUrlScheme::default()).await {
                Ok(manifest) => set_state.set(ManifestState::Ready(manifest)),
                Err(e) => {
                    console::warn_1(&format!("App: no 360° view for {}: {}", product_id, e).into());
                    set_state.set(ManifestState::Missing(e));
                }
            }
        });
    });

    let title = product_id.unwrap_or_default();
    let alt = format!("{} 360° view", title);

    view! {
        <div class="product-page">
            <h1 class="product-title">{title}</h1>
            {move || match state.get() {
                ManifestState::Loading => view! {
                    <div class="spin-viewer spin-viewer-loading">
                        <div class="loading-spinner"></div>
                    </div>
                }.into_any(),
                ManifestState::Ready(manifest) => {
                    let config = manifest.viewer_config();
                    view! {
                        <SpinViewer
                            product_id=manifest.product_id.clone()
                            frame_count=manifest.frame_count
                            config=config
                            alt=alt.clone()
                        />
                    }.into_any()
                }
                ManifestState::Missing(reason) => view! {
                    <div class="spin-viewer spin-viewer-empty" title=reason>
                        "No 360° view available"
                    </div>
                }.into_any(),
            }}
        </div>
    }
}
