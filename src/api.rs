//! Storefront asset fetches

use gloo_net::http::Request;
use spin_core::{FrameUrlScheme, SpinManifest};
use web_sys::console;

/// Fetch the 360° manifest published next to a product's frames
pub async fn fetch_manifest(product_id: &str, scheme: &FrameUrlScheme) -> Result<SpinManifest, String> {
    let url = scheme.manifest_url(product_id);
    console::log_1(&format!("fetch_manifest: Fetching {}", url).into());

    let resp = Request::get(&url).send().await.map_err(|e| {
        console::error_1(&format!("fetch_manifest: Fetch failed: {}", e).into());
        e.to_string()
    })?;

    if !resp.ok() {
        return Err(format!("HTTP error: {}", resp.status()));
    }

    let body = resp.text().await.map_err(|e| e.to_string())?;
    SpinManifest::from_json(&body).map_err(|e| {
        console::error_1(&format!("fetch_manifest: Invalid manifest: {}", e).into());
        e.to_string()
    })
}
