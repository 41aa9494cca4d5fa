//! WebAssembly entry point exposing the page bridge to JavaScript.
//!
//! ```js
//! import init, { EmbedBridge } from "./bridge_site.js";
//! await init();
//! const bridge = new EmbedBridge({ responseTimeoutMs: 800 });
//! bridge.set({ level: 3 }, () => console.log("saved"));
//! window.addEventListener("storageUpdated", (e) => console.log(e.detail));
//! ```

mod convert;
mod embed;

pub use embed::EmbedBridge;

/// Installs the panic hook and the console `tracing` subscriber.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();
    tracing::debug!(mode = %bridge_host_web::runtime_mode(), "bridge module loaded");
}
