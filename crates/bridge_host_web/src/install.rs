//! Page-level bridge installation and browser event wiring.
//!
//! One bridge exists per page. Installing it registers `receive` for the window `message` event
//! and the duplicate `message` event some native WebView hosts fire on `document`, subscribes to
//! window `storage` events for cross-tab signals, and re-dispatches every local snapshot
//! notification as a `storageUpdated` DOM event on `window`.

use std::{cell::OnceCell, rc::Rc};

use bridge_host::{Bridge, BridgeConfig, BridgeParts};
#[cfg(target_arch = "wasm32")]
use bridge_host::{InboundOutcome, Snapshot};
#[cfg(target_arch = "wasm32")]
use serde::Serialize;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

use crate::{
    channel::outbound_channel, detect::runtime_mode, platform::WebPlatform,
    storage::WebLocalStorage, timer::WindowScheduler,
};

/// DOM event dispatched on `window` for each storage snapshot notification.
pub const STORAGE_UPDATED_EVENT: &str = "storageUpdated";

thread_local! {
    static INSTALLED: OnceCell<Rc<Bridge>> = const { OnceCell::new() };
}

/// Browser collaborators for the page's runtime mode.
pub fn bridge_parts() -> BridgeParts {
    let mode = runtime_mode();
    BridgeParts {
        mode,
        channel: Rc::new(outbound_channel(mode)),
        scheduler: Rc::new(WindowScheduler),
        store: Rc::new(WebLocalStorage),
        platform: Rc::new(WebPlatform),
    }
}

/// Installs the page bridge, or returns the one already installed. `config` only applies to the
/// first call.
pub fn install(config: BridgeConfig) -> Rc<Bridge> {
    INSTALLED.with(|cell| {
        if let Some(bridge) = cell.get() {
            tracing::debug!("bridge already installed; configuration ignored");
            return bridge.clone();
        }
        let bridge = Rc::new(Bridge::new(config, bridge_parts()));
        register_listeners(&bridge);
        cell.get_or_init(|| bridge).clone()
    })
}

/// Returns the installed page bridge.
pub fn installed() -> Option<Rc<Bridge>> {
    INSTALLED.with(|cell| cell.get().cloned())
}

#[cfg(target_arch = "wasm32")]
fn route_message(bridge: &Bridge, data: JsValue) -> InboundOutcome {
    if let Some(text) = data.as_string() {
        return bridge.receive(&text);
    }
    match serde_wasm_bindgen::from_value::<serde_json::Value>(data) {
        Ok(value) => bridge.receive_value(value),
        Err(err) => {
            tracing::debug!("non-JSON message discarded: {err}");
            InboundOutcome::Discarded
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn dispatch_storage_updated(snapshot: &Snapshot) -> Result<(), String> {
    let window = web_sys::window().ok_or_else(|| "window unavailable".to_string())?;
    let detail = snapshot
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| e.to_string())?;
    let init = web_sys::CustomEventInit::new();
    init.set_detail(&detail);
    let event = web_sys::CustomEvent::new_with_event_init_dict(STORAGE_UPDATED_EVENT, &init)
        .map_err(|e| format!("failed to create {STORAGE_UPDATED_EVENT} event: {e:?}"))?;
    window
        .dispatch_event(&event)
        .map(|_| ())
        .map_err(|e| format!("failed to dispatch {STORAGE_UPDATED_EVENT}: {e:?}"))
}

#[cfg(target_arch = "wasm32")]
fn register_listeners(bridge: &Rc<Bridge>) {
    bridge.on_storage_updated(|snapshot| {
        if let Err(err) = dispatch_storage_updated(snapshot) {
            tracing::warn!("{err}");
        }
    });

    let Some(window) = web_sys::window() else {
        tracing::warn!("window unavailable; inbound listeners not registered");
        return;
    };

    let on_message = {
        let bridge = bridge.clone();
        Closure::<dyn FnMut(web_sys::MessageEvent)>::wrap(Box::new(move |event| {
            let outcome = route_message(&bridge, event.data());
            tracing::trace!(?outcome, "message handled");
        }))
    };
    let callback: &js_sys::Function = on_message.as_ref().unchecked_ref();
    if let Err(err) = window.add_event_listener_with_callback("message", callback) {
        tracing::warn!("window message listener not registered: {err:?}");
    }
    if let Some(document) = window.document() {
        if let Err(err) = document.add_event_listener_with_callback("message", callback) {
            tracing::warn!("document message listener not registered: {err:?}");
        }
    }
    on_message.forget();

    let on_storage = {
        let bridge = bridge.clone();
        Closure::<dyn FnMut(web_sys::StorageEvent)>::wrap(Box::new(move |event| {
            let Some(key) = event.key() else {
                return;
            };
            bridge.handle_storage_change(&key, event.new_value().as_deref());
        }))
    };
    if let Err(err) =
        window.add_event_listener_with_callback("storage", on_storage.as_ref().unchecked_ref())
    {
        tracing::warn!("storage listener not registered: {err:?}");
    }
    on_storage.forget();
}

#[cfg(not(target_arch = "wasm32"))]
fn register_listeners(_bridge: &Rc<Bridge>) {}
