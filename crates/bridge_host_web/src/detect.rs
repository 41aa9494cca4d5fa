//! Browser environment probe and the per-page runtime mode.

use bridge_host::{EnvironmentProbe, ParentProbe, RuntimeMode, RuntimeModeCell};
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{JsCast, JsValue};

/// Global under which native WebView hosts inject their bridge object.
pub const NATIVE_BRIDGE_GLOBAL: &str = "ReactNativeWebView";

thread_local! {
    static RUNTIME_MODE: RuntimeModeCell = const { RuntimeModeCell::new() };
}

#[derive(Debug, Clone, Copy, Default)]
/// Probe over `window`: the injected native bridge object and the parent frame.
pub struct WebEnvironmentProbe;

#[cfg(target_arch = "wasm32")]
pub(crate) fn native_bridge_object(window: &web_sys::Window) -> Option<js_sys::Object> {
    let bridge = js_sys::Reflect::get(window, &JsValue::from_str(NATIVE_BRIDGE_GLOBAL)).ok()?;
    let post = js_sys::Reflect::get(&bridge, &JsValue::from_str("postMessage")).ok()?;
    if !post.is_function() {
        return None;
    }
    bridge.dyn_into::<js_sys::Object>().ok()
}

impl EnvironmentProbe for WebEnvironmentProbe {
    fn has_native_bridge(&self) -> bool {
        #[cfg(target_arch = "wasm32")]
        {
            web_sys::window()
                .as_ref()
                .and_then(native_bridge_object)
                .is_some()
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            false
        }
    }

    fn probe_parent(&self) -> ParentProbe {
        #[cfg(target_arch = "wasm32")]
        {
            let Some(window) = web_sys::window() else {
                return ParentProbe::Absent;
            };
            match window.parent() {
                // Touching a cross-origin parent throws; that still proves there is one.
                Err(_) => ParentProbe::Isolated,
                Ok(None) => ParentProbe::Absent,
                Ok(Some(parent)) => {
                    let own: &JsValue = window.as_ref();
                    let parent: &JsValue = parent.as_ref();
                    if js_sys::Object::is(own, parent) {
                        ParentProbe::Absent
                    } else {
                        ParentProbe::Distinct
                    }
                }
            }
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            ParentProbe::Absent
        }
    }
}

/// Returns whether detection is skipped at compile time.
pub const fn standalone_forced() -> bool {
    cfg!(feature = "force-standalone")
}

/// Returns the page's runtime mode, detecting it on first call.
pub fn runtime_mode() -> RuntimeMode {
    if standalone_forced() {
        return RuntimeMode::Standalone;
    }
    RUNTIME_MODE.with(|cell| cell.get_or_detect(&WebEnvironmentProbe))
}
