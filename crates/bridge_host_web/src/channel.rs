//! Outbound channels for the browser.

use bridge_host::{Envelope, NullChannel, OutboundChannel, RuntimeMode};
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{JsCast, JsValue};

/// Target origin used for parent-frame messages.
pub const PARENT_TARGET_ORIGIN: &str = "*";

#[derive(Debug, Clone, Copy, Default)]
/// Calls `postMessage` on the host-injected native bridge object.
pub struct NativeBridgeChannel;

impl OutboundChannel for NativeBridgeChannel {
    fn send(&self, envelope: &Envelope) -> Result<(), String> {
        let text = envelope.encode().map_err(|e| e.to_string())?;

        #[cfg(target_arch = "wasm32")]
        {
            let window = web_sys::window().ok_or_else(|| "window unavailable".to_string())?;
            let bridge = crate::detect::native_bridge_object(&window)
                .ok_or_else(|| "native bridge object unavailable".to_string())?;
            let post = js_sys::Reflect::get(&bridge, &JsValue::from_str("postMessage"))
                .map_err(|e| format!("native bridge lookup failed: {e:?}"))?
                .dyn_into::<js_sys::Function>()
                .map_err(|_| "native bridge postMessage is not callable".to_string())?;
            post.call1(&bridge, &JsValue::from_str(&text))
                .map_err(|e| format!("native bridge postMessage failed: {e:?}"))?;
            Ok(())
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = text;
            Err("native bridge unavailable outside the browser".to_string())
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
/// Posts envelopes to the parent frame with a wildcard target origin.
pub struct ParentFrameChannel;

impl OutboundChannel for ParentFrameChannel {
    fn send(&self, envelope: &Envelope) -> Result<(), String> {
        let text = envelope.encode().map_err(|e| e.to_string())?;

        #[cfg(target_arch = "wasm32")]
        {
            let window = web_sys::window().ok_or_else(|| "window unavailable".to_string())?;
            let parent = window
                .parent()
                .map_err(|e| format!("parent frame unavailable: {e:?}"))?
                .ok_or_else(|| "parent frame unavailable".to_string())?;
            parent
                .post_message(&JsValue::from_str(&text), PARENT_TARGET_ORIGIN)
                .map_err(|e| format!("parent postMessage failed: {e:?}"))
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = text;
            Err("parent frame unavailable outside the browser".to_string())
        }
    }
}

/// Adapter enum that erases the concrete outbound strategy behind [`OutboundChannel`].
#[derive(Debug, Clone, Copy)]
pub enum OutboundChannelAdapter {
    /// Native WebView host.
    NativeBridge(NativeBridgeChannel),
    /// Parent frame.
    ParentFrame(ParentFrameChannel),
    /// No peer.
    Null(NullChannel),
}

impl OutboundChannel for OutboundChannelAdapter {
    fn send(&self, envelope: &Envelope) -> Result<(), String> {
        match self {
            Self::NativeBridge(channel) => channel.send(envelope),
            Self::ParentFrame(channel) => channel.send(envelope),
            Self::Null(channel) => channel.send(envelope),
        }
    }
}

/// Builds the outbound channel for `mode`.
pub fn outbound_channel(mode: RuntimeMode) -> OutboundChannelAdapter {
    match mode {
        RuntimeMode::HostBridge => OutboundChannelAdapter::NativeBridge(NativeBridgeChannel),
        RuntimeMode::HostFrame => OutboundChannelAdapter::ParentFrame(ParentFrameChannel),
        RuntimeMode::Standalone => OutboundChannelAdapter::Null(NullChannel),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn each_mode_gets_its_own_strategy() {
        assert!(matches!(
            outbound_channel(RuntimeMode::HostBridge),
            OutboundChannelAdapter::NativeBridge(_)
        ));
        assert!(matches!(
            outbound_channel(RuntimeMode::HostFrame),
            OutboundChannelAdapter::ParentFrame(_)
        ));
        assert!(matches!(
            outbound_channel(RuntimeMode::Standalone),
            OutboundChannelAdapter::Null(_)
        ));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn host_channels_report_missing_peer_natively() {
        let envelope = Envelope::new("storage.get", "1.0", json!({}));
        assert!(outbound_channel(RuntimeMode::HostFrame)
            .send(&envelope)
            .is_err());
        assert!(outbound_channel(RuntimeMode::Standalone)
            .send(&envelope)
            .is_ok());
    }
}
