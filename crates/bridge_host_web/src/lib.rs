//! Browser (`wasm32`) implementations of the [`bridge_host`] contracts.
//!
//! Non-wasm builds compile against parity shims: detection reports a top-level page, storage
//! keeps nothing, timers never fire and host channels report a missing peer.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod channel;
pub mod detect;
pub mod install;
pub mod platform;
pub mod storage;
pub mod timer;

pub use channel::{
    outbound_channel, NativeBridgeChannel, OutboundChannelAdapter, ParentFrameChannel,
    PARENT_TARGET_ORIGIN,
};
pub use detect::{runtime_mode, standalone_forced, WebEnvironmentProbe, NATIVE_BRIDGE_GLOBAL};
pub use install::{bridge_parts, install, installed, STORAGE_UPDATED_EVENT};
pub use platform::{WebPlatform, FALLBACK_LANGUAGE};
pub use storage::WebLocalStorage;
pub use timer::WindowScheduler;
