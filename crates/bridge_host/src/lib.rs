//! Target-neutral core of the embed bridge.
//!
//! Pages hosted inside an iframe or a native WebView use this crate to reach capabilities owned
//! by the embedding application (storage, user/device/language/location info). When no host is
//! present the same operations are emulated against a local key-value store, and every local
//! write is broadcast to sibling contexts sharing the storage origin.
//!
//! Browser bindings for the traits declared here live in `bridge_host_web`; the in-memory
//! adapters exported from this crate back native tests and simulations.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod bridge;
pub mod broadcast;
pub mod channel;
pub mod config;
pub mod envelope;
pub mod error;
pub mod local_store;
pub mod mode;
pub mod notify;
pub mod platform;
pub mod scheduler;
pub mod store;
pub mod time;
pub mod transport;

pub use bridge::{Bridge, BridgeParts, Completion, InfoCallback, ValueCallback};
pub use broadcast::{decode_change_record, encode_change_record, previous_stamp, ChangeRecord};
pub use channel::{NullChannel, OutboundChannel, RecordingChannel};
pub use config::{
    BridgeConfig, DEFAULT_BROADCAST_KEY, DEFAULT_LANGUAGE_KEY, DEFAULT_PROTOCOL_VERSION,
    DEFAULT_RESPONSE_TIMEOUT_MS, DEFAULT_STORAGE_KEY, DEFAULT_USER_KEY,
};
pub use envelope::{actions, decode_inbound, decode_inbound_value, CallbackId, Envelope, Inbound};
pub use error::BridgeError;
pub use local_store::{LocalStore, Snapshot};
pub use mode::{detect, EnvironmentProbe, ParentProbe, RuntimeMode, RuntimeModeCell, StaticProbe};
pub use notify::{Subscription, UpdateHub};
pub use platform::{DeviceInfo, PlatformInfo, StandaloneUser, StaticPlatform};
pub use scheduler::{ManualScheduler, ScheduledTask, Scheduler};
pub use store::{
    KeyValueStore, MemoryKeyValueStore, MemoryOrigin, MemoryStorageArea, NoopKeyValueStore,
    StorageChange,
};
pub use time::{next_change_stamp, Clock, FixedClock, SystemClock};
pub use transport::{Fallback, InboundOutcome, ResponseHandler, Transport};
