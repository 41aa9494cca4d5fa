//! Capability façade.
//!
//! Every operation branches once on the runtime mode. Standalone calls run synchronously against
//! the local store and announce storage changes to sibling contexts; delegated calls send a
//! correlated envelope and leave the work to the host peer.

use std::{cell::RefCell, rc::Rc};

use serde_json::{json, Value};

use crate::{
    broadcast::{decode_change_record, encode_change_record},
    channel::OutboundChannel,
    config::BridgeConfig,
    envelope::actions,
    local_store::{LocalStore, Snapshot},
    mode::RuntimeMode,
    notify::{Subscription, UpdateHub},
    platform::{PlatformInfo, StandaloneUser},
    scheduler::Scheduler,
    store::KeyValueStore,
    time::{Clock, SystemClock},
    transport::{Fallback, InboundOutcome, ResponseHandler, Transport},
};

/// Receives a storage value; `None` means no value.
pub type ValueCallback = Box<dyn FnOnce(Option<Value>)>;
/// Receives an info capability result.
pub type InfoCallback = Box<dyn FnOnce(Value)>;
/// Signals completion of a mutating operation.
pub type Completion = Box<dyn FnOnce()>;

/// Environment-specific collaborators selected at startup.
pub struct BridgeParts {
    /// Detected runtime mode.
    pub mode: RuntimeMode,
    /// Outbound strategy matching `mode`.
    pub channel: Rc<dyn OutboundChannel>,
    /// Timer source for fallbacks.
    pub scheduler: Rc<dyn Scheduler>,
    /// Persistent key-value store shared with sibling contexts.
    pub store: Rc<dyn KeyValueStore>,
    /// Page facilities for standalone info capabilities.
    pub platform: Rc<dyn PlatformInfo>,
}

/// Single per-page bridge context owning the transport, the local store and the listeners.
pub struct Bridge {
    config: BridgeConfig,
    transport: Transport,
    local: LocalStore,
    updates: UpdateHub,
    platform: Rc<dyn PlatformInfo>,
    clock: Rc<dyn Clock>,
}

fn first_arg(args: Vec<Value>) -> Value {
    args.into_iter().next().unwrap_or(Value::Null)
}

/// Splits a one-shot callback between a response handler and a fallback; whichever runs first
/// takes it.
fn shared_once<T: 'static>(
    callback: Box<dyn FnOnce(T)>,
) -> (Rc<RefCell<Option<Box<dyn FnOnce(T)>>>>, Rc<RefCell<Option<Box<dyn FnOnce(T)>>>>) {
    let slot = Rc::new(RefCell::new(Some(callback)));
    (slot.clone(), slot)
}

impl Bridge {
    /// Assembles the bridge from its environment-specific parts.
    pub fn new(config: BridgeConfig, parts: BridgeParts) -> Self {
        let updates = UpdateHub::default();
        let transport = Transport::new(
            parts.mode,
            &config,
            parts.channel,
            parts.scheduler,
            updates.clone(),
        );
        tracing::debug!(mode = parts.mode.as_str(), "bridge ready");
        Self {
            config,
            transport,
            local: LocalStore::new(parts.store),
            updates,
            platform: parts.platform,
            clock: Rc::new(SystemClock),
        }
    }

    /// Replaces the wall clock used for change records and standalone user ids.
    pub fn with_clock(mut self, clock: Rc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The runtime mode fixed at startup.
    pub fn mode(&self) -> RuntimeMode {
        self.transport.mode()
    }

    /// Active configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Underlying transport, for raw sends and async requests.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Number of delegated requests still waiting.
    pub fn pending_count(&self) -> usize {
        self.transport.pending_count()
    }

    /// Registers a `storageUpdated` listener.
    pub fn on_storage_updated(&self, listener: impl Fn(&Snapshot) + 'static) -> Subscription {
        self.updates.subscribe(listener)
    }

    /// Removes a `storageUpdated` listener.
    pub fn off_storage_updated(&self, subscription: Subscription) -> bool {
        self.updates.unsubscribe(subscription)
    }

    /// Local notification hub shared with the transport.
    pub fn updates(&self) -> &UpdateHub {
        &self.updates
    }

    /// Entry point for inbound message text.
    pub fn receive(&self, raw: &str) -> InboundOutcome {
        self.transport.receive(raw)
    }

    /// Entry point for inbound structured messages.
    pub fn receive_value(&self, value: Value) -> InboundOutcome {
        self.transport.receive_value(value)
    }

    /// Entry point for storage changes made by sibling contexts. Returns whether the change was
    /// a cross-tab signal and was republished locally.
    pub fn handle_storage_change(&self, key: &str, new_value: Option<&str>) -> bool {
        let Some(snapshot) = decode_change_record(&self.config.broadcast_key, key, new_value)
        else {
            return false;
        };
        self.updates.publish(&snapshot);
        true
    }

    /// Reads one key, or the whole namespace when `key` is `None`.
    ///
    /// Standalone: answers synchronously, both through `callback` and the return value.
    /// Delegated: sends `storage.get`, returns `None`, and `callback` runs when the peer answers
    /// (never, if it stays silent).
    pub fn get(
        &self,
        key: Option<&str>,
        callback: ValueCallback,
        storage_key: Option<&str>,
    ) -> Option<Value> {
        let storage_key = self.config.storage_key(storage_key);
        if self.mode().is_delegated() {
            let handler: ResponseHandler =
                Box::new(move |args: Vec<Value>| callback(args.into_iter().next()));
            self.transport.send(
                actions::STORAGE_GET,
                json!({ "key": key, "storageKey": storage_key }),
                Some(handler),
                None,
            );
            return None;
        }

        let value = self.read_local(key, storage_key);
        callback(value.clone());
        value
    }

    /// Like [`Bridge::get`], but answers `default` when the value is missing or the peer stays
    /// silent for the response timeout.
    pub fn get_or(
        &self,
        key: Option<&str>,
        default: Value,
        callback: ValueCallback,
        storage_key: Option<&str>,
    ) -> Option<Value> {
        let storage_key = self.config.storage_key(storage_key);
        if self.mode().is_delegated() {
            let (on_response, on_timeout) = shared_once(callback);
            let handler: ResponseHandler = {
                let default = default.clone();
                Box::new(move |args: Vec<Value>| {
                    let value = match first_arg(args) {
                        Value::Null => default,
                        value => value,
                    };
                    if let Some(callback) = on_response.borrow_mut().take() {
                        callback(Some(value));
                    }
                })
            };
            let fallback: Fallback = Box::new(move || {
                if let Some(callback) = on_timeout.borrow_mut().take() {
                    callback(Some(default));
                }
            });
            self.transport.send(
                actions::STORAGE_GET,
                json!({ "key": key, "storageKey": storage_key }),
                Some(handler),
                Some(fallback),
            );
            return None;
        }

        let value = self.read_local(key, storage_key).unwrap_or(default);
        callback(Some(value.clone()));
        Some(value)
    }

    /// Merges `changeset` into the namespace; existing keys not named in it are preserved.
    pub fn set(&self, changeset: Snapshot, callback: Option<Completion>, storage_key: Option<&str>) {
        let storage_key = self.config.storage_key(storage_key);
        if self.mode().is_delegated() {
            self.delegate(
                actions::STORAGE_SET,
                json!({ "changeset": changeset, "storageKey": storage_key }),
                callback,
            );
            return;
        }

        let mut mapping = self.local.read_mapping(storage_key);
        mapping.extend(changeset);
        self.commit(storage_key, &mapping);
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Deletes one key. Removing a missing key succeeds.
    pub fn remove(&self, key: &str, callback: Option<Completion>, storage_key: Option<&str>) {
        let storage_key = self.config.storage_key(storage_key);
        if self.mode().is_delegated() {
            self.delegate(
                actions::STORAGE_REMOVE,
                json!({ "key": key, "storageKey": storage_key }),
                callback,
            );
            return;
        }

        let mut mapping = self.local.read_mapping(storage_key);
        mapping.remove(key);
        self.commit(storage_key, &mapping);
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Empties the namespace.
    pub fn clear(&self, callback: Option<Completion>, storage_key: Option<&str>) {
        let storage_key = self.config.storage_key(storage_key);
        if self.mode().is_delegated() {
            self.delegate(
                actions::STORAGE_CLEAR,
                json!({ "storageKey": storage_key }),
                callback,
            );
            return;
        }

        self.commit(storage_key, &Snapshot::new());
        if let Some(callback) = callback {
            callback();
        }
    }

    /// Writes a timestamped change record to the cross-tab signal slot.
    ///
    /// Other contexts on the same origin observe the write; this context does not.
    pub fn broadcast_update(&self, snapshot: &Snapshot) {
        let slot = self.config.broadcast_key.as_str();
        let current = self.local.raw().get_item(slot).unwrap_or_else(|err| {
            tracing::warn!("cross-tab slot unreadable: {err}");
            None
        });
        let raw = match encode_change_record(snapshot, current.as_deref(), self.clock.now_ms()) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!("change record encoding failed: {err}");
                return;
            }
        };
        if let Err(err) = self.local.raw().set_item(slot, &raw) {
            tracing::warn!("cross-tab broadcast failed: {err}");
        }
    }

    /// `user.get`. Standalone answers a persisted guest record, created on first use.
    pub fn user(&self, callback: InfoCallback) {
        if self.mode().is_delegated() {
            self.request_info(actions::USER_GET, json!({}), callback);
            return;
        }

        let record = match self.local.load_typed::<Value>(&self.config.user_key) {
            Some(record) => record,
            None => {
                let user = StandaloneUser::guest(self.clock.now_ms());
                if let Err(err) = self.local.save_typed(&self.config.user_key, &user) {
                    tracing::warn!("standalone user record not persisted: {err}");
                }
                json!(user)
            }
        };
        callback(record);
    }

    /// `device.get`.
    pub fn device(&self, callback: InfoCallback) {
        if self.mode().is_delegated() {
            self.request_info(actions::DEVICE_GET, json!({}), callback);
            return;
        }
        callback(json!(self.platform.device()));
    }

    /// `language.get`. Standalone answers the stored preference or the environment language.
    pub fn language(&self, callback: InfoCallback) {
        if self.mode().is_delegated() {
            self.request_info(actions::LANGUAGE_GET, json!({}), callback);
            return;
        }
        let language = self
            .local
            .load_typed::<String>(&self.config.language_key)
            .unwrap_or_else(|| self.platform.default_language());
        callback(Value::String(language));
    }

    /// `language.set`.
    pub fn set_language(&self, language: &str, callback: Option<Completion>) {
        if self.mode().is_delegated() {
            self.delegate(
                actions::LANGUAGE_SET,
                json!({ "language": language }),
                callback,
            );
            return;
        }
        if let Err(err) = self.local.save_typed(&self.config.language_key, language) {
            tracing::warn!("language preference not persisted: {err}");
        }
        if let Some(callback) = callback {
            callback();
        }
    }

    /// `location.get`.
    pub fn location(&self, callback: InfoCallback) {
        if self.mode().is_delegated() {
            self.request_info(actions::LOCATION_GET, json!({}), callback);
            return;
        }
        callback(Value::String(self.platform.location()));
    }

    /// `location.set`.
    pub fn set_location(&self, url: &str, callback: Option<Completion>) {
        if self.mode().is_delegated() {
            self.delegate(actions::LOCATION_SET, json!({ "url": url }), callback);
            return;
        }
        self.run_local(actions::LOCATION_SET, self.platform.navigate(url), callback);
    }

    /// `location.back`.
    pub fn back(&self, callback: Option<Completion>) {
        if self.mode().is_delegated() {
            self.delegate(actions::LOCATION_BACK, json!({}), callback);
            return;
        }
        self.run_local(actions::LOCATION_BACK, self.platform.back(), callback);
    }

    /// `location.close`.
    pub fn close(&self, callback: Option<Completion>) {
        if self.mode().is_delegated() {
            self.delegate(actions::LOCATION_CLOSE, json!({}), callback);
            return;
        }
        self.run_local(actions::LOCATION_CLOSE, self.platform.close(), callback);
    }

    fn read_local(&self, key: Option<&str>, storage_key: &str) -> Option<Value> {
        let mut mapping = self.local.read_mapping(storage_key);
        match key {
            None => Some(Value::Object(mapping)),
            Some(key) => mapping.remove(key),
        }
    }

    fn commit(&self, storage_key: &str, mapping: &Snapshot) {
        match self.local.write_mapping(storage_key, mapping) {
            Ok(()) => self.broadcast_update(mapping),
            Err(err) => tracing::warn!(storage_key, "local storage write failed: {err}"),
        }
    }

    fn delegate(&self, action: &str, data: Value, callback: Option<Completion>) {
        let handler = callback
            .map(|callback| -> ResponseHandler { Box::new(move |_: Vec<Value>| callback()) });
        self.transport.send(action, data, handler, None);
    }

    fn request_info(&self, action: &str, data: Value, callback: InfoCallback) {
        let handler: ResponseHandler =
            Box::new(move |args: Vec<Value>| callback(first_arg(args)));
        self.transport.send(action, data, Some(handler), None);
    }

    fn run_local(&self, action: &str, result: Result<(), String>, callback: Option<Completion>) {
        if let Err(err) = result {
            tracing::warn!(action, "standalone emulation failed: {err}");
        }
        if let Some(callback) = callback {
            callback();
        }
    }
}
