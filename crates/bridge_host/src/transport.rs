//! Request/response correlation over a one-way channel.
//!
//! Outbound requests that expect an answer get a fresh [`CallbackId`] and an entry in the pending
//! table. The entry leaves the table exactly once: either a matching `callback` envelope removes
//! it and runs the handler, or the fallback timer removes it and runs the fallback. Whoever
//! removes the entry wins; the other side finds nothing and does nothing.

use std::{
    cell::RefCell,
    collections::HashMap,
    future::Future,
    rc::{Rc, Weak},
    time::Duration,
};

use futures::channel::oneshot;
use serde_json::Value;

use crate::{
    channel::OutboundChannel,
    config::BridgeConfig,
    envelope::{decode_inbound, decode_inbound_value, CallbackId, Envelope, Inbound},
    error::BridgeError,
    mode::RuntimeMode,
    notify::UpdateHub,
    scheduler::{ScheduledTask, Scheduler},
};

/// Handler receiving the positional `args` of a correlated response.
pub type ResponseHandler = Box<dyn FnOnce(Vec<Value>)>;
/// Action run instead of the handler when the peer stays silent.
pub type Fallback = Box<dyn FnOnce()>;

struct PendingCallback {
    action: String,
    handler: ResponseHandler,
    timeout: Option<ScheduledTask>,
}

#[derive(Default)]
struct PendingTable {
    last_id: u64,
    entries: HashMap<CallbackId, PendingCallback>,
}

impl PendingTable {
    fn allocate(&mut self) -> CallbackId {
        self.last_id += 1;
        CallbackId(self.last_id)
    }
}

/// What the transport did with one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundOutcome {
    /// A pending handler ran.
    Resolved(CallbackId),
    /// The callback id was unknown or already consumed.
    Stale(CallbackId),
    /// A storage snapshot was forwarded to local listeners.
    Broadcast,
    /// A well-formed envelope with an action this layer does not handle.
    Ignored(String),
    /// Malformed input.
    Discarded,
}

/// Correlating transport bound to one outbound channel.
pub struct Transport {
    mode: RuntimeMode,
    version: String,
    timeout: Duration,
    channel: Rc<dyn OutboundChannel>,
    scheduler: Rc<dyn Scheduler>,
    pending: Rc<RefCell<PendingTable>>,
    updates: UpdateHub,
}

impl Transport {
    /// Creates a transport. `mode` is the already-detected runtime mode and `channel` the
    /// outbound strategy selected for it.
    pub fn new(
        mode: RuntimeMode,
        config: &BridgeConfig,
        channel: Rc<dyn OutboundChannel>,
        scheduler: Rc<dyn Scheduler>,
        updates: UpdateHub,
    ) -> Self {
        Self {
            mode,
            version: config.protocol_version.clone(),
            timeout: config.response_timeout(),
            channel,
            scheduler,
            pending: Rc::new(RefCell::new(PendingTable::default())),
            updates,
        }
    }

    /// The runtime mode this transport was built for.
    pub fn mode(&self) -> RuntimeMode {
        self.mode
    }

    /// Number of requests still waiting for a response or a timeout.
    pub fn pending_count(&self) -> usize {
        self.pending.borrow().entries.len()
    }

    /// Sends one envelope.
    ///
    /// With a `callback`, the envelope carries a fresh callback id and the handler waits in the
    /// pending table. With a `fallback` as well, a one-shot timer runs the fallback instead if no
    /// response arrives within the configured timeout. A `fallback` without a `callback` is
    /// ignored. Delivery failures are logged and otherwise swallowed.
    pub fn send(
        &self,
        action: &str,
        data: Value,
        callback: Option<ResponseHandler>,
        fallback: Option<Fallback>,
    ) {
        let mut envelope = Envelope::new(action, self.version.as_str(), data);
        if let Some(handler) = callback {
            let callback_id = self.pending.borrow_mut().allocate();
            envelope.callback_id = Some(callback_id);
            let timeout = fallback.map(|fallback| self.schedule_fallback(callback_id, fallback));
            self.pending.borrow_mut().entries.insert(
                callback_id,
                PendingCallback {
                    action: action.to_string(),
                    handler,
                    timeout,
                },
            );
        }
        tracing::debug!(
            action,
            mode = self.mode.as_str(),
            callback_id = envelope.callback_id.map(|id| id.0),
            "sending envelope"
        );
        if let Err(err) = self.channel.send(&envelope).map_err(BridgeError::Channel) {
            tracing::warn!(action, "{err}");
        }
    }

    /// Sends a request and resolves with the peer's `args`.
    ///
    /// The request is dispatched immediately; the returned future only waits. It yields
    /// [`BridgeError::TimedOut`] when the fallback timer wins and [`BridgeError::Dropped`] when
    /// the transport is dropped first.
    pub fn request(
        &self,
        action: &str,
        data: Value,
    ) -> impl Future<Output = Result<Vec<Value>, BridgeError>> {
        let (tx, rx) = oneshot::channel::<Result<Vec<Value>, BridgeError>>();
        let tx = Rc::new(RefCell::new(Some(tx)));

        let on_response: ResponseHandler = {
            let tx = tx.clone();
            Box::new(move |args| {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(Ok(args));
                }
            })
        };
        let on_timeout: Fallback = {
            let action = action.to_string();
            Box::new(move || {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(Err(BridgeError::TimedOut { action }));
                }
            })
        };
        self.send(action, data, Some(on_response), Some(on_timeout));

        let action = action.to_string();
        async move {
            rx.await
                .unwrap_or_else(|_| Err(BridgeError::Dropped { action }))
        }
    }

    /// Handles raw inbound text from the host peer or a sibling context. Never fails.
    pub fn receive(&self, raw: &str) -> InboundOutcome {
        match decode_inbound(raw) {
            Some(inbound) => self.dispatch(inbound),
            None => {
                tracing::trace!("discarding malformed inbound message");
                InboundOutcome::Discarded
            }
        }
    }

    /// Handles an inbound message that arrived as structured data.
    pub fn receive_value(&self, value: Value) -> InboundOutcome {
        match decode_inbound_value(value) {
            Some(inbound) => self.dispatch(inbound),
            None => {
                tracing::trace!("discarding malformed inbound message");
                InboundOutcome::Discarded
            }
        }
    }

    fn dispatch(&self, inbound: Inbound) -> InboundOutcome {
        match inbound {
            Inbound::Callback { callback_id, args } => {
                let entry = self.pending.borrow_mut().entries.remove(&callback_id);
                let Some(PendingCallback {
                    action,
                    handler,
                    timeout,
                }) = entry
                else {
                    tracing::trace!(callback_id = callback_id.0, "ignoring stale callback");
                    return InboundOutcome::Stale(callback_id);
                };
                drop(timeout);
                tracing::debug!(
                    callback_id = callback_id.0,
                    action = action.as_str(),
                    "response received"
                );
                handler(args);
                InboundOutcome::Resolved(callback_id)
            }
            Inbound::StorageUpdated { snapshot } => {
                self.updates.publish(&snapshot);
                InboundOutcome::Broadcast
            }
            Inbound::Other { action } => InboundOutcome::Ignored(action),
        }
    }

    fn schedule_fallback(&self, callback_id: CallbackId, fallback: Fallback) -> ScheduledTask {
        let pending: Weak<RefCell<PendingTable>> = Rc::downgrade(&self.pending);
        self.scheduler.schedule_once(
            self.timeout,
            Box::new(move || {
                let Some(pending) = pending.upgrade() else {
                    return;
                };
                let entry = pending.borrow_mut().entries.remove(&callback_id);
                if let Some(entry) = entry {
                    tracing::debug!(
                        callback_id = callback_id.0,
                        action = entry.action.as_str(),
                        "no response before timeout; running fallback"
                    );
                    drop(entry);
                    fallback();
                }
            }),
        )
    }
}
