//! Outbound channel strategy.
//!
//! The runtime detector picks one implementation per page context; the transport never branches
//! on the environment itself.

use std::{cell::RefCell, rc::Rc};

use crate::envelope::Envelope;

/// One-way delivery of envelopes to the host peer.
pub trait OutboundChannel {
    /// Dispatches one envelope. Delivery is fire-and-forget; an `Ok` does not imply receipt.
    ///
    /// # Errors
    ///
    /// Returns an error when the channel rejects the envelope outright.
    fn send(&self, envelope: &Envelope) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, Default)]
/// Channel for contexts without a peer. Envelopes are dropped.
pub struct NullChannel;

impl OutboundChannel for NullChannel {
    fn send(&self, envelope: &Envelope) -> Result<(), String> {
        tracing::trace!(action = %envelope.action, "no peer; envelope dropped");
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
/// In-memory channel that keeps every envelope it is handed.
pub struct RecordingChannel {
    sent: Rc<RefCell<Vec<Envelope>>>,
}

impl RecordingChannel {
    /// Returns every envelope sent so far, oldest first.
    pub fn sent(&self) -> Vec<Envelope> {
        self.sent.borrow().clone()
    }

    /// Returns the most recently sent envelope.
    pub fn last(&self) -> Option<Envelope> {
        self.sent.borrow().last().cloned()
    }

    /// Removes and returns every recorded envelope.
    pub fn drain(&self) -> Vec<Envelope> {
        std::mem::take(&mut *self.sent.borrow_mut())
    }
}

impl OutboundChannel for RecordingChannel {
    fn send(&self, envelope: &Envelope) -> Result<(), String> {
        self.sent.borrow_mut().push(envelope.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn recording_channel_keeps_order_and_drains() {
        let channel = RecordingChannel::default();
        let channel_obj: &dyn OutboundChannel = &channel;

        channel_obj
            .send(&Envelope::new("a", "1.0", json!({})))
            .expect("send a");
        channel_obj
            .send(&Envelope::new("b", "1.0", json!({})))
            .expect("send b");

        assert_eq!(channel.last().map(|e| e.action), Some("b".to_string()));
        let drained: Vec<_> = channel.drain().into_iter().map(|e| e.action).collect();
        assert_eq!(drained, vec!["a".to_string(), "b".to_string()]);
        assert!(channel.sent().is_empty());
    }

    #[test]
    fn null_channel_accepts_everything() {
        NullChannel
            .send(&Envelope::new("storage.get", "1.0", json!(null)))
            .expect("null channel never fails");
    }
}
