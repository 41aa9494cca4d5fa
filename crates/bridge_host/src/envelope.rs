//! Wire envelope shared with the host peer.
//!
//! Outbound envelopes are flat JSON objects:
//! `{"action": "...", "version": "...", "data": {...}, "callbackId": 7}`.
//! Inbound traffic is parsed leniently: anything that is not a JSON object with a string
//! `action` is discarded, and the version tag is never checked against a literal.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::local_store::Snapshot;

/// Dot-namespaced action names understood by the bridge.
pub mod actions {
    /// Response correlated to a prior request.
    pub const CALLBACK: &str = "callback";
    /// Unsolicited snapshot pushed by the host.
    pub const STORAGE_UPDATED: &str = "storage.updated";

    /// Reads one key or the whole namespace.
    pub const STORAGE_GET: &str = "storage.get";
    /// Merges a changeset into a namespace.
    pub const STORAGE_SET: &str = "storage.set";
    /// Deletes one key.
    pub const STORAGE_REMOVE: &str = "storage.remove";
    /// Empties a namespace.
    pub const STORAGE_CLEAR: &str = "storage.clear";

    /// Current user record.
    pub const USER_GET: &str = "user.get";
    /// Device description.
    pub const DEVICE_GET: &str = "device.get";
    /// Active language.
    pub const LANGUAGE_GET: &str = "language.get";
    /// Changes the active language.
    pub const LANGUAGE_SET: &str = "language.set";
    /// Current location.
    pub const LOCATION_GET: &str = "location.get";
    /// Navigates to a URL.
    pub const LOCATION_SET: &str = "location.set";
    /// Navigates back.
    pub const LOCATION_BACK: &str = "location.back";
    /// Closes the embedded content.
    pub const LOCATION_CLOSE: &str = "location.close";
}

/// Correlation tag linking a request to its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallbackId(pub u64);

impl std::fmt::Display for CallbackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One outbound protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Dot-namespaced action name.
    pub action: String,
    /// Protocol version tag.
    pub version: String,
    /// Action-specific payload.
    pub data: Value,
    /// Present iff the sender expects a response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<CallbackId>,
}

impl Envelope {
    /// Builds an envelope without a correlation tag.
    pub fn new(action: impl Into<String>, version: impl Into<String>, data: Value) -> Self {
        Self {
            action: action.into(),
            version: version.into(),
            data,
            callback_id: None,
        }
    }

    /// Attaches a correlation tag.
    pub fn with_callback(mut self, callback_id: CallbackId) -> Self {
        self.callback_id = Some(callback_id);
        self
    }

    /// Encodes the envelope as the JSON text sent over the channel.
    ///
    /// # Errors
    ///
    /// Returns an error when the payload cannot be serialized.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Inbound message after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Response to a pending request.
    Callback {
        /// Correlation tag of the original request.
        callback_id: CallbackId,
        /// Positional arguments for the pending handler.
        args: Vec<Value>,
    },
    /// Host-pushed storage snapshot.
    StorageUpdated {
        /// Full resulting key-value mapping.
        snapshot: Snapshot,
    },
    /// Any other action; not handled by the transport.
    Other {
        /// The unrecognized action name.
        action: String,
    },
}

/// Parses raw inbound text. Returns `None` for anything malformed.
pub fn decode_inbound(raw: &str) -> Option<Inbound> {
    let value: Value = serde_json::from_str(raw).ok()?;
    decode_inbound_value(value)
}

/// Classifies an already-parsed inbound value.
///
/// Structured-clone delivery may hand over either an object or its JSON text, so a string value
/// is parsed once more.
pub fn decode_inbound_value(value: Value) -> Option<Inbound> {
    let mut object = match value {
        Value::Object(object) => object,
        Value::String(raw) => return decode_inbound(&raw),
        _ => return None,
    };
    let action = match object.remove("action") {
        Some(Value::String(action)) => action,
        _ => return None,
    };

    match action.as_str() {
        actions::CALLBACK => {
            let data = object.remove("data");
            let callback_id = object
                .get("callbackId")
                .or_else(|| data.as_ref().and_then(|d| d.get("callbackId")))
                .and_then(Value::as_u64)
                .filter(|id| *id > 0)
                .map(CallbackId)?;
            let args = match object
                .remove("args")
                .or_else(|| data.and_then(|mut d| d.as_object_mut()?.remove("args")))
            {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(args)) => args,
                Some(single) => vec![single],
            };
            Some(Inbound::Callback { callback_id, args })
        }
        actions::STORAGE_UPDATED => match object.remove("data") {
            Some(Value::Object(snapshot)) => Some(Inbound::StorageUpdated { snapshot }),
            _ => None,
        },
        _ => Some(Inbound::Other { action }),
    }
}
