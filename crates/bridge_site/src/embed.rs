use std::rc::Rc;

use bridge_host::{Bridge, BridgeConfig, Fallback, ResponseHandler};
use serde_json::Value;
use wasm_bindgen::prelude::*;

use crate::convert::{
    completion, from_js, info_callback, payload_from_js, snapshot_from_js, to_js, value_callback,
};

/// JavaScript handle to the page bridge. Every instance shares the same underlying bridge.
#[wasm_bindgen]
pub struct EmbedBridge {
    inner: Rc<Bridge>,
}

#[wasm_bindgen]
impl EmbedBridge {
    /// Installs the page bridge on first use. `config` is an optional plain object whose
    /// camelCase fields override the defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<EmbedBridge, JsValue> {
        let config = if config.is_undefined() || config.is_null() {
            BridgeConfig::default()
        } else {
            from_js(config)?
        };
        Ok(Self {
            inner: bridge_host_web::install(config),
        })
    }

    /// `"host-bridge"`, `"host-frame"` or `"standalone"`.
    pub fn mode(&self) -> String {
        self.inner.mode().as_str().to_string()
    }

    /// Requests still waiting for a response.
    #[wasm_bindgen(js_name = pendingCount)]
    pub fn pending_count(&self) -> usize {
        self.inner.pending_count()
    }

    /// Reads one key, or the whole namespace when `key` is `null`. Standalone reads also return
    /// the value directly.
    pub fn get(
        &self,
        key: Option<String>,
        callback: js_sys::Function,
        storage_key: Option<String>,
    ) -> JsValue {
        self.inner
            .get(
                key.as_deref(),
                value_callback(callback),
                storage_key.as_deref(),
            )
            .map_or(JsValue::UNDEFINED, |value| to_js(&value))
    }

    /// Reads with a default used when the value is missing or the host stays silent.
    #[wasm_bindgen(js_name = getOr)]
    pub fn get_or(
        &self,
        key: Option<String>,
        default_value: JsValue,
        callback: js_sys::Function,
        storage_key: Option<String>,
    ) -> Result<JsValue, JsValue> {
        let default = from_js::<Value>(default_value)?;
        Ok(self
            .inner
            .get_or(
                key.as_deref(),
                default,
                value_callback(callback),
                storage_key.as_deref(),
            )
            .map_or(JsValue::UNDEFINED, |value| to_js(&value)))
    }

    /// Merges a changeset into the namespace.
    pub fn set(
        &self,
        changeset: JsValue,
        callback: Option<js_sys::Function>,
        storage_key: Option<String>,
    ) -> Result<(), JsValue> {
        let changeset = snapshot_from_js(changeset)?;
        self.inner
            .set(changeset, completion(callback), storage_key.as_deref());
        Ok(())
    }

    /// Deletes one key.
    pub fn remove(
        &self,
        key: String,
        callback: Option<js_sys::Function>,
        storage_key: Option<String>,
    ) {
        self.inner
            .remove(&key, completion(callback), storage_key.as_deref());
    }

    /// Empties the namespace.
    pub fn clear(&self, callback: Option<js_sys::Function>, storage_key: Option<String>) {
        self.inner
            .clear(completion(callback), storage_key.as_deref());
    }

    /// Announces a snapshot to other tabs on the same origin.
    #[wasm_bindgen(js_name = broadcastUpdate)]
    pub fn broadcast_update(&self, snapshot: JsValue) -> Result<(), JsValue> {
        self.inner.broadcast_update(&snapshot_from_js(snapshot)?);
        Ok(())
    }

    /// Current user record.
    pub fn user(&self, callback: js_sys::Function) {
        self.inner.user(info_callback(callback));
    }

    /// Device description.
    pub fn device(&self, callback: js_sys::Function) {
        self.inner.device(info_callback(callback));
    }

    /// Active language.
    pub fn language(&self, callback: js_sys::Function) {
        self.inner.language(info_callback(callback));
    }

    /// Changes the active language.
    #[wasm_bindgen(js_name = setLanguage)]
    pub fn set_language(&self, language: String, callback: Option<js_sys::Function>) {
        self.inner.set_language(&language, completion(callback));
    }

    /// Current location.
    pub fn location(&self, callback: js_sys::Function) {
        self.inner.location(info_callback(callback));
    }

    /// Navigates to `url`.
    #[wasm_bindgen(js_name = setLocation)]
    pub fn set_location(&self, url: String, callback: Option<js_sys::Function>) {
        self.inner.set_location(&url, completion(callback));
    }

    /// Navigates back.
    pub fn back(&self, callback: Option<js_sys::Function>) {
        self.inner.back(completion(callback));
    }

    /// Closes the embedded content.
    pub fn close(&self, callback: Option<js_sys::Function>) {
        self.inner.close(completion(callback));
    }

    /// Sends a raw envelope. `callback` receives the response `args` spread as arguments;
    /// `fallback` runs instead when the host stays silent.
    pub fn send(
        &self,
        action: String,
        data: JsValue,
        callback: Option<js_sys::Function>,
        fallback: Option<js_sys::Function>,
    ) -> Result<(), JsValue> {
        let data = payload_from_js(data)?;
        let handler = callback.map(|callback| -> ResponseHandler {
            Box::new(move |args: Vec<Value>| {
                let args: js_sys::Array = args.iter().map(to_js::<Value>).collect();
                if let Err(err) = callback.apply(&JsValue::NULL, &args) {
                    tracing::warn!("bridge callback threw: {err:?}");
                }
            })
        });
        let fallback = fallback.map(|fallback| -> Fallback {
            Box::new(move || {
                if let Err(err) = fallback.call0(&JsValue::NULL) {
                    tracing::warn!("bridge fallback threw: {err:?}");
                }
            })
        });
        self.inner.transport().send(&action, data, handler, fallback);
        Ok(())
    }

    /// Sends a request and returns a promise of the response `args`. Rejects when the host stays
    /// silent for the response timeout.
    pub fn request(&self, action: String, data: JsValue) -> Result<js_sys::Promise, JsValue> {
        let data = payload_from_js(data)?;
        let response = self.inner.transport().request(&action, data);
        Ok(wasm_bindgen_futures::future_to_promise(async move {
            response
                .await
                .map(|args| to_js(&args))
                .map_err(|err| JsValue::from_str(&err.to_string()))
        }))
    }

    /// Feeds an inbound message manually, for hosts that deliver through a custom hook.
    pub fn receive(&self, message: JsValue) -> Result<(), JsValue> {
        match message.as_string() {
            Some(text) => {
                self.inner.receive(&text);
            }
            None => {
                self.inner.receive_value(from_js(message)?);
            }
        }
        Ok(())
    }
}
