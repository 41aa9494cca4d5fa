use bridge_host::{Completion, InfoCallback, Snapshot, ValueCallback};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use wasm_bindgen::JsValue;

pub(crate) fn to_js<T: Serialize + ?Sized>(value: &T) -> JsValue {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .unwrap_or_else(|err| {
            tracing::warn!("value not representable in JavaScript: {err}");
            JsValue::UNDEFINED
        })
}

pub(crate) fn from_js<T: DeserializeOwned>(value: JsValue) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value).map_err(JsValue::from)
}

fn require_object(value: Value) -> Result<Snapshot, String> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(format!("expected a plain object, got {other}")),
    }
}

/// A missing payload is an empty object; anything supplied is passed through.
fn payload_or_empty(value: Option<Value>) -> Value {
    value.unwrap_or_else(|| Value::Object(Snapshot::new()))
}

pub(crate) fn snapshot_from_js(value: JsValue) -> Result<Snapshot, JsValue> {
    require_object(from_js(value)?).map_err(|err| JsValue::from_str(&err))
}

/// `undefined` payloads become an empty object.
pub(crate) fn payload_from_js(value: JsValue) -> Result<Value, JsValue> {
    let value = if value.is_undefined() {
        None
    } else {
        Some(from_js(value)?)
    };
    Ok(payload_or_empty(value))
}

fn invoke(callback: &js_sys::Function, arg: &JsValue) {
    if let Err(err) = callback.call1(&JsValue::NULL, arg) {
        tracing::warn!("bridge callback threw: {err:?}");
    }
}

/// Missing values reach JavaScript as `undefined`.
pub(crate) fn value_callback(callback: js_sys::Function) -> ValueCallback {
    Box::new(move |value: Option<Value>| {
        let arg = value.as_ref().map_or(JsValue::UNDEFINED, to_js::<Value>);
        invoke(&callback, &arg);
    })
}

pub(crate) fn info_callback(callback: js_sys::Function) -> InfoCallback {
    Box::new(move |value: Value| invoke(&callback, &to_js(&value)))
}

pub(crate) fn completion(callback: Option<js_sys::Function>) -> Option<Completion> {
    callback.map(|callback| -> Completion {
        Box::new(move || invoke(&callback, &JsValue::UNDEFINED))
    })
}
