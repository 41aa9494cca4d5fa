//! Page-level facts used to emulate info capabilities in standalone mode.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use serde::{Deserialize, Serialize};

/// Device description answered for `device.get` in standalone mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Platform token reported by the page environment.
    pub platform: String,
    /// Full user-agent string.
    pub user_agent: String,
    /// Preferred language of the environment.
    pub language: String,
}

/// Emulated user record persisted for `user.get` in standalone mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandaloneUser {
    /// Locally generated identifier, stable across page loads.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Always `true`; lets pages tell emulated users from host users.
    pub standalone: bool,
}

impl StandaloneUser {
    /// Creates a fresh guest record.
    pub fn guest(timestamp_ms: u64) -> Self {
        Self {
            id: format!("local-{timestamp_ms}"),
            name: "Guest".to_string(),
            standalone: true,
        }
    }
}

/// Ambient page facilities behind the info capabilities.
pub trait PlatformInfo {
    /// Describes the device.
    fn device(&self) -> DeviceInfo;

    /// Language preferred by the environment when no preference is stored.
    fn default_language(&self) -> String;

    /// Current page URL.
    fn location(&self) -> String;

    /// Navigates to `url`.
    ///
    /// # Errors
    ///
    /// Returns an error when navigation is refused.
    fn navigate(&self, url: &str) -> Result<(), String>;

    /// Goes back one history entry.
    ///
    /// # Errors
    ///
    /// Returns an error when history is unavailable.
    fn back(&self) -> Result<(), String>;

    /// Closes the page.
    ///
    /// # Errors
    ///
    /// Returns an error when the window cannot be closed.
    fn close(&self) -> Result<(), String>;
}

#[derive(Debug)]
struct StaticState {
    history: RefCell<Vec<String>>,
    closed: Cell<bool>,
}

/// Scripted platform for simulations and tests.
#[derive(Debug, Clone)]
pub struct StaticPlatform {
    device: DeviceInfo,
    state: Rc<StaticState>,
}

impl StaticPlatform {
    /// Creates a platform positioned at `url`.
    pub fn new(device: DeviceInfo, url: impl Into<String>) -> Self {
        Self {
            device,
            state: Rc::new(StaticState {
                history: RefCell::new(vec![url.into()]),
                closed: Cell::new(false),
            }),
        }
    }

    /// Returns whether [`PlatformInfo::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.state.closed.get()
    }

    /// Visited URLs, oldest first.
    pub fn history(&self) -> Vec<String> {
        self.state.history.borrow().clone()
    }
}

impl Default for StaticPlatform {
    fn default() -> Self {
        Self::new(
            DeviceInfo {
                platform: "test".to_string(),
                user_agent: "bridge-host-test".to_string(),
                language: "en".to_string(),
            },
            "about:blank",
        )
    }
}

impl PlatformInfo for StaticPlatform {
    fn device(&self) -> DeviceInfo {
        self.device.clone()
    }

    fn default_language(&self) -> String {
        self.device.language.clone()
    }

    fn location(&self) -> String {
        self.state
            .history
            .borrow()
            .last()
            .cloned()
            .unwrap_or_default()
    }

    fn navigate(&self, url: &str) -> Result<(), String> {
        self.state.history.borrow_mut().push(url.to_string());
        Ok(())
    }

    fn back(&self) -> Result<(), String> {
        let mut history = self.state.history.borrow_mut();
        if history.len() > 1 {
            history.pop();
        }
        Ok(())
    }

    fn close(&self) -> Result<(), String> {
        self.state.closed.set(true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guest_record_serializes_with_local_prefix() {
        let user = StandaloneUser::guest(1_700_000_000_000);
        assert_eq!(
            serde_json::to_value(&user).expect("serialize"),
            serde_json::json!({"id": "local-1700000000000", "name": "Guest", "standalone": true})
        );
    }

    #[test]
    fn back_never_leaves_the_first_entry() {
        let platform = StaticPlatform::new(StaticPlatform::default().device(), "https://a.test");
        platform.navigate("https://b.test").expect("navigate");
        platform.back().expect("back");
        platform.back().expect("back");

        assert_eq!(platform.location(), "https://a.test");
        assert_eq!(platform.history(), vec!["https://a.test".to_string()]);
    }

    #[test]
    fn device_info_uses_camel_case_keys() {
        let device = StaticPlatform::default().device();
        let value = serde_json::to_value(device).expect("serialize");
        assert_eq!(value["userAgent"], "bridge-host-test");
    }
}
