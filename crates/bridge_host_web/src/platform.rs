//! Page facilities behind the standalone info capabilities.

use bridge_host::{DeviceInfo, PlatformInfo};

/// Language reported when the environment does not expose one.
pub const FALLBACK_LANGUAGE: &str = "en";

#[derive(Debug, Clone, Copy, Default)]
/// Navigator, location and history of the current window.
pub struct WebPlatform;

#[cfg(target_arch = "wasm32")]
fn window() -> Result<web_sys::Window, String> {
    web_sys::window().ok_or_else(|| "window unavailable".to_string())
}

impl PlatformInfo for WebPlatform {
    fn device(&self) -> DeviceInfo {
        #[cfg(target_arch = "wasm32")]
        {
            if let Some(window) = web_sys::window() {
                let navigator = window.navigator();
                return DeviceInfo {
                    platform: navigator.platform().unwrap_or_default(),
                    user_agent: navigator.user_agent().unwrap_or_default(),
                    language: navigator
                        .language()
                        .unwrap_or_else(|| FALLBACK_LANGUAGE.to_string()),
                };
            }
        }

        DeviceInfo {
            platform: String::new(),
            user_agent: String::new(),
            language: FALLBACK_LANGUAGE.to_string(),
        }
    }

    fn default_language(&self) -> String {
        self.device().language
    }

    fn location(&self) -> String {
        #[cfg(target_arch = "wasm32")]
        {
            web_sys::window()
                .and_then(|w| w.location().href().ok())
                .unwrap_or_default()
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            String::new()
        }
    }

    fn navigate(&self, url: &str) -> Result<(), String> {
        #[cfg(target_arch = "wasm32")]
        {
            window()?
                .location()
                .set_href(url)
                .map_err(|e| format!("navigation failed: {e:?}"))
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = url;
            Err("navigation unavailable outside the browser".to_string())
        }
    }

    fn back(&self) -> Result<(), String> {
        #[cfg(target_arch = "wasm32")]
        {
            window()?
                .history()
                .and_then(|history| history.back())
                .map_err(|e| format!("history back failed: {e:?}"))
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            Err("history unavailable outside the browser".to_string())
        }
    }

    fn close(&self) -> Result<(), String> {
        #[cfg(target_arch = "wasm32")]
        {
            window()?
                .close()
                .map_err(|e| format!("window close failed: {e:?}"))
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            Err("window unavailable outside the browser".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn native_builds_report_fallback_language() {
        assert_eq!(WebPlatform.default_language(), FALLBACK_LANGUAGE);
        assert_eq!(WebPlatform.location(), "");
        assert!(WebPlatform.navigate("https://example.test").is_err());
    }
}
