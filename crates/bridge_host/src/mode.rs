//! Runtime-mode detection.
//!
//! The environment is classified once per page context. A host-injected native bridge object is
//! the strongest signal; a distinct parent context comes next, and a parent that cannot be
//! inspected because of cross-origin isolation still counts as a parent.

use std::cell::OnceCell;

/// Execution environment of the embedded page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeMode {
    /// A native WebView host injected a bridge object into the page.
    HostBridge,
    /// The page runs inside a parent frame reachable through cross-context messaging.
    HostFrame,
    /// No host peer; capabilities are emulated locally.
    Standalone,
}

impl RuntimeMode {
    /// Returns a stable string token for diagnostics.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HostBridge => "host-bridge",
            Self::HostFrame => "host-frame",
            Self::Standalone => "standalone",
        }
    }

    /// Returns whether operations are forwarded to a host peer.
    pub const fn is_delegated(self) -> bool {
        !matches!(self, Self::Standalone)
    }
}

impl std::fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of probing for a parent execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentProbe {
    /// The context is top-level.
    Absent,
    /// A distinct parent context was found.
    Distinct,
    /// Probing the parent raised an isolation error, which proves a parent exists.
    Isolated,
}

/// Ambient environment queried by [`detect`].
pub trait EnvironmentProbe {
    /// Returns whether a host-injected native bridge object is present.
    fn has_native_bridge(&self) -> bool;

    /// Probes for a distinct parent context.
    fn probe_parent(&self) -> ParentProbe;
}

/// Classifies the environment; first match wins.
pub fn detect<P: EnvironmentProbe + ?Sized>(probe: &P) -> RuntimeMode {
    if probe.has_native_bridge() {
        return RuntimeMode::HostBridge;
    }
    match probe.probe_parent() {
        ParentProbe::Distinct | ParentProbe::Isolated => RuntimeMode::HostFrame,
        ParentProbe::Absent => RuntimeMode::Standalone,
    }
}

/// Write-once holder for the detected mode.
#[derive(Debug, Default)]
pub struct RuntimeModeCell {
    cell: OnceCell<RuntimeMode>,
}

impl RuntimeModeCell {
    /// Creates an empty cell.
    pub const fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Returns the cached mode, running detection on first use only.
    pub fn get_or_detect<P: EnvironmentProbe + ?Sized>(&self, probe: &P) -> RuntimeMode {
        *self.cell.get_or_init(|| {
            let mode = detect(probe);
            tracing::debug!(mode = mode.as_str(), "runtime mode detected");
            mode
        })
    }

    /// Returns the cached mode if detection already ran.
    pub fn get(&self) -> Option<RuntimeMode> {
        self.cell.get().copied()
    }
}

/// Fixed environment description for simulations and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticProbe {
    /// Whether the native bridge object is present.
    pub native_bridge: bool,
    /// Parent probe result.
    pub parent: ParentProbe,
}

impl StaticProbe {
    /// Top-level page with no host.
    pub const fn standalone() -> Self {
        Self {
            native_bridge: false,
            parent: ParentProbe::Absent,
        }
    }
}

impl EnvironmentProbe for StaticProbe {
    fn has_native_bridge(&self) -> bool {
        self.native_bridge
    }

    fn probe_parent(&self) -> ParentProbe {
        self.parent
    }
}
