// src/ipc/probe.rs
//
// Transport availability probe. Asks the injected provider for a channel
// handle and records the outcome in the session state. A missing transport
// is an expected condition (e.g. running outside the host process), so it
// is reported as a warning and never as an error.

use std::sync::{Arc, Mutex};

use super::{Transport, TransportProvider};
use crate::diagnostics::DiagnosticLog;
use crate::session::SessionState;

#[derive(Clone)]
pub struct TransportProbe {
    provider: Arc<dyn TransportProvider>,
    log: DiagnosticLog,
}

impl TransportProbe {
    pub fn new(provider: Arc<dyn TransportProvider>, log: DiagnosticLog) -> Self {
        Self { provider, log }
    }

    /// Look for a channel handle.
    ///
    /// Always updates `transport_available` in `state` and appends exactly
    /// one diagnostic line.
    pub fn probe(&self, state: &Mutex<SessionState>) -> Option<Arc<dyn Transport>> {
        let handle = self.provider.handle();
        let available = handle.is_some();

        if let Ok(mut state) = state.lock() {
            state.transport_available = available;
        }

        if available {
            self.log.append("checkIpcAvailability: ipcAvailable: true");
        } else {
            self.log
                .warn("checkIpcAvailability: ipcAvailable: false (no transport installed)");
        }

        handle
    }
}
