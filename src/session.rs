// src/session.rs
//
// Session manager: owns the channel lifecycle.
//
//   Stopped --start()--> Starting --(handle)--> Active
//                            \--(no handle)--> Stopped
//   Active  --stop()---> Stopping ------------> Stopped
//
// start() subscribes the frame decoder to SERIAL_TO_RENDERER and sends the
// HANDSHAKE. stop() re-probes the transport and releases the held handle.
// restart() runs both under one lifecycle lock so no caller observes the
// intermediate phases.
//
// Inbound frames are decoded and handed to the registered consumer in the
// order the transport emits them. A frame already in flight when stop()
// runs may still be delivered.

use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex};

use crate::consumer::ConsumerSlot;
use crate::decoder::{FrameDecoder, Record};
use crate::diagnostics::{DiagnosticLog, LogEntry};
use crate::ipc::{Listener, Topic, Transport, TransportProbe, TransportProvider};
use crate::sender::OutboundSender;

// ============================================================================
// State
// ============================================================================

/// Observable session state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Result of the most recent probe
    pub transport_available: bool,
    /// True between a successful start and the next stop
    pub active: bool,
}

impl SessionState {
    /// Outbound sends require both an available transport and an active session.
    pub fn can_send(&self) -> bool {
        self.transport_available && self.active
    }
}

/// Lifecycle phase
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    #[default]
    Stopped,
    Starting,
    Active,
    Stopping,
}

/// State shared by the manager, its sender and its inbound listener
pub(crate) struct SessionCore {
    state: Mutex<SessionState>,
    phase: Mutex<SessionPhase>,
    handle: Mutex<Option<Arc<dyn Transport>>>,
    pub(crate) log: DiagnosticLog,
}

impl SessionCore {
    pub(crate) fn new(log: DiagnosticLog) -> Self {
        Self {
            state: Mutex::new(SessionState::default()),
            phase: Mutex::new(SessionPhase::Stopped),
            handle: Mutex::new(None),
            log,
        }
    }

    pub(crate) fn state(&self) -> SessionState {
        self.state.lock().map(|s| *s).unwrap_or_default()
    }

    pub(crate) fn phase(&self) -> SessionPhase {
        self.phase.lock().map(|p| *p).unwrap_or_default()
    }

    pub(crate) fn held_handle(&self) -> Option<Arc<dyn Transport>> {
        self.handle.lock().ok().and_then(|h| h.clone())
    }

    fn set_phase(&self, phase: SessionPhase) {
        if let Ok(mut current) = self.phase.lock() {
            *current = phase;
        }
    }

    fn set_active(&self, active: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.active = active;
        }
    }

    /// Replace the held handle, returning the previous one.
    fn swap_handle(&self, handle: Option<Arc<dyn Transport>>) -> Option<Arc<dyn Transport>> {
        match self.handle.lock() {
            Ok(mut held) => std::mem::replace(&mut *held, handle),
            Err(_) => None,
        }
    }

    #[cfg(test)]
    pub(crate) fn force_state(&self, state: SessionState, handle: Option<Arc<dyn Transport>>) {
        *self.state.lock().unwrap() = state;
        *self.handle.lock().unwrap() = handle;
    }
}

fn same_handle(a: &Arc<dyn Transport>, b: &Arc<dyn Transport>) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

// ============================================================================
// Session Manager
// ============================================================================

pub struct SessionManager {
    core: Arc<SessionCore>,
    probe: TransportProbe,
    decoder: FrameDecoder,
    consumers: ConsumerSlot,
    sender: OutboundSender,
    /// UI location announced in the handshake
    location: String,
    /// Serializes start/stop/restart
    lifecycle: Mutex<()>,
}

impl SessionManager {
    pub fn new(provider: Arc<dyn TransportProvider>, location: impl Into<String>) -> Self {
        let log = DiagnosticLog::new();
        let core = Arc::new(SessionCore::new(log.clone()));
        Self {
            probe: TransportProbe::new(provider, log.clone()),
            decoder: FrameDecoder::new(log),
            consumers: ConsumerSlot::new(),
            sender: OutboundSender::new(core.clone()),
            core,
            location: location.into(),
            lifecycle: Mutex::new(()),
        }
    }

    /// Open the session: probe, subscribe, handshake.
    /// With no transport available this only logs and stays stopped.
    pub fn start(&self) {
        let _guard = self.lifecycle.lock().unwrap_or_else(|p| p.into_inner());
        self.start_locked();
    }

    /// Close the session. Safe to call when already stopped.
    pub fn stop(&self) {
        let _guard = self.lifecycle.lock().unwrap_or_else(|p| p.into_inner());
        self.stop_locked();
    }

    /// stop() then start() as one step.
    pub fn restart(&self) {
        let _guard = self.lifecycle.lock().unwrap_or_else(|p| p.into_inner());
        self.stop_locked();
        self.start_locked();
    }

    /// Register the consumer for decoded records, replacing any previous one.
    /// Does not touch the session state.
    pub fn set_consumer<F>(&self, consumer: F)
    where
        F: Fn(Record) + Send + Sync + 'static,
    {
        self.consumers.set(Arc::new(consumer));
    }

    /// Forward `data` to the host if the session is active.
    pub fn send(&self, data: Value) -> bool {
        self.sender.send(data)
    }

    /// Cloneable sender bound to this session
    pub fn sender(&self) -> OutboundSender {
        self.sender.clone()
    }

    pub fn state(&self) -> SessionState {
        self.core.state()
    }

    pub fn phase(&self) -> SessionPhase {
        self.core.phase()
    }

    pub fn ipc_available(&self) -> bool {
        self.core.state().transport_available
    }

    pub fn is_active(&self) -> bool {
        self.core.state().active
    }

    pub fn log(&self) -> &DiagnosticLog {
        &self.core.log
    }

    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.core.log.entries()
    }

    fn start_locked(&self) {
        self.core.set_phase(SessionPhase::Starting);

        let handle = match self.probe.probe(&self.core.state) {
            Some(handle) => handle,
            None => {
                // Drop any subscription left from an earlier session
                if let Some(stale) = self.core.swap_handle(None) {
                    stale.remove_all_listeners();
                }
                self.core.set_active(false);
                self.core.set_phase(SessionPhase::Stopped);
                return;
            }
        };

        handle.on(Topic::SerialToRenderer, self.inbound_listener());
        handle.send(Topic::Handshake, Value::String(self.location.clone()));
        self.core
            .log
            .append(format!("startIpcCommunication: handshake sent ({})", self.location));

        if let Some(previous) = self.core.swap_handle(Some(handle.clone())) {
            if !same_handle(&previous, &handle) {
                previous.remove_all_listeners();
            }
        }
        self.core.set_active(true);
        self.core.set_phase(SessionPhase::Active);
    }

    fn stop_locked(&self) {
        if self.core.phase() == SessionPhase::Active {
            self.core.set_phase(SessionPhase::Stopping);
        }

        // Refreshes transport availability; the held handle is what gets released
        let _ = self.probe.probe(&self.core.state);

        if let Some(handle) = self.core.swap_handle(None) {
            handle.remove_all_listeners();
            self.core.log.append("stopIpcCommunication");
        }

        self.core.set_active(false);
        self.core.set_phase(SessionPhase::Stopped);
    }

    /// Listener that logs, decodes and dispatches one inbound frame
    fn inbound_listener(&self) -> Listener {
        let log = self.core.log.clone();
        let decoder = self.decoder.clone();
        let consumers = self.consumers.clone();
        Arc::new(move |raw: &str| {
            log.append(format!("onSerialData: {}", Value::String(raw.to_string())));
            let record = decoder.decode(raw);
            consumers.deliver(record, &log);
        })
    }
}
