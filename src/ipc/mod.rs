// src/ipc/mod.rs
//
// Inter-process channel abstraction between the renderer side and the host
// process that owns the serial port.
//
// The channel handle is never looked up from global state. A
// `TransportProvider` is injected into the session at construction and is
// asked for a handle each time the session probes for availability.
//
// Implementations:
// - memory.rs - in-process transport (host simulators, tests)
// - stdio.rs  - line-delimited JSON envelopes over stdin/stdout

pub mod memory;
mod probe;
pub mod stdio;

pub use memory::{MemoryTransport, SentMessage};
pub use probe::TransportProbe;
pub use stdio::StdioTransport;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};

// ============================================================================
// Topics
// ============================================================================

/// Event topics carried by the channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// Host -> renderer: one raw serial frame as a string
    #[serde(rename = "SERIAL_TO_RENDERER")]
    SerialToRenderer,
    /// Renderer -> host: application data forwarded verbatim
    #[serde(rename = "RENDERER_TO_SERIAL")]
    RendererToSerial,
    /// Renderer -> host: sent once per session start with the UI location
    #[serde(rename = "HANDSHAKE")]
    Handshake,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::SerialToRenderer => "SERIAL_TO_RENDERER",
            Topic::RendererToSerial => "RENDERER_TO_SERIAL",
            Topic::Handshake => "HANDSHAKE",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Transport Traits
// ============================================================================

/// Inbound event listener. Receives the raw payload of one event.
pub type Listener = Arc<dyn Fn(&str) + Send + Sync>;

/// An open channel handle.
///
/// All operations return immediately; delivery happens asynchronously and
/// inbound events are observed through registered listeners. Listener
/// registration is not deduplicated here: registering twice delivers twice.
pub trait Transport: Send + Sync {
    /// Register a listener for inbound events on `topic`.
    fn on(&self, topic: Topic, listener: Listener);

    /// Remove every registered listener, on all topics.
    fn remove_all_listeners(&self);

    /// Send `payload` to the host on `topic`.
    fn send(&self, topic: Topic, payload: Value);
}

/// Source of channel handles, injected into the session at construction.
pub trait TransportProvider: Send + Sync {
    /// The current handle, or `None` if no channel exists in this context.
    fn handle(&self) -> Option<Arc<dyn Transport>>;
}

// ============================================================================
// Transport Slot
// ============================================================================

/// Single-slot provider: a handle is installed at startup and released at
/// shutdown. An empty slot means the transport is unavailable.
#[derive(Default)]
pub struct TransportSlot {
    handle: Mutex<Option<Arc<dyn Transport>>>,
}

impl TransportSlot {
    /// An empty slot (no transport available)
    pub fn empty() -> Self {
        Self::default()
    }

    /// A slot already holding `handle`
    pub fn with(handle: Arc<dyn Transport>) -> Self {
        Self {
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Install (or replace) the handle.
    pub fn install(&self, handle: Arc<dyn Transport>) {
        if let Ok(mut slot) = self.handle.lock() {
            *slot = Some(handle);
        }
    }

    /// Release the handle, returning it if one was installed.
    pub fn release(&self) -> Option<Arc<dyn Transport>> {
        self.handle.lock().ok().and_then(|mut slot| slot.take())
    }
}

impl TransportProvider for TransportSlot {
    fn handle(&self) -> Option<Arc<dyn Transport>> {
        self.handle.lock().ok().and_then(|slot| slot.clone())
    }
}
