// src/sender.rs
//
// Outbound sender. Forwards application data to the host on
// RENDERER_TO_SERIAL, but only while a session is active on an available
// transport. Every call appends exactly one diagnostic line.

use serde_json::Value;
use std::sync::Arc;

use crate::ipc::Topic;
use crate::session::SessionCore;

#[derive(Clone)]
pub struct OutboundSender {
    core: Arc<SessionCore>,
}

impl OutboundSender {
    pub(crate) fn new(core: Arc<SessionCore>) -> Self {
        Self { core }
    }

    /// Send `data` unmodified to the host.
    ///
    /// Returns whether the data was handed to the channel. When the session
    /// is not active the channel is not touched.
    pub fn send(&self, data: Value) -> bool {
        let state = self.core.state();
        let handle = if state.can_send() {
            self.core.held_handle()
        } else {
            None
        };

        match handle {
            Some(handle) => {
                self.core.log.append(format!("sendData: {}", data));
                handle.send(Topic::RendererToSerial, data);
                true
            }
            None => {
                self.core.log.warn(format!("IPC not available: {}", data));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticLog, LogLevel};
    use crate::ipc::{MemoryTransport, Transport};
    use crate::session::SessionState;
    use serde_json::json;

    fn sender_with(state: SessionState) -> (OutboundSender, Arc<MemoryTransport>, DiagnosticLog) {
        let log = DiagnosticLog::new();
        let core = Arc::new(SessionCore::new(log.clone()));
        let transport = Arc::new(MemoryTransport::new());
        let handle: Arc<dyn Transport> = transport.clone();
        core.force_state(state, Some(handle));
        (OutboundSender::new(core), transport, log)
    }

    #[test]
    fn test_send_requires_active_and_available() {
        let gated = [
            SessionState { transport_available: false, active: false },
            SessionState { transport_available: true, active: false },
            SessionState { transport_available: false, active: true },
        ];
        for state in gated {
            let (sender, transport, log) = sender_with(state);
            assert!(!sender.send(json!({"cmd": "on"})));
            assert_eq!(transport.call_count(), 0);
            assert_eq!(log.len(), 1);
            assert_eq!(log.entries()[0].level, LogLevel::Warn);
        }
    }

    #[test]
    fn test_send_forwards_payload_verbatim() {
        let (sender, transport, log) = sender_with(SessionState {
            transport_available: true,
            active: true,
        });
        let payload = json!({"cmd": "on", "args": [1, 2.5, null]});
        assert!(sender.send(payload.clone()));
        assert_eq!(transport.sent_on(Topic::RendererToSerial), vec![payload]);
        assert_eq!(log.len(), 1);
        assert!(log.entries()[0].content.starts_with("sendData: "));
    }

    #[test]
    fn test_sends_keep_call_order() {
        let (sender, transport, _log) = sender_with(SessionState {
            transport_available: true,
            active: true,
        });
        for i in 0..3 {
            sender.send(json!(i));
        }
        assert_eq!(
            transport.sent_on(Topic::RendererToSerial),
            vec![json!(0), json!(1), json!(2)]
        );
    }
}
