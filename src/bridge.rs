// src/bridge.rs
//
// Mount/unmount wrapper exposed to the UI host.
// Mounting starts the session; dropping the bridge stops it, which removes
// the inbound subscription.

use serde_json::Value;
use std::sync::Arc;

use crate::decoder::Record;
use crate::diagnostics::LogEntry;
use crate::ipc::TransportProvider;
use crate::session::{SessionManager, SessionState};
use crate::settings::BridgeSettings;

pub struct SerialBridge {
    session: SessionManager,
    debug_view: bool,
}

impl SerialBridge {
    /// Build the session for `settings.location` and start it.
    pub fn mount(provider: Arc<dyn TransportProvider>, settings: &BridgeSettings) -> Self {
        let bridge = Self {
            session: SessionManager::new(provider, settings.location.clone()),
            debug_view: settings.debug_view,
        };
        bridge.start_ipc_communication();
        bridge
    }

    pub fn start_ipc_communication(&self) {
        self.session.start();
    }

    pub fn stop_ipc_communication(&self) {
        self.session.stop();
    }

    pub fn restart_ipc_communication(&self) {
        self.session.restart();
    }

    /// Returns whether the data reached the channel.
    pub fn send_data(&self, data: Value) -> bool {
        self.session.send(data)
    }

    pub fn set_on_data_callback<F>(&self, callback: F)
    where
        F: Fn(Record) + Send + Sync + 'static,
    {
        self.session.set_consumer(callback);
    }

    pub fn ipc_available(&self) -> bool {
        self.session.ipc_available()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.session.log_entries()
    }

    /// Whether the diagnostic overlay should be shown
    pub fn debug_view(&self) -> bool {
        self.debug_view
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }
}

impl Drop for SerialBridge {
    fn drop(&mut self) {
        self.session.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::LogLevel;
    use crate::ipc::{MemoryTransport, Topic, TransportSlot};
    use serde_json::json;
    use std::sync::Mutex;

    #[test]
    fn test_mount_without_transport() {
        let settings = BridgeSettings::from_location("app://ui/?debug=true");
        let bridge = SerialBridge::mount(Arc::new(TransportSlot::empty()), &settings);

        assert!(!bridge.ipc_available());
        assert!(bridge.debug_view());
        let entries = bridge.log_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Warn);
        assert!(!bridge.send_data(json!({"cmd": "on"})));
    }

    #[test]
    fn test_mount_end_to_end() {
        let transport = Arc::new(MemoryTransport::new());
        let slot = Arc::new(TransportSlot::with(transport.clone()));
        let settings = BridgeSettings::from_location("app://ui/");
        let bridge = SerialBridge::mount(slot, &settings);
        assert!(!bridge.debug_view());

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        bridge.set_on_data_callback(move |record| sink.lock().unwrap().push(record));

        transport.emit(Topic::SerialToRenderer, r#"{"temp":21.5}"#);
        assert!(bridge.send_data(json!({"cmd": "on"})));

        assert_eq!(received.lock().unwrap()[0].get("temp"), Some(&json!(21.5)));
        assert_eq!(
            transport.sent_on(Topic::RendererToSerial),
            vec![json!({"cmd": "on"})]
        );
        assert_eq!(transport.sent_on(Topic::Handshake), vec![json!("app://ui/")]);
    }

    #[test]
    fn test_unmount_removes_subscription() {
        let transport = Arc::new(MemoryTransport::new());
        let slot = Arc::new(TransportSlot::with(transport.clone()));
        let bridge = SerialBridge::mount(slot, &BridgeSettings::default());
        assert_eq!(transport.listener_count(Topic::SerialToRenderer), 1);

        drop(bridge);
        assert_eq!(transport.listener_count(Topic::SerialToRenderer), 0);
    }
}
