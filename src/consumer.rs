// src/consumer.rs
//
// Single-slot registration for the downstream data consumer.
// Registering replaces any previous consumer; at most one is active.

use std::sync::{Arc, Mutex};

use crate::decoder::Record;
use crate::diagnostics::DiagnosticLog;

/// Callback receiving one decoded record per inbound frame
pub type Consumer = Arc<dyn Fn(Record) + Send + Sync>;

#[derive(Clone, Default)]
pub struct ConsumerSlot {
    current: Arc<Mutex<Option<Consumer>>>,
}

impl ConsumerSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `consumer`, replacing the previous one.
    pub fn set(&self, consumer: Consumer) {
        if let Ok(mut current) = self.current.lock() {
            *current = Some(consumer);
        }
    }

    /// Hand `record` to the current consumer, or log the drop.
    /// Returns whether a consumer received it.
    pub fn deliver(&self, record: Record, log: &DiagnosticLog) -> bool {
        // Clone out of the lock so the consumer may re-register or send
        let consumer = self.current.lock().ok().and_then(|c| c.clone());
        match consumer {
            Some(consumer) => {
                consumer(record);
                true
            }
            None => {
                log.warn(format!(
                    "No onDataCallback set. Unused data: {}",
                    serde_json::Value::Object(record)
                ));
                false
            }
        }
    }
}
