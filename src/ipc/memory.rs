// src/ipc/memory.rs
//
// In-process transport. Records every outbound call and lets the host side
// emit inbound events, which are delivered synchronously and in order to the
// listeners registered at the time of the emit.

use serde_json::Value;
use std::sync::Mutex;

use super::{Listener, Topic, Transport};

/// One outbound message captured by the transport
#[derive(Clone, Debug, PartialEq)]
pub struct SentMessage {
    pub topic: Topic,
    pub payload: Value,
}

#[derive(Default)]
pub struct MemoryTransport {
    listeners: Mutex<Vec<(Topic, Listener)>>,
    sent: Mutex<Vec<SentMessage>>,
    /// Count of every trait call (on, remove_all_listeners, send)
    calls: Mutex<usize>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `raw` to every listener registered for `topic`.
    /// Returns the number of listeners invoked.
    pub fn emit(&self, topic: Topic, raw: &str) -> usize {
        // Snapshot so listeners may call back into the transport
        let targets: Vec<Listener> = match self.listeners.lock() {
            Ok(listeners) => listeners
                .iter()
                .filter(|(t, _)| *t == topic)
                .map(|(_, l)| l.clone())
                .collect(),
            Err(_) => return 0,
        };
        for listener in &targets {
            listener(raw);
        }
        targets.len()
    }

    /// Every message sent so far, in call order
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Messages sent on one topic, in call order
    pub fn sent_on(&self, topic: Topic) -> Vec<Value> {
        self.sent()
            .into_iter()
            .filter(|m| m.topic == topic)
            .map(|m| m.payload)
            .collect()
    }

    pub fn listener_count(&self, topic: Topic) -> usize {
        self.listeners
            .lock()
            .map(|l| l.iter().filter(|(t, _)| *t == topic).count())
            .unwrap_or(0)
    }

    /// Total number of channel operations performed on this transport
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| *c).unwrap_or(0)
    }

    fn record_call(&self) {
        if let Ok(mut calls) = self.calls.lock() {
            *calls += 1;
        }
    }
}

impl Transport for MemoryTransport {
    fn on(&self, topic: Topic, listener: Listener) {
        self.record_call();
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push((topic, listener));
        }
    }

    fn remove_all_listeners(&self) {
        self.record_call();
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.clear();
        }
    }

    fn send(&self, topic: Topic, payload: Value) {
        self.record_call();
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(SentMessage { topic, payload });
        }
    }
}
