// src/ipc/stdio.rs
//
// Host link over a pair of byte streams (stdin/stdout by default).
//
// Wire format: one JSON envelope per line, in both directions:
//   {"topic":"SERIAL_TO_RENDERER","payload":"{\"temp\":21.5}"}
//   {"topic":"HANDSHAKE","payload":"app://serial-bridge/"}
//
// Inbound string payloads are handed to listeners as-is. Any other inbound
// payload value is re-serialized to JSON text first, so listeners always see
// the raw textual frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use super::{Listener, Topic, Transport};
use crate::error::BridgeError;

/// One line on the wire
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub topic: Topic,
    #[serde(default)]
    pub payload: Value,
}

/// Parse one inbound line into an envelope.
pub fn parse_envelope(line: &str) -> Result<Envelope, BridgeError> {
    serde_json::from_str(line.trim()).map_err(|e| BridgeError::Io(format!("Bad envelope: {}", e)))
}

/// Raw textual payload handed to listeners
fn raw_payload(payload: &Value) -> String {
    match payload {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

type ListenerTable = Arc<Mutex<Vec<(Topic, Listener)>>>;

/// Background tasks behind a `StdioTransport`
pub struct StdioTasks {
    /// Finishes when the host closes the inbound stream
    pub reader: JoinHandle<()>,
    /// Finishes once every transport handle is dropped and the queue is flushed
    pub writer: JoinHandle<()>,
}

pub struct StdioTransport {
    listeners: ListenerTable,
    outbound: mpsc::UnboundedSender<Envelope>,
    /// Wakes the reader on the first listener registration
    subscribed: Arc<Notify>,
}

impl StdioTransport {
    /// Attach to the process's stdin/stdout. Must be called inside a tokio runtime.
    pub fn spawn() -> (Arc<Self>, StdioTasks) {
        Self::spawn_with(tokio::io::stdin(), tokio::io::stdout())
    }

    /// Attach to arbitrary streams. Spawns one reader and one writer task.
    ///
    /// The reader does not consume input until the first listener is
    /// registered, so frames the host sends early wait in the stream.
    pub fn spawn_with<R, W>(reader: R, writer: W) -> (Arc<Self>, StdioTasks)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let listeners: ListenerTable = Arc::new(Mutex::new(Vec::new()));
        let subscribed = Arc::new(Notify::new());
        let (tx, rx) = mpsc::unbounded_channel();

        let tasks = StdioTasks {
            reader: tokio::spawn(read_loop(reader, listeners.clone(), subscribed.clone())),
            writer: tokio::spawn(write_loop(writer, rx)),
        };

        let transport = Arc::new(Self {
            listeners,
            outbound: tx,
            subscribed,
        });
        (transport, tasks)
    }

    fn enqueue(&self, envelope: Envelope) -> Result<(), BridgeError> {
        self.outbound.send(envelope).map_err(|_| BridgeError::Closed)
    }
}

impl Transport for StdioTransport {
    fn on(&self, topic: Topic, listener: Listener) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push((topic, listener));
        }
        // Stores a permit if the reader is not waiting yet
        self.subscribed.notify_one();
    }

    fn remove_all_listeners(&self) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.clear();
        }
    }

    fn send(&self, topic: Topic, payload: Value) {
        if let Err(e) = self.enqueue(Envelope { topic, payload }) {
            tlog!("[stdio] Dropping {} message: {}", topic, e);
        }
    }
}

async fn read_loop<R>(reader: R, listeners: ListenerTable, subscribed: Arc<Notify>)
where
    R: AsyncRead + Unpin,
{
    subscribed.notified().await;

    let mut lines = BufReader::new(reader).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tlog!("[stdio] Read failed: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let envelope = match parse_envelope(&line) {
            Ok(envelope) => envelope,
            Err(e) => {
                tlog!("[stdio] Ignoring line: {}", e);
                continue;
            }
        };

        let targets: Vec<Listener> = match listeners.lock() {
            Ok(listeners) => listeners
                .iter()
                .filter(|(t, _)| *t == envelope.topic)
                .map(|(_, l)| l.clone())
                .collect(),
            Err(_) => break,
        };
        let raw = raw_payload(&envelope.payload);
        if targets.is_empty() {
            tlog!("[stdio] No listener for {}, dropping: {}", envelope.topic, raw);
            continue;
        }
        for listener in &targets {
            listener(&raw);
        }
    }
    tlog!("[stdio] Host closed the inbound stream");
}

async fn write_loop<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<Envelope>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(envelope) = rx.recv().await {
        let mut line = match serde_json::to_string(&envelope) {
            Ok(line) => line,
            Err(e) => {
                tlog!("[stdio] Failed to encode {} message: {}", envelope.topic, e);
                continue;
            }
        };
        line.push('\n');
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            tlog!("[stdio] Write failed: {}", e);
            break;
        }
        if let Err(e) = writer.flush().await {
            tlog!("[stdio] Flush failed: {}", e);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_parse_envelope() {
        let env = parse_envelope(r#"{"topic":"SERIAL_TO_RENDERER","payload":"{\"a\":1}"}"#).unwrap();
        assert_eq!(env.topic, Topic::SerialToRenderer);
        assert_eq!(raw_payload(&env.payload), r#"{"a":1}"#);

        assert!(parse_envelope("not json").is_err());
        assert!(parse_envelope(r#"{"topic":"UNKNOWN"}"#).is_err());
    }

    #[test]
    fn test_object_payload_is_reserialized() {
        let env = parse_envelope(r#"{"topic":"SERIAL_TO_RENDERER","payload":{"temp":21.5}}"#).unwrap();
        assert_eq!(raw_payload(&env.payload), r#"{"temp":21.5}"#);
    }

    #[tokio::test]
    async fn test_stdio_roundtrip() {
        let (mut host_in, transport_in) = tokio::io::duplex(4096);
        let (transport_out, host_out) = tokio::io::duplex(4096);
        let (transport, tasks) = StdioTransport::spawn_with(transport_in, transport_out);

        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<String>();
        transport.on(
            Topic::SerialToRenderer,
            Arc::new(move |raw: &str| {
                let _ = seen_tx.send(raw.to_string());
            }),
        );

        host_in
            .write_all(b"garbage\n{\"topic\":\"SERIAL_TO_RENDERER\",\"payload\":\"{\\\"x\\\":1}\"}\n")
            .await
            .unwrap();
        let raw = tokio::time::timeout(Duration::from_secs(2), seen_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(raw, r#"{"x":1}"#);

        transport.send(Topic::Handshake, json!("app://ui"));
        let mut out_lines = BufReader::new(host_out).lines();
        let line = tokio::time::timeout(Duration::from_secs(2), out_lines.next_line())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(
            parse_envelope(&line).unwrap(),
            Envelope {
                topic: Topic::Handshake,
                payload: json!("app://ui"),
            }
        );

        drop(host_in);
        tokio::time::timeout(Duration::from_secs(2), tasks.reader)
            .await
            .unwrap()
            .unwrap();

        drop(transport);
        tokio::time::timeout(Duration::from_secs(2), tasks.writer)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_frames_sent_before_subscribe_are_kept() {
        let (mut host_in, transport_in) = tokio::io::duplex(4096);
        let (transport_out, _host_out) = tokio::io::duplex(4096);
        let (transport, tasks) = StdioTransport::spawn_with(transport_in, transport_out);

        host_in
            .write_all(b"{\"topic\":\"SERIAL_TO_RENDERER\",\"payload\":\"{\\\"early\\\":1}\"}\n")
            .await
            .unwrap();
        tokio::task::yield_now().await;

        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel::<String>();
        transport.on(
            Topic::SerialToRenderer,
            Arc::new(move |raw: &str| {
                let _ = seen_tx.send(raw.to_string());
            }),
        );

        let raw = tokio::time::timeout(Duration::from_secs(2), seen_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(raw, r#"{"early":1}"#);

        drop(host_in);
        tokio::time::timeout(Duration::from_secs(2), tasks.reader)
            .await
            .unwrap()
            .unwrap();
    }
}
