// src/lib.rs
//
// Renderer-side bridge for serial device data relayed by a host process.
//
// The host owns the serial port and relays each line-oriented JSON frame
// over an IPC channel. This crate manages the channel session (probe,
// handshake, subscribe, teardown), decodes inbound frames and hands them to
// a single consumer, and gates outbound data on the session state.

#[macro_use]
pub mod logging;

pub mod bridge;
pub mod consumer;
pub mod decoder;
pub mod diagnostics;
pub mod error;
pub mod ipc;
pub mod sender;
pub mod session;
pub mod settings;

pub use bridge::SerialBridge;
pub use decoder::{FrameDecoder, Record};
pub use diagnostics::{DiagnosticLog, LogEntry, LogLevel};
pub use error::BridgeError;
pub use ipc::{MemoryTransport, StdioTransport, Topic, Transport, TransportProvider, TransportSlot};
pub use session::{SessionManager, SessionPhase, SessionState};
pub use settings::BridgeSettings;

use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};

/// Command line for the stdio bridge binary
#[derive(Parser, Debug)]
#[command(name = "serial-bridge", version, about = "Relay serial device frames between a host process and this UI session")]
pub struct Cli {
    /// UI location announced in the handshake (`?debug=true` enables the log dump)
    #[arg(long)]
    pub location: Option<String>,

    /// Settings file (defaults to the platform config dir)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Write logs to this directory as well as stderr
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Send every decoded record back to the host on RENDERER_TO_SERIAL
    #[arg(long)]
    pub echo: bool,
}

pub fn run() {
    let cli = Cli::parse();
    if let Err(e) = run_with(cli) {
        tlog!("[serial-bridge] {}", e);
        std::process::exit(1);
    }
}

fn run_with(cli: Cli) -> Result<(), BridgeError> {
    let mut settings = match cli.settings.or_else(settings::default_settings_path) {
        Some(path) => settings::load_settings(&path)?,
        None => BridgeSettings::default(),
    };
    if let Some(location) = &cli.location {
        settings = settings.with_location(location);
    }

    if let Some(dir) = cli.log_dir.as_ref().or(settings.log_dir.as_ref()) {
        logging::init_file_logging(dir)?;
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let echo = cli.echo;
    runtime.block_on(async move {
        let entries = serve(tokio::io::stdin(), tokio::io::stdout(), &settings, echo).await;
        if settings.debug_view {
            for entry in entries {
                tlog!("[serial-bridge] {} {:?} {}", entry.id, entry.level, entry.content);
            }
        }
    });

    logging::stop_file_logging();
    Ok(())
}

/// Run one bridge session over a host link until the host closes `reader`.
///
/// Returns the session's diagnostic log. Everything queued for the host,
/// including the handshake and echoed records, is written before this returns.
pub async fn serve<R, W>(reader: R, writer: W, settings: &BridgeSettings, echo: bool) -> Vec<LogEntry>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (transport, tasks) = StdioTransport::spawn_with(reader, writer);
    let slot = Arc::new(TransportSlot::with(transport));
    let bridge = SerialBridge::mount(slot.clone(), settings);

    let sender = bridge.session().sender();
    bridge.set_on_data_callback(move |record| {
        let value = Value::Object(record);
        tlog!("[serial-bridge] Record: {}", value);
        if echo {
            sender.send(value);
        }
    });

    if let Err(e) = tasks.reader.await {
        tlog!("[serial-bridge] Reader task failed: {}", e);
    }

    let entries = bridge.log_entries();
    drop(bridge);
    slot.release();

    // Finishes once the last transport handle is gone and the queue is drained
    if let Err(e) = tasks.writer.await {
        tlog!("[serial-bridge] Writer task failed: {}", e);
    }
    entries
}
