// src/decoder.rs
//
// Frame decoder for inbound serial payloads.
//
// Each payload is expected to hold exactly one JSON object. Decoding never
// fails outward: malformed input is logged as a warning and yields an empty
// record so the stream keeps flowing.
//
// Payloads holding several concatenated objects (`{..}{..}`) are not split;
// they fail to parse as a whole and decode to an empty record.

use serde_json::{Map, Value};

use crate::diagnostics::DiagnosticLog;

/// One decoded frame. No schema is enforced here.
pub type Record = Map<String, Value>;

#[derive(Clone)]
pub struct FrameDecoder {
    log: DiagnosticLog,
}

impl FrameDecoder {
    pub fn new(log: DiagnosticLog) -> Self {
        Self { log }
    }

    /// Decode one raw payload.
    ///
    /// Returns the parsed object, or an empty record (plus one warning log
    /// line) when the payload is not a single JSON object.
    pub fn decode(&self, raw: &str) -> Record {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(record)) => record,
            Ok(other) => {
                self.log.warn(format!(
                    "Unable to parse serial data: expected an object, got {}",
                    value_kind(&other)
                ));
                Record::new()
            }
            Err(e) => {
                self.log.warn(format!("Unable to parse serial data: {}", e));
                Record::new()
            }
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
