//! Wire messages
//!
//! [`OutputMessage`] is the envelope published on an output channel; the
//! end-of-stream sentinel is an envelope whose `target_table` is `-1`.
//! [`InboundMessage`] classifies raw input JSON into data and control signals.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::ids::canonical_key;

/// Wire value of the end-of-stream table marker
pub const END_OF_STREAM_TABLE: i64 = -1;

/// Destination table of an output message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetTable {
    /// A named destination table
    Table(String),
    /// The end-of-stream sentinel marker (`-1` on the wire)
    EndOfStream,
}

impl Serialize for TargetTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TargetTable::Table(name) => serializer.serialize_str(name),
            TargetTable::EndOfStream => serializer.serialize_i64(END_OF_STREAM_TABLE),
        }
    }
}

impl<'de> Deserialize<'de> for TargetTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        if value.as_i64() == Some(END_OF_STREAM_TABLE) {
            return Ok(TargetTable::EndOfStream);
        }
        canonical_key(&value)
            .map(TargetTable::Table)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid target_table: {value}")))
    }
}

impl std::fmt::Display for TargetTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetTable::Table(name) => write!(f, "{name}"),
            TargetTable::EndOfStream => write!(f, "{END_OF_STREAM_TABLE}"),
        }
    }
}

/// Envelope published on an output channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputMessage {
    pub target_table: TargetTable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,
    pub record: Value,
}

impl OutputMessage {
    /// A data row for `table`
    pub fn row(table: impl Into<String>, queue: Option<String>, record: Value) -> Self {
        Self {
            target_table: TargetTable::Table(table.into()),
            queue,
            record,
        }
    }

    /// The end-of-stream sentinel for `channel`
    pub fn end_of_stream(channel: impl Into<String>) -> Self {
        Self {
            target_table: TargetTable::EndOfStream,
            queue: Some(channel.into()),
            record: Value::String(String::new()),
        }
    }

    /// Whether this is an end-of-stream sentinel
    pub fn is_end_of_stream(&self) -> bool {
        self.target_table == TargetTable::EndOfStream
    }

    /// Channel this message is published on; empty or absent queues fall back to `default`
    pub fn channel_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.queue.as_deref() {
            Some(queue) if !queue.trim().is_empty() => queue,
            _ => default,
        }
    }
}

/// A classified inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Seeds the number of documents the run will deliver
    Start { expected: u64 },
    /// The source has no more messages
    End,
    /// A clinical document
    Document(Value),
    /// Input that could not be read or is not a valid message
    ///
    /// Still counts as a delivered document so the stream terminates.
    Invalid { origin: String, reason: String },
}

impl InboundMessage {
    /// Classifies a parsed JSON value
    ///
    /// Accepted control shapes:
    /// - `{"control": "start", "expected": n}` and the legacy `{"id": 0, "numPlantillasProcesar": n}`
    /// - `{"control": "end"}` and the legacy `{"id": -1}`
    ///
    /// Anything else with an `id` is a document.
    pub fn classify(value: Value, origin: &str) -> Self {
        if let Some(control) = value.get("control").and_then(Value::as_str) {
            return match control {
                "start" => match value.get("expected").and_then(as_count) {
                    Some(expected) => InboundMessage::Start { expected },
                    None => InboundMessage::invalid(origin, "start control without a valid 'expected' count"),
                },
                "end" => InboundMessage::End,
                other => InboundMessage::invalid(origin, format!("unknown control '{other}'")),
            };
        }

        let id = value.get("id").and_then(canonical_key);
        match id.as_deref() {
            Some("0") => match value.get("numPlantillasProcesar").and_then(as_count) {
                Some(expected) => InboundMessage::Start { expected },
                None => InboundMessage::invalid(origin, "start message without a valid 'numPlantillasProcesar'"),
            },
            Some("-1") => InboundMessage::End,
            Some(_) => InboundMessage::Document(value),
            None => InboundMessage::invalid(origin, "document has no string or numeric 'id'"),
        }
    }

    /// Parses and classifies raw message text
    pub fn parse(text: &str, origin: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value) => Self::classify(value, origin),
            Err(e) => Self::invalid(origin, format!("invalid JSON: {e}")),
        }
    }

    /// An invalid input notice
    pub fn invalid(origin: impl Into<String>, reason: impl Into<String>) -> Self {
        InboundMessage::Invalid {
            origin: origin.into(),
            reason: reason.into(),
        }
    }

    /// Whether this message accounts for one expected document
    pub fn is_document_like(&self) -> bool {
        matches!(self, InboundMessage::Document(_) | InboundMessage::Invalid { .. })
    }
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
