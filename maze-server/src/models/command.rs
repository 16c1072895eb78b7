//! Decoding of inbound client messages.
//!
//! Clients send JSON objects discriminated by a `type` field:
//! `generate` (optional `size`), `visualize` (optional `mazeSize`) and
//! `visualization_complete` (optional `duration`). Optional fields follow
//! JavaScript truthiness: `null`, `0`, `false` and `""` count as absent.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Maze size used when a `generate` request has no usable size.
pub const DEFAULT_SIZE: u32 = 15;

/// Label used for telemetry fields the client left out.
pub const UNKNOWN: &str = "unknown";

/// A decoded client command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Generate a maze of the given size.
    Generate { size: u32 },
    /// The client started animating the solver.
    Visualize { maze_size: String },
    /// The client finished animating the solver.
    VisualizationComplete { duration: String },
}

/// Why a message could not be decoded.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Not JSON, not an object, missing or unknown `type`.
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// `size` is present but not a positive integer.
    #[error("invalid maze size: {value}")]
    InvalidSize { value: String },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Envelope {
    Generate {
        #[serde(default)]
        size: Value,
    },
    Visualize {
        #[serde(default, rename = "mazeSize")]
        maze_size: Value,
    },
    VisualizationComplete {
        #[serde(default)]
        duration: Value,
    },
}

impl Command {
    /// Decode a raw message.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Malformed` if the message is not a recognised
    /// command, or `CommandError::InvalidSize` for an unusable `size`.
    pub fn parse(raw: &[u8]) -> Result<Self, CommandError> {
        match serde_json::from_slice(raw)? {
            Envelope::Generate { size } => Ok(Self::Generate {
                size: effective_size(&size)?,
            }),
            Envelope::Visualize { maze_size } => Ok(Self::Visualize {
                maze_size: label_or_unknown(&maze_size),
            }),
            Envelope::VisualizationComplete { duration } => Ok(Self::VisualizationComplete {
                duration: label_or_unknown(&duration),
            }),
        }
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

fn effective_size(value: &Value) -> Result<u32, CommandError> {
    if is_falsy(value) {
        return Ok(DEFAULT_SIZE);
    }

    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };

    match parsed {
        Some(0) => Ok(DEFAULT_SIZE),
        Some(size) => Ok(size),
        None => Err(CommandError::InvalidSize {
            value: value.to_string(),
        }),
    }
}

fn label_or_unknown(value: &Value) -> String {
    if is_falsy(value) {
        return UNKNOWN.to_string();
    }
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
