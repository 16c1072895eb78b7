//! Audit event kinds and the line format they are written in.

use chrono::{DateTime, SecondsFormat, Utc};

/// Kind of lifecycle or telemetry event recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The server finished start-up and is accepting connections.
    ServerStarted,
    /// The server shut down gracefully.
    ServerStopped,
    /// A client connection was accepted.
    ClientConnected,
    /// A client connection closed.
    ClientDisconnected,
    /// A client asked for a maze.
    MazeGenerationRequested,
    /// The generator failed to spawn or exited non-zero.
    MazeGenerationFailed,
    /// The generator produced a maze.
    MazeGeneratedSuccessfully,
    /// Client-reported: pathfinding animation started.
    PathfindingVisualizationStarted,
    /// Client-reported: pathfinding animation finished.
    PathfindingVisualizationCompleted,
}

impl EventKind {
    /// Label written into the log line.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ServerStarted => "SERVER_STARTED",
            Self::ServerStopped => "SERVER_STOPPED",
            Self::ClientConnected => "CLIENT_CONNECTED",
            Self::ClientDisconnected => "CLIENT_DISCONNECTED",
            Self::MazeGenerationRequested => "MAZE_GENERATION_REQUESTED",
            Self::MazeGenerationFailed => "MAZE_GENERATION_FAILED",
            Self::MazeGeneratedSuccessfully => "MAZE_GENERATED_SUCCESSFULLY",
            Self::PathfindingVisualizationStarted => "PATHFINDING_VISUALIZATION_STARTED",
            Self::PathfindingVisualizationCompleted => "PATHFINDING_VISUALIZATION_COMPLETED",
        }
    }

    /// Parse a label back into a kind.
    #[cfg(test)]
    pub fn from_label(s: &str) -> Option<Self> {
        match s {
            "SERVER_STARTED" => Some(Self::ServerStarted),
            "SERVER_STOPPED" => Some(Self::ServerStopped),
            "CLIENT_CONNECTED" => Some(Self::ClientConnected),
            "CLIENT_DISCONNECTED" => Some(Self::ClientDisconnected),
            "MAZE_GENERATION_REQUESTED" => Some(Self::MazeGenerationRequested),
            "MAZE_GENERATION_FAILED" => Some(Self::MazeGenerationFailed),
            "MAZE_GENERATED_SUCCESSFULLY" => Some(Self::MazeGeneratedSuccessfully),
            "PATHFINDING_VISUALIZATION_STARTED" => Some(Self::PathfindingVisualizationStarted),
            "PATHFINDING_VISUALIZATION_COMPLETED" => Some(Self::PathfindingVisualizationCompleted),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single immutable audit record.
///
/// Renders as `[<timestamp>] <KIND>` followed by ` - <detail>` when the
/// detail is non-empty. The timestamp uses millisecond precision and a `Z`
/// suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
    pub detail: String,
}

impl AuditEntry {
    /// Stamp a new entry with the current time.
    pub fn now(kind: EventKind, detail: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            kind,
            detail: detail.into(),
        }
    }

    /// Parse a line previously produced by [`AuditEntry`]'s `Display`.
    ///
    /// Banner lines and anything else that does not follow the format yield
    /// `None`.
    #[cfg(test)]
    pub fn parse_line(line: &str) -> Option<Self> {
        let rest = line.strip_prefix('[')?;
        let (stamp, rest) = rest.split_once("] ")?;
        let timestamp = DateTime::parse_from_rfc3339(stamp).ok()?.with_timezone(&Utc);
        let (label, detail) = match rest.split_once(" - ") {
            Some((label, detail)) => (label, detail),
            None => (rest, ""),
        };
        Some(Self {
            timestamp,
            kind: EventKind::from_label(label)?,
            detail: detail.to_string(),
        })
    }
}

impl std::fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.kind
        )?;
        if !self.detail.is_empty() {
            write!(f, " - {}", self.detail)?;
        }
        Ok(())
    }
}
