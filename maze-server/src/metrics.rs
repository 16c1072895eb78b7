//! Best-effort summary of generator output for the audit log.
//!
//! The generator's document is passed to clients untouched; this module only
//! peeks at it to count the solution path and the explored cells. Output that
//! does not look like a maze document simply has no metrics.

use serde::de::IgnoredAny;
use serde::Deserialize;

/// Counts extracted from a maze document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    /// Number of cells on the solution path.
    pub path_length: usize,
    /// Number of cells the solver explored.
    pub explored_nodes: usize,
}

#[derive(Deserialize)]
struct MazeSummary {
    // The bundled generator names this field `path`.
    #[serde(alias = "path")]
    solution: Vec<IgnoredAny>,
    explored: Vec<IgnoredAny>,
}

/// Extract metrics from raw generator output, or `None` if it does not parse.
pub fn extract(raw: &[u8]) -> Option<Metrics> {
    let summary: MazeSummary = serde_json::from_slice(raw).ok()?;
    Some(Metrics {
        path_length: summary.solution.len(),
        explored_nodes: summary.explored.len(),
    })
}
