//! Error type shared by every stage of the stream-parameter pipeline.
use std::path::PathBuf;

use thiserror::Error;

use crate::cell::CellCoord;

/// Everything that can abort a run.
///
/// All variants are fatal: the pipeline is a one-shot batch transform and a
/// failed run leaves no output that downstream tools should consume.
#[derive(Debug, Error)]
pub enum StreamError {
    /// A routed cell carries a flow-direction code outside the D8 set.
    #[error("invalid flow direction code {code} at cell {cell}")]
    InvalidFlowDirection { code: i32, cell: CellCoord },

    /// A segment has zero or several exit points where exactly one is required.
    #[error(
        "segment {segment} has {} outlet cells {}; check for streams exiting then \
         re-entering a lake (lake cell elevations may not be constant)",
        .candidates.len(),
        format_cells(.candidates)
    )]
    AmbiguousOutlet {
        segment: i32,
        candidates: Vec<CellCoord>,
    },

    /// A stream segment whose cells do not form a single head-to-outlet chain.
    #[error("segment {segment} is not a single chain of cells (head cells {})", format_cells(.heads))]
    NonLinearSegment { segment: i32, heads: Vec<CellCoord> },

    /// A stream or lake cell without a routing segment.
    #[error("cell {cell_id} at {cell} is a stream or lake cell but has no routing segment")]
    UnroutedCell { cell_id: i64, cell: CellCoord },

    /// Segment ids must fit the signed stream/lake encoding.
    #[error("cell {cell_id} has out-of-range segment id {value}")]
    InvalidSegmentId { cell_id: i64, value: i32 },

    #[error("cell {cell_id} has unknown cell type {code}")]
    InvalidActiveType { cell_id: i64, code: i32 },

    #[error("cell {cell} appears more than once in the cell table")]
    DuplicateCell { cell: CellCoord },

    /// Grid coordinates are 1-based; anything below 1 is rejected.
    #[error("cell {cell_id} has invalid grid coordinate {cell}")]
    InvalidCoordinate { cell_id: i64, cell: CellCoord },

    /// Segments that never reach the domain exit.
    #[error("routing cycle detected through segments {segments:?}")]
    RoutingCycle { segments: Vec<i32> },

    #[error("invalid ASCII grid {source_name}: {reason}")]
    InvalidGrid { source_name: String, reason: String },

    /// The cascade routing tool failed or reported a fatal condition.
    #[error("cascade routing tool {executable} failed: {detail}")]
    ExternalToolFailure { executable: String, detail: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, StreamError>;

impl StreamError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json { path: path.into(), source }
    }
}

fn format_cells(cells: &[CellCoord]) -> String {
    let parts: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
    format!("[{}]", parts.join(", "))
}
