//! Per-cell attribute table: the in-memory snapshot every stage reads from.
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamError};
use crate::segment_id::SegmentId;

// ── Coordinates ───────────────────────────────────────────────────────────────

/// Grid coordinate. Row 1 / column 1 is the upper-left cell; offsets may
/// step outside the grid, so both components are signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub row: i32,
    pub col: i32,
}

impl CellCoord {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn offset(self, d_row: i32, d_col: i32) -> Self {
        Self::new(self.row + d_row, self.col + d_col)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

// ── Cell type ─────────────────────────────────────────────────────────────────

/// HRU type code carried by every cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveType {
    Inactive,
    /// Land cell; may carry a stream.
    Land,
    Lake,
    InactiveWater,
}

impl ActiveType {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ActiveType::Inactive),
            1 => Some(ActiveType::Land),
            2 => Some(ActiveType::Lake),
            3 => Some(ActiveType::InactiveWater),
            _ => None,
        }
    }
}

// ── Table row ─────────────────────────────────────────────────────────────────

/// One row of the cell table: input attributes followed by the columns the
/// attribute writer fills in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellRecord {
    pub cell_id: i64,
    pub row: i32,
    pub col: i32,
    pub active_type: i32,
    /// Nonzero when the cell carries a stream.
    pub is_stream: i32,
    pub lake_id: i32,
    /// Display segment id (lake cells lose theirs on output).
    pub segment_id: i32,
    /// Segment used for routing; keeps the lake segment on lake cells.
    pub routing_segment_id: i32,
    pub subbasin_id: i32,
    /// Adjusted DEM elevation.
    pub elevation: f64,
    pub flow_direction_code: i32,
    /// Cell centroid, only used by the coordinate export.
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    /// Explicit domain-outflow flag; derived from flow direction when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outflow: Option<bool>,

    #[serde(default)]
    pub tosegment: i32,
    #[serde(default)]
    pub outseg: i32,
    #[serde(default)]
    pub reach: i32,
    #[serde(default)]
    pub maxreach: i32,
    #[serde(default)]
    pub iupseg: i32,
    #[serde(default)]
    pub segbasin: i32,
    #[serde(default)]
    pub stream_top: f64,
    #[serde(default)]
    pub display_segment_id: i32,
}

impl CellRecord {
    /// Bare input row with every output column zeroed.
    pub fn new(cell_id: i64, row: i32, col: i32) -> Self {
        Self {
            cell_id,
            row,
            col,
            active_type: 0,
            is_stream: 0,
            lake_id: 0,
            segment_id: 0,
            routing_segment_id: 0,
            subbasin_id: 0,
            elevation: 0.0,
            flow_direction_code: 0,
            x: 0.0,
            y: 0.0,
            outflow: None,
            tosegment: 0,
            outseg: 0,
            reach: 0,
            maxreach: 0,
            iupseg: 0,
            segbasin: 0,
            stream_top: 0.0,
            display_segment_id: 0,
        }
    }

    pub fn coord(&self) -> CellCoord {
        CellCoord::new(self.row, self.col)
    }

    pub fn is_active(&self) -> bool {
        self.active_type != 0
    }

    /// Active stream or lake cell; only these take part in routing.
    pub fn is_routed(&self) -> bool {
        self.is_active() && (self.is_stream != 0 || self.lake_id != 0)
    }

    pub fn routing_segment(&self) -> Option<SegmentId> {
        SegmentId::from_raw(self.routing_segment_id)
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// Validated, read-only snapshot of the cell table.
///
/// Rows keep their input order; lookups by coordinate go through an index.
#[derive(Debug, Clone, Default)]
pub struct CellStore {
    records: Vec<CellRecord>,
    index: HashMap<CellCoord, usize>,
}

impl CellStore {
    /// Build the store, rejecting rows that would corrupt routing:
    /// duplicate or non-positive coordinates, unknown cell types, segment ids
    /// outside the signed encoding, and stream or lake cells without a
    /// routing segment.
    pub fn from_records(records: Vec<CellRecord>) -> Result<Self> {
        let mut index = HashMap::with_capacity(records.len());
        for (i, rec) in records.iter().enumerate() {
            let cell = rec.coord();
            if rec.row < 1 || rec.col < 1 {
                return Err(StreamError::InvalidCoordinate { cell_id: rec.cell_id, cell });
            }
            if ActiveType::from_code(rec.active_type).is_none() {
                return Err(StreamError::InvalidActiveType {
                    cell_id: rec.cell_id,
                    code: rec.active_type,
                });
            }
            if let Some(value) = [rec.segment_id, rec.routing_segment_id]
                .into_iter()
                .find(|&v| v == i32::MIN)
            {
                return Err(StreamError::InvalidSegmentId { cell_id: rec.cell_id, value });
            }
            if rec.is_routed() && rec.routing_segment_id == 0 {
                return Err(StreamError::UnroutedCell { cell_id: rec.cell_id, cell });
            }
            if index.insert(cell, i).is_some() {
                return Err(StreamError::DuplicateCell { cell });
            }
        }
        Ok(Self { records, index })
    }

    pub fn records(&self) -> &[CellRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<CellRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, cell: CellCoord) -> Option<&CellRecord> {
        self.index.get(&cell).map(|&i| &self.records[i])
    }

    /// Stream and lake cells, in table order.
    pub fn routed(&self) -> impl Iterator<Item = &CellRecord> {
        self.records.iter().filter(|r| r.is_routed())
    }

    /// (nrows, ncols) of the smallest grid holding every cell.
    pub fn dimensions(&self) -> (usize, usize) {
        let rows = self.records.iter().map(|r| r.row).max().unwrap_or(0);
        let cols = self.records.iter().map(|r| r.col).max().unwrap_or(0);
        (rows.max(0) as usize, cols.max(0) as usize)
    }
}
