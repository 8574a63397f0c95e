//! D8 flow graph over the routed (stream and lake) cells.
use std::collections::BTreeMap;

use crate::cell::{CellCoord, CellStore};
use crate::error::{Result, StreamError};

/// ESRI D8 direction codes. Rows grow southward, columns eastward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowDirection {
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    North,
    NorthEast,
}

impl FlowDirection {
    pub const ALL: [FlowDirection; 8] = [
        FlowDirection::East,
        FlowDirection::SouthEast,
        FlowDirection::South,
        FlowDirection::SouthWest,
        FlowDirection::West,
        FlowDirection::NorthWest,
        FlowDirection::North,
        FlowDirection::NorthEast,
    ];

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(FlowDirection::East),
            2 => Some(FlowDirection::SouthEast),
            4 => Some(FlowDirection::South),
            8 => Some(FlowDirection::SouthWest),
            16 => Some(FlowDirection::West),
            32 => Some(FlowDirection::NorthWest),
            64 => Some(FlowDirection::North),
            128 => Some(FlowDirection::NorthEast),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            FlowDirection::East => 1,
            FlowDirection::SouthEast => 2,
            FlowDirection::South => 4,
            FlowDirection::SouthWest => 8,
            FlowDirection::West => 16,
            FlowDirection::NorthWest => 32,
            FlowDirection::North => 64,
            FlowDirection::NorthEast => 128,
        }
    }

    /// (Δrow, Δcol).
    pub fn offset(self) -> (i32, i32) {
        match self {
            FlowDirection::East => (0, 1),
            FlowDirection::SouthEast => (1, 1),
            FlowDirection::South => (1, 0),
            FlowDirection::SouthWest => (1, -1),
            FlowDirection::West => (0, -1),
            FlowDirection::NorthWest => (-1, -1),
            FlowDirection::North => (-1, 0),
            FlowDirection::NorthEast => (-1, 1),
        }
    }
}

/// Neighbour that `cell` drains to under flow code `code`.
pub fn downstream_of(cell: CellCoord, code: i32) -> Result<CellCoord> {
    let dir = FlowDirection::from_code(code)
        .ok_or(StreamError::InvalidFlowDirection { code, cell })?;
    let (dr, dc) = dir.offset();
    Ok(cell.offset(dr, dc))
}

/// Single-successor adjacency over routed cells.
///
/// Every routed cell has exactly one entry; the target may be any coordinate,
/// including cells off the grid or outside the routed set.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    next: BTreeMap<CellCoord, CellCoord>,
}

impl FlowGraph {
    pub fn downstream(&self, cell: CellCoord) -> Option<CellCoord> {
        self.next.get(&cell).copied()
    }

    /// True when `cell` is a routed cell (a node of the graph).
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.next.contains_key(&cell)
    }

    pub fn len(&self) -> usize {
        self.next.len()
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }

    pub fn edges(&self) -> impl Iterator<Item = (CellCoord, CellCoord)> + '_ {
        self.next.iter().map(|(&from, &to)| (from, to))
    }
}

/// Build the flow graph for every active stream or lake cell in `store`.
pub fn build_flow_graph(store: &CellStore) -> Result<FlowGraph> {
    let mut next = BTreeMap::new();
    for rec in store.routed() {
        let cell = rec.coord();
        next.insert(cell, downstream_of(cell, rec.flow_direction_code)?);
    }
    Ok(FlowGraph { next })
}
