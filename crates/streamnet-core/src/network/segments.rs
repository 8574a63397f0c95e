//! Segment resolution: outlet cell, downstream segment and reach numbering.
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, info};

use super::flow_graph::FlowGraph;
use crate::cell::{CellCoord, CellStore};
use crate::error::{Result, StreamError};
use crate::segment_id::{Downstream, SegmentId};

/// One stream or lake segment after resolution.
#[derive(Debug, Clone)]
pub struct ResolvedSegment {
    pub id: SegmentId,
    /// Member cells. Stream segments are ordered head to outlet; lake
    /// segments are in coordinate order.
    pub cells: Vec<CellCoord>,
    /// Members whose downstream neighbour lies outside the segment.
    pub outlets: Vec<CellCoord>,
    pub downstream: Downstream,
    reaches: HashMap<CellCoord, u32>,
}

impl ResolvedSegment {
    /// 1-based reach of `cell`; 0 for lake segments and non-members.
    pub fn reach(&self, cell: CellCoord) -> u32 {
        self.reaches.get(&cell).copied().unwrap_or(0)
    }

    /// Number of reaches (stream segments only, 0 for lakes).
    pub fn max_reach(&self) -> u32 {
        self.reaches.len() as u32
    }

    /// The single outlet cell, when there is exactly one.
    pub fn outlet(&self) -> Option<CellCoord> {
        match self.outlets.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

/// All resolved segments, keyed and iterated in ascending raw id.
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    segments: BTreeMap<SegmentId, ResolvedSegment>,
    cell_segment: HashMap<CellCoord, SegmentId>,
}

impl SegmentTable {
    pub fn get(&self, id: SegmentId) -> Option<&ResolvedSegment> {
        self.segments.get(&id)
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.segments.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolvedSegment> {
        self.segments.values()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment owning a routed cell.
    pub fn segment_of(&self, cell: CellCoord) -> Option<&ResolvedSegment> {
        self.cell_segment.get(&cell).and_then(|id| self.segments.get(id))
    }

    /// (segment, downstream) pairs, the input of basin aggregation.
    pub fn links(&self) -> impl Iterator<Item = (SegmentId, Downstream)> + '_ {
        self.segments.values().map(|s| (s.id, s.downstream))
    }
}

/// Group routed cells by routing segment and resolve each segment.
///
/// Stream segments must have exactly one outlet cell and form a single chain;
/// lake segments may have several outlets only when none of them drains into
/// another routed cell, in which case the lake pours out of the domain.
pub fn resolve_segments(store: &CellStore, graph: &FlowGraph) -> Result<SegmentTable> {
    info!("Calculate IREACH and OUTSEG");

    let mut members: BTreeMap<SegmentId, Vec<CellCoord>> = BTreeMap::new();
    let mut cell_segment = HashMap::with_capacity(graph.len());
    for (cell, _) in graph.edges() {
        let Some(id) = store.get(cell).and_then(|r| r.routing_segment()) else {
            continue;
        };
        members.entry(id).or_default().push(cell);
        cell_segment.insert(cell, id);
    }

    let target_segment = |target: CellCoord| -> Downstream {
        match cell_segment.get(&target) {
            Some(&id) => Downstream::Segment(id),
            None => {
                debug!("    Out cell {target} is not a routed cell, draining to exit");
                Downstream::Exit
            }
        }
    };

    let mut segments = BTreeMap::new();
    for (id, cells) in members {
        debug!("    Segment: {id}");
        let resolved = if id.is_stream() {
            resolve_stream(id, cells, graph, &target_segment)?
        } else {
            resolve_lake(id, cells, graph, &cell_segment, &target_segment)?
        };
        segments.insert(id, resolved);
    }

    Ok(SegmentTable { segments, cell_segment })
}

fn outlet_cells(cells: &[CellCoord], graph: &FlowGraph) -> (HashSet<CellCoord>, Vec<CellCoord>) {
    let member_set: HashSet<CellCoord> = cells.iter().copied().collect();
    let outlets = cells
        .iter()
        .copied()
        .filter(|&c| graph.downstream(c).is_some_and(|d| !member_set.contains(&d)))
        .collect();
    (member_set, outlets)
}

fn resolve_stream(
    id: SegmentId,
    cells: Vec<CellCoord>,
    graph: &FlowGraph,
    target_segment: &impl Fn(CellCoord) -> Downstream,
) -> Result<ResolvedSegment> {
    let (member_set, outlets) = outlet_cells(&cells, graph);
    if outlets.len() != 1 {
        return Err(StreamError::AmbiguousOutlet {
            segment: id.to_raw(),
            candidates: outlets,
        });
    }
    let outlet = outlets[0];
    let downstream = match graph.downstream(outlet) {
        Some(target) => target_segment(target),
        None => Downstream::Exit,
    };

    // Head: the only member no other member drains into.
    let fed: HashSet<CellCoord> = cells.iter().filter_map(|&c| graph.downstream(c)).collect();
    let heads: Vec<CellCoord> = cells.iter().copied().filter(|c| !fed.contains(c)).collect();
    let non_linear = |heads: Vec<CellCoord>| StreamError::NonLinearSegment {
        segment: id.to_raw(),
        heads,
    };
    if heads.len() != 1 {
        return Err(non_linear(heads));
    }

    let mut ordered = Vec::with_capacity(cells.len());
    let mut reaches = HashMap::with_capacity(cells.len());
    let mut current = heads[0];
    loop {
        if !member_set.contains(&current) || reaches.contains_key(&current) {
            return Err(non_linear(heads));
        }
        ordered.push(current);
        reaches.insert(current, ordered.len() as u32);
        if current == outlet {
            break;
        }
        match graph.downstream(current) {
            Some(next) => current = next,
            None => return Err(non_linear(heads)),
        }
    }
    if ordered.len() != cells.len() {
        return Err(non_linear(heads));
    }

    Ok(ResolvedSegment {
        id,
        cells: ordered,
        outlets,
        downstream,
        reaches,
    })
}

fn resolve_lake(
    id: SegmentId,
    cells: Vec<CellCoord>,
    graph: &FlowGraph,
    cell_segment: &HashMap<CellCoord, SegmentId>,
    target_segment: &impl Fn(CellCoord) -> Downstream,
) -> Result<ResolvedSegment> {
    let (_, outlets) = outlet_cells(&cells, graph);
    let targets: BTreeSet<CellCoord> = outlets.iter().filter_map(|&c| graph.downstream(c)).collect();

    let downstream = if targets.len() == 1 {
        targets
            .first()
            .map(|&t| target_segment(t))
            .unwrap_or(Downstream::Exit)
    } else if targets.iter().all(|t| !cell_segment.contains_key(t)) {
        if targets.is_empty() {
            debug!("  Lake {id} has no out cells, setting outseg to exit");
        } else {
            debug!("  All out cells are inactive, setting outseg to exit");
        }
        Downstream::Exit
    } else {
        return Err(StreamError::AmbiguousOutlet {
            segment: id.to_raw(),
            candidates: outlets,
        });
    };

    Ok(ResolvedSegment {
        id,
        cells,
        outlets,
        downstream,
        reaches: HashMap::new(),
    })
}
