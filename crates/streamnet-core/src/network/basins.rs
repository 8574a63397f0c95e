//! Basin aggregation: the terminal pour segment of every segment.
use std::collections::{BTreeMap, HashMap};

use tracing::{debug, info};

use crate::error::{Result, StreamError};
use crate::segment_id::{Downstream, SegmentId};

/// Segment -> pour segment (the last segment before the domain exit).
#[derive(Debug, Clone, Default)]
pub struct BasinMap {
    pourseg: BTreeMap<SegmentId, SegmentId>,
}

impl BasinMap {
    pub fn pourseg(&self, id: SegmentId) -> Option<SegmentId> {
        self.pourseg.get(&id).copied()
    }

    /// Every segment draining through `pour`, including `pour` itself.
    pub fn members(&self, pour: SegmentId) -> Vec<SegmentId> {
        self.pourseg
            .iter()
            .filter(|&(_, &p)| p == pour)
            .map(|(&s, _)| s)
            .collect()
    }

    /// Distinct pour segments in ascending order.
    pub fn pour_points(&self) -> Vec<SegmentId> {
        let mut pours: Vec<SegmentId> = self.pourseg.values().copied().collect();
        pours.sort();
        pours.dedup();
        pours
    }

    pub fn len(&self) -> usize {
        self.pourseg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pourseg.is_empty()
    }
}

/// Assign every segment to the pour segment its flow leaves the domain through.
///
/// `links` gives each segment's downstream. A downstream segment that is not
/// itself in `links` is treated as the domain exit. Segments that never reach
/// the exit sit on a routing cycle and fail the aggregation.
pub fn aggregate_basins(links: impl IntoIterator<Item = (SegmentId, Downstream)>) -> Result<BasinMap> {
    info!("Segment in/out-flow dictionary");
    let outseg: BTreeMap<SegmentId, Downstream> = links.into_iter().collect();

    let mut inflow: HashMap<SegmentId, Vec<SegmentId>> = HashMap::new();
    let mut pours = Vec::new();
    for (&seg, &down) in &outseg {
        match down {
            Downstream::Segment(target) if outseg.contains_key(&target) => {
                inflow.entry(target).or_default().push(seg);
            }
            Downstream::Segment(target) => {
                debug!("    Segment {seg} drains to unknown segment {target}, treating as exit");
                pours.push(seg);
            }
            Downstream::Exit => pours.push(seg),
        }
    }

    // Walk upstream from each pour point. A segment is assigned once and
    // never expanded twice, so the walk terminates on any input.
    let mut pourseg = BTreeMap::new();
    for &pour in &pours {
        let mut worklist = vec![pour];
        while let Some(seg) = worklist.pop() {
            if pourseg.contains_key(&seg) {
                continue;
            }
            pourseg.insert(seg, pour);
            if let Some(upstream) = inflow.get(&seg) {
                worklist.extend(upstream.iter().copied());
            }
        }
    }

    let stranded: Vec<i32> = outseg
        .keys()
        .filter(|s| !pourseg.contains_key(*s))
        .map(|s| s.to_raw())
        .collect();
    if !stranded.is_empty() {
        return Err(StreamError::RoutingCycle { segments: stranded });
    }

    info!("  {} segments drain through {} pour points", pourseg.len(), pours.len());
    Ok(BasinMap { pourseg })
}
