//! Drainage network construction: flow graph → segments → lake links
//! → basins.
pub mod basins;
pub mod flow_graph;
pub mod lakes;
pub mod segments;
pub mod stream_links;

use tracing::info;

use crate::cell::CellStore;
use crate::error::Result;
use basins::{aggregate_basins, BasinMap};
use flow_graph::{build_flow_graph, FlowGraph};
use lakes::{resolve_lake_links, LakeLinks};
use segments::{resolve_segments, SegmentTable};

/// Every derived structure of one network build. Each stage's output is a
/// fresh value; the cell store is never modified.
#[derive(Debug, Clone)]
pub struct DrainageNetwork {
    pub graph: FlowGraph,
    pub segments: SegmentTable,
    pub lake_links: LakeLinks,
    pub basins: BasinMap,
}

/// Build the drainage network for `store`.
///
/// Steps:
/// 1. Flow graph over stream and lake cells.
/// 2. Segment outlets, downstream segments and reach numbers.
/// 3. Lake → stream links (IUPSEG).
/// 4. Pour segment of every segment (SEG_BASIN).
///
/// Any malformed input aborts the build before a single output is produced.
pub fn build_network(store: &CellStore) -> Result<DrainageNetwork> {
    info!("Cell out-flow dictionary");
    let graph = build_flow_graph(store)?;
    info!("  {} stream and lake cells", graph.len());

    let segments = resolve_segments(store, &graph)?;
    let lake_links = resolve_lake_links(&segments);
    let basins = aggregate_basins(segments.links())?;

    Ok(DrainageNetwork { graph, segments, lake_links, basins })
}


#[cfg(test)]
mod tests {
    use super::testing::{lake, stream};
    use super::*;
    use crate::error::StreamError;
    use crate::segment_id::{Downstream, SegmentId};

    fn seg(raw: i32) -> SegmentId {
        SegmentId::from_raw(raw).unwrap()
    }

    /// Streams 1 (west) and 2 (north) feed lake -1, which drains into stream 3
    /// running east off the grid.
    fn lake_network() -> CellStore {
        CellStore::from_records(vec![
            stream(1, 2, 1, 1, 1),
            stream(2, 1, 2, 2, 4),
            lake(3, 2, 2, -1, 1),
            lake(4, 2, 3, -1, 1),
            stream(5, 2, 4, 3, 1),
            stream(6, 2, 5, 3, 1),
        ])
        .unwrap()
    }

    #[test]
    fn lake_network_end_to_end() {
        let net = build_network(&lake_network()).unwrap();
        assert_eq!(net.segments.len(), 4);
        assert_eq!(net.segments.get(seg(1)).unwrap().downstream, Downstream::Segment(seg(-1)));
        assert_eq!(net.segments.get(seg(2)).unwrap().downstream, Downstream::Segment(seg(-1)));
        assert_eq!(net.segments.get(seg(-1)).unwrap().downstream, Downstream::Segment(seg(3)));
        assert_eq!(net.segments.get(seg(3)).unwrap().downstream, Downstream::Exit);
        assert_eq!(net.segments.get(seg(3)).unwrap().max_reach(), 2);
        assert_eq!(net.lake_links.upstream_lake(seg(3)), Some(seg(-1)));
        for s in [1, 2, -1, 3] {
            assert_eq!(net.basins.pourseg(seg(s)), Some(seg(3)), "segment {s}");
        }
    }

    #[test]
    fn build_stops_at_first_malformed_segment() {
        let store = CellStore::from_records(vec![stream(1, 1, 1, 5, 4), stream(2, 1, 2, 5, 4)])
            .unwrap();
        let err = build_network(&store).unwrap_err();
        assert!(matches!(err, StreamError::AmbiguousOutlet { segment: 5, .. }), "got {err}");
    }
}
