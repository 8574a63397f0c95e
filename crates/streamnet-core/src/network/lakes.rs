//! IUPSEG: which lake, if any, feeds each stream segment.
use std::collections::BTreeMap;

use tracing::{info, warn};

use super::segments::SegmentTable;
use crate::segment_id::{Downstream, SegmentId};

/// Stream segment -> lake segment draining directly into it.
#[derive(Debug, Clone, Default)]
pub struct LakeLinks {
    upstream_lake: BTreeMap<SegmentId, SegmentId>,
}

impl LakeLinks {
    /// Lake feeding `stream`, if any.
    pub fn upstream_lake(&self, stream: SegmentId) -> Option<SegmentId> {
        self.upstream_lake.get(&stream).copied()
    }

    pub fn len(&self) -> usize {
        self.upstream_lake.len()
    }

    pub fn is_empty(&self) -> bool {
        self.upstream_lake.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SegmentId, SegmentId)> + '_ {
        self.upstream_lake.iter().map(|(&s, &l)| (s, l))
    }
}

/// Invert the lake -> downstream mapping for lakes that drain into a stream.
///
/// When two lakes drain into the same stream segment the lake with the
/// smaller number is kept and the conflict is logged.
pub fn resolve_lake_links(segments: &SegmentTable) -> LakeLinks {
    info!("IUPSEG for streams flowing out of lakes");
    let mut upstream_lake: BTreeMap<SegmentId, SegmentId> = BTreeMap::new();
    for lake in segments.iter().filter(|s| s.id.is_lake()) {
        let Downstream::Segment(target) = lake.downstream else {
            continue;
        };
        if !target.is_stream() {
            continue;
        }
        match upstream_lake.get(&target) {
            Some(&kept) if kept.number() <= lake.id.number() => {
                warn!(
                    "Lakes {kept} and {} both drain into segment {target}, keeping {kept}",
                    lake.id
                );
            }
            Some(&replaced) => {
                warn!(
                    "Lakes {replaced} and {} both drain into segment {target}, keeping {}",
                    lake.id, lake.id
                );
                upstream_lake.insert(target, lake.id);
            }
            None => {
                upstream_lake.insert(target, lake.id);
            }
        }
    }
    LakeLinks { upstream_lake }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellStore;
    use crate::network::flow_graph::build_flow_graph;
    use crate::network::segments::resolve_segments;
    use crate::network::testing::{lake, stream};

    fn seg(raw: i32) -> SegmentId {
        SegmentId::from_raw(raw).unwrap()
    }

    fn links_for(cells: Vec<crate::cell::CellRecord>) -> LakeLinks {
        let store = CellStore::from_records(cells).unwrap();
        let graph = build_flow_graph(&store).unwrap();
        resolve_lake_links(&resolve_segments(&store, &graph).unwrap())
    }

    #[test]
    fn stream_below_lake_gets_lake_id() {
        // 1 -> lake -1 -> 3 -> exit; stream 1 has no lake above it.
        let links = links_for(vec![
            stream(1, 1, 1, 1, 1),
            lake(2, 1, 2, -1, 1),
            stream(3, 1, 3, 3, 1),
        ]);
        assert_eq!(links.upstream_lake(seg(3)), Some(seg(-1)));
        assert_eq!(links.upstream_lake(seg(1)), None);
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn lake_into_lake_is_not_recorded() {
        let links = links_for(vec![lake(1, 1, 1, -1, 1), lake(2, 1, 2, -2, 1)]);
        assert!(links.is_empty());
    }

    #[test]
    fn two_lakes_into_one_stream_keep_smaller_lake_number() {
        // Lake -4 from the north and lake -2 from the west both feed stream 5.
        let links = links_for(vec![
            lake(1, 1, 2, -4, 4),
            lake(2, 2, 1, -2, 1),
            stream(3, 2, 2, 5, 1),
        ]);
        assert_eq!(links.upstream_lake(seg(5)), Some(seg(-2)));
    }
}
