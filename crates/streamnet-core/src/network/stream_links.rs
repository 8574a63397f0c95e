//! Line-level TOSEGMENT for stream polylines connected by shared nodes.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

/// Stream polyline from the stream-line table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamLine {
    pub id: i64,
    pub from_node: i64,
    pub to_node: i64,
    #[serde(default)]
    pub tosegment: i64,
}

/// Set each line's `tosegment` to the line starting where it ends (0 if none).
///
/// Lines are matched through a from-node index. When several lines start at
/// the same node, the lowest id wins.
pub fn link_stream_lines(lines: &[StreamLine]) -> Vec<StreamLine> {
    info!("Calculating tosegment parameter");
    let mut starts: HashMap<i64, i64> = HashMap::with_capacity(lines.len());
    for line in lines {
        starts
            .entry(line.from_node)
            .and_modify(|id| *id = (*id).min(line.id))
            .or_insert(line.id);
    }
    lines
        .iter()
        .map(|line| StreamLine {
            tosegment: starts.get(&line.to_node).copied().unwrap_or(0),
            ..line.clone()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i64, from_node: i64, to_node: i64) -> StreamLine {
        StreamLine { id, from_node, to_node, tosegment: -1 }
    }

    #[test]
    fn lines_link_through_shared_nodes() {
        // 1 -> 2 -> 3, and 4 joins 2 at node 20.
        let linked = link_stream_lines(&[
            line(1, 10, 20),
            line(2, 20, 30),
            line(3, 30, 40),
            line(4, 15, 20),
        ]);
        let to: Vec<i64> = linked.iter().map(|l| l.tosegment).collect();
        assert_eq!(to, vec![2, 3, 0, 2]);
    }

    #[test]
    fn shared_start_node_picks_lowest_id() {
        let linked = link_stream_lines(&[line(9, 1, 2), line(5, 2, 3), line(3, 2, 4)]);
        assert_eq!(linked[0].tosegment, 3);
    }

    #[test]
    fn stale_values_are_reset() {
        let linked = link_stream_lines(&[line(1, 1, 2)]);
        assert_eq!(linked[0].tosegment, 0);
    }
}
