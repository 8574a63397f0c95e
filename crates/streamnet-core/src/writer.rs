//! Projection of the drainage network back onto the cell table's output columns.
use tracing::{debug, info};

use crate::cell::{ActiveType, CellRecord, CellStore};
use crate::network::DrainageNetwork;
use crate::segment_id::Downstream;

/// Table encodings the writer needs from the configuration.
#[derive(Debug, Clone, Copy)]
pub struct WriterOptions {
    /// Value written for segments that leave the domain.
    pub exit_seg: i32,
    /// Stream top = elevation minus this offset.
    pub stream_top_offset: f64,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self { exit_seg: 0, stream_top_offset: 1.0 }
    }
}

/// Return a copy of every row with the output columns filled in.
///
/// Inactive cells get zeros throughout. The input store is left untouched.
pub fn project_outputs(
    store: &CellStore,
    network: &DrainageNetwork,
    opts: WriterOptions,
) -> Vec<CellRecord> {
    info!("Save IREACH and OUTSEG");
    store
        .records()
        .iter()
        .map(|rec| project_cell(rec, network, opts))
        .collect()
}

fn project_cell(rec: &CellRecord, network: &DrainageNetwork, opts: WriterOptions) -> CellRecord {
    let mut out = CellRecord {
        tosegment: 0,
        outseg: 0,
        reach: 0,
        maxreach: 0,
        iupseg: 0,
        segbasin: 0,
        stream_top: 0.0,
        display_segment_id: 0,
        ..rec.clone()
    };
    let Some(active) = ActiveType::from_code(rec.active_type) else {
        return out;
    };
    if active == ActiveType::Inactive {
        return out;
    }

    let routed = if rec.is_routed() {
        network.segments.segment_of(rec.coord())
    } else {
        None
    };
    if let Some(seg) = routed {
        out.outseg = seg.downstream.to_raw(opts.exit_seg);
        out.tosegment = match seg.downstream {
            Downstream::Segment(id) => id.to_raw(),
            Downstream::Exit => 0,
        };
        if seg.id.is_stream() {
            out.reach = seg.reach(rec.coord()) as i32;
            out.maxreach = seg.max_reach() as i32;
            if active == ActiveType::Land {
                out.iupseg = network
                    .lake_links
                    .upstream_lake(seg.id)
                    .map_or(0, |lake| lake.to_raw());
            }
        }
    }

    if let Some(id) = rec.routing_segment() {
        out.segbasin = match network.basins.pourseg(id) {
            Some(pour) => pour.to_raw(),
            None => {
                debug!("    Cell {} references unresolved segment {id}", rec.coord());
                0
            }
        };
    }

    if active == ActiveType::Land && rec.segment_id != 0 {
        out.stream_top = rec.elevation - opts.stream_top_offset;
    }

    out.display_segment_id = if active == ActiveType::Lake && rec.segment_id < 0 {
        0
    } else {
        rec.segment_id
    };
    out
}
