//! Pipeline orchestrator: runs every stage of a stream-parameters run in order.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cell::{CellRecord, CellStore};
use crate::config::{GridSpec, StreamConfig};
use crate::crt::{render_crt_files, run_crt};
use crate::error::{Result, StreamError};
use crate::network::build_network;
use crate::network::stream_links::{link_stream_lines, StreamLine};
use crate::raster::AsciiGrid;
use crate::store::{CellDatastore, JsonCellStore};
use crate::writer::{project_outputs, WriterOptions};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Export CRT inputs but do not run the tool.
    pub skip_crt: bool,
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub cells: usize,
    pub routed_cells: usize,
    pub stream_segments: usize,
    pub lake_segments: usize,
    pub pour_points: usize,
    pub lake_links: usize,
    pub stream_lines: usize,
    pub files_written: Vec<PathBuf>,
}

#[derive(Serialize, Deserialize)]
struct StreamLineDocument {
    lines: Vec<StreamLine>,
}

/// Run against the JSON cell table named in `config`.
pub fn run(config: &StreamConfig, opts: &RunOptions) -> Result<RunSummary> {
    let mut cells = JsonCellStore::new(&config.cells_path);
    run_with_store(&mut cells, config, opts)
}

/// Run against any datastore.
///
/// Every output is rendered before the first write: the network, the stream
/// lines, the parameter grids and the CRT files. A run that fails leaves the
/// datastore and the output directories untouched.
pub fn run_with_store(
    datastore: &mut impl CellDatastore,
    config: &StreamConfig,
    opts: &RunOptions,
) -> Result<RunSummary> {
    info!("Reading cell table");
    let store = CellStore::from_records(datastore.read_cells()?)?;
    let network = build_network(&store)?;

    let projected = CellStore::from_records(project_outputs(
        &store,
        &network,
        WriterOptions {
            exit_seg: config.exit_seg,
            stream_top_offset: config.stream_top_offset,
        },
    ))?;
    let lines = match &config.stream_lines_path {
        Some(path) => Some((path, link_stream_lines(&read_stream_lines(path)?))),
        None => None,
    };
    let grids = match (&config.ascii_ws, config.emit_parameter_grids) {
        (Some(ws), true) => Some((ws, render_parameter_grids(&projected, &config.grid))),
        (None, true) => {
            warn!("emit_parameter_grids is set but ascii_ws is not, skipping parameter grids");
            None
        }
        (_, false) => None,
    };
    let crt_files = render_crt_files(&projected, &config.crt, &config.grid)?;

    let mut summary = RunSummary {
        cells: store.len(),
        routed_cells: network.graph.len(),
        stream_segments: network.segments.iter().filter(|s| s.id.is_stream()).count(),
        lake_segments: network.segments.iter().filter(|s| s.id.is_lake()).count(),
        pour_points: network.basins.pour_points().len(),
        lake_links: network.lake_links.len(),
        stream_lines: lines.as_ref().map_or(0, |(_, l)| l.len()),
        files_written: Vec::new(),
    };

    datastore.write_cells(projected.records())?;
    if let Some((path, lines)) = &lines {
        write_stream_lines(path, lines)?;
    }
    if let Some((ws, grids)) = &grids {
        summary.files_written.extend(write_parameter_grids(ws, grids)?);
    }
    summary
        .files_written
        .extend(crt_files.write(&config.crt.workspace)?);

    if !opts.skip_crt {
        run_crt(&config.crt)?;
    }
    Ok(summary)
}

fn read_stream_lines(path: &Path) -> Result<Vec<StreamLine>> {
    let text = fs::read_to_string(path).map_err(|e| StreamError::io(path, e))?;
    let doc: StreamLineDocument =
        serde_json::from_str(&text).map_err(|e| StreamError::json(path, e))?;
    Ok(doc.lines)
}

fn write_stream_lines(path: &Path, lines: &[StreamLine]) -> Result<()> {
    let doc = StreamLineDocument { lines: lines.to_vec() };
    let json = serde_json::to_string_pretty(&doc).map_err(|e| StreamError::json(path, e))?;
    fs::write(path, json).map_err(|e| StreamError::io(path, e))
}

/// Model grids rendered from the finished cell table.
fn render_parameter_grids(store: &CellStore, spec: &GridSpec) -> Vec<(&'static str, String)> {
    let grids: [(&'static str, bool, fn(&CellRecord) -> f64); 6] = [
        ("hru_type.asc", true, |r| r.active_type as f64),
        ("dem_adj.asc", false, |r| r.elevation),
        ("iseg.asc", true, |r| r.display_segment_id as f64),
        ("irunbound.asc", true, |r| r.routing_segment_id as f64),
        ("segbasin.asc", true, |r| r.segbasin as f64),
        ("subbasin.asc", true, |r| r.subbasin_id as f64),
    ];
    grids
        .into_iter()
        .map(|(name, integer, value)| {
            (name, AsciiGrid::from_cells(store, spec, integer, value).to_ascii_string())
        })
        .collect()
}

fn write_parameter_grids(ws: &Path, grids: &[(&'static str, String)]) -> Result<Vec<PathBuf>> {
    info!("Output model grid ascii");
    fs::create_dir_all(ws).map_err(|e| StreamError::io(ws, e))?;
    let mut written = Vec::with_capacity(grids.len());
    for (name, text) in grids {
        let path = ws.join(name);
        fs::write(&path, text).map_err(|e| StreamError::io(&path, e))?;
        written.push(path);
    }
    Ok(written)
}
