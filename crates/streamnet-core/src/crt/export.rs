//! Flat-file inputs of the Cascade Routing Tool.
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::cell::{CellCoord, CellStore};
use crate::config::{CascadeParams, CrtConfig, GridSpec};
use crate::error::{Result, StreamError};
use crate::network::flow_graph::FlowDirection;
use crate::raster::{body_lines, AsciiGrid};

pub const STREAM_CELLS_FILE: &str = "STREAM_CELLS.DAT";
pub const OUTFLOW_HRU_FILE: &str = "OUTFLOW_HRU.DAT";
pub const HRU_CASC_FILE: &str = "HRU_CASC.DAT";
pub const LAND_ELEV_FILE: &str = "LAND_ELEV.DAT";
pub const XY_FILE: &str = "XY.DAT";

// ── Line builders ─────────────────────────────────────────────────────────────

/// `[row, col, segment, reach, 1]` for every stream cell, sorted.
pub fn stream_cell_rows(store: &CellStore) -> Vec<[i32; 5]> {
    let mut rows: Vec<[i32; 5]> = store
        .records()
        .iter()
        .filter(|r| r.active_type == 1 && r.segment_id > 0)
        .map(|r| [r.row, r.col, r.segment_id, r.reach, 1])
        .collect();
    rows.sort_unstable();
    rows
}

/// Active cells whose flow leaves the model, in table order.
///
/// An explicit `outflow` flag wins; otherwise a cell is an outflow cell when
/// its D8 target is off the grid or an inactive cell. Land cells outside the
/// routed network may carry any code; an unknown code is never an outflow.
pub fn outflow_cells(store: &CellStore) -> Vec<CellCoord> {
    let mut cells = Vec::new();
    for rec in store.records().iter().filter(|r| r.is_active()) {
        let is_outflow = match rec.outflow {
            Some(flag) => flag,
            None => match FlowDirection::from_code(rec.flow_direction_code) {
                Some(dir) => {
                    let (dr, dc) = dir.offset();
                    store
                        .get(rec.coord().offset(dr, dc))
                        .map_or(true, |t| !t.is_active())
                }
                None => {
                    debug!(
                        "    Cell {} has flow code {}, not an outflow cell",
                        rec.coord(),
                        rec.flow_direction_code
                    );
                    false
                }
            },
        };
        if is_outflow {
            cells.push(rec.coord());
        }
    }
    cells
}

/// `[cell_id, x, y]` with coordinates truncated to integers, sorted.
pub fn xy_rows(store: &CellStore) -> Vec<[i64; 3]> {
    let mut rows: Vec<[i64; 3]> = store
        .records()
        .iter()
        .map(|r| [r.cell_id, r.x as i64, r.y as i64])
        .collect();
    rows.sort_unstable();
    rows
}

pub fn format_stream_cells(rows: &[[i32; 5]]) -> String {
    let mut out = format!("{}    NREACH\n", rows.len());
    for row in rows {
        out.push_str(&format!("{} {} {} {} {}\n", row[0], row[1], row[2], row[3], row[4]));
    }
    out
}

pub fn format_outflow_cells(cells: &[CellCoord]) -> String {
    let mut out = format!("{}    NUMOUTFLOWHRU\n", cells.len());
    for (i, cell) in cells.iter().enumerate() {
        out.push_str(&format!("{} {} {}   OUTFLOW_ID ROW COL\n", i + 1, cell.row, cell.col));
    }
    out
}

pub fn format_xy(rows: &[[i64; 3]]) -> String {
    rows.iter()
        .map(|row| format!("{} {} {}\n", row[0], row[1], row[2]))
        .collect()
}

/// `HRU_CASC.DAT`: cascade flags, then the HRU type grid body.
pub fn format_hru_casc(params: &CascadeParams, hru_type_grid: &str) -> String {
    let mut out = format!(
        "{} {} {} {} {} {} {} {}     HRUFLG STRMFLG FLOWFLG VISFLG IPRN IFILL DPIT OUTITMAX\n",
        params.hruflg,
        params.strmflg,
        params.flowflg,
        params.visflg,
        params.iprn,
        params.ifill,
        params.dpit,
        params.outitmax
    );
    out.push_str(&body_lines(hru_type_grid));
    out
}

/// `LAND_ELEV.DAT`: grid shape, then the adjusted DEM grid body.
pub fn format_land_elev(dem_grid: &AsciiGrid, dem_grid_text: &str) -> String {
    let mut out = format!("{} {}       NROW NCOL\n", dem_grid.nrows, dem_grid.ncols);
    out.push_str(&body_lines(dem_grid_text));
    out
}

// ── Rendering and writing ─────────────────────────────────────────────────────

/// Grid text from the external export when configured, else rendered from
/// the cell table.
fn grid_source(
    external: Option<&Path>,
    render: impl FnOnce() -> AsciiGrid,
) -> Result<(AsciiGrid, String)> {
    match external {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|e| StreamError::io(path, e))?;
            let grid = AsciiGrid::parse(&path.display().to_string(), &text)?;
            Ok((grid, text))
        }
        None => {
            let grid = render();
            let text = grid.to_ascii_string();
            Ok((grid, text))
        }
    }
}

/// Contents of every CRT input file, rendered but not yet on disk.
#[derive(Debug, Clone, Default)]
pub struct CrtFiles {
    files: Vec<(&'static str, String)>,
}

impl CrtFiles {
    pub fn names(&self) -> Vec<&'static str> {
        self.files.iter().map(|(name, _)| *name).collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, text)| text.as_str())
    }

    /// Write every file into `ws`, creating it if needed. Returns the paths written.
    pub fn write(&self, ws: &Path) -> Result<Vec<PathBuf>> {
        info!("Output CRT files");
        fs::create_dir_all(ws).map_err(|e| StreamError::io(ws, e))?;
        let mut written = Vec::with_capacity(self.files.len());
        for (name, text) in &self.files {
            let path = ws.join(name);
            info!("  {name}");
            fs::write(&path, text).map_err(|e| StreamError::io(&path, e))?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Render every CRT input file. External grids are read and checked here, so
/// a bad grid fails before anything is written. Stream-cell and outflow files
/// are left out when they would be empty.
pub fn render_crt_files(store: &CellStore, crt: &CrtConfig, grid: &GridSpec) -> Result<CrtFiles> {
    let mut files = Vec::new();

    let stream_rows = stream_cell_rows(store);
    if !stream_rows.is_empty() {
        files.push((STREAM_CELLS_FILE, format_stream_cells(&stream_rows)));
    }
    let outflow = outflow_cells(store);
    if !outflow.is_empty() {
        files.push((OUTFLOW_HRU_FILE, format_outflow_cells(&outflow)));
    }

    let (_, hru_type_text) = grid_source(crt.hru_type_ascii.as_deref(), || {
        AsciiGrid::from_cells(store, grid, true, |r| r.active_type as f64)
    })?;
    files.push((HRU_CASC_FILE, format_hru_casc(&crt.params, &hru_type_text)));

    let (dem_grid, dem_text) = grid_source(crt.dem_adj_ascii.as_deref(), || {
        AsciiGrid::from_cells(store, grid, false, |r| r.elevation)
    })?;
    files.push((LAND_ELEV_FILE, format_land_elev(&dem_grid, &dem_text)));

    files.push((XY_FILE, format_xy(&xy_rows(store))));
    Ok(CrtFiles { files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellRecord;

    fn cell(id: i64, row: i32, col: i32, active_type: i32, code: i32) -> CellRecord {
        let mut rec = CellRecord::new(id, row, col);
        rec.active_type = active_type;
        rec.flow_direction_code = code;
        rec.x = 1000.0 + col as f64 * 10.0 + 0.7;
        rec.y = 5000.0 - row as f64 * 10.0;
        rec
    }

    /// 2 x 3 grid draining east; (1,3) and (2,3) spill off the east edge,
    /// (2,1) is inactive.
    fn small_grid() -> CellStore {
        let mut cells = vec![
            cell(3, 1, 3, 1, 1),
            cell(1, 1, 1, 1, 1),
            cell(2, 1, 2, 1, 1),
            cell(4, 2, 1, 0, 1),
            cell(5, 2, 2, 1, 4),
            cell(6, 2, 3, 2, 1),
        ];
        for rec in cells.iter_mut().filter(|r| r.row == 1) {
            rec.is_stream = 1;
            rec.segment_id = 1;
            rec.routing_segment_id = 1;
            rec.reach = rec.col;
            rec.elevation = 10.5 - rec.col as f64;
        }
        CellStore::from_records(cells).unwrap()
    }

    #[test]
    fn stream_cells_sorted_with_header() {
        let rows = stream_cell_rows(&small_grid());
        assert_eq!(rows, vec![[1, 1, 1, 1, 1], [1, 2, 1, 2, 1], [1, 3, 1, 3, 1]]);
        assert_eq!(
            format_stream_cells(&rows),
            "3    NREACH\n1 1 1 1 1\n1 2 1 2 1\n1 3 1 3 1\n"
        );
    }

    #[test]
    fn outflow_cells_derived_from_flow_direction() {
        // (2,2) drains south off the grid; (1,3) and (2,3) east off the grid.
        let cells = outflow_cells(&small_grid());
        assert_eq!(
            cells,
            vec![CellCoord::new(1, 3), CellCoord::new(2, 2), CellCoord::new(2, 3)]
        );
        assert_eq!(
            format_outflow_cells(&cells[..1]),
            "1    NUMOUTFLOWHRU\n1 1 3   OUTFLOW_ID ROW COL\n"
        );
    }

    #[test]
    fn explicit_outflow_flag_wins() {
        let mut a = cell(1, 1, 1, 1, 1);
        a.outflow = Some(true);
        let mut b = cell(2, 1, 2, 1, 1);
        b.outflow = Some(false);
        let store = CellStore::from_records(vec![a, b]).unwrap();
        assert_eq!(outflow_cells(&store), vec![CellCoord::new(1, 1)]);
    }

    #[test]
    fn outflow_into_inactive_cell() {
        // (1,1) drains south into the inactive (2,1).
        let store = CellStore::from_records(vec![cell(1, 1, 1, 1, 4), cell(2, 2, 1, 0, 1)]).unwrap();
        assert_eq!(outflow_cells(&store), vec![CellCoord::new(1, 1)]);
    }

    #[test]
    fn xy_rows_truncate_and_sort() {
        let rows = xy_rows(&small_grid());
        assert_eq!(rows[0], [1, 1010, 4990]);
        assert_eq!(rows.len(), 6);
        assert!(rows.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn hru_casc_header_then_grid_body() {
        let grid = "ncols 2\nnrows 1\nxllcorner 0\nyllcorner 0\ncellsize 1\nNODATA_value -9999\n1 2\n";
        let text = format_hru_casc(&CascadeParams::default(), grid);
        assert_eq!(
            text,
            "0 0 1 1 1 1 0.01 100000     HRUFLG STRMFLG FLOWFLG VISFLG IPRN IFILL DPIT OUTITMAX\n1 2\n"
        );
    }

    #[test]
    fn export_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let crt = CrtConfig {
            workspace: dir.path().join("crt"),
            ..CrtConfig::default()
        };
        let files = render_crt_files(&small_grid(), &crt, &GridSpec::default()).unwrap();
        let written = files.write(&crt.workspace).unwrap();
        let names: Vec<String> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![STREAM_CELLS_FILE, OUTFLOW_HRU_FILE, HRU_CASC_FILE, LAND_ELEV_FILE, XY_FILE]
        );

        let land_elev = fs::read_to_string(crt.workspace.join(LAND_ELEV_FILE)).unwrap();
        let mut lines = land_elev.lines();
        assert_eq!(lines.next(), Some("2 3       NROW NCOL"));
        assert_eq!(lines.next(), Some("9.5 8.5 7.5"));

        let hru_casc = fs::read_to_string(crt.workspace.join(HRU_CASC_FILE)).unwrap();
        assert!(hru_casc.ends_with("1 1 1\n0 1 2\n"), "got {hru_casc}");
    }

    #[test]
    fn external_grid_body_is_copied_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let dem_path = dir.path().join("dem_adj.asc");
        fs::write(
            &dem_path,
            "ncols 3\nnrows 2\nxllcorner 0\nyllcorner 0\ncellsize 10\nNODATA_value -9999\n 1.25  2.5 3\n4 5 6\n",
        )
        .unwrap();
        let crt = CrtConfig {
            workspace: dir.path().join("crt"),
            dem_adj_ascii: Some(dem_path),
            ..CrtConfig::default()
        };
        let files = render_crt_files(&small_grid(), &crt, &GridSpec::default()).unwrap();
        assert_eq!(
            files.get(LAND_ELEV_FILE),
            Some("2 3       NROW NCOL\n 1.25  2.5 3\n4 5 6\n")
        );
    }

    #[test]
    fn bad_external_grid_fails_before_any_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let hru_path = dir.path().join("hru_type.asc");
        fs::write(&hru_path, "ncols 3\nnrows 2\n").unwrap();
        let crt = CrtConfig {
            workspace: dir.path().join("crt"),
            hru_type_ascii: Some(hru_path),
            ..CrtConfig::default()
        };
        let err = render_crt_files(&small_grid(), &crt, &GridSpec::default()).unwrap_err();
        assert!(matches!(err, StreamError::InvalidGrid { .. }), "got {err}");
        assert!(!crt.workspace.exists());
    }

    #[test]
    fn unknown_code_on_land_cell_is_not_outflow() {
        // (1,2) is plain land with no flow direction; (1,1) drains into it.
        let store = CellStore::from_records(vec![cell(1, 1, 1, 1, 1), cell(2, 1, 2, 1, 0)]).unwrap();
        assert!(outflow_cells(&store).is_empty());
        let files = render_crt_files(&store, &CrtConfig::default(), &GridSpec::default()).unwrap();
        assert_eq!(files.names(), vec![HRU_CASC_FILE, LAND_ELEV_FILE, XY_FILE]);
    }
}
