//! ESRI ASCII grids: six header lines followed by row-major values.
use std::fs;
use std::path::Path;

use crate::cell::{CellRecord, CellStore};
use crate::config::GridSpec;
use crate::error::{Result, StreamError};

/// Number of header lines in an ESRI ASCII grid.
pub const HEADER_LINES: usize = 6;

/// Row-major grid; row 0 is the northern edge.
#[derive(Debug, Clone, PartialEq)]
pub struct AsciiGrid {
    pub ncols: usize,
    pub nrows: usize,
    pub xllcorner: f64,
    pub yllcorner: f64,
    pub cellsize: f64,
    pub nodata: f64,
    pub values: Vec<f64>,
    /// Print values without decimals.
    pub integer: bool,
}

impl AsciiGrid {
    /// Render a grid from the cell table. Cell (1, 1) lands at grid (0, 0);
    /// positions without a cell hold `nodata`.
    pub fn from_cells(
        store: &CellStore,
        spec: &GridSpec,
        integer: bool,
        value: impl Fn(&CellRecord) -> f64,
    ) -> Self {
        let (nrows, ncols) = store.dimensions();
        let nodata = spec.nodata as f64;
        let mut values = vec![nodata; nrows * ncols];
        for rec in store.records() {
            let i = (rec.row as usize - 1) * ncols + (rec.col as usize - 1);
            values[i] = value(rec);
        }
        Self {
            ncols,
            nrows,
            xllcorner: spec.xllcorner,
            yllcorner: spec.yllcorner,
            cellsize: spec.cellsize,
            nodata,
            values,
            integer,
        }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.ncols + col]
    }

    /// Parse grid text. `source_name` only labels errors.
    pub fn parse(source_name: &str, text: &str) -> Result<Self> {
        let invalid = |reason: String| StreamError::InvalidGrid {
            source_name: source_name.to_string(),
            reason,
        };

        let mut lines = text.lines();
        let mut header = [None::<f64>; HEADER_LINES];
        for _ in 0..HEADER_LINES {
            let line = lines.next().ok_or_else(|| invalid("truncated header".into()))?;
            let mut parts = line.split_whitespace();
            let (Some(key), Some(raw)) = (parts.next(), parts.next()) else {
                return Err(invalid(format!("malformed header line {line:?}")));
            };
            let slot = match key.to_ascii_lowercase().as_str() {
                "ncols" => 0,
                "nrows" => 1,
                "xllcorner" | "xllcenter" => 2,
                "yllcorner" | "yllcenter" => 3,
                "cellsize" => 4,
                "nodata_value" => 5,
                other => return Err(invalid(format!("unknown header key {other:?}"))),
            };
            let v: f64 = raw
                .parse()
                .map_err(|_| invalid(format!("bad value {raw:?} for {key}")))?;
            header[slot] = Some(v);
        }
        let field = |slot: usize, name: &str| {
            header[slot].ok_or_else(|| invalid(format!("missing {name}")))
        };
        let dimension = |slot: usize, name: &str| -> Result<usize> {
            let v = field(slot, name)?;
            if v < 0.0 || v.fract() != 0.0 || v > u32::MAX as f64 {
                return Err(invalid(format!("{name} must be a non-negative integer, got {v}")));
            }
            Ok(v as usize)
        };
        let ncols = dimension(0, "ncols")?;
        let nrows = dimension(1, "nrows")?;
        let expected = ncols
            .checked_mul(nrows)
            .ok_or_else(|| invalid(format!("{nrows} x {ncols} grid is too large")))?;

        // Sized by the body actually read, never by the header.
        let mut integer = true;
        let mut values = Vec::new();
        for token in lines.flat_map(str::split_whitespace) {
            if token.contains(['.', 'e', 'E']) {
                integer = false;
            }
            values.push(
                token
                    .parse::<f64>()
                    .map_err(|_| invalid(format!("bad cell value {token:?}")))?,
            );
        }
        if values.len() != expected {
            return Err(invalid(format!(
                "expected {expected} values for {nrows} x {ncols}, found {}",
                values.len()
            )));
        }

        Ok(Self {
            ncols,
            nrows,
            xllcorner: field(2, "xllcorner")?,
            yllcorner: field(3, "yllcorner")?,
            cellsize: field(4, "cellsize")?,
            // NODATA_value is optional in the format.
            nodata: header[5].unwrap_or(-9999.0),
            values,
            integer,
        })
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| StreamError::io(path, e))?;
        Self::parse(&path.display().to_string(), &text)
    }

    pub fn to_ascii_string(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("ncols         {}\n", self.ncols));
        out.push_str(&format!("nrows         {}\n", self.nrows));
        out.push_str(&format!("xllcorner     {}\n", self.xllcorner));
        out.push_str(&format!("yllcorner     {}\n", self.yllcorner));
        out.push_str(&format!("cellsize      {}\n", self.cellsize));
        out.push_str(&format!("NODATA_value  {}\n", format_value(self.nodata, true)));
        for row in self.values.chunks(self.ncols.max(1)) {
            let line: Vec<String> = row.iter().map(|&v| format_value(v, self.integer)).collect();
            out.push_str(&line.join(" "));
            out.push('\n');
        }
        out
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_ascii_string()).map_err(|e| StreamError::io(path, e))
    }
}

fn format_value(v: f64, integer: bool) -> String {
    if integer {
        format!("{}", v.round() as i64)
    } else {
        format!("{v}")
    }
}

/// Lines after the header, verbatim and newline-terminated.
pub fn body_lines(text: &str) -> String {
    text.lines()
        .skip(HEADER_LINES)
        .flat_map(|l| [l, "\n"])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "ncols 3\nnrows 2\nxllcorner 100.0\nyllcorner 200.0\ncellsize 30\nNODATA_value -9999\n1 2 3\n4 -9999 6\n";

    #[test]
    fn parse_reads_header_and_values() {
        let grid = AsciiGrid::parse("sample", SAMPLE).unwrap();
        assert_eq!((grid.nrows, grid.ncols), (2, 3));
        assert_eq!(grid.xllcorner, 100.0);
        assert_eq!(grid.cellsize, 30.0);
        assert_eq!(grid.get(1, 2), 6.0);
        assert_eq!(grid.get(1, 1), grid.nodata);
        assert!(grid.integer);
    }

    #[test]
    fn parse_rejects_wrong_value_count() {
        let text = SAMPLE.replace("4 -9999 6\n", "4\n");
        let err = AsciiGrid::parse("short", &text).unwrap_err();
        assert!(err.to_string().contains("expected 6 values"), "got {err}");
    }

    #[test]
    fn parse_rejects_truncated_header() {
        let err = AsciiGrid::parse("stub", "ncols 3\nnrows 2\n").unwrap_err();
        assert!(matches!(err, StreamError::InvalidGrid { .. }), "got {err}");
    }

    #[test]
    fn parse_rejects_oversized_and_fractional_dimensions() {
        for (ncols, nrows) in [("1e20", "1e20"), ("3.5", "2"), ("-3", "2"), ("4294967295", "4294967295")] {
            let text = SAMPLE
                .replace("ncols 3", &format!("ncols {ncols}"))
                .replace("nrows 2", &format!("nrows {nrows}"));
            let err = AsciiGrid::parse("huge", &text).unwrap_err();
            assert!(
                matches!(err, StreamError::InvalidGrid { .. }),
                "{ncols} x {nrows}: got {err}"
            );
        }
    }

    #[test]
    fn written_grid_parses_back() {
        let grid = AsciiGrid::parse("sample", SAMPLE).unwrap();
        let text = grid.to_ascii_string();
        assert_eq!(AsciiGrid::parse("rewritten", &text).unwrap(), grid);
    }

    #[test]
    fn body_lines_strips_header_only() {
        assert_eq!(body_lines(SAMPLE), "1 2 3\n4 -9999 6\n");
    }

    #[test]
    fn from_cells_places_rows_and_fills_gaps() {
        let mut a = CellRecord::new(1, 1, 1);
        a.active_type = 1;
        let mut b = CellRecord::new(2, 2, 3);
        b.active_type = 2;
        let store = CellStore::from_records(vec![a, b]).unwrap();
        let grid = AsciiGrid::from_cells(&store, &GridSpec::default(), true, |r| r.active_type as f64);
        assert_eq!((grid.nrows, grid.ncols), (2, 3));
        assert_eq!(grid.get(0, 0), 1.0);
        assert_eq!(grid.get(1, 2), 2.0);
        assert_eq!(grid.get(0, 1), -9999.0);
        assert!(grid.to_ascii_string().ends_with("1 -9999 -9999\n-9999 -9999 2\n"));
    }
}
