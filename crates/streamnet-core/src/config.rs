//! Run configuration, read from a JSON file.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StreamError};

/// Top-level configuration for one stream-parameters run.
///
/// Relative paths are resolved against the directory of the configuration
/// file by [`StreamConfig::load`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Cell table (`{ "cells": [...] }`), rewritten in place.
    pub cells_path: PathBuf,
    /// Optional stream polyline table (`{ "lines": [...] }`).
    pub stream_lines_path: Option<PathBuf>,
    /// Table value written for segments that leave the domain.
    pub exit_seg: i32,
    /// Stream top = adjusted elevation minus this offset.
    pub stream_top_offset: f64,
    /// Directory for parameter grids; grids are skipped when unset.
    pub ascii_ws: Option<PathBuf>,
    pub emit_parameter_grids: bool,
    pub grid: GridSpec,
    pub crt: CrtConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            cells_path: PathBuf::from("cells.json"),
            stream_lines_path: None,
            exit_seg: 0,
            stream_top_offset: 1.0,
            ascii_ws: None,
            emit_parameter_grids: false,
            grid: GridSpec::default(),
            crt: CrtConfig::default(),
        }
    }
}

/// Georeferencing used when grids are rendered from the cell table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct GridSpec {
    pub xllcorner: f64,
    pub yllcorner: f64,
    pub cellsize: f64,
    pub nodata: i32,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self { xllcorner: 0.0, yllcorner: 0.0, cellsize: 1.0, nodata: -9999 }
    }
}

/// Cascade Routing Tool inputs and invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrtConfig {
    /// Working directory of the tool; the exported files land here.
    pub workspace: PathBuf,
    /// Executable; the tool is not run when unset.
    pub executable: Option<PathBuf>,
    pub args: Vec<String>,
    /// Log file the tool writes into its workspace.
    pub log_name: String,
    /// External ASCII export of the HRU type grid.
    pub hru_type_ascii: Option<PathBuf>,
    /// External ASCII export of the adjusted DEM grid.
    pub dem_adj_ascii: Option<PathBuf>,
    pub params: CascadeParams,
}

impl Default for CrtConfig {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from("crt"),
            executable: None,
            args: Vec::new(),
            log_name: "outputstat.txt".to_string(),
            hru_type_ascii: None,
            dem_adj_ascii: None,
            params: CascadeParams::default(),
        }
    }
}

/// Control flags written on the first line of `HRU_CASC.DAT`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeParams {
    pub hruflg: i32,
    pub strmflg: i32,
    pub flowflg: i32,
    pub visflg: i32,
    pub iprn: i32,
    pub ifill: i32,
    pub dpit: f64,
    pub outitmax: i64,
}

impl Default for CascadeParams {
    fn default() -> Self {
        Self {
            hruflg: 0,
            strmflg: 0,
            flowflg: 1,
            visflg: 1,
            iprn: 1,
            ifill: 1,
            dpit: 0.01,
            outitmax: 100_000,
        }
    }
}

impl StreamConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| StreamError::io(path, e))?;
        let mut config: StreamConfig =
            serde_json::from_str(&text).map_err(|e| StreamError::json(path, e))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.resolve_paths(base);
        Ok(config)
    }

    /// Make every relative path absolute with respect to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.cells_path);
        join(&mut self.crt.workspace);
        for p in [
            self.stream_lines_path.as_mut(),
            self.ascii_ws.as_mut(),
            self.crt.hru_type_ascii.as_mut(),
            self.crt.dem_adj_ascii.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            join(p);
        }
        // A bare program name is looked up on PATH; anything with a
        // directory component is relative to the configuration file.
        if let Some(exe) = self.crt.executable.as_mut() {
            if exe.components().count() > 1 {
                join(exe);
            }
        }
    }
}
