//! Record-oriented datastore the cell table is read from and written back to.
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::cell::CellRecord;
use crate::error::{Result, StreamError};

/// Source and sink of cell rows. A run reads once and writes once.
pub trait CellDatastore {
    fn read_cells(&self) -> Result<Vec<CellRecord>>;

    /// Overwrite the stored rows with `cells`.
    fn write_cells(&mut self, cells: &[CellRecord]) -> Result<()>;
}

#[derive(Serialize, Deserialize)]
struct CellDocument {
    cells: Vec<CellRecord>,
}

/// JSON document `{ "cells": [...] }` on disk, rewritten in place.
#[derive(Debug, Clone)]
pub struct JsonCellStore {
    path: PathBuf,
}

impl JsonCellStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CellDatastore for JsonCellStore {
    fn read_cells(&self) -> Result<Vec<CellRecord>> {
        let text = fs::read_to_string(&self.path).map_err(|e| StreamError::io(&self.path, e))?;
        let doc: CellDocument =
            serde_json::from_str(&text).map_err(|e| StreamError::json(&self.path, e))?;
        Ok(doc.cells)
    }

    fn write_cells(&mut self, cells: &[CellRecord]) -> Result<()> {
        let doc = CellDocument { cells: cells.to_vec() };
        let json = serde_json::to_string_pretty(&doc).map_err(|e| StreamError::json(&self.path, e))?;
        fs::write(&self.path, json).map_err(|e| StreamError::io(&self.path, e))
    }
}

/// Vec-backed store for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryCellStore {
    pub cells: Vec<CellRecord>,
}

impl MemoryCellStore {
    pub fn new(cells: Vec<CellRecord>) -> Self {
        Self { cells }
    }
}

impl CellDatastore for MemoryCellStore {
    fn read_cells(&self) -> Result<Vec<CellRecord>> {
        Ok(self.cells.clone())
    }

    fn write_cells(&mut self, cells: &[CellRecord]) -> Result<()> {
        self.cells = cells.to_vec();
        Ok(())
    }
}
