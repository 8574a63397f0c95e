//! Stream network parameters for a gridded groundwater/surface-water model.
//!
//! Derives segment routing (OUTSEG), reach numbering, lake links (IUPSEG)
//! and basin membership (SEG_BASIN) from a cell table, writes them back, and
//! exports the flat-file inputs of the Cascade Routing Tool.
pub mod cell;
pub mod config;
pub mod crt;
pub mod error;
pub mod network;
pub mod pipeline;
pub mod raster;
pub mod segment_id;
pub mod store;
pub mod writer;

pub use cell::{ActiveType, CellCoord, CellRecord, CellStore};
pub use config::StreamConfig;
pub use error::{Result, StreamError};
pub use network::{build_network, DrainageNetwork};
pub use pipeline::{run, run_with_store, RunOptions, RunSummary};
pub use segment_id::{Downstream, SegmentId};
