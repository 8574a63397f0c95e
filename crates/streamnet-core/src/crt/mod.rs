//! Cascade Routing Tool (CRT) support: input export and invocation.
pub mod export;
pub mod runner;

pub use export::{render_crt_files, CrtFiles};
pub use runner::{run_crt, UNDECLARED_SWALE_SENTINEL};
