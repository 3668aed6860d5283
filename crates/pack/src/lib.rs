//! # Simlog Pack
//!
//! Turns a classified `RunId -> Run` subtree into a [`SimDataPack`] by loading
//! every selected logbook, isolating per-file failures as warnings.
//!
//! ```text
//! simTree ──> DataPackRequest::from_json (shape check, 400 on failure)
//!    │
//!    └──> PackAggregator::aggregate
//!           ├─> lift / passenger: first file per run
//!           ├─> timeline: every file, keyed by level
//!           └─> TabularLoader per file (bounded by LoadLimiter)
//! ```
//!
//! [`SimDataPack`]: simlog_protocol::SimDataPack

mod aggregate;
mod error;
mod request;

pub use aggregate::PackAggregator;
pub use error::{PackError, Result};
pub use request::{parse_sim_tree, DataPackRequest};
