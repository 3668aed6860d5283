//! # Simlog Indexer
//!
//! Discovery and classification of simulation log trees.
//!
//! ## Layout
//!
//! ```text
//! <root>/<path>
//!     └── zone/
//!          └── config/
//!               └── run/
//!                    ├── lift_logbook.csv           -> lift
//!                    ├── timeline_logbook.csv       -> timeline (level "all")
//!                    ├── 605_timeline_logbook_L3.csv -> timeline (level "L3")
//!                    └── passenger_logbook.csv      -> passenger
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use simlog_indexer::DirectoryScanner;
//!
//! #[tokio::main]
//! async fn main() -> simlog_indexer::Result<()> {
//!     let scanner = DirectoryScanner::new("public/data_dev");
//!     let tree = scanner.scan("Direct-3Zone-DD-Lunch").await?;
//!     println!("{} zones", tree.zones.len());
//!     Ok(())
//! }
//! ```

mod classifier;
mod error;
mod limits;
mod paths;
mod scanner;

pub use classifier::{
    category_of, classify, timeline_level, ClassifiedFile, CSV_EXTENSION, LIFT_LOGBOOK_MARKER,
    PASSENGER_LOGBOOK_MARKER, TIMELINE_LOGBOOK_MARKER,
};
pub use error::{IndexerError, Result};
pub use limits::{
    default_load_concurrency, parse_load_concurrency, LoadConcurrencySnapshot, LoadLimiter,
    LoadPermit, MAX_LOAD_CONCURRENCY,
};
pub use paths::{canonical_key, normalize_relative, resolve_within};
pub use scanner::DirectoryScanner;
