//! # Simlog Tabular
//!
//! Loads delimited simulation logbooks into column-oriented datasets.
//!
//! ## Pipeline
//!
//! ```text
//! ResourceLocation (path | http(s) URL)
//!     │
//!     ├──> read bytes (tokio::fs / reqwest), bounded by LoadOptions::timeout
//!     │
//!     ├──> parse_delimited (header row, quoting, CR/LF/CRLF)
//!     │      └─> TabularDataset of text cells
//!     │
//!     └──> coerce_numeric (optional first-row typing pass)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use simlog_tabular::{ResourceLocation, TabularLoader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), simlog_tabular::TabularError> {
//!     let loader = TabularLoader::default();
//!     let location = ResourceLocation::parse("data/zone_1/cfg/run_1/lift_logbook.csv")?;
//!     let dataset = loader.load(&location).await?;
//!     println!("{} rows x {} columns", dataset.row_count, dataset.col_count);
//!     Ok(())
//! }
//! ```

mod error;
mod loader;
mod location;
mod parse;
mod typing;

pub use error::{Result, TabularError};
pub use loader::{LoadOptions, TabularLoader};
pub use location::{is_http_url, ResourceLocation};
pub use parse::{parse_delimited, DEFAULT_DELIMITER};
pub use typing::{coerce_numeric, infer_column, ColumnKind};
