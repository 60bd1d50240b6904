//! Input loading for invoice matching.
//!
//! Every input is a comma-separated file with one header row. Columns are
//! found by header name (case-insensitive, with a few accepted aliases), so
//! column order and extra columns do not matter.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use pharm_ingest::{load_catalog, load_invoice};
//!
//! let catalog = load_catalog(Path::new("data/master.csv"))?;
//! let lines = load_invoice(Path::new("data/invoice.csv"))?;
//! ```

mod catalog;
mod corrections;
mod error;
mod invoice;
mod purchases;
mod results;
mod table;

// === Error Types ===
pub use error::{IngestError, Result};

// === Loaders ===
pub use catalog::load_catalog;
pub use corrections::load_corrections;
pub use invoice::load_invoice;
pub use purchases::load_purchases;

// === Output ===
pub use results::{RESULT_COLUMNS, write_results};

// === CSV Reading ===
pub use table::{CsvTable, Row};
