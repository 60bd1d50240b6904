//! Text normalization for pharmaceutical item and supplier names.
//!
//! Invoice text and catalog names go through the same [`Normalizer`] so the
//! matcher compares like with like. The [`Vocabulary`] that drives it is
//! configuration and can be loaded from TOML.

pub mod error;
pub mod normalizer;
pub mod vocabulary;

pub use error::{NormalizeError, Result};
pub use normalizer::{
    ExtractedFields, Normalize, NormalizedText, Normalizer, clean_basic, simplify_supplier,
};
pub use vocabulary::Vocabulary;
