//! Learning store for confirmed invoice-to-catalog corrections.
//!
//! Every write is an immutable [`LearningEvent`] appended to a log; the
//! current mappings are a [`Projection`] derived from that log. Replaying the
//! same log always produces the same mappings, which keeps conflict
//! resolution auditable.
//!
//! # Journal format
//!
//! A store opened with [`LearningStore::open`] appends each event as one JSON
//! object per line and replays the file on the next open:
//!
//! ```text
//! {"sequence":1,"at":"2025-01-01T00:00:00Z","pattern_key":"PANADOL|CITY PHARMA","type":"correction",...}
//! {"sequence":2,"at":"2025-01-02T00:00:00Z","pattern_key":"PANADOL|CITY PHARMA","type":"seen",...}
//! ```

mod error;
mod event;
mod policy;
mod projection;
mod store;

pub use error::{LearnError, Result};
pub use event::{CorrectionAudit, EventKind, LearningEvent};
pub use policy::LearningPolicy;
pub use projection::{Applied, Projection, Variant};
pub use store::{LearningStore, MappingStore, StoreExport, StoreStats, UnavailableStore};
