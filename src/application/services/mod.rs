//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (FileSystem, ContentProducer, etc.)
//! but are themselves concrete structs, not traits.

mod chapter;
mod dataset;
mod expander;
mod store;

pub use chapter::{ChapterService, ChapterTrees};
pub use dataset::{DatasetRecord, DatasetService};
pub use expander::{
    ExpansionReport, ExpansionService, FillErrorEvent, KilledBranch, DEFAULT_MAX_DEPTH,
    DEFAULT_MAX_RETRIES,
};
pub use store::JsonStore;
