//! Confluence Cloud transformations
//!
//! - [`types`]: raw API response models
//! - [`normalize`]: raw responses to stable records and envelopes
//! - [`payload`]: write payloads, dry-run previews and CQL helpers

pub mod normalize;
pub mod payload;
pub mod types;

pub use normalize::{
    Envelope, Identity, PageRecord, PageRequest, PageSummary, SearchHit, SpaceSummary,
};
pub use payload::{PageUpdate, WriteAction};
