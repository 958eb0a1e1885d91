//! MemeLingo client core.
//!
//! Everything the UI layer builds on: the local persistence store, the meme
//! feed client, the lesson-generation API client, the lesson workflow state
//! machine and the account statistics. UI rendering lives elsewhere; this
//! crate owns the data and the sequencing.

pub mod api;
pub mod feed;
pub mod quiz;
pub mod stats;
pub mod storage;
pub mod workflow;
