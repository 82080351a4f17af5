//! Negotiation pipeline stages.
//!
//! Each stage is a pure-ish module the [`orchestrator`] composes:
//! extraction, timezone normalization, constraint intersection, ranking and
//! reply rendering.

pub mod composer;
pub mod extractor;
pub mod intersect;
pub mod orchestrator;
pub mod ranking;
pub mod timezone;

pub use extractor::{Extraction, Extractor, Validated};
pub use orchestrator::Orchestrator;
