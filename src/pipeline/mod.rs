//! Pipelines.
//!
//! Holds the [FilterPipeline] that applies filters to parallel streams,
//! and provides a light [pipeline::Pipeline] trait implemented by every processing step.
mod filters;
#[allow(clippy::module_inception)]
pub mod pipeline;

pub use filters::{FilterPipeline, FilterStats};
pub use pipeline::Pipeline;
