/*! Filtering utilities

Filters (or oracles) operate on [crate::record::Record]s and implement [Filter], [Score] or both:
- [Filter] gives a keep/drop decision,
- [Score] gives a numeric (or per-stream) value that can be serialized to JSON.

Filters are immutable once built, so that they can be shared between worker threads.
Model-backed filters ([cross_entropy::CrossEntropy], [word_align::WordAlign]) only implement [Score].

Filters are selected from configuration through [OracleConfig], and dispatched through [Oracle].
! */
pub mod cross_entropy;
mod filter;
pub mod html;
pub mod langid;
pub mod length;
mod oracle;
pub mod punctuation;
pub mod script;
pub mod word_align;

pub use filter::{Filter, Mode, Score, Value};
pub use oracle::{Named, Oracle, OracleConfig};
