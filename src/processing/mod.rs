/*! Corpus processing steps

Every step implements [crate::pipeline::Pipeline] and returns the number of records it wrote:

- [filter::FilterStep]/[filter::ScoreStep]: apply a [crate::pipeline::FilterPipeline],
- [subset::Subset]: seeded reservoir sampling,
- [sort::Sort]: external sort of texts by score fields,
- [join::Join]: row-wise merge of score streams,
- [concatenate::Concatenate]: file concatenation.

Steps write through atomic writers: an error leaves none of the step outputs behind.
!*/
pub mod concatenate;
pub mod filter;
pub mod join;
pub mod sort;
pub mod subset;

pub use concatenate::Concatenate;
pub use filter::{FilterStep, ScoreStep};
pub use join::Join;
pub use sort::Sort;
pub use subset::Subset;
