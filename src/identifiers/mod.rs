/*! Language identification models

Holds an [Identifier] trait for implementing other ones, and the [Backend] enum that selects one by name:

- `whatlang`: trigram-based detector, always available,
- `fasttext`: [fasttext](https://fasttext.cc) classifier, behind the `fasttext` feature.

The `fasttext` crate builds the C++ fasttext library, so it is left out of default builds.
A default build only has `whatlang`; configurations asking for `fasttext` fail with a
configuration error before any record is read. Build (and test) the second backend with
`cargo test --features fasttext`. [Backend::available] lists the methods of the current build.
!*/
#[cfg(feature = "fasttext")]
mod fasttext;
mod identification;
mod identifier;
pub mod tag_convert;
mod whatlang;

#[cfg(feature = "fasttext")]
pub use self::fasttext::FastText;
pub use self::whatlang::Whatlang;
pub use identification::Identification;
pub use identifier::{Backend, Identifier};
