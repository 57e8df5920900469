/*! # Paraclean

Cleaning and scoring of parallel corpora.

A parallel corpus is a set of line-aligned files (a *parallel stream*): line `i` of every file
belongs to the same [record::Record]. Every operation keeps files aligned.

- [filtering]: filters/scorers over records,
- [pipeline]: ordered filter lists applied to streams,
- [processing]: steps (filter, score, subset, sort, join, concatenate),
- [config] and [steps]: configuration files and their execution,
- [models], [identifiers] and [tokenizers]: resources used by filters.
!*/
pub mod config;
pub mod error;
pub mod filtering;
pub mod identifiers;
pub mod io;
pub mod models;
pub mod pipeline;
pub mod processing;
pub mod record;
pub mod steps;
pub mod tokenizers;
