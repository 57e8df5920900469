//! # Paraclean
//!
//! Paraclean cleans and scores parallel corpora: sets of line-aligned text files,
//! one per language, where line `i` of every file holds translations of each other.
//!
//! Processing is described by a configuration file listing steps (filter, score, subset, sort, join, concatenate).
//!
//! ## Getting started
//!
//! ```sh
//! paraclean 0.3.0
//! parallel corpus cleaning tool.
//!
//! USAGE:
//!     paraclean <SUBCOMMAND>
//!
//! FLAGS:
//!     -h, --help       Prints help information
//!     -V, --version    Prints version information
//!
//! SUBCOMMANDS:
//!     help    Prints this message or the help of the given subcommand(s)
//!     run     Run the steps of a configuration file
//! ```
//!
//! Logging is configured through `RUST_LOG` (`RUST_LOG=info paraclean run config.json`).
use structopt::StructOpt;

use paraclean::{config::Configuration, error, steps::StepRunner};

#[macro_use]
extern crate log;

mod cli;

fn main() -> Result<(), error::Error> {
    env_logger::init();

    let opt = cli::Paraclean::from_args();
    debug!("cli args\n{:#?}", opt);

    match opt {
        cli::Paraclean::Run(r) => {
            let config = Configuration::from_path(&r.config)?;
            let runner = StepRunner::new(config)?;
            match r.single {
                Some(num) => {
                    runner.execute_step(num, r.overwrite)?;
                }
                None => {
                    let outcomes = runner.execute_steps(r.overwrite, r.last)?;
                    info!("{} steps processed", outcomes.len());
                }
            }
        }
    };
    Ok(())
}
