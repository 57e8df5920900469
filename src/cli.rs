//! Command line arguments and parameters management/parsing.
use std::path::PathBuf;

use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "paraclean", about = "parallel corpus cleaning tool.")]
/// Holds every command that is callable by the `paraclean` command.
pub enum Paraclean {
    #[structopt(about = "Run the steps of a configuration file")]
    Run(Run),
}

#[derive(Debug, StructOpt)]
/// Run command and parameters.
/// ```sh
/// paraclean-run 0.3.0
/// Run the steps of a configuration file
///
/// USAGE:
///     paraclean run [FLAGS] [OPTIONS] <config>
///
/// FLAGS:
///     -h, --help         Prints help information
///         --overwrite    overwrite existing outputs instead of skipping steps
///     -V, --version      Prints version information
///
/// OPTIONS:
///         --last <last>        run steps up to this one (1-based)
///         --single <single>    run only this step (1-based, negative values count from the end)
///
/// ARGS:
///     <config>    configuration file (JSON)
/// ```
pub struct Run {
    #[structopt(parse(from_os_str), help = "configuration file (JSON)")]
    pub config: PathBuf,
    #[structopt(
        long = "overwrite",
        help = "overwrite existing outputs instead of skipping steps"
    )]
    pub overwrite: bool,
    #[structopt(long = "last", help = "run steps up to this one (1-based)")]
    pub last: Option<usize>,
    #[structopt(
        long = "single",
        allow_hyphen_values = true,
        conflicts_with = "last",
        help = "run only this step (1-based, negative values count from the end)"
    )]
    pub single: Option<isize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run() {
        let Paraclean::Run(run) =
            Paraclean::from_iter(["paraclean", "run", "config.json", "--single", "-1"]);
        assert_eq!(run.config, PathBuf::from("config.json"));
        assert_eq!(run.single, Some(-1));
        assert!(!run.overwrite);

        let Paraclean::Run(run) =
            Paraclean::from_iter(["paraclean", "run", "config.json", "--overwrite", "--last", "2"]);
        assert!(run.overwrite);
        assert_eq!(run.last, Some(2));
    }

    #[test]
    fn conflicting_selection() {
        assert!(Paraclean::from_iter_safe([
            "paraclean", "run", "c.json", "--last", "1", "--single", "2"
        ])
        .is_err());
    }
}
