// archiver/src/cli.rs

/// Action selected on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Bring the named sources (all when empty) up to date.
    Fetch { sources: Vec<String> },
    Analyze,
    Series { metrics: Vec<archiver_core::series::SeriesMetric>, csv: bool },
    PuzzleIds,
    BeeWord { word: String },
}

/// Structure representing command-line arguments.
#[derive(Debug)]
pub struct Args {
    /// Settings file; the built-in layout is used without one.
    pub config: Option<std::path::PathBuf>,
    pub verbose: bool,
    pub command: Command,
}

impl Args {
    /// Parses command-line arguments using `clap`.
    ///
    /// # Returns
    /// * `Args` - Struct containing parsed arguments.
    ///
    /// # Errors
    /// * If required arguments are missing or invalid.
    pub fn parse() -> Self {
        Self::from_matches(Self::command().get_matches())
    }

    fn command() -> clap::Command {
        let metric_names: Vec<&'static str> = archiver_core::series::SeriesMetric::ALL
            .iter()
            .map(|m| m.name())
            .collect();

        clap::Command::new("archiver")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Incremental archiver for daily puzzle records")
            .arg(
                clap::Arg::new("config")
                .short('c')
                .long("config")
                .help("Path to the settings.json configuration file")
                .global(true)
                .num_args(1),
            )
            .arg(
                clap::Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log debug output unless RUST_LOG is set")
                .global(true)
                .action(clap::ArgAction::SetTrue),
            )
            .subcommand_required(true)
            .subcommand(
                clap::Command::new("fetch")
                .about("Fetch missing records of every source, or of the given ones")
                .arg(
                    clap::Arg::new("source")
                    .short('s')
                    .long("source")
                    .help("Source name from the settings file")
                    .action(clap::ArgAction::Append)
                    .num_args(1),
                ),
            )
            .subcommand(clap::Command::new("analyze").about("Update the first-guess analysis"))
            .subcommand(
                clap::Command::new("series")
                .about("Write reporting series from the summary archive")
                .arg(
                    clap::Arg::new("metric")
                    .short('m')
                    .long("metric")
                    .help("Metric to write, all when omitted")
                    .value_parser(clap::builder::PossibleValuesParser::new(metric_names))
                    .action(clap::ArgAction::Append)
                    .num_args(1),
                )
                .arg(
                    clap::Arg::new("csv")
                    .long("csv")
                    .help("Write ';'-separated CSV instead of JSON")
                    .action(clap::ArgAction::SetTrue),
                ),
            )
            .subcommand(clap::Command::new("puzzle-ids").about("Write the relevant puzzle id list"))
            .subcommand(
                clap::Command::new("bee-word")
                .about("List archived Spelling Bee puzzles accepting a word")
                .arg(clap::Arg::new("word").required(true).num_args(1)),
            )
    }

    fn from_matches(matches: clap::ArgMatches) -> Self {
        let strings = |m: &clap::ArgMatches, id: &str| -> Vec<String> {
            m.get_many::<String>(id).map(|v| v.cloned().collect()).unwrap_or_default()
        };

        let command = match matches.subcommand() {
            Some(("fetch", m)) => Command::Fetch { sources: strings(m, "source") },
            Some(("analyze", _)) => Command::Analyze,
            Some(("series", m)) => Command::Series {
                metrics: strings(m, "metric")
                    .iter()
                    .filter_map(|name| archiver_core::series::SeriesMetric::parse(name))
                    .collect(),
                csv: m.get_flag("csv"),
            },
            Some(("puzzle-ids", _)) => Command::PuzzleIds,
            Some(("bee-word", m)) => Command::BeeWord {
                word: m.get_one::<String>("word").cloned().unwrap_or_default(),
            },
            _ => unreachable!("subcommand is required"),
        };

        Args {
            config: matches.get_one::<String>("config").map(std::path::PathBuf::from),
            verbose: matches.get_flag("verbose"),
            command,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::from_matches(Args::command().try_get_matches_from(args).unwrap())
    }

    #[test]
    fn fetch_with_sources() {
        let args = parse(&["archiver", "-c", "settings.json", "fetch", "-s", "wordle_archive", "-s", "spelling_bee"]);
        assert_eq!(args.config, Some(std::path::PathBuf::from("settings.json")));
        assert_eq!(args.command, Command::Fetch {
            sources: vec!["wordle_archive".to_string(), "spelling_bee".to_string()],
        });
    }

    #[test]
    fn series_metrics_and_global_flags() {
        let args = parse(&["archiver", "series", "-m", "average", "--csv", "-v"]);
        assert!(args.verbose);
        assert!(args.config.is_none());
        assert_eq!(args.command, Command::Series {
            metrics: vec![archiver_core::series::SeriesMetric::Average],
            csv: true,
        });
    }

    #[test]
    fn rejects_unknown_metric_and_missing_subcommand() {
        assert!(Args::command().try_get_matches_from(["archiver", "series", "-m", "luck"]).is_err());
        assert!(Args::command().try_get_matches_from(["archiver"]).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }
}
