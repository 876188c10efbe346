// archiver/src/main.rs

mod cli;
mod jobs;

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let start_time = std::time::Instant::now();

    let args = cli::Args::parse();
    init_tracing(args.verbose);

    let settings = match &args.config {
        Some(path) => archiver_core::settings::Settings::load(path)?,
        None => archiver_core::settings::Settings::builtin(),
    };
    let runner = jobs::JobRunner::for_today(settings);

    match &args.command {
        cli::Command::Fetch { sources } => runner.run_fetch(sources)?,
        cli::Command::Analyze => runner.run_analysis()?,
        cli::Command::Series { metrics, csv } => runner.run_series(metrics, *csv)?,
        cli::Command::PuzzleIds => runner.run_puzzle_ids()?,
        cli::Command::BeeWord { word } => {
            let puzzles = runner.find_bee_word(word)?;
            if puzzles.is_empty() {
                println!("'{}' was not possible in any archived puzzle", word);
            }
            for puzzle in puzzles {
                println!(
                    "#{} {} {}",
                    puzzle.puzzle_number,
                    archiver_core::keys::format_date(&puzzle.date),
                    puzzle.letters.all_letters.concat(),
                );
            }
        }
    }

    tracing::info!("Finished in {:.3} seconds", start_time.elapsed().as_secs_f64());
    anyhow::Ok(())
}
