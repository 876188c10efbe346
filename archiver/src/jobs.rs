// archiver/src/jobs.rs

//! Wiring of settings to archive jobs.
//! Builds transports, fetchers, stores and the controller for each configured
//! source and runs the incremental job, the analyses and the exports.

use std::sync::Arc;

use anyhow::Context;

use archiver_core::controller::{ConcurrencyController, HorizonPolicy, RunSummary};
use archiver_core::settings::{EpochKey, Settings, SourceSettings, SourceType};
use archiver_core::sources::{spelling_bee, wordle};
use archiver_core::store::ArchiveStore;
use archiver_core::{aggregate, cheating, fetcher, job, keys, records, series, utils};

pub struct JobRunner {
    settings: Settings,
    today: chrono::NaiveDate,
}

impl JobRunner {
    pub fn new(settings: Settings, today: chrono::NaiveDate) -> Self {
        Self { settings, today }
    }

    /// Runner whose boundaries resolve against the current UTC day, the day
    /// the puzzle endpoints publish by.
    pub fn for_today(settings: Settings) -> Self {
        Self::new(settings, chrono::Utc::now().date_naive())
    }

    pub fn get_today(&self) -> chrono::NaiveDate {
        self.today
    }

    /// Runs every selected source, or all of them when `only` is empty.
    /// A failing source does not stop the others; the run reports failure at the end.
    pub fn run_fetch(&self, only: &[String]) -> anyhow::Result<()> {
        for name in only {
            if !self.settings.sources.contains_key(name) {
                anyhow::bail!("Unknown source '{}'", name);
            }
        }

        let common = &self.settings.common;
        let transport: Arc<dyn fetcher::Transport> = Arc::new(fetcher::HttpClient::new(
            std::time::Duration::from_secs(common.timeout_secs),
            &common.user_agent,
        )?);

        let mut failed_sources = Vec::new();
        for (name, source) in &self.settings.sources {
            if !only.is_empty() && !only.contains(name) {
                continue;
            }
            let start_time = std::time::Instant::now();

            match self.run_source(name, source, transport.clone()) {
                Ok(incomplete) => {
                    if incomplete {
                        failed_sources.push(name.clone());
                    }
                    tracing::info!(source = %name, seconds = start_time.elapsed().as_secs_f64(), "Source done");
                }
                Err(e) => {
                    tracing::error!(source = %name, error = %format!("{:#}", e), "Source failed");
                    failed_sources.push(name.clone());
                }
            }
        }

        if !failed_sources.is_empty() {
            anyhow::bail!("Sources did not complete: {}", failed_sources.join(", "));
        }
        anyhow::Ok(())
    }

    fn controller(&self, source: &SourceSettings) -> ConcurrencyController {
        let common = &self.settings.common;
        ConcurrencyController::new()
            .with_workers(common.workers)
            .with_batch_size(common.batch_size)
            .with_dispatch_delay(std::time::Duration::from_millis(common.dispatch_delay_ms))
            .with_transient_abort_threshold(common.transient_abort_threshold)
            .with_horizon_policy(HorizonPolicy::new(&source.horizon_on))
    }

    /// Returns whether the run ended incomplete because of transient failures.
    fn run_source(
        &self,
        name: &str,
        source: &SourceSettings,
        transport: Arc<dyn fetcher::Transport>,
    ) -> anyhow::Result<bool> {
        let controller = self.controller(source);
        let boundary = source.boundary.resolve(self.today);

        let incomplete = match &source.source_type {
            SourceType::WordleArchive { solution_url } => {
                let fetcher = wordle::SolutionFetcher::new(transport).with_url_template(solution_url);
                let store = ArchiveStore::new(&source.output_path, wordle::SolutionSchema);
                report(job::run_incremental(name, &store, &fetcher, date_epoch(name, source)?, boundary, &controller)?)
            }
            SourceType::WordleSolutions { solution_url } => {
                let fetcher = wordle::SolutionFetcher::new(transport).with_url_template(solution_url);
                let index = aggregate::SolutionsIndex::new(&source.output_path);
                report(job::run_incremental(name, &index, &fetcher, date_epoch(name, source)?, boundary, &controller)?)
            }
            SourceType::WordleSummaries { solution_url, summary_url } => {
                let solutions = wordle::SolutionFetcher::new(transport).with_url_template(solution_url);
                let fetcher = wordle::SummaryFetcher::new(solutions).with_url_template(summary_url);
                let store = ArchiveStore::new(&source.output_path, wordle::SummarySchema);
                report(job::run_incremental(name, &store, &fetcher, date_epoch(name, source)?, boundary, &controller)?)
            }
            SourceType::GuessesByRound { mode, solution_url, guesses_url } => {
                let solutions = wordle::SolutionFetcher::new(transport).with_url_template(solution_url);
                let fetcher = wordle::GuessesByRoundFetcher::new(solutions, *mode).with_url_template(guesses_url);
                let store = ArchiveStore::new(&source.output_path, wordle::GuessesByRoundSchema::new(*mode));
                report(job::run_incremental(name, &store, &fetcher, date_epoch(name, source)?, boundary, &controller)?)
            }
            SourceType::SpellingBee { puzzle_url, first_puzzle_date } => {
                let EpochKey::Number(epoch) = source.epoch else {
                    anyhow::bail!("Source '{}': epoch must be a puzzle number", name);
                };
                let fetcher = spelling_bee::SpellingBeeFetcher::new(transport)
                    .with_url_template(puzzle_url)
                    .with_first_puzzle_date(*first_puzzle_date);
                let store = ArchiveStore::new(&source.output_path, spelling_bee::SpellingBeeSchema::new(*first_puzzle_date));
                let boundary = source.boundary.resolve_number(self.today, *first_puzzle_date);
                report(job::run_incremental(name, &store, &fetcher, epoch, boundary, &controller)?)
            }
        };

        anyhow::Ok(incomplete)
    }

    /// Extends the first-guess analysis of both modes.
    pub fn run_analysis(&self) -> anyhow::Result<()> {
        let analysis = self.settings.analysis.as_ref()
            .context("No analysis section in settings")?;
        let end = analysis.boundary.resolve(self.today);

        for mode in records::Mode::ALL {
            let (Some(guesses_path), Some(output_path)) =
                (analysis.guesses_paths.get(&mode), analysis.output_paths.get(&mode)) else {
                anyhow::bail!("Analysis paths for '{}' mode are missing", mode);
            };
            let store = ArchiveStore::new(guesses_path, wordle::GuessesByRoundSchema::new(mode));
            let summary = cheating::update_analysis(&store, std::path::Path::new(output_path), analysis.start_date, end)
                .with_context(|| format!("First-guess analysis failed for '{}' mode", mode))?;
            tracing::info!(%mode, added = summary.added, unavailable = summary.unavailable, "Analysis updated");
        }

        anyhow::Ok(())
    }

    /// Writes the series of `metrics` (all when empty) as JSON, or CSV with `as_csv`.
    pub fn run_series(&self, metrics: &[series::SeriesMetric], as_csv: bool) -> anyhow::Result<()> {
        let series_settings = self.settings.series.as_ref()
            .context("No series section in settings")?;
        let store = ArchiveStore::new(&series_settings.summaries_path, wordle::SummarySchema);
        let summaries = store.load_all()?;
        let output_dir = std::path::Path::new(&series_settings.output_dir);

        let requested = !metrics.is_empty();
        let metrics = if requested { metrics.to_vec() } else { series::SeriesMetric::ALL.to_vec() };
        for metric in metrics {
            let derived = match series::DerivedSeries::compute(&summaries, metric) {
                Ok(derived) => derived,
                Err(e) if !requested => {
                    tracing::warn!(%metric, reason = %e, "Skipping series");
                    continue;
                }
                Err(e) => return Err(e),
            };
            let path = if as_csv {
                let path = output_dir.join(format!("{}.csv", metric));
                derived.export_csv(&path)?;
                path
            } else {
                let path = output_dir.join(format!("{}.json", metric));
                utils::write_json(&path, &derived)?;
                path
            };
            tracing::info!(%metric, points = derived.points.len(), global_mean = derived.global_mean, path = %path.display(), "Series written");
        }

        anyhow::Ok(())
    }

    pub fn run_puzzle_ids(&self) -> anyhow::Result<()> {
        let puzzle_ids = self.settings.puzzle_ids.as_ref()
            .context("No puzzle_ids section in settings")?;
        let store = ArchiveStore::new(&puzzle_ids.archive_path, wordle::SolutionSchema);
        let solutions = store.load_all()?;

        let ids = aggregate::PuzzleIds::build(&solutions, puzzle_ids.skip_first, chrono::Local::now().naive_local());
        utils::write_json(std::path::Path::new(&puzzle_ids.output_path), &ids)?;
        tracing::info!(count = ids.puzzle_ids.len(), path = %puzzle_ids.output_path, "Puzzle ids written");

        anyhow::Ok(())
    }

    /// Archived Spelling Bee puzzles in which `word` could have been played.
    pub fn find_bee_word(&self, word: &str) -> anyhow::Result<Vec<records::SpellingBeePuzzle>> {
        let word = word.trim().to_uppercase();
        if word.chars().count() < spelling_bee::MIN_WORD_LEN {
            anyhow::bail!("Words must have at least {} letters", spelling_bee::MIN_WORD_LEN);
        }

        let mut matches = Vec::new();
        for (_, source) in self.settings.spelling_bee_sources() {
            let SourceType::SpellingBee { first_puzzle_date, .. } = &source.source_type else { continue };
            let store = ArchiveStore::new(&source.output_path, spelling_bee::SpellingBeeSchema::new(*first_puzzle_date));
            matches.extend(
                store.load_all()?
                    .into_iter()
                    .filter(|puzzle| spelling_bee::is_word_possible(&word, puzzle)),
            );
        }

        anyhow::Ok(matches)
    }
}

fn date_epoch(name: &str, source: &SourceSettings) -> anyhow::Result<chrono::NaiveDate> {
    match source.epoch {
        EpochKey::Date(date) => anyhow::Ok(date),
        EpochKey::Number(_) => anyhow::bail!("Source '{}': epoch must be a YYYY-MM-DD date", name),
    }
}

fn report<K: keys::ArchiveKey>(summary: RunSummary<K>) -> bool {
    if summary.aborted {
        tracing::warn!(failed = summary.failed, unreached = summary.unreached, "Run aborted after repeated transient failures");
    }
    summary.aborted || summary.retry_from.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use archiver_core::store::Archive;

    fn puzzle(number: u64, letters: &[&str]) -> records::SpellingBeePuzzle {
        records::SpellingBeePuzzle {
            date: keys::number_to_date(spelling_bee::first_puzzle_date(), number),
            puzzle_number: number,
            letters: records::BeeLetters::from_letters(letters.iter().map(|l| l.to_string()).collect()).unwrap(),
        }
    }

    #[test]
    fn bee_word_lookup_reads_archive() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::builtin();
        let bee_dir = dir.path().join("bee");
        settings.sources.get_mut("spelling_bee").unwrap().output_path = bee_dir.display().to_string();

        let store = ArchiveStore::new(&bee_dir, spelling_bee::SpellingBeeSchema::default());
        store.write(&puzzle(10, &["C", "A", "E", "N", "R", "S", "T"])).unwrap();
        store.write(&puzzle(11, &["A", "B", "D", "E", "I", "L", "O"])).unwrap();

        let runner = JobRunner::new(settings, chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let found = runner.find_bee_word("crane").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].puzzle_number, 10);

        assert!(runner.find_bee_word("cat").is_err());
    }

    fn summary(day: u32, word: &str, average: f64) -> records::WordleSummaryRecord {
        records::WordleSummaryRecord {
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            solution: word.to_string(),
            days_since_launch: 925 + day as u64,
            summary: serde_json::from_value(serde_json::json!({
                "average": {"normal": average, "hard": average - 0.2},
            }))
            .unwrap(),
        }
    }

    #[test]
    fn series_without_metric_skips_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::builtin();
        let summaries_dir = dir.path().join("summaries");
        let output_dir = dir.path().join("series");
        settings.series = Some(archiver_core::settings::SeriesSettings {
            summaries_path: summaries_dir.display().to_string(),
            output_dir: output_dir.display().to_string(),
        });

        let store = ArchiveStore::new(&summaries_dir, wordle::SummarySchema);
        store.write(&summary(1, "crane", 4.1)).unwrap();
        store.write(&summary(2, "slate", 3.9)).unwrap();

        let runner = JobRunner::new(settings, chrono::NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        runner.run_series(&[], false).unwrap();
        assert!(output_dir.join("average.json").is_file());
        assert!(output_dir.join("difference.json").is_file());
        assert!(!output_dir.join("efficiency.json").exists());

        assert!(runner.run_series(&[series::SeriesMetric::Efficiency], false).is_err());
    }

    #[test]
    fn today_is_the_utc_day() {
        let before = chrono::Utc::now().date_naive();
        let today = JobRunner::for_today(Settings::builtin()).get_today();
        let after = chrono::Utc::now().date_naive();
        assert!(today == before || today == after);
    }

    #[test]
    fn unknown_source_is_rejected() {
        let runner = JobRunner::new(Settings::builtin(), chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(runner.run_fetch(&["nope".to_string()]).is_err());
    }
}
