// archiver_core/src/sources/wordle.rs

//! Wordle sources: daily solutions, crowd summaries and per-round guess
//! distributions. The latter two are keyed by date but published under the
//! solution word, so they first resolve the solution for the date.

use std::sync::Arc;

use crate::fetcher;
use crate::fetcher::{FetchError, RecordFetcher, Transport};
use crate::file_names;
use crate::keys;
use crate::records;
use crate::store::RecordSchema;
use crate::utils;

pub const DEFAULT_SOLUTION_URL: &str = "https://www.nytimes.com/svc/wordle/v2/{date}.json";
pub const DEFAULT_SUMMARY_URL: &str =
    "https://static01.nyt.com/newsgraphics/2022/2022-01-25-wordle-solver/{solution}/summary.json";
pub const DEFAULT_GUESSES_URL: &str =
    "https://static01.nyt.com/newsgraphics/2022/2022-01-25-wordle-solver/{solution}/guesses-by-round-{mode}.json";

/// Day before Wordle #0 (2021-06-19).
pub fn launch_epoch() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2021, 6, 18).unwrap_or_default()
}

/// Day before the first archived guesses-by-round distribution (2023-03-29).
pub fn guesses_epoch() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2023, 3, 28).unwrap_or_default()
}

fn parse_body<T: serde::de::DeserializeOwned>(url: &str, body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::validation(url, e))
}

// --- Solutions ---

/// Fetches the solution published for a date.
#[derive(Clone)]
pub struct SolutionFetcher {
    transport: Arc<dyn Transport>,
    url_template: String,
}

impl SolutionFetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            url_template: DEFAULT_SOLUTION_URL.to_string(),
        }
    }

    pub fn with_url_template(mut self, url_template: &str) -> Self {
        self.url_template = url_template.to_string();
        self
    }
}

impl RecordFetcher for SolutionFetcher {
    type Key = chrono::NaiveDate;
    type Record = records::WordleSolution;

    fn fetch(&self, date: &chrono::NaiveDate) -> Result<records::WordleSolution, FetchError> {
        let date_str = keys::format_date(date);
        let url = fetcher::fill_template(&self.url_template, &[("date", &date_str)]);
        let body = self.transport.get(&url)?;
        let solution: records::WordleSolution = parse_body(&url, &body)?;

        if solution.print_date != *date {
            return Err(FetchError::validation(
                &url,
                format!("print_date {} does not match requested {}", solution.print_date, date_str),
            ));
        }
        if !file_names::is_word(&solution.solution) {
            return Err(FetchError::validation(&url, format!("unexpected solution '{}'", solution.solution)));
        }
        tracing::info!(date = %date_str, solution = %solution.solution, days_since_launch = solution.days_since_launch, "Fetched solution");

        Ok(solution)
    }
}

/// `{date}.json` holding the solution response verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolutionSchema;

impl RecordSchema for SolutionSchema {
    type Key = chrono::NaiveDate;
    type Record = records::WordleSolution;

    fn key_of(&self, record: &records::WordleSolution) -> chrono::NaiveDate {
        record.print_date
    }

    fn file_name(&self, record: &records::WordleSolution) -> String {
        file_names::format_dated(&record.print_date)
    }

    fn key_from_file_name(&self, file_name: &str) -> Option<chrono::NaiveDate> {
        file_names::parse_dated(file_name)
    }

    fn exact_file_name(&self, key: &chrono::NaiveDate) -> Option<String> {
        Some(file_names::format_dated(key))
    }

    fn encode(&self, record: &records::WordleSolution) -> anyhow::Result<String> {
        utils::to_pretty_json(record)
    }

    fn decode(&self, _file_name: &str, contents: &str) -> anyhow::Result<records::WordleSolution> {
        serde_json::from_str(contents)
            .map_err(|e| anyhow::anyhow!("Invalid solution record: {}", e))
    }
}

// --- Summaries ---

/// Fetches the crowd summary for the solution of a date.
#[derive(Clone)]
pub struct SummaryFetcher {
    solutions: SolutionFetcher,
    url_template: String,
}

impl SummaryFetcher {
    pub fn new(solutions: SolutionFetcher) -> Self {
        Self {
            solutions,
            url_template: DEFAULT_SUMMARY_URL.to_string(),
        }
    }

    pub fn with_url_template(mut self, url_template: &str) -> Self {
        self.url_template = url_template.to_string();
        self
    }
}

impl RecordFetcher for SummaryFetcher {
    type Key = chrono::NaiveDate;
    type Record = records::WordleSummaryRecord;

    fn fetch(&self, date: &chrono::NaiveDate) -> Result<records::WordleSummaryRecord, FetchError> {
        let solution = self.solutions.fetch(date)?;
        let url = fetcher::fill_template(&self.url_template, &[("solution", &solution.solution)]);
        let body = self.solutions.transport.get(&url)?;
        let summary: records::WordleSummary = parse_body(&url, &body)?;

        Ok(records::WordleSummaryRecord {
            date: *date,
            solution: solution.solution,
            days_since_launch: solution.days_since_launch,
            summary,
        })
    }
}

/// `summary_{solution},{days_since_launch},{date}.json` holding the summary body.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummarySchema;

impl RecordSchema for SummarySchema {
    type Key = chrono::NaiveDate;
    type Record = records::WordleSummaryRecord;

    fn key_of(&self, record: &records::WordleSummaryRecord) -> chrono::NaiveDate {
        record.date
    }

    fn file_name(&self, record: &records::WordleSummaryRecord) -> String {
        file_names::format_summary(&file_names::SummaryName {
            solution: record.solution.clone(),
            days_since_launch: record.days_since_launch,
            date: record.date,
        })
    }

    fn key_from_file_name(&self, file_name: &str) -> Option<chrono::NaiveDate> {
        file_names::parse_summary(file_name).map(|name| name.date)
    }

    fn encode(&self, record: &records::WordleSummaryRecord) -> anyhow::Result<String> {
        utils::to_pretty_json(&record.summary)
    }

    fn decode(&self, file_name: &str, contents: &str) -> anyhow::Result<records::WordleSummaryRecord> {
        let name = file_names::parse_summary(file_name)
            .ok_or_else(|| anyhow::anyhow!("Not a summary file name: '{}'", file_name))?;
        let summary = serde_json::from_str(contents)
            .map_err(|e| anyhow::anyhow!("Invalid summary body: {}", e))?;

        anyhow::Ok(records::WordleSummaryRecord {
            date: name.date,
            solution: name.solution,
            days_since_launch: name.days_since_launch,
            summary,
        })
    }
}

// --- Guesses by round ---

/// Fetches the per-round guess distribution of one mode for the solution of a date.
#[derive(Clone)]
pub struct GuessesByRoundFetcher {
    solutions: SolutionFetcher,
    url_template: String,
    mode: records::Mode,
}

impl GuessesByRoundFetcher {
    pub fn new(solutions: SolutionFetcher, mode: records::Mode) -> Self {
        Self {
            solutions,
            url_template: DEFAULT_GUESSES_URL.to_string(),
            mode,
        }
    }

    pub fn with_url_template(mut self, url_template: &str) -> Self {
        self.url_template = url_template.to_string();
        self
    }
}

impl RecordFetcher for GuessesByRoundFetcher {
    type Key = chrono::NaiveDate;
    type Record = records::GuessesByRoundRecord;

    fn fetch(&self, date: &chrono::NaiveDate) -> Result<records::GuessesByRoundRecord, FetchError> {
        let solution = self.solutions.fetch(date)?;
        let url = fetcher::fill_template(
            &self.url_template,
            &[("solution", &solution.solution), ("mode", self.mode.as_str())],
        );
        let body = self.solutions.transport.get(&url)?;
        let rounds: records::GuessRounds = parse_body(&url, &body)?;
        if rounds.is_empty() {
            return Err(FetchError::validation(&url, "no guess rounds"));
        }

        Ok(records::GuessesByRoundRecord {
            date: *date,
            solution: solution.solution,
            mode: self.mode,
            rounds,
        })
    }
}

/// `guesses-by-round-{mode}-{date}-{solution}.json` holding the rounds array.
#[derive(Debug, Clone, Copy)]
pub struct GuessesByRoundSchema {
    mode: records::Mode,
}

impl GuessesByRoundSchema {
    pub fn new(mode: records::Mode) -> Self {
        Self { mode }
    }
}

impl RecordSchema for GuessesByRoundSchema {
    type Key = chrono::NaiveDate;
    type Record = records::GuessesByRoundRecord;

    fn key_of(&self, record: &records::GuessesByRoundRecord) -> chrono::NaiveDate {
        record.date
    }

    fn file_name(&self, record: &records::GuessesByRoundRecord) -> String {
        file_names::format_guesses(&file_names::GuessesName {
            mode: record.mode,
            date: record.date,
            solution: record.solution.clone(),
        })
    }

    fn key_from_file_name(&self, file_name: &str) -> Option<chrono::NaiveDate> {
        file_names::parse_guesses(file_name)
            .filter(|name| name.mode == self.mode)
            .map(|name| name.date)
    }

    fn encode(&self, record: &records::GuessesByRoundRecord) -> anyhow::Result<String> {
        utils::to_pretty_json(&record.rounds)
    }

    fn decode(&self, file_name: &str, contents: &str) -> anyhow::Result<records::GuessesByRoundRecord> {
        let name = file_names::parse_guesses(file_name)
            .ok_or_else(|| anyhow::anyhow!("Not a guesses-by-round file name: '{}'", file_name))?;
        let rounds = serde_json::from_str(contents)
            .map_err(|e| anyhow::anyhow!("Invalid guesses-by-round body: {}", e))?;

        anyhow::Ok(records::GuessesByRoundRecord {
            date: name.date,
            solution: name.solution,
            mode: name.mode,
            rounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::{FetchErrorKind, StaticTransport};
    use crate::store::{Archive, ArchiveStore};

    fn day(s: &str) -> chrono::NaiveDate {
        keys::parse_date(s).unwrap()
    }

    fn solution_body(date: &str, word: &str, days: u64) -> String {
        format!(r#"{{"id":{},"solution":"{}","print_date":"{}","days_since_launch":{},"editor":"Tracy Bennett"}}"#, days + 300, word, date, days)
    }

    fn transport() -> Arc<StaticTransport> {
        Arc::new(
            StaticTransport::new()
                .with_body("https://www.nytimes.com/svc/wordle/v2/2024-01-05.json", &solution_body("2024-01-05", "crane", 930))
                .with_body("https://www.nytimes.com/svc/wordle/v2/2024-01-06.json", &solution_body("2024-01-04", "slate", 929))
                .with_body(
                    "https://static01.nyt.com/newsgraphics/2022/2022-01-25-wordle-solver/crane/summary.json",
                    r#"{"average":{"normal":4.12,"hard":3.98},"efficiency":{"normal":0.8,"hard":0.82}}"#,
                )
                .with_body(
                    "https://static01.nyt.com/newsgraphics/2022/2022-01-25-wordle-solver/crane/guesses-by-round-hard.json",
                    r#"[{"crane":12,"adieu":88},{"crane":40}]"#,
                ),
        )
    }

    #[test]
    fn solution_fetch_validates_print_date() {
        let fetcher = SolutionFetcher::new(transport());
        assert_eq!(fetcher.fetch(&day("2024-01-05")).unwrap().solution, "crane");

        let mismatch = fetcher.fetch(&day("2024-01-06")).unwrap_err();
        assert_eq!(mismatch.kind(), FetchErrorKind::Validation);

        let missing = fetcher.fetch(&day("2024-01-07")).unwrap_err();
        assert_eq!(missing.kind(), FetchErrorKind::NotFound);
    }

    #[test]
    fn summary_fetch_chains_solution_then_summary() {
        let transport = transport();
        let fetcher = SummaryFetcher::new(SolutionFetcher::new(transport.clone()));
        let record = fetcher.fetch(&day("2024-01-05")).unwrap();

        assert_eq!(record.solution, "crane");
        assert_eq!(record.days_since_launch, 930);
        assert_eq!(record.summary.average.normal, 4.12);
        assert_eq!(transport.get_requests().len(), 2);
    }

    #[test]
    fn guesses_fetch_uses_mode_in_url() {
        let solutions = SolutionFetcher::new(transport());
        let hard = GuessesByRoundFetcher::new(solutions.clone(), records::Mode::Hard)
            .fetch(&day("2024-01-05"))
            .unwrap();
        assert_eq!(hard.first_guess_count("crane"), (12, 100));

        let normal = GuessesByRoundFetcher::new(solutions, records::Mode::Normal)
            .fetch(&day("2024-01-05"))
            .unwrap_err();
        assert_eq!(normal.kind(), FetchErrorKind::NotFound);
    }

    #[test]
    fn summary_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path(), SummarySchema);
        let record = SummaryFetcher::new(SolutionFetcher::new(transport()))
            .fetch(&day("2024-01-05"))
            .unwrap();

        store.write(&record).unwrap();

        assert!(dir.path().join("summary_crane,930,2024-01-05.json").is_file());
        assert_eq!(store.read(&day("2024-01-05")).unwrap(), Some(record));
        assert_eq!(store.read(&day("2024-01-04")).unwrap(), None);
        assert_eq!(store.latest_key().unwrap(), Some(day("2024-01-05")));
    }

    #[test]
    fn guesses_store_only_sees_its_own_mode() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("guesses-by-round-normal-2024-02-01-stair.json"), "[{}]").unwrap();
        std::fs::write(dir.path().join("guesses-by-round-hard-2024-01-05-crane.json"), "[{}]").unwrap();

        let hard = ArchiveStore::new(dir.path(), GuessesByRoundSchema::new(records::Mode::Hard));
        assert_eq!(hard.latest_key().unwrap(), Some(day("2024-01-05")));
        assert_eq!(hard.load_all().unwrap().len(), 1);
    }

    #[test]
    fn solution_store_ignores_foreign_files_and_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArchiveStore::new(dir.path().join("absent"), SolutionSchema);
        assert_eq!(store.latest_key().unwrap(), None);

        let store = ArchiveStore::new(dir.path(), SolutionSchema);
        std::fs::write(dir.path().join("README.md"), "notes").unwrap();
        std::fs::write(dir.path().join("2021-06-19.json"), solution_body("2021-06-19", "cigar", 0)).unwrap();
        std::fs::write(dir.path().join("2021-06-20.json"), solution_body("2021-06-20", "rebut", 1)).unwrap();

        assert_eq!(store.latest_key().unwrap(), Some(day("2021-06-20")));
        assert_eq!(store.read(&day("2021-06-19")).unwrap().unwrap().solution, "cigar");
    }
}
