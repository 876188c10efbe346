// archiver_core/src/aggregate.rs

//! Single-file aggregate outputs.
//! `SolutionsIndex` is an append-only `date -> solution` dictionary that
//! behaves like any other archive; `PuzzleIds` lists the puzzle ids of the
//! local solution archive for the personal-history collector.

use std::collections::BTreeMap;
use std::sync::Mutex;

use itertools::Itertools;

use crate::records;
use crate::store::Archive;
use crate::utils;

/// `solutions.json`: every fetched solution keyed by its `YYYY-MM-DD` date.
/// The whole dictionary is rewritten after each added record.
#[derive(Debug)]
pub struct SolutionsIndex {
    path: std::path::PathBuf,
    lock: Mutex<()>,
}

impl SolutionsIndex {
    pub fn new<P: AsRef<std::path::Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn get_path(&self) -> &std::path::Path {
        &self.path
    }

    /// Reads the whole dictionary. A missing file is an empty index.
    pub fn load(&self) -> anyhow::Result<BTreeMap<chrono::NaiveDate, records::WordleSolution>> {
        anyhow::Ok(utils::read_json(&self.path)?.unwrap_or_default())
    }
}

impl Archive for SolutionsIndex {
    type Key = chrono::NaiveDate;
    type Record = records::WordleSolution;

    fn latest_key(&self) -> anyhow::Result<Option<chrono::NaiveDate>> {
        anyhow::Ok(self.load()?.keys().next_back().copied())
    }

    fn write(&self, record: &records::WordleSolution) -> anyhow::Result<()> {
        let _guard = self.lock
            .lock()
            .map_err(|_| anyhow::anyhow!("Solutions index lock poisoned"))?;

        let mut solutions = self.load()?;
        solutions.insert(record.print_date, record.clone());
        utils::write_json(&self.path, &solutions)?;
        tracing::info!(date = %record.print_date, solution = %record.solution, path = %self.path.display(), "Added solution to index");

        anyhow::Ok(())
    }

    fn read(&self, key: &chrono::NaiveDate) -> anyhow::Result<Option<records::WordleSolution>> {
        anyhow::Ok(self.load()?.remove(key))
    }
}

/// Puzzles from before the game changed hands are not in the player history.
pub const DEFAULT_SKIPPED_PUZZLE_IDS: usize = 227;

/// `relevant_puzzle_ids.json`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PuzzleIds {
    pub last_updated: String,
    pub puzzle_ids: Vec<u64>,
}

impl PuzzleIds {
    /// Collects the ids of `solutions` in date order, dropping the first `skip_first`.
    pub fn build(
        solutions: &[records::WordleSolution],
        skip_first: usize,
        now: chrono::NaiveDateTime,
    ) -> Self {
        let puzzle_ids = solutions
            .iter()
            .sorted_by_key(|s| s.print_date)
            .map(|s| s.id)
            .skip(skip_first)
            .collect();

        Self {
            last_updated: now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            puzzle_ids,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solution(date: &str, id: u64) -> records::WordleSolution {
        records::WordleSolution {
            id,
            solution: "crane".to_string(),
            print_date: crate::keys::parse_date(date).unwrap(),
            days_since_launch: id,
            editor: None,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn index_is_keyed_by_date() {
        let dir = tempfile::tempdir().unwrap();
        let index = SolutionsIndex::new(dir.path().join("wordle").join("solutions.json"));
        assert_eq!(index.latest_key().unwrap(), None);

        index.write(&solution("2021-06-20", 1)).unwrap();
        index.write(&solution("2021-06-19", 0)).unwrap();

        assert_eq!(index.latest_key().unwrap(), crate::keys::parse_date("2021-06-20"));
        assert_eq!(index.read(&crate::keys::parse_date("2021-06-19").unwrap()).unwrap(), Some(solution("2021-06-19", 0)));

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(index.get_path()).unwrap()).unwrap();
        assert_eq!(raw["2021-06-20"]["id"], 1);
    }

    #[test]
    fn puzzle_ids_skip_the_oldest() {
        let solutions = vec![solution("2021-06-21", 2), solution("2021-06-19", 0), solution("2021-06-20", 1)];
        let now = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(8, 0, 0).unwrap();
        let ids = PuzzleIds::build(&solutions, 1, now);
        assert_eq!(ids.puzzle_ids, vec![1, 2]);
        assert_eq!(ids.last_updated, "2024-01-01T08:00:00.000000");
    }
}
