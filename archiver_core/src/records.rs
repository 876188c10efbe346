// archiver_core/src/records.rs

//! Archive record types.
//! Payload shapes follow the public endpoints they are fetched from; fields
//! this crate does not interpret are carried through untouched.

use std::collections::BTreeMap;

/// Wordle difficulty mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub enum Mode {
    #[serde(rename = "normal")]
    Normal,
    #[serde(rename = "hard")]
    Hard,
}

impl Mode {
    pub const ALL: [Mode; 2] = [Mode::Normal, Mode::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Hard => "hard",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "normal" => Some(Mode::Normal),
            "hard" => Some(Mode::Hard),
            _ => None,
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value reported separately for normal and hard mode.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ModePair<T> {
    pub normal: T,
    pub hard: T,
}

impl<T: Copy> ModePair<T> {
    pub fn get(&self, mode: Mode) -> T {
        match mode {
            Mode::Normal => self.normal,
            Mode::Hard => self.hard,
        }
    }
}

/// Daily Wordle solution as served by the puzzle endpoint.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WordleSolution {
    pub id: u64,
    pub solution: String,
    pub print_date: chrono::NaiveDate,
    pub days_since_launch: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Crowd statistics for one solution word.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordleSummary {
    pub average: ModePair<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub efficiency: Option<ModePair<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub luck: Option<ModePair<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsolved_penalty: Option<ModePair<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent_solving_in_three_or_fewer: Option<ModePair<f64>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Summary archive entry. The identifying fields live in the file name, the
/// file body is the summary itself.
#[derive(Debug, Clone, PartialEq)]
pub struct WordleSummaryRecord {
    pub date: chrono::NaiveDate,
    pub solution: String,
    pub days_since_launch: u64,
    pub summary: WordleSummary,
}

/// First guesses, second guesses, ... each as `word -> number of players`.
pub type GuessRounds = Vec<BTreeMap<String, u64>>;

/// Per-round guess distribution for one day and mode.
#[derive(Debug, Clone, PartialEq)]
pub struct GuessesByRoundRecord {
    pub date: chrono::NaiveDate,
    pub solution: String,
    pub mode: Mode,
    pub rounds: GuessRounds,
}

impl GuessesByRoundRecord {
    /// Players whose first guess was `word`, and the total number of first guesses.
    pub fn first_guess_count(&self, word: &str) -> (u64, u64) {
        match self.rounds.first() {
            Some(first) => (first.get(word).copied().unwrap_or(0), first.values().sum()),
            None => (0, 0),
        }
    }
}

/// Letters of one Spelling Bee puzzle. The centre letter comes first in `all_letters`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BeeLetters {
    pub center_letter: String,
    pub outer_letters: Vec<String>,
    pub all_letters: Vec<String>,
}

impl BeeLetters {
    pub fn from_letters(letters: Vec<String>) -> Option<Self> {
        let (center, outer) = letters.split_first()?;
        Some(Self {
            center_letter: center.clone(),
            outer_letters: outer.to_vec(),
            all_letters: letters.clone(),
        })
    }
}

/// One archived Spelling Bee puzzle.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SpellingBeePuzzle {
    pub date: chrono::NaiveDate,
    pub puzzle_number: u64,
    pub letters: BeeLetters,
}
