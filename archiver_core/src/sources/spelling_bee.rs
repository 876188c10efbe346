// archiver_core/src/sources/spelling_bee.rs

//! Spelling Bee source.
//! Puzzles are numbered from 1 (2018-05-09) and published one per day. The
//! letters are scraped from the puzzle page: seven letter images inside the
//! `thinner-space-after` block, centre letter first.

use std::sync::Arc;
use std::sync::LazyLock;

use crate::fetcher;
use crate::fetcher::{FetchError, RecordFetcher, Transport};
use crate::file_names;
use crate::keys;
use crate::records;
use crate::store::{KeyLocation, RecordSchema};
use crate::utils;

pub const DEFAULT_PUZZLE_URL: &str = "https://www.sbsolver.com/s/{number}";
pub const LETTER_COUNT: usize = 7;
pub const MIN_WORD_LEN: usize = 4;

/// Publication day of puzzle #1.
pub fn first_puzzle_date() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2018, 5, 9).unwrap_or_default()
}

static PUZZLE_BLOCK: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r#"(?is)<div[^>]*class\s*=\s*["'][^"']*\bthinner-space-after\b[^"']*["'][^>]*>(.*?)</div>"#)
        .expect("valid puzzle block pattern")
});
static IMG_TAG: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"(?is)<img\b[^>]*>").expect("valid img pattern"));
static ALT_ATTR: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r#"(?i)\balt\s*=\s*["']([^"']*)["']"#).expect("valid alt pattern"));
static SRC_ATTR: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r#"(?i)\bsrc\s*=\s*["']([^"']*)["']"#).expect("valid src pattern"));
static SRC_LETTER: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"/([a-zA-Z])-[yg]\.gif").expect("valid letter image pattern"));

/// Extracts the seven puzzle letters from a puzzle page.
///
/// Each letter comes from the image's single-character `alt` text or, failing
/// that, from an image path like `/w-y.gif`. Letters are uppercased.
///
/// # Returns
/// * `Some(BeeLetters)` - Exactly seven letters were found.
/// * `None` - The page holds no complete puzzle.
pub fn extract_letters(html: &str) -> Option<records::BeeLetters> {
    let block = PUZZLE_BLOCK.captures(html)?.get(1)?.as_str();
    let images: Vec<&str> = IMG_TAG.find_iter(block).map(|m| m.as_str()).collect();
    if images.len() != LETTER_COUNT {
        return None;
    }

    let mut letters = Vec::with_capacity(LETTER_COUNT);
    for img in images {
        let alt = ALT_ATTR.captures(img).and_then(|c| c.get(1)).map(|m| m.as_str().trim());
        let letter = match alt {
            Some(alt) if alt.chars().count() == 1 && alt.chars().all(|c| c.is_ascii_alphabetic()) => {
                Some(alt.to_ascii_uppercase())
            }
            _ => SRC_ATTR
                .captures(img)
                .and_then(|c| c.get(1))
                .and_then(|src| SRC_LETTER.captures(src.as_str()))
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_ascii_uppercase()),
        };
        if let Some(letter) = letter {
            letters.push(letter);
        }
    }

    if letters.len() != LETTER_COUNT {
        return None;
    }
    records::BeeLetters::from_letters(letters)
}

/// Whether `word` was a valid answer for `puzzle`: at least four letters,
/// contains the centre letter and uses no other letters than the puzzle's.
pub fn is_word_possible(word: &str, puzzle: &records::SpellingBeePuzzle) -> bool {
    let word = word.trim().to_lowercase();
    if word.chars().count() < MIN_WORD_LEN {
        return false;
    }

    let first_char = |letter: &String| letter.chars().next().map(|c| c.to_ascii_lowercase());
    let Some(center) = first_char(&puzzle.letters.center_letter) else { return false };
    let allowed: Vec<char> = puzzle.letters.all_letters.iter().filter_map(first_char).collect();

    word.contains(center) && word.chars().all(|c| allowed.contains(&c))
}

/// Fetches and parses one puzzle page.
#[derive(Clone)]
pub struct SpellingBeeFetcher {
    transport: Arc<dyn Transport>,
    url_template: String,
    first_puzzle_date: chrono::NaiveDate,
}

impl SpellingBeeFetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            url_template: DEFAULT_PUZZLE_URL.to_string(),
            first_puzzle_date: first_puzzle_date(),
        }
    }

    pub fn with_url_template(mut self, url_template: &str) -> Self {
        self.url_template = url_template.to_string();
        self
    }

    pub fn with_first_puzzle_date(mut self, first_puzzle_date: chrono::NaiveDate) -> Self {
        self.first_puzzle_date = first_puzzle_date;
        self
    }
}

impl RecordFetcher for SpellingBeeFetcher {
    type Key = u64;
    type Record = records::SpellingBeePuzzle;

    fn fetch(&self, number: &u64) -> Result<records::SpellingBeePuzzle, FetchError> {
        let url = fetcher::fill_template(&self.url_template, &[("number", &number.to_string())]);
        let html = self.transport.get(&url)?;

        // an unfilled page means the puzzle is not out yet
        let letters = extract_letters(&html)
            .ok_or_else(|| FetchError::not_found(&url, format!("no {LETTER_COUNT}-letter puzzle on page")))?;

        let puzzle = records::SpellingBeePuzzle {
            date: keys::number_to_date(self.first_puzzle_date, *number),
            puzzle_number: *number,
            letters,
        };
        tracing::info!(number, date = %puzzle.date, center = %puzzle.letters.center_letter, "Fetched puzzle");

        Ok(puzzle)
    }
}

/// `spelling-bee_{date}.json`; the key is the `puzzle_number` inside the file.
#[derive(Debug, Clone, Copy)]
pub struct SpellingBeeSchema {
    first_puzzle_date: chrono::NaiveDate,
}

impl SpellingBeeSchema {
    pub fn new(first_puzzle_date: chrono::NaiveDate) -> Self {
        Self { first_puzzle_date }
    }
}

impl Default for SpellingBeeSchema {
    fn default() -> Self {
        Self::new(first_puzzle_date())
    }
}

#[derive(serde::Deserialize)]
struct PuzzleNumberOnly {
    puzzle_number: u64,
}

impl RecordSchema for SpellingBeeSchema {
    type Key = u64;
    type Record = records::SpellingBeePuzzle;

    fn key_of(&self, record: &records::SpellingBeePuzzle) -> u64 {
        record.puzzle_number
    }

    fn file_name(&self, record: &records::SpellingBeePuzzle) -> String {
        file_names::format_spelling_bee(&record.date)
    }

    fn key_from_file_name(&self, file_name: &str) -> Option<u64> {
        file_names::parse_spelling_bee(file_name)
            .map(|date| keys::date_to_number(self.first_puzzle_date, date))
    }

    fn key_location(&self) -> KeyLocation {
        KeyLocation::Content
    }

    fn key_from_contents(&self, contents: &str) -> Option<u64> {
        serde_json::from_str::<PuzzleNumberOnly>(contents)
            .ok()
            .map(|p| p.puzzle_number)
    }

    fn exact_file_name(&self, key: &u64) -> Option<String> {
        Some(file_names::format_spelling_bee(&keys::number_to_date(self.first_puzzle_date, *key)))
    }

    fn encode(&self, record: &records::SpellingBeePuzzle) -> anyhow::Result<String> {
        utils::to_pretty_json(record)
    }

    fn decode(&self, _file_name: &str, contents: &str) -> anyhow::Result<records::SpellingBeePuzzle> {
        serde_json::from_str(contents)
            .map_err(|e| anyhow::anyhow!("Invalid Spelling Bee record: {}", e))
    }
}
