// archiver_core/src/file_names.rs

//! File name schemes of the on-disk archives.
//! Every `format_*` has a matching `parse_*` that inverts it exactly, so the
//! newest key of an archive can be found from a directory listing alone.
//!
//! | archive            | scheme                                               |
//! |--------------------|------------------------------------------------------|
//! | Wordle solutions   | `{date}.json`                                        |
//! | Wordle summaries   | `summary_{solution},{days_since_launch},{date}.json` |
//! | guesses by round   | `guesses-by-round-{mode}-{date}-{solution}.json`     |
//! | Spelling Bee       | `spelling-bee_{date}.json`                           |

use crate::keys;
use crate::records::Mode;

pub const JSON_EXTENSION: &str = ".json";
pub const SUMMARY_PREFIX: &str = "summary_";
pub const GUESSES_PREFIX: &str = "guesses-by-round-";
pub const SPELLING_BEE_PREFIX: &str = "spelling-bee_";

/// Identifying fields carried by a summary file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryName {
    pub solution: String,
    pub days_since_launch: u64,
    pub date: chrono::NaiveDate,
}

/// Identifying fields carried by a guesses-by-round file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessesName {
    pub mode: Mode,
    pub date: chrono::NaiveDate,
    pub solution: String,
}

pub fn format_dated(date: &chrono::NaiveDate) -> String {
    format!("{}{}", keys::format_date(date), JSON_EXTENSION)
}

pub fn parse_dated(file_name: &str) -> Option<chrono::NaiveDate> {
    keys::parse_date(file_name.strip_suffix(JSON_EXTENSION)?)
}

pub fn format_summary(name: &SummaryName) -> String {
    format!(
        "{}{},{},{}{}",
        SUMMARY_PREFIX,
        name.solution,
        name.days_since_launch,
        keys::format_date(&name.date),
        JSON_EXTENSION,
    )
}

pub fn parse_summary(file_name: &str) -> Option<SummaryName> {
    let body = file_name
        .strip_prefix(SUMMARY_PREFIX)?
        .strip_suffix(JSON_EXTENSION)?;

    // the solution is a plain word, so the last two commas delimit the numeric fields
    let mut parts = body.rsplitn(3, ',');
    let date = keys::parse_date(parts.next()?)?;
    let days_since_launch = parts.next()?.parse().ok()?;
    let solution = parts.next()?;
    if !is_word(solution) {
        return None;
    }

    Some(SummaryName {
        solution: solution.to_string(),
        days_since_launch,
        date,
    })
}

pub fn format_guesses(name: &GuessesName) -> String {
    format!(
        "{}{}-{}-{}{}",
        GUESSES_PREFIX,
        name.mode,
        keys::format_date(&name.date),
        name.solution,
        JSON_EXTENSION,
    )
}

pub fn parse_guesses(file_name: &str) -> Option<GuessesName> {
    let body = file_name
        .strip_prefix(GUESSES_PREFIX)?
        .strip_suffix(JSON_EXTENSION)?;

    let (mode, rest) = body.split_once('-')?;
    let mode = Mode::parse(mode)?;

    // date is fixed width: YYYY-MM-DD
    const DATE_LEN: usize = 10;
    if rest.len() < DATE_LEN + 2 || !rest.is_char_boundary(DATE_LEN) {
        return None;
    }
    let (date, solution) = rest.split_at(DATE_LEN);
    let date = keys::parse_date(date)?;
    let solution = solution.strip_prefix('-')?;
    if !is_word(solution) {
        return None;
    }

    Some(GuessesName {
        mode,
        date,
        solution: solution.to_string(),
    })
}

pub fn format_spelling_bee(date: &chrono::NaiveDate) -> String {
    format!("{}{}{}", SPELLING_BEE_PREFIX, keys::format_date(date), JSON_EXTENSION)
}

pub fn parse_spelling_bee(file_name: &str) -> Option<chrono::NaiveDate> {
    let date = file_name
        .strip_prefix(SPELLING_BEE_PREFIX)?
        .strip_suffix(JSON_EXTENSION)?;
    keys::parse_date(date)
}

/// Solutions are embedded in file names, so they must not contain separators.
pub fn is_word(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(s: &str) -> chrono::NaiveDate {
        keys::parse_date(s).unwrap()
    }

    #[test]
    fn summary_names_match_existing_archive() {
        let name = parse_summary("summary_crane,930,2024-01-05.json").unwrap();
        assert_eq!(name.solution, "crane");
        assert_eq!(name.days_since_launch, 930);
        assert_eq!(name.date, day("2024-01-05"));
        assert_eq!(format_summary(&name), "summary_crane,930,2024-01-05.json");
    }

    #[test]
    fn guesses_names_match_existing_archive() {
        let name = parse_guesses("guesses-by-round-hard-2023-03-29-stair.json").unwrap();
        assert_eq!(name.mode, Mode::Hard);
        assert_eq!(name.date, day("2023-03-29"));
        assert_eq!(name.solution, "stair");
    }

    #[test]
    fn unrelated_files_are_ignored() {
        assert!(parse_dated("notes.txt").is_none());
        assert!(parse_dated("2024-01-05.json.tmp").is_none());
        assert!(parse_summary("summary_crane,x,2024-01-05.json").is_none());
        assert!(parse_summary("summary_,930,2024-01-05.json").is_none());
        assert!(parse_guesses("guesses-by-round-easy-2023-03-29-stair.json").is_none());
        assert!(parse_guesses("guesses-by-round-hard-2023-03-29.json").is_none());
        assert!(parse_spelling_bee("spelling-bee_latest.json").is_none());
    }

    proptest! {
        #[test]
        fn summary_round_trip(solution in "[a-z]{5}", days in 0u64..5000, offset in 0i64..3000) {
            let name = SummaryName {
                solution,
                days_since_launch: days,
                date: day("2021-06-19") + chrono::Duration::days(offset),
            };
            prop_assert_eq!(parse_summary(&format_summary(&name)), Some(name));
        }

        #[test]
        fn guesses_round_trip(solution in "[a-z]{5}", hard in any::<bool>(), offset in 0i64..3000) {
            let name = GuessesName {
                mode: if hard { Mode::Hard } else { Mode::Normal },
                date: day("2023-03-29") + chrono::Duration::days(offset),
                solution,
            };
            prop_assert_eq!(parse_guesses(&format_guesses(&name)), Some(name));
        }

        #[test]
        fn dated_round_trip(offset in 0i64..5000) {
            let date = day("2018-05-09") + chrono::Duration::days(offset);
            prop_assert_eq!(parse_dated(&format_dated(&date)), Some(date));
            prop_assert_eq!(parse_spelling_bee(&format_spelling_bee(&date)), Some(date));
        }
    }
}
