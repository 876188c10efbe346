// archiver_core/src/keys.rs

//! Archive keys.
//! A key addresses exactly one archive record: either a calendar day or a
//! puzzle sequence number. Keys are totally ordered and contiguous, so the
//! successor of a key is always the next record to expect.

/// Identifier of one archive record.
pub trait ArchiveKey: Ord + Clone + std::fmt::Debug + std::fmt::Display + Send + Sync {
    /// The key immediately following `self`.
    fn successor(&self) -> Self;
}

impl ArchiveKey for chrono::NaiveDate {
    fn successor(&self) -> Self {
        *self + chrono::Days::new(1)
    }
}

impl ArchiveKey for u64 {
    fn successor(&self) -> Self {
        self + 1
    }
}

/// ISO calendar day format used in URLs, file names and record bodies.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Formats a date key as `YYYY-MM-DD`.
pub fn format_date(date: &chrono::NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a `YYYY-MM-DD` date key.
pub fn parse_date(value: &str) -> Option<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Maps a puzzle number to its publication day given the day of puzzle #1.
pub fn number_to_date(first_puzzle_date: chrono::NaiveDate, number: u64) -> chrono::NaiveDate {
    first_puzzle_date + chrono::Days::new(number.saturating_sub(1))
}

/// Maps a publication day to its puzzle number given the day of puzzle #1.
/// Days before puzzle #1 map to `0`.
pub fn date_to_number(first_puzzle_date: chrono::NaiveDate, date: chrono::NaiveDate) -> u64 {
    let days = (date - first_puzzle_date).num_days();
    if days < 0 { 0 } else { days as u64 + 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(s: &str) -> chrono::NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn date_successor_crosses_month_and_year() {
        assert_eq!(day("2021-06-30").successor(), day("2021-07-01"));
        assert_eq!(day("2023-12-31").successor(), day("2024-01-01"));
        assert_eq!(day("2024-02-28").successor(), day("2024-02-29"));
    }

    #[test]
    fn puzzle_numbers_map_to_days() {
        let first = day("2018-05-09");
        assert_eq!(number_to_date(first, 1), first);
        assert_eq!(number_to_date(first, 32), day("2018-06-09"));
        assert_eq!(date_to_number(first, day("2018-06-09")), 32);
        assert_eq!(date_to_number(first, day("2018-05-08")), 0);
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(parse_date("2024-13-01").is_none());
        assert!(parse_date("20240101").is_none());
        assert_eq!(format_date(&day("2024-01-05")), "2024-01-05");
    }
}
