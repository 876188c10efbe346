// archiver_core/src/date_range.rs

//! Fetch window calculation.
//! Given the newest key already archived and the newest key that should exist
//! by now, produces the ordered keys still missing from the archive.

use crate::keys;
use crate::keys::ArchiveKey;

/// Which day counts as "the newest record that should now exist".
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub enum Boundary {
    /// The source publishes same-day records.
    #[serde(rename = "today")]
    Today,
    /// Stay one day behind to avoid racing an unpublished record.
    #[serde(rename = "yesterday")]
    Yesterday,
}

impl Boundary {
    /// Resolves the boundary day relative to `today`.
    pub fn resolve(&self, today: chrono::NaiveDate) -> chrono::NaiveDate {
        match self {
            Boundary::Today => today,
            Boundary::Yesterday => today - chrono::Days::new(1),
        }
    }

    /// Resolves the boundary as a puzzle number for sequence-keyed sources.
    pub fn resolve_number(&self, today: chrono::NaiveDate, first_puzzle_date: chrono::NaiveDate) -> u64 {
        keys::date_to_number(first_puzzle_date, self.resolve(today))
    }
}

/// Lazy, restartable sequence of keys in `(start, end]`.
#[derive(Debug, Clone)]
pub struct KeyRange<K: ArchiveKey> {
    next: K,
    end: K,
    exhausted: bool,
}

impl<K: ArchiveKey> Iterator for KeyRange<K> {
    type Item = K;

    fn next(&mut self) -> Option<K> {
        if self.exhausted || self.next > self.end {
            self.exhausted = true;
            return None;
        }
        let current = self.next.clone();
        if current == self.end {
            self.exhausted = true;
        } else {
            self.next = current.successor();
        }
        Some(current)
    }
}

/// Computes the keys missing from an archive.
///
/// # Arguments
/// * `latest` - Newest key in the archive, `None` when the archive is empty.
/// * `epoch` - Key preceding the first record; used when `latest` is `None`.
/// * `boundary` - Newest key that should exist now (inclusive).
///
/// # Returns
/// * `KeyRange` from `latest + 1` to `boundary`; empty if `latest >= boundary`.
pub fn compute_missing<K: ArchiveKey>(latest: Option<K>, epoch: K, boundary: K) -> KeyRange<K> {
    let start = latest.unwrap_or(epoch);
    if start >= boundary {
        // no successor taken: `start` may be the largest representable key
        return KeyRange { next: boundary.clone(), end: boundary, exhausted: true };
    }
    KeyRange {
        next: start.successor(),
        end: boundary,
        exhausted: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn day(s: &str) -> chrono::NaiveDate {
        keys::parse_date(s).unwrap()
    }

    #[test]
    fn empty_archive_starts_after_epoch() {
        let keys: Vec<_> = compute_missing(None, day("2021-06-18"), day("2021-06-21")).collect();
        assert_eq!(keys, vec![day("2021-06-19"), day("2021-06-20"), day("2021-06-21")]);
    }

    #[test]
    fn up_to_date_archive_yields_nothing() {
        assert_eq!(compute_missing(Some(day("2024-03-01")), day("2021-06-18"), day("2024-03-01")).count(), 0);
        assert_eq!(compute_missing(Some(day("2024-03-05")), day("2021-06-18"), day("2024-03-01")).count(), 0);
    }

    #[test]
    fn range_is_restartable() {
        let range = compute_missing(Some(3u64), 0, 6);
        let first: Vec<u64> = range.clone().collect();
        let second: Vec<u64> = range.collect();
        assert_eq!(first, vec![4, 5, 6]);
        assert_eq!(first, second);
    }

    #[test]
    fn boundary_resolution() {
        let today = day("2024-03-01");
        assert_eq!(Boundary::Today.resolve(today), today);
        assert_eq!(Boundary::Yesterday.resolve(today), day("2024-02-29"));
        assert_eq!(Boundary::Today.resolve_number(day("2018-05-10"), day("2018-05-09")), 2);
    }

    #[test]
    fn boundary_at_max_key_terminates() {
        let keys: Vec<u64> = compute_missing(Some(u64::MAX - 2), 0, u64::MAX - 1).collect();
        assert_eq!(keys, vec![u64::MAX - 1]);
    }

    #[test]
    fn latest_at_max_key_yields_nothing() {
        assert_eq!(compute_missing(Some(u64::MAX), 0, 5).count(), 0);
        assert_eq!(compute_missing(Some(u64::MAX), 0, u64::MAX).count(), 0);
        assert_eq!(compute_missing(Some(chrono::NaiveDate::MAX), day("2021-06-18"), day("2024-03-01")).count(), 0);
    }

    proptest! {
        #[test]
        fn window_is_exactly_the_open_closed_interval(latest in proptest::option::of(0u64..500), epoch in 0u64..50, boundary in 0u64..600) {
            let keys: Vec<u64> = compute_missing(latest, epoch, boundary).collect();
            let start = latest.unwrap_or(epoch);
            let expected: Vec<u64> = (start + 1..=boundary).collect();
            prop_assert_eq!(&keys, &expected);
            prop_assert!(keys.windows(2).all(|w| w[0] < w[1]));
        }

        #[test]
        fn date_window_length_matches_day_difference(offset in 0i64..400, span in -5i64..120) {
            let latest = day("2021-06-18") + chrono::Duration::days(offset);
            let boundary = latest + chrono::Duration::days(span);
            let keys: Vec<_> = compute_missing(Some(latest), day("2021-06-18"), boundary).collect();
            prop_assert_eq!(keys.len() as i64, span.max(0));
            if let Some(first) = keys.first() {
                prop_assert_eq!(*first, latest.successor());
                prop_assert_eq!(*keys.last().unwrap(), boundary);
            }
        }
    }
}
