// archiver_core/src/cheating.rs

//! First-guess analysis.
//! If many players open with today's solution, a share noticeably higher
//! than the day before (when nobody could know it) suggests leaked answers.
//! For every day the first-round share of the solution is compared with the
//! share the same word had on the previous day.

use crate::indicators;
use crate::keys;
use crate::records;
use crate::store::Archive;
use crate::utils;

/// First day with a previous day to compare against.
pub fn analysis_start() -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2023, 3, 30).unwrap_or_default()
}

/// Percentages, rounded to two decimals.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProportionDelta {
    pub today: f64,
    pub yesterday: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GuessComparison {
    pub today: u64,
    pub yesterday: u64,
    pub delta: i64,
    pub proportion: ProportionDelta,
}

/// One analysed day.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FirstGuessAnalysis {
    pub date: chrono::NaiveDate,
    pub word: String,
    pub guesses: GuessComparison,
}

fn proportion(count: u64, total: u64) -> f64 {
    if total == 0 { 0.0 } else { count as f64 / total as f64 }
}

/// Compares the first-guess share of `today.solution` on both days.
pub fn compare(
    today: &records::GuessesByRoundRecord,
    yesterday: &records::GuessesByRoundRecord,
) -> FirstGuessAnalysis {
    let (today_count, today_total) = today.first_guess_count(&today.solution);
    let (yesterday_count, yesterday_total) = yesterday.first_guess_count(&today.solution);
    let today_share = proportion(today_count, today_total);
    let yesterday_share = proportion(yesterday_count, yesterday_total);
    let share_delta = indicators::delta(Some(today_share), Some(yesterday_share)).unwrap_or_default();

    FirstGuessAnalysis {
        date: today.date,
        word: today.solution.clone(),
        guesses: GuessComparison {
            today: today_count,
            yesterday: yesterday_count,
            delta: today_count as i64 - yesterday_count as i64,
            proportion: ProportionDelta {
                today: utils::round_to(today_share * 100.0, 2),
                yesterday: utils::round_to(yesterday_share * 100.0, 2),
                delta: utils::round_to(share_delta * 100.0, 2),
            },
        },
    }
}

/// Analyses `date` from the archive, `None` if either day is not archived.
pub fn analyse_day<A>(archive: &A, date: chrono::NaiveDate) -> anyhow::Result<Option<FirstGuessAnalysis>>
where
    A: Archive<Key = chrono::NaiveDate, Record = records::GuessesByRoundRecord>,
{
    let Some(today) = archive.read(&date)? else { return anyhow::Ok(None) };
    let previous = date - chrono::Days::new(1);
    let Some(yesterday) = archive.read(&previous)? else { return anyhow::Ok(None) };

    anyhow::Ok(Some(compare(&today, &yesterday)))
}

/// Counts of one incremental analysis pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisSummary {
    pub added: usize,
    pub unavailable: usize,
}

/// Extends the results file at `output` with every day in `[start, end]`
/// that is not analysed yet. Days whose data is incomplete are left out so
/// a later run picks them up.
pub fn update_analysis<A>(
    archive: &A,
    output: &std::path::Path,
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
) -> anyhow::Result<AnalysisSummary>
where
    A: Archive<Key = chrono::NaiveDate, Record = records::GuessesByRoundRecord>,
{
    let mut results: Vec<FirstGuessAnalysis> = utils::read_json(output)?.unwrap_or_default();
    let done: std::collections::HashSet<chrono::NaiveDate> = results.iter().map(|r| r.date).collect();
    let mut summary = AnalysisSummary::default();

    let mut date = start;
    while date <= end {
        if !done.contains(&date) {
            match analyse_day(archive, date)? {
                Some(analysis) => {
                    tracing::info!(
                        date = %keys::format_date(&date),
                        word = %analysis.word,
                        delta = analysis.guesses.proportion.delta,
                        "Analysed first guesses"
                    );
                    results.push(analysis);
                    summary.added += 1;
                }
                None => {
                    tracing::debug!(date = %keys::format_date(&date), "first-guess comparison unavailable");
                    summary.unavailable += 1;
                }
            }
        }
        date = date + chrono::Days::new(1);
    }

    if summary.added > 0 || !output.exists() {
        results.sort_by_key(|r| r.date);
        utils::write_json(output, &results)?;
    }

    anyhow::Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(date: &str, solution: &str, first: &[(&str, u64)]) -> records::GuessesByRoundRecord {
        records::GuessesByRoundRecord {
            date: keys::parse_date(date).unwrap(),
            solution: solution.to_string(),
            mode: records::Mode::Normal,
            rounds: vec![first.iter().map(|(w, c)| (w.to_string(), *c)).collect::<BTreeMap<_, _>>()],
        }
    }

    #[test]
    fn delta_in_percentage_points() {
        let today = record("2024-01-05", "crane", &[("crane", 420), ("adieu", 580)]);
        let yesterday = record("2024-01-04", "slate", &[("crane", 385), ("slate", 615)]);

        let analysis = compare(&today, &yesterday);
        assert_eq!(analysis.word, "crane");
        assert_eq!(analysis.guesses.today, 420);
        assert_eq!(analysis.guesses.yesterday, 385);
        assert_eq!(analysis.guesses.delta, 35);
        assert_eq!(analysis.guesses.proportion.today, 42.0);
        assert_eq!(analysis.guesses.proportion.yesterday, 38.5);
        assert_eq!(analysis.guesses.proportion.delta, 3.5);
    }

    #[test]
    fn empty_rounds_are_zero_not_missing() {
        let today = record("2024-01-05", "crane", &[]);
        let yesterday = record("2024-01-04", "slate", &[("slate", 10)]);
        let analysis = compare(&today, &yesterday);
        assert_eq!(analysis.guesses.proportion.delta, 0.0);
    }

    #[test]
    fn serialized_shape() {
        let analysis = compare(
            &record("2024-01-05", "crane", &[("crane", 1), ("adieu", 3)]),
            &record("2024-01-04", "slate", &[("slate", 4)]),
        );
        let json = serde_json::to_value(&analysis).unwrap();
        assert_eq!(json["date"], "2024-01-05");
        assert_eq!(json["guesses"]["proportion"]["today"], 25.0);
        assert_eq!(json["guesses"]["delta"], 1);
    }
}
