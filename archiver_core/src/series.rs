// archiver_core/src/series.rs

//! Reporting series derived from the summary archive.
//! A series is a read-only view: one point per day carrying the metric value
//! and its 7- and 30-day trailing means, plus the mean of the whole series.
//! It is written only as a hand-off file for the chart renderer.

use anyhow::Context;

use crate::indicators;
use crate::keys;
use crate::records;

pub const SHORT_WINDOW: usize = 7;
pub const LONG_WINDOW: usize = 30;

/// Quantity plotted per puzzle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SeriesMetric {
    #[serde(rename = "average")]
    Average,
    #[serde(rename = "hard_average")]
    HardAverage,
    #[serde(rename = "percent_solved")]
    PercentSolved,
    #[serde(rename = "percent_solved_hard")]
    PercentSolvedHard,
    #[serde(rename = "percent_three_or_fewer")]
    PercentThreeOrFewer,
    #[serde(rename = "percent_three_or_fewer_hard")]
    PercentThreeOrFewerHard,
    #[serde(rename = "efficiency")]
    Efficiency,
    #[serde(rename = "efficiency_hard")]
    EfficiencyHard,
    /// Hard-mode average minus normal-mode average.
    #[serde(rename = "difference")]
    Difference,
}

impl SeriesMetric {
    pub const ALL: [SeriesMetric; 9] = [
        SeriesMetric::Average,
        SeriesMetric::HardAverage,
        SeriesMetric::PercentSolved,
        SeriesMetric::PercentSolvedHard,
        SeriesMetric::PercentThreeOrFewer,
        SeriesMetric::PercentThreeOrFewerHard,
        SeriesMetric::Efficiency,
        SeriesMetric::EfficiencyHard,
        SeriesMetric::Difference,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SeriesMetric::Average => "average",
            SeriesMetric::HardAverage => "hard_average",
            SeriesMetric::PercentSolved => "percent_solved",
            SeriesMetric::PercentSolvedHard => "percent_solved_hard",
            SeriesMetric::PercentThreeOrFewer => "percent_three_or_fewer",
            SeriesMetric::PercentThreeOrFewerHard => "percent_three_or_fewer_hard",
            SeriesMetric::Efficiency => "efficiency",
            SeriesMetric::EfficiencyHard => "efficiency_hard",
            SeriesMetric::Difference => "difference",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.name() == value)
    }

    /// Value of the metric for one summary, `None` when the summary lacks it.
    pub fn value(&self, summary: &records::WordleSummary) -> Option<f64> {
        use records::Mode::{Hard, Normal};

        let percent_solved = |mode| summary.unsolved_penalty.map(|p| (1.0 - p.get(mode) / 100.0) * 100.0);
        let three_or_fewer = |mode| summary.percent_solving_in_three_or_fewer.map(|p| p.get(mode) * 100.0);
        let efficiency = |mode| summary.efficiency.map(|p| p.get(mode) * 100.0);

        match self {
            SeriesMetric::Average => Some(summary.average.normal),
            SeriesMetric::HardAverage => Some(summary.average.hard),
            SeriesMetric::PercentSolved => percent_solved(Normal),
            SeriesMetric::PercentSolvedHard => percent_solved(Hard),
            SeriesMetric::PercentThreeOrFewer => three_or_fewer(Normal),
            SeriesMetric::PercentThreeOrFewerHard => three_or_fewer(Hard),
            SeriesMetric::Efficiency => efficiency(Normal),
            SeriesMetric::EfficiencyHard => efficiency(Hard),
            SeriesMetric::Difference => Some(summary.average.hard - summary.average.normal),
        }
    }
}

impl std::fmt::Display for SeriesMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One plotted puzzle.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub key: chrono::NaiveDate,
    /// Solution word, uppercased.
    pub label: String,
    pub id: u64,
    pub value: f64,
    #[serde(rename = "rollingAvg7")]
    pub rolling_avg_7: Option<f64>,
    #[serde(rename = "rollingAvg30")]
    pub rolling_avg_30: Option<f64>,
}

/// Ordered points of one metric plus its mean.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedSeries {
    pub metric: SeriesMetric,
    pub points: Vec<SeriesPoint>,
    pub global_mean: f64,
}

impl DerivedSeries {
    /// Builds the series of `metric` over summary records.
    ///
    /// # Arguments
    /// * `records` - Summary records; ordered by date here, missing metrics left out.
    /// * `metric` - Plotted quantity.
    ///
    /// # Returns
    /// * `Err` when no record carries the metric.
    pub fn compute(records: &[records::WordleSummaryRecord], metric: SeriesMetric) -> anyhow::Result<Self> {
        let mut rows: Vec<(&records::WordleSummaryRecord, f64)> = records
            .iter()
            .filter_map(|r| metric.value(&r.summary).map(|v| (r, v)))
            .collect();
        rows.sort_by_key(|(r, _)| r.date);

        let values: Vec<f64> = rows.iter().map(|(_, v)| *v).collect();
        let global_mean = indicators::global_mean(&values)
            .with_context(|| format!("No summaries carry the '{}' metric", metric))?;
        let short = indicators::rolling_mean(&values, SHORT_WINDOW);
        let long = indicators::rolling_mean(&values, LONG_WINDOW);

        let points = rows
            .iter()
            .enumerate()
            .map(|(i, (record, value))| SeriesPoint {
                key: record.date,
                label: record.solution.to_uppercase(),
                id: record.days_since_launch,
                value: *value,
                rolling_avg_7: short[i],
                rolling_avg_30: long[i],
            })
            .collect();

        anyhow::Ok(Self { metric, points, global_mean })
    }

    /// Writes the points as `;`-separated CSV with a header row.
    pub fn export_csv(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .from_writer(Vec::new());

        writer.write_record(["date", "word", "id", self.metric.name(), "rolling_avg_7", "rolling_avg_30", "global_mean"])?;
        let optional = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        for point in &self.points {
            writer.write_record([
                keys::format_date(&point.key),
                point.label.clone(),
                point.id.to_string(),
                point.value.to_string(),
                optional(point.rolling_avg_7),
                optional(point.rolling_avg_30),
                self.global_mean.to_string(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e))?;
        let contents = String::from_utf8(bytes)?;
        crate::utils::write_atomic(path, &contents)
    }
}
