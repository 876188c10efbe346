// archiver_core/src/settings.rs

//! Configuration structures for the archiver.
//! Loads settings from JSON files and validates them. Without a settings file
//! the built-in defaults reproduce the historical archive layout.

use std::collections::BTreeMap;
use std::fs;

use crate::controller;
use crate::fetcher::FetchErrorKind;
use crate::date_range::Boundary;
use crate::records::Mode;
use crate::sources::{spelling_bee, wordle};

/// Provider and layout of one archive.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub enum SourceType {
    /// One `{date}.json` per solution.
    #[serde(rename = "Wordle_Archive")]
    WordleArchive { solution_url: String },
    /// Single `date -> solution` dictionary file.
    #[serde(rename = "Wordle_Solutions")]
    WordleSolutions { solution_url: String },
    #[serde(rename = "Wordle_Summaries")]
    WordleSummaries { solution_url: String, summary_url: String },
    #[serde(rename = "Guesses_By_Round")]
    GuessesByRound { mode: Mode, solution_url: String, guesses_url: String },
    #[serde(rename = "Spelling_Bee")]
    SpellingBee { puzzle_url: String, first_puzzle_date: chrono::NaiveDate },
}

impl SourceType {
    pub fn is_sequence_keyed(&self) -> bool {
        matches!(self, SourceType::SpellingBee { .. })
    }

    /// URL templates with the placeholders each must contain.
    fn url_templates(&self) -> Vec<(&str, &'static [&'static str])> {
        const DATE: &[&str] = &["date"];
        const SOLUTION: &[&str] = &["solution"];
        const SOLUTION_MODE: &[&str] = &["solution", "mode"];
        const NUMBER: &[&str] = &["number"];

        match self {
            SourceType::WordleArchive { solution_url } | SourceType::WordleSolutions { solution_url } => {
                vec![(solution_url.as_str(), DATE)]
            }
            SourceType::WordleSummaries { solution_url, summary_url } => {
                vec![(solution_url.as_str(), DATE), (summary_url.as_str(), SOLUTION)]
            }
            SourceType::GuessesByRound { solution_url, guesses_url, .. } => {
                vec![(solution_url.as_str(), DATE), (guesses_url.as_str(), SOLUTION_MODE)]
            }
            SourceType::SpellingBee { puzzle_url, .. } => vec![(puzzle_url.as_str(), NUMBER)],
        }
    }
}

/// Key preceding the first record of a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum EpochKey {
    Number(u64),
    Date(chrono::NaiveDate),
}

/// Settings for a single source.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSettings {
    pub source_type: SourceType,
    /// Archive directory, or the index file for `Wordle_Solutions`.
    pub output_path: String,
    pub epoch: EpochKey,
    pub boundary: Boundary,
    #[serde(default = "default_horizon_on")]
    pub horizon_on: Vec<FetchErrorKind>,
}

fn default_horizon_on() -> Vec<FetchErrorKind> {
    vec![FetchErrorKind::NotFound]
}

/// Settings applicable to every run.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommonSettings {
    pub workers: usize,
    pub batch_size: usize,
    pub timeout_secs: u64,
    pub dispatch_delay_ms: u64,
    pub transient_abort_threshold: usize,
    pub user_agent: String,
}

impl Default for CommonSettings {
    fn default() -> Self {
        Self {
            workers: controller::DEFAULT_WORKERS,
            batch_size: controller::DEFAULT_BATCH_SIZE,
            timeout_secs: 30,
            dispatch_delay_ms: controller::DEFAULT_DISPATCH_DELAY_MS,
            transient_abort_threshold: controller::DEFAULT_TRANSIENT_ABORT_THRESHOLD,
            user_agent: format!("archiver/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// First-guess analysis inputs and outputs, per mode.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisSettings {
    pub start_date: chrono::NaiveDate,
    pub boundary: Boundary,
    pub guesses_paths: BTreeMap<Mode, String>,
    pub output_paths: BTreeMap<Mode, String>,
}

/// Series export settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeriesSettings {
    pub summaries_path: String,
    pub output_dir: String,
}

/// Puzzle id list export settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PuzzleIdsSettings {
    pub archive_path: String,
    pub output_path: String,
    pub skip_first: usize,
}

/// Top-level settings structure.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub common: CommonSettings,
    pub sources: BTreeMap<String, SourceSettings>,
    pub analysis: Option<AnalysisSettings>,
    pub series: Option<SeriesSettings>,
    pub puzzle_ids: Option<PuzzleIdsSettings>,
}

impl Settings {
    /// Loads settings from a JSON file.
    /// # Arguments
    /// * `settings_file_path` - Path to the JSON configuration file.
    /// # Returns
    /// * `anyhow::Result<Settings>` containing the validated settings.
    pub fn load<P: AsRef<std::path::Path>>(settings_file_path: P) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(settings_file_path)?;
        Self::from_json(&contents)
    }

    /// Parses and validates settings from JSON text.
    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        let settings: Settings = serde_json::from_str(contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse settings JSON: {}", e))?;

        check_args(&settings)
            .map_err(|e| anyhow::anyhow!("Settings validation failed:\n{}", e))?;

        anyhow::Ok(settings)
    }

    /// Settings matching the historical layout of the data directories.
    pub fn builtin() -> Self {
        let mut sources = BTreeMap::new();
        let wordle_epoch = EpochKey::Date(wordle::launch_epoch());

        sources.insert("wordle_archive".to_string(), SourceSettings {
            source_type: SourceType::WordleArchive { solution_url: wordle::DEFAULT_SOLUTION_URL.to_string() },
            output_path: "data/archive/json".to_string(),
            epoch: wordle_epoch,
            boundary: Boundary::Today,
            horizon_on: default_horizon_on(),
        });
        sources.insert("wordle_solutions".to_string(), SourceSettings {
            source_type: SourceType::WordleSolutions { solution_url: wordle::DEFAULT_SOLUTION_URL.to_string() },
            output_path: "data/wordle/solutions.json".to_string(),
            epoch: wordle_epoch,
            boundary: Boundary::Yesterday,
            horizon_on: default_horizon_on(),
        });
        sources.insert("wordle_summaries".to_string(), SourceSettings {
            source_type: SourceType::WordleSummaries {
                solution_url: wordle::DEFAULT_SOLUTION_URL.to_string(),
                summary_url: wordle::DEFAULT_SUMMARY_URL.to_string(),
            },
            output_path: "data/wordle/summaries".to_string(),
            epoch: wordle_epoch,
            boundary: Boundary::Today,
            horizon_on: default_horizon_on(),
        });
        for mode in Mode::ALL {
            sources.insert(format!("guesses_{}", mode), SourceSettings {
                source_type: SourceType::GuessesByRound {
                    mode,
                    solution_url: wordle::DEFAULT_SOLUTION_URL.to_string(),
                    guesses_url: wordle::DEFAULT_GUESSES_URL.to_string(),
                },
                output_path: guesses_dir(mode),
                epoch: EpochKey::Date(wordle::guesses_epoch()),
                boundary: Boundary::Today,
                horizon_on: default_horizon_on(),
            });
        }
        sources.insert("spelling_bee".to_string(), SourceSettings {
            source_type: SourceType::SpellingBee {
                puzzle_url: spelling_bee::DEFAULT_PUZZLE_URL.to_string(),
                first_puzzle_date: spelling_bee::first_puzzle_date(),
            },
            output_path: "data/spelling-bee/archive".to_string(),
            epoch: EpochKey::Number(0),
            boundary: Boundary::Today,
            horizon_on: default_horizon_on(),
        });

        Self {
            common: CommonSettings::default(),
            sources,
            analysis: Some(AnalysisSettings {
                start_date: crate::cheating::analysis_start(),
                boundary: Boundary::Today,
                guesses_paths: Mode::ALL.into_iter().map(|m| (m, guesses_dir(m))).collect(),
                output_paths: Mode::ALL
                    .into_iter()
                    .map(|m| (m, format!("data/wordle/guesses_by_round/cheating_analysis_{}.json", m)))
                    .collect(),
            }),
            series: Some(SeriesSettings {
                summaries_path: "data/wordle/summaries".to_string(),
                output_dir: "data/wordle/series".to_string(),
            }),
            puzzle_ids: Some(PuzzleIdsSettings {
                archive_path: "data/archive/json".to_string(),
                output_path: "data/archive/relevant_puzzle_ids.json".to_string(),
                skip_first: crate::aggregate::DEFAULT_SKIPPED_PUZZLE_IDS,
            }),
        }
    }

    /// Names of the Spelling Bee sources, used to locate puzzle archives.
    pub fn spelling_bee_sources(&self) -> Vec<(&String, &SourceSettings)> {
        self.sources
            .iter()
            .filter(|(_, s)| s.source_type.is_sequence_keyed())
            .collect()
    }
}

fn guesses_dir(mode: Mode) -> String {
    format!("data/wordle/guesses_by_round/{}", mode)
}

fn check_args(settings: &Settings) -> anyhow::Result<()> {
    // check common
    {
        let common = &settings.common;
        if common.workers == 0 {
            anyhow::bail!("Settings validation error: 'workers' cannot be zero.");
        }
        if common.batch_size == 0 {
            anyhow::bail!("Settings validation error: 'batch_size' cannot be zero.");
        }
        if common.timeout_secs == 0 {
            anyhow::bail!("Settings validation error: 'timeout_secs' cannot be zero.");
        }
        if common.user_agent.trim().is_empty() {
            anyhow::bail!("Settings validation error: 'user_agent' cannot be empty.");
        }
    }

    // check sources
    {
        if settings.sources.is_empty() {
            anyhow::bail!("Provide at least one source!");
        }

        for (name, source) in &settings.sources {
            // check epoch kind
            {
                match (&source.epoch, source.source_type.is_sequence_keyed()) {
                    (EpochKey::Number(_), true) | (EpochKey::Date(_), false) => {}
                    (EpochKey::Date(_), true) => {
                        anyhow::bail!("Source '{}': epoch must be a puzzle number", name);
                    }
                    (EpochKey::Number(_), false) => {
                        anyhow::bail!("Source '{}': epoch must be a YYYY-MM-DD date", name);
                    }
                }
            }

            // check url templates
            {
                for (template, placeholders) in source.source_type.url_templates() {
                    if !template.starts_with("http://") && !template.starts_with("https://") {
                        anyhow::bail!("Source '{}': URL template '{}' must be an http(s) URL", name, template);
                    }
                    for placeholder in placeholders {
                        if !template.contains(&format!("{{{}}}", placeholder)) {
                            anyhow::bail!(
                                "Source '{}': URL template '{}' is missing the {{{}}} placeholder",
                                name,
                                template,
                                placeholder,
                            );
                        }
                    }
                }
            }

            // check output path
            {
                let normalized_path = source.output_path.trim_end_matches('/');
                if normalized_path.is_empty() {
                    anyhow::bail!("Source '{}': output path cannot be empty!", name);
                }

                let path = std::path::Path::new(normalized_path);
                let single_file = matches!(source.source_type, SourceType::WordleSolutions { .. });
                if single_file && path.is_dir() {
                    anyhow::bail!("Source '{}': output path '{}' is a directory, expected a file", name, normalized_path);
                }
                if !single_file && path.exists() && !path.is_dir() {
                    anyhow::bail!("Source '{}': output path '{}' is not a directory!", name, normalized_path);
                }
            }

            // check horizon kinds
            {
                if source.horizon_on.contains(&FetchErrorKind::Transient) {
                    tracing::warn!(source = %name, "transient failures are configured as horizon signals");
                }
            }
        }
    }

    // check analysis
    {
        if let Some(analysis) = &settings.analysis {
            for mode in Mode::ALL {
                if !analysis.guesses_paths.contains_key(&mode) || !analysis.output_paths.contains_key(&mode) {
                    anyhow::bail!("Analysis settings need guesses and output paths for '{}' mode", mode);
                }
            }
        }
    }

    // check puzzle ids
    {
        if let Some(puzzle_ids) = &settings.puzzle_ids {
            if puzzle_ids.output_path.trim().is_empty() {
                anyhow::bail!("Puzzle ids output path cannot be empty!");
            }
        }
    }

    anyhow::Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_settings_pass_validation() {
        let settings = Settings::builtin();
        check_args(&settings).unwrap();
        assert_eq!(settings.sources.len(), 6);
        assert_eq!(settings.spelling_bee_sources().len(), 1);
    }

    #[test]
    fn builtin_settings_survive_json() {
        let json = serde_json::to_string_pretty(&Settings::builtin()).unwrap();
        let settings = Settings::from_json(&json).unwrap();
        let bee = &settings.sources["spelling_bee"];
        assert_eq!(bee.epoch, EpochKey::Number(0));
        assert!(matches!(settings.sources["guesses_hard"].source_type, SourceType::GuessesByRound { mode: Mode::Hard, .. }));
    }

    #[test]
    fn parses_minimal_file() {
        let json = r#"{
            "sources": {
                "bee": {
                    "source_type": {"Spelling_Bee": {"puzzle_url": "https://example.org/s/{number}", "first_puzzle_date": "2018-05-09"}},
                    "output_path": "bee",
                    "epoch": 0,
                    "boundary": "yesterday",
                    "horizon_on": ["not_found", "validation"]
                }
            },
            "analysis": null,
            "series": null,
            "puzzle_ids": null
        }"#;
        let settings = Settings::from_json(json).unwrap();
        assert_eq!(settings.common.workers, controller::DEFAULT_WORKERS);
        assert_eq!(settings.sources["bee"].horizon_on, vec![FetchErrorKind::NotFound, FetchErrorKind::Validation]);
        assert_eq!(settings.sources["bee"].boundary, Boundary::Yesterday);
    }

    #[test]
    fn rejects_mismatched_epoch() {
        let mut settings = Settings::builtin();
        settings.sources.get_mut("spelling_bee").unwrap().epoch = EpochKey::Date(wordle::launch_epoch());
        assert!(check_args(&settings).is_err());

        let mut settings = Settings::builtin();
        settings.sources.get_mut("wordle_archive").unwrap().epoch = EpochKey::Number(3);
        assert!(check_args(&settings).is_err());
    }

    #[test]
    fn rejects_template_without_placeholder() {
        let mut settings = Settings::builtin();
        settings.sources.get_mut("wordle_summaries").unwrap().source_type = SourceType::WordleSummaries {
            solution_url: wordle::DEFAULT_SOLUTION_URL.to_string(),
            summary_url: "https://example.org/summary.json".to_string(),
        };
        let error = check_args(&settings).unwrap_err().to_string();
        assert!(error.contains("{solution}"), "{error}");
    }

    #[test]
    fn rejects_zero_workers_and_unknown_fields() {
        let mut settings = Settings::builtin();
        settings.common.workers = 0;
        assert!(check_args(&settings).is_err());

        assert!(Settings::from_json(r#"{"sources": {}, "extra": 1}"#).is_err());
    }
}
