// archiver_core/src/job.rs

//! Incremental fetch-and-archive job.
//! Reads the newest archived key, derives the missing window up to the
//! boundary and hands it to the controller, which stores every fetched record
//! back into the same archive.

use crate::controller::{ConcurrencyController, RunSummary};
use crate::date_range;
use crate::fetcher::RecordFetcher;
use crate::store::Archive;

/// Brings `archive` up to `boundary`.
///
/// # Arguments
/// * `name` - Source name used in log output.
/// * `archive` - Destination; also the only source of "what is already there".
/// * `fetcher` - Remote source of records.
/// * `epoch` - Key before the first record, used for an empty archive.
/// * `boundary` - Newest key that should exist now.
/// * `controller` - Worker pool settings and horizon policy.
///
/// # Returns
/// * `RunSummary` of the run.
pub fn run_incremental<A, F>(
    name: &str,
    archive: &A,
    fetcher: &F,
    epoch: A::Key,
    boundary: A::Key,
    controller: &ConcurrencyController,
) -> anyhow::Result<RunSummary<A::Key>>
where
    A: Archive,
    A::Record: Send,
    F: RecordFetcher<Key = A::Key, Record = A::Record>,
{
    // the listing must finish before any write of this run starts
    let latest = archive.latest_key()?;
    let window = date_range::compute_missing(latest.clone(), epoch, boundary.clone());
    let pending = window.clone().count();

    match &latest {
        Some(latest) => tracing::info!(source = name, %latest, %boundary, pending, "Updating archive"),
        None => tracing::info!(source = name, %boundary, pending, "Archive is empty, starting from epoch"),
    }
    if pending == 0 {
        return anyhow::Ok(RunSummary::default());
    }

    let summary = controller.run(
        window,
        |key| fetcher.fetch(key),
        |record| archive.write(record),
    )?;

    tracing::info!(
        source = name,
        fetched = summary.fetched,
        skipped = summary.skipped,
        failed = summary.failed,
        at_horizon = summary.at_horizon,
        unreached = summary.unreached,
        horizon = ?summary.horizon,
        retry_from = ?summary.retry_from,
        aborted = summary.aborted,
        "Run finished"
    );

    anyhow::Ok(summary)
}
