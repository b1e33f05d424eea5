use logbook_core::sync::{PassOutcome, SkipReason};

use crate::commands::common::open_service;
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_sync(settings: &Settings) -> Result<(), CliError> {
    settings.require_remote()?;
    let service = open_service(settings).await?;

    match service.coordinator().sync_now().await? {
        PassOutcome::Completed(report) => {
            println!(
                "{}",
                describe_pass(
                    report.reconciled,
                    report.drain.delivered,
                    report.drain.remaining(),
                    report.entries.len()
                )
            );
        }
        PassOutcome::Skipped(SkipReason::Offline) => {
            let queued = service.store().pending().await?.len();
            println!("Remote unreachable; {queued} change(s) still queued");
        }
        PassOutcome::Skipped(SkipReason::NoTransition) | PassOutcome::Coalesced => {
            println!("Sync already in progress");
        }
    }
    Ok(())
}

pub fn describe_pass(reconciled: bool, delivered: usize, remaining: usize, total: usize) -> String {
    let fetched = if reconciled {
        "merged remote entries"
    } else {
        "remote fetch failed, kept local entries"
    };
    if remaining == 0 {
        format!("Sync completed: {fetched}, {delivered} change(s) delivered, {total} entries")
    } else {
        format!(
            "Sync incomplete: {fetched}, {delivered} change(s) delivered, {remaining} still queued, {total} entries"
        )
    }
}
