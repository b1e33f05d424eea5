use crate::commands::common::open_service;
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_add(
    name: &str,
    activity_parts: &[String],
    settings: &Settings,
) -> Result<(), CliError> {
    let activity = activity_parts.join(" ");

    let service = open_service(settings).await?;
    let entries = service.create_entry(name, &activity).await?;
    let queued = service.store().pending().await?.len();

    if queued == 0 {
        println!("Recorded entry for {} ({} total)", name.trim(), entries.len());
    } else {
        println!(
            "Recorded entry for {} ({} total, {queued} change(s) waiting to sync)",
            name.trim(),
            entries.len()
        );
    }
    Ok(())
}
