use crate::commands::common::{format_pending_lines, open_service, pending_to_item, PendingItem};
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_pending(as_json: bool, settings: &Settings) -> Result<(), CliError> {
    let service = open_service(settings).await?;
    let pending = service.store().pending().await?;

    if as_json {
        let json_items = pending
            .iter()
            .map(pending_to_item)
            .collect::<Vec<PendingItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if pending.is_empty() {
        println!("Nothing waiting to sync.");
        return Ok(());
    }

    for line in format_pending_lines(&pending) {
        println!("{line}");
    }
    Ok(())
}
