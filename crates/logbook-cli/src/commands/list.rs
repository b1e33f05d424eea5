use crate::commands::common::{entry_to_list_item, format_entry_lines, open_service, EntryListItem};
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_list(limit: usize, as_json: bool, settings: &Settings) -> Result<(), CliError> {
    let service = open_service(settings).await?;
    let mut entries = service.list_entries().await?;
    entries.truncate(limit);

    if as_json {
        let json_items = entries
            .iter()
            .map(entry_to_list_item)
            .collect::<Vec<EntryListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
    } else if entries.is_empty() {
        println!("No entries yet.");
    } else {
        for line in format_entry_lines(&entries) {
            println!("{line}");
        }
    }

    Ok(())
}
