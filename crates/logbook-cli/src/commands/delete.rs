use logbook_core::EntryId;

use crate::commands::common::open_service;
use crate::config::Settings;
use crate::error::CliError;

pub async fn run_delete(id: EntryId, settings: &Settings) -> Result<(), CliError> {
    let service = open_service(settings).await?;
    match service.store().get(id).await {
        Ok(_) => {}
        Err(error) if error.is_not_found() => return Err(CliError::EntryNotFound(id)),
        Err(error) => return Err(error.into()),
    }

    service.delete_entry(id).await?;
    println!("{id}");
    Ok(())
}
