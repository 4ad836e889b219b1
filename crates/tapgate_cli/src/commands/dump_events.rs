//! Dump-events command implementation.

use std::path::Path;
use tapgate_core::{AccessEvent, HolderId};
use tapgate_store::LocalStore;

/// Runs the dump-events command.
pub fn run(
    path: &Path,
    holder: Option<u64>,
    unsynced_only: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = LocalStore::open(path)?;
    let events = store.events();

    let rows: Vec<AccessEvent> = match holder {
        Some(id) => events.all_for(HolderId::new(id)),
        None => events.all(),
    };
    let rows: Vec<AccessEvent> = rows
        .into_iter()
        .filter(|e| !unsynced_only || (!e.synced && e.backend_id.is_none()))
        .collect();

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&rows)?),
        _ => {
            for event in &rows {
                let verdict = if event.granted { "GRANT" } else { "DENY " };
                let sync = match event.backend_id {
                    Some(id) => format!("backend:{id}"),
                    None if event.synced => "synced".to_string(),
                    None => "queued".to_string(),
                };
                println!(
                    "{} {} {} {} [{}] {}",
                    event.id, event.occurred_at, verdict, event.holder, sync, event.reason
                );
            }
            println!("{} event(s)", rows.len());
        }
    }

    Ok(())
}
