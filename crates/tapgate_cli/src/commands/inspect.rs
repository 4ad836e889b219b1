//! Inspect command implementation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tapgate_store::LocalStore;

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store directory.
    pub path: String,
    /// Total recorded events.
    pub event_count: usize,
    /// Events waiting for the authority.
    pub unsynced_count: usize,
    /// Cached rules.
    pub rule_count: usize,
    /// When rules were last pulled, if ever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_synced_at: Option<DateTime<Utc>>,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = LocalStore::open(path)?;
    let events = store.events();
    let rules = store.rules();

    let result = InspectResult {
        path: path.display().to_string(),
        event_count: events.len(),
        unsynced_count: events.unsynced_len(),
        rule_count: rules.len(),
        rules_synced_at: rules.last_synced_at(),
    };

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => {
            println!("Store:           {}", result.path);
            println!("Events:          {}", result.event_count);
            println!("Unsynced events: {}", result.unsynced_count);
            println!("Cached rules:    {}", result.rule_count);
            match result.rules_synced_at {
                Some(at) => println!("Rules synced:    {at}"),
                None => println!("Rules synced:    never"),
            }
        }
    }

    Ok(())
}
