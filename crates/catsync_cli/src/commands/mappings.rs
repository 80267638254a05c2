//! Mappings command implementation.

use super::Settings;
use catsync_engine::SyncStateStore;

/// Runs the mappings command.
pub fn run(settings: &Settings, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let store = settings.store()?;
    let mappings = store.entries()?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&mappings)?),
        _ => {
            println!("Mappings for {} ({})", settings.domain, store.path().display());
            for mapping in &mappings {
                println!("  {:<24} -> {}", mapping.local_id, mapping.remote_id);
            }
            println!();
            println!("  Total: {}", mappings.len());
        }
    }
    Ok(())
}
