//! Payload command implementation.

use super::Settings;
use catsync_engine::{build_remote_payload, LocalEntityProvider};

/// Runs the payload command.
pub fn run(settings: &Settings, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let entity = settings
        .provider()
        .get_by_id(id)?
        .ok_or_else(|| format!("Entity {id} not found"))?;

    let payload = build_remote_payload(&entity);
    let value: serde_json::Value = serde_json::from_str(&payload.to_json()?)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
