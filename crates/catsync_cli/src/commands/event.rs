//! Event command implementation.

use super::Settings;
use catsync_engine::EventDispatcher;
use catsync_protocol::{ChangeKind, EntityEvent};
use std::sync::Arc;

/// Runs the event command.
pub fn run(settings: &Settings, kind: ChangeKind, id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let dispatcher = EventDispatcher::new();
    dispatcher.register(Arc::new(settings.engine(true)?));

    let event = EntityEvent::new(settings.domain.clone(), id, kind);
    let op = dispatcher.dispatch(&event)?;
    println!("{kind} {id}: {op}");
    Ok(())
}
