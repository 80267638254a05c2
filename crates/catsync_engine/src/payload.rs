//! Remote payload construction.

use catsync_protocol::{LocalEntity, RemotePayload};
use serde_json::{Map, Value};

/// Builds the remote payload for an entity.
///
/// Pure: the result depends only on the entity's current state. The
/// retailer ID is the local ID verbatim so the remote resource stays
/// recognizable even if the local mapping is lost.
pub fn build_remote_payload(entity: &LocalEntity) -> RemotePayload {
    let metadata = if entity.metadata.is_empty() {
        None
    } else {
        let object: Map<String, Value> = entity
            .metadata
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();
        Some(Value::Object(object).to_string())
    };

    RemotePayload {
        name: entity.display_name.clone(),
        retailer_id: entity.id.clone(),
        filter: entity.filter_criteria().to_json_string(),
        metadata,
    }
}
