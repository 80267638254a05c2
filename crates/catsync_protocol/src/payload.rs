//! Request payload for remote product sets.

use serde::{Deserialize, Serialize};

/// The flat JSON body sent when creating or updating a remote resource.
///
/// `filter` and `metadata` are themselves JSON documents encoded as strings;
/// this is what the remote service expects and must not be changed to
/// nested objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePayload {
    /// Display name of the remote resource.
    pub name: String,
    /// Stable external identifier, equal to the local entity ID.
    pub retailer_id: String,
    /// JSON-encoded boolean filter expression.
    pub filter: String,
    /// JSON-encoded metadata object, omitted when there is none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl RemotePayload {
    /// Encodes the payload as a JSON request body.
    pub fn to_json(&self) -> crate::ProtocolResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn metadata_omitted_when_absent() {
        let payload = RemotePayload {
            name: "Hats".into(),
            retailer_id: "7".into(),
            filter: "{}".into(),
            metadata: None,
        };

        let body: Value = serde_json::from_str(&payload.to_json().unwrap()).unwrap();
        let object = body.as_object().unwrap();
        assert_eq!(object.len(), 3);
        assert!(!object.contains_key("metadata"));
    }

    #[test]
    fn filter_stays_a_string() {
        let payload = RemotePayload {
            name: "Hats".into(),
            retailer_id: "7".into(),
            filter: r#"{"and":[]}"#.into(),
            metadata: Some(r#"{"description":"d"}"#.into()),
        };

        let body: Value = serde_json::from_str(&payload.to_json().unwrap()).unwrap();
        assert!(body["filter"].is_string());
        assert!(body["metadata"].is_string());
    }
}
