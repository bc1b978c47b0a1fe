use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{BucketName, ObjectKey};

/// Body of `GET /get-prediction`.
///
/// `object_key` names the stored object the label was computed from; older
/// backends omit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub prediction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_key: Option<ObjectKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObjectSummary {
    pub bucket: BucketName,
    pub key: ObjectKey,
    pub content_type: String,
    pub size_bytes: u64,
    pub revision: i64,
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

pub fn get_prediction_route() -> &'static str {
    "/get-prediction"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prediction_without_object_key_decodes() {
        let parsed: PredictionResponse =
            serde_json::from_str(r#"{"prediction":"apple"}"#).expect("json");
        assert_eq!(parsed.prediction, "apple");
        assert!(parsed.object_key.is_none());
    }

    #[test]
    fn prediction_with_object_key_round_trips_field_names() {
        let response = PredictionResponse {
            prediction: "Banana".into(),
            object_key: Some(ObjectKey::from("banana.png")),
        };
        let value = serde_json::to_value(&response).expect("json");
        assert_eq!(value["prediction"], "Banana");
        assert_eq!(value["object_key"], "banana.png");
    }
}
