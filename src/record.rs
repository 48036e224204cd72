use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::PayloadError;

/// Key used for notifications that carry no `image` field. Every such
/// notification lands on this key and replaces the previous one.
pub const UNKNOWN_IMAGE: &str = "unknown";

/// The latest known state of one image, as reported by the notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecord {
    #[serde(default, deserialize_with = "deserialize_text")]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub provider: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub digest: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub created: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub platform: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub hub_link: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text")]
    pub hostname: Option<String>,
    #[serde(default, deserialize_with = "deserialize_metadata")]
    pub metadata: Map<String, Value>,
    /// Server time of arrival, milliseconds since the Unix epoch.
    #[serde(default, deserialize_with = "deserialize_millis")]
    pub detected_at: i64,
    /// Insertion order within the current cycle; breaks `detected_at` ties.
    #[serde(default)]
    pub seq: u64,
}

impl UpdateRecord {
    /// Build a record from a webhook payload, stamped with `detected_at`.
    ///
    /// Returns the store key alongside the record. Only the known fields are
    /// read; `hub-link` is the notifier's spelling of `hub_link`.
    pub fn from_payload(payload: &Map<String, Value>, detected_at: i64) -> (String, Self) {
        let image = text_field(payload, "image");
        let key = image.clone().unwrap_or_else(|| UNKNOWN_IMAGE.to_string());
        let metadata = match payload.get("metadata") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };

        let record = Self {
            image,
            status: text_field(payload, "status"),
            provider: text_field(payload, "provider"),
            digest: text_field(payload, "digest"),
            created: text_field(payload, "created"),
            platform: text_field(payload, "platform"),
            hub_link: text_field(payload, "hub-link"),
            hostname: text_field(payload, "hostname"),
            metadata,
            detected_at,
            seq: 0,
        };
        (key, record)
    }
}

/// Parse a raw request body into the JSON object a notification must be.
pub fn parse_payload(body: &[u8]) -> Result<Map<String, Value>, PayloadError> {
    match serde_json::from_slice::<Value>(body)? {
        Value::Object(map) => Ok(map),
        _ => Err(PayloadError::NotAnObject),
    }
}

fn text_field(payload: &Map<String, Value>, key: &str) -> Option<String> {
    scalar_text(payload.get(key)?)
}

/// Scalars are kept in their JSON text form; null, objects and arrays are dropped.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// Older documents stored payload values verbatim, so any JSON type may appear.
fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(&Value::deserialize(deserializer)?))
}

// Documents written by older trackers may carry float timestamps or nulls.
fn deserialize_millis<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .ok_or_else(|| serde::de::Error::custom(format!("invalid detected_at: {}", n))),
        other => Err(serde::de::Error::custom(format!(
            "detected_at must be a number, got {}",
            other
        ))),
    }
}

fn deserialize_metadata<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

/// Image identifier → latest record. Serializes as a plain JSON object, keys
/// in sorted order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateMap {
    records: BTreeMap<String, UpdateRecord>,
}

impl UpdateMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, image: &str) -> Option<&UpdateRecord> {
        self.records.get(image)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &UpdateRecord)> {
        self.records.iter()
    }

    pub fn records(&self) -> impl Iterator<Item = &UpdateRecord> {
        self.records.values()
    }

    /// The newest `detected_at` in the map, or `None` when empty.
    pub fn most_recent_detected_at(&self) -> Option<i64> {
        self.records.values().map(|r| r.detected_at).max()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Insert or replace the record for `image`, assigning it the next
    /// sequence number. Returns the replaced record, if any.
    pub fn upsert(&mut self, image: String, mut record: UpdateRecord) -> Option<UpdateRecord> {
        record.seq = self.next_seq();
        self.records.insert(image, record)
    }

    fn next_seq(&self) -> u64 {
        self.records
            .values()
            .map(|r| r.seq)
            .max()
            .map_or(0, |seq| seq + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[test]
    fn test_parse_payload_object() {
        let map = parse_payload(br#"{"image":"a"}"#).unwrap();
        assert_eq!(map.get("image").and_then(|v| v.as_str()), Some("a"));
    }

    #[test]
    fn test_parse_payload_malformed_keeps_parser_message() {
        let err = parse_payload(b"{not json").unwrap_err();
        assert!(matches!(err, PayloadError::InvalidJson(_)));
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_parse_payload_rejects_array() {
        assert!(matches!(
            parse_payload(b"[1,2]"),
            Err(PayloadError::NotAnObject)
        ));
    }

    #[test]
    fn test_from_payload_reads_known_fields() {
        let p = payload(json!({
            "image": "docker.io/library/nginx:latest",
            "status": "update",
            "provider": "docker",
            "digest": "sha256:abc",
            "created": "2024-01-01T00:00:00Z",
            "platform": "linux/amd64",
            "hub-link": "https://hub.docker.com/_/nginx",
            "hostname": "nas",
            "metadata": {"ctn_names": "web", "nested": {"a": [1, 2]}},
            "detected_at": 42,
            "extra": "ignored"
        }));
        let (key, record) = UpdateRecord::from_payload(&p, 1_000);
        assert_eq!(key, "docker.io/library/nginx:latest");
        assert_eq!(record.hub_link.as_deref(), Some("https://hub.docker.com/_/nginx"));
        assert_eq!(record.hostname.as_deref(), Some("nas"));
        assert_eq!(record.metadata["nested"], json!({"a": [1, 2]}));
        assert_eq!(record.detected_at, 1_000);
    }

    #[test]
    fn test_from_payload_defaults() {
        let (key, record) = UpdateRecord::from_payload(&payload(json!({"status": "new"})), 5);
        assert_eq!(key, UNKNOWN_IMAGE);
        assert_eq!(record.image, None);
        assert_eq!(record.provider, None);
        assert!(record.metadata.is_empty());
    }

    #[test]
    fn test_from_payload_stringifies_scalars() {
        let (_, record) = UpdateRecord::from_payload(
            &payload(json!({"image": "a", "status": 3, "digest": true, "platform": ["x"]})),
            5,
        );
        assert_eq!(record.status.as_deref(), Some("3"));
        assert_eq!(record.digest.as_deref(), Some("true"));
        assert_eq!(record.platform, None);
    }

    #[test]
    fn test_upsert_assigns_increasing_seq() {
        let mut map = UpdateMap::new();
        let (k1, r1) = UpdateRecord::from_payload(&payload(json!({"image": "a"})), 1);
        let (k2, r2) = UpdateRecord::from_payload(&payload(json!({"image": "b"})), 1);
        map.upsert(k1, r1);
        map.upsert(k2, r2);
        assert_eq!(map.get("a").unwrap().seq, 0);
        assert_eq!(map.get("b").unwrap().seq, 1);

        let (k3, r3) = UpdateRecord::from_payload(&payload(json!({"image": "a"})), 2);
        assert!(map.upsert(k3, r3).is_some());
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("a").unwrap().seq, 2);
    }

    #[test]
    fn test_deserialize_legacy_document() {
        let doc = json!({
            "repo/app:1.0.0": {
                "image": "repo/app:1.0.0",
                "status": "update",
                "provider": null,
                "metadata": null,
                "detected_at": 1700000000000.123
            }
        });
        let map: UpdateMap = serde_json::from_value(doc).unwrap();
        let record = map.get("repo/app:1.0.0").unwrap();
        assert_eq!(record.detected_at, 1_700_000_000_000);
        assert_eq!(record.seq, 0);
        assert!(record.metadata.is_empty());
        assert_eq!(record.provider, None);
    }

    #[test]
    fn test_deserialize_legacy_raw_field_values() {
        let doc = json!({
            "a": {
                "image": "a",
                "status": 3,
                "provider": true,
                "digest": ["sha256:1"],
                "created": {"at": 1},
                "platform": 1.5,
                "hub_link": null,
                "detected_at": 1.0
            }
        });
        let map: UpdateMap = serde_json::from_value(doc).unwrap();
        let record = map.get("a").unwrap();
        assert_eq!(record.status.as_deref(), Some("3"));
        assert_eq!(record.provider.as_deref(), Some("true"));
        assert_eq!(record.digest, None);
        assert_eq!(record.created, None);
        assert_eq!(record.platform.as_deref(), Some("1.5"));
        assert_eq!(record.hub_link, None);
        assert_eq!(record.hostname, None);
        assert_eq!(record.detected_at, 1);
    }

    #[test]
    fn test_deserialize_rejects_text_timestamp() {
        let doc = json!({"a": {"detected_at": "yesterday"}});
        assert!(serde_json::from_value::<UpdateMap>(doc).is_err());
    }

    #[test]
    fn test_most_recent_detected_at() {
        let mut map = UpdateMap::new();
        assert_eq!(map.most_recent_detected_at(), None);
        for (image, at) in [("a", 10), ("b", 30), ("c", 20)] {
            let (k, r) = UpdateRecord::from_payload(&payload(json!({"image": image})), at);
            map.upsert(k, r);
        }
        assert_eq!(map.most_recent_detected_at(), Some(30));
    }
}
