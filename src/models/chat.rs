use chrono::{ DateTime, Utc };
use serde::{ Serialize, Deserialize };
use serde_json::{ Map, Value };

/// The final record of a chat log, kept as the raw JSON object.
///
/// Every field is optional and untrusted; accessors fall back to `None` (or `0`
/// for the send date) instead of failing, and unknown fields round-trip verbatim.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageRecord {
    fields: Map<String, Value>,
}

impl MessageRecord {
    pub fn name(&self) -> Option<&str> {
        self.fields.get("name").and_then(Value::as_str)
    }

    pub fn is_user(&self) -> bool {
        self.fields.get("is_user").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn mes(&self) -> Option<&str> {
        self.fields.get("mes").and_then(Value::as_str)
    }

    /// Numeric send timestamp used for recency ordering. Missing or
    /// non-numeric values order as `0`.
    pub fn send_date(&self) -> f64 {
        self.fields
            .get("send_date")
            .and_then(Value::as_f64)
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    /// Send timestamp interpreted as epoch milliseconds.
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        let millis = self.fields.get("send_date").and_then(Value::as_f64)?;
        if !millis.is_finite() || millis <= 0.0 {
            return None;
        }
        DateTime::from_timestamp_millis(millis as i64)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub chat_file_id: String,
    pub last_message: MessageRecord,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> MessageRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn missing_fields_fall_back_quietly() {
        let r = record(json!({}));
        assert_eq!(r.name(), None);
        assert_eq!(r.mes(), None);
        assert!(!r.is_user());
        assert_eq!(r.send_date(), 0.0);
        assert!(r.sent_at().is_none());
    }

    #[test]
    fn non_numeric_send_date_orders_as_zero() {
        let r = record(json!({ "send_date": "May 5, 2024 3:30pm" }));
        assert_eq!(r.send_date(), 0.0);
    }

    #[test]
    fn sent_at_reads_epoch_millis() {
        let r = record(json!({ "send_date": 1_700_000_000_000i64 }));
        assert_eq!(r.sent_at().unwrap().timestamp(), 1_700_000_000);
    }

    #[test]
    fn summary_uses_camel_case_and_keeps_unknown_fields() {
        let summary = ChatSummary {
            chat_file_id: "b".into(),
            last_message: record(json!({ "send_date": 200, "mes": "yo", "extra": { "swipes": [] } })),
        };
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["chatFileId"], "b");
        assert_eq!(value["lastMessage"]["extra"], json!({ "swipes": [] }));
    }

    #[test]
    fn non_object_records_are_rejected() {
        assert!(serde_json::from_str::<MessageRecord>("[1,2]").is_err());
    }
}
