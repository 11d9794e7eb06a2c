use crate::kernel::layout::FormKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A submission waiting for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Unique per entry; removal after delivery goes by id.
    pub id: String,
    #[serde(rename = "type")]
    pub kind: FormKind,
    pub payload: Value,
    pub enqueued_at: DateTime<Utc>,
}

impl OutboxEntry {
    pub fn new(kind: FormKind, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            payload,
            enqueued_at: Utc::now(),
        }
    }
}
