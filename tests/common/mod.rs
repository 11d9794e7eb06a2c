#![allow(dead_code)]

use async_trait::async_trait;
use scoutbox::kernel::layout::FormKind;
use scoutbox::outbox::{DeliveryError, DeliveryReceipt, Outbox, SubmissionSink};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn sample_document() -> Value {
    json!({
        "match_form": {
            "pre-match_info": {
                "team_number": { "type": "integer" },
                "scouter": { "type": "string" }
            },
            "auto_period": {
                "leave": { "type": "boolean with value", "value": 3 },
                "L1": { "Value": 2 },
                "path_time": { "type": "timer" }
            },
            "teleop_period": {
                "coral": {
                    "L2": { "Value": 3 },
                    "L4": { "Value": 5 }
                },
                "defense": {
                    "type": "multiple choice",
                    "options": ["pin", "block", "steal"],
                    "values": [1, 2, 3]
                },
                "assist": { "type": "boolean", "value": 4 }
            },
            "endgame": {
                "final_status": { "options": ["Parked", "Climbed"], "values": [2, 6] }
            },
            "misc": {
                "fouls": { "type": "integer" },
                "notes": "free text"
            }
        },
        "pit_form": {
            "fields": {
                "drivetrain": { "type": "single choice", "options": ["tank", "swerve"] },
                "Robot Picture": { "type": "string" },
                "weight": { "type": "float" }
            }
        }
    })
}

/// A unique path under the system temp dir.
pub fn temp_path(name: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("scoutbox-{name}-{}-{nanos}.jsonl", std::process::id()))
}

/// Records every delivery; fails while `failing` is set.
#[derive(Default)]
pub struct RecordingSink {
    pub failing: AtomicBool,
    pub delivered: Mutex<Vec<(FormKind, Value)>>,
    pub attempts: AtomicUsize,
}

impl RecordingSink {
    pub fn succeeding() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let sink = Self::default();
        sink.failing.store(true, Ordering::SeqCst);
        sink
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<(FormKind, Value)> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SubmissionSink for RecordingSink {
    async fn deliver(&self, kind: FormKind, payload: &Value) -> Result<DeliveryReceipt, DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(DeliveryError::Transport("connection refused".into()));
        }
        self.delivered.lock().unwrap().push((kind, payload.clone()));
        Ok(DeliveryReceipt {
            id: Some(json!(42)),
            total: Some(0.0),
            ..Default::default()
        })
    }
}

/// Rejects payloads carrying `"reject": true`, accepts the rest.
#[derive(Default)]
pub struct SelectiveSink {
    pub delivered: Mutex<Vec<Value>>,
}

#[async_trait]
impl SubmissionSink for SelectiveSink {
    async fn deliver(&self, _kind: FormKind, payload: &Value) -> Result<DeliveryReceipt, DeliveryError> {
        if payload.get("reject") == Some(&Value::Bool(true)) {
            return Err(DeliveryError::Rejected { status: 500 });
        }
        self.delivered.lock().unwrap().push(payload.clone());
        Ok(DeliveryReceipt::default())
    }
}

/// Queues one extra submission the first time it delivers, simulating a
/// form submitted while a flush is in progress.
pub struct EnqueueDuringFlushSink {
    pub outbox: Outbox,
    pub fired: AtomicBool,
}

#[async_trait]
impl SubmissionSink for EnqueueDuringFlushSink {
    async fn deliver(&self, _kind: FormKind, _payload: &Value) -> Result<DeliveryReceipt, DeliveryError> {
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.outbox
                .enqueue(FormKind::Pit, json!({ "late": true }))
                .await
                .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        }
        Ok(DeliveryReceipt::default())
    }
}
