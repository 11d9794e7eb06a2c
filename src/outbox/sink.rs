use crate::kernel::layout::FormKind;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The server's answer to an accepted submission. Pit records usually come
/// back with just an id; match records also carry the server's own scoring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, rename = "autoPts")]
    pub auto_pts: Option<f64>,
    #[serde(default, rename = "telePts")]
    pub tele_pts: Option<f64>,
    #[serde(default, rename = "endPts")]
    pub end_pts: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("server rejected submission with status {status}")]
    Rejected { status: u16 },
}

/// Somewhere a submission can be delivered. Implemented by the HTTP client
/// and by test doubles.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    async fn deliver(&self, kind: FormKind, payload: &Value) -> Result<DeliveryReceipt, DeliveryError>;
}
