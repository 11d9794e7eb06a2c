use serde::Serialize;

/// User-facing status messages produced by background work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum Notice {
    /// A flush pass delivered `count` queued submissions.
    SyncCompleted { count: usize },
    WentOffline,
    /// Connectivity came back; a sync pass is starting.
    BackOnline,
    /// A submission could not be delivered and was queued locally.
    SavedOffline { placeholder_id: String },
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Self::SyncCompleted { count } => format!("Synced {count} offline submission(s)"),
            Self::WentOffline => "You're offline. Submissions will be saved locally.".to_string(),
            Self::BackOnline => "Back online. Syncing queued submissions...".to_string(),
            Self::SavedOffline { .. } => "Saved offline. Will sync when connected.".to_string(),
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::WentOffline | Self::SavedOffline { .. })
    }
}
