//! One scouting form being filled in.
//!
//! A `FormSession` owns the state tree for its form, applies every
//! interaction to it synchronously, publishes a fresh score on a fixed tick
//! and hands finished records to the server or, failing that, to the outbox.

use crate::kernel::layout::{FormKind, FormLayout, Section};
use crate::kernel::path::FieldPath;
use crate::kernel::schema::{FieldDescriptor, FieldSpec};
use crate::kernel::scoring::{score_form, ScoreBreakdown};
use crate::kernel::state::{Attempt, LeafValue, ScoringPair, StateError, StateTree};
use crate::kernel::timer::FieldTimer;
use crate::notice::Notice;
use crate::outbox::{DeliveryReceipt, Outbox, StoreError, SubmissionSink};
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How a submission ended up.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The server stored the record.
    Delivered(DeliveryReceipt),
    /// Delivery failed; the record is in the outbox under `entry_id`.
    Offline {
        placeholder_id: String,
        entry_id: String,
    },
}

impl SubmitOutcome {
    pub fn is_offline(&self) -> bool {
        matches!(self, Self::Offline { .. })
    }
}

pub struct FormSession {
    layout: Arc<FormLayout>,
    state: Arc<RwLock<StateTree>>,
    timers: Mutex<HashMap<FieldPath, FieldTimer>>,
    sink: Arc<dyn SubmissionSink>,
    outbox: Outbox,
    notices: mpsc::Sender<Notice>,
    scores: watch::Receiver<ScoreBreakdown>,
    token: CancellationToken,
    scorer: JoinHandle<()>,
}

impl FormSession {
    /// Bind every field of `layout` and start the scoring tick. Must be
    /// called from within a tokio runtime.
    pub fn start(
        layout: FormLayout,
        sink: Arc<dyn SubmissionSink>,
        outbox: Outbox,
        notices: mpsc::Sender<Notice>,
        score_tick: Duration,
    ) -> Result<Self, StateError> {
        let tree = layout.initial_state()?;
        let layout = Arc::new(layout);
        let (score_tx, scores) = watch::channel(score_form(&layout, &tree));
        let state = Arc::new(RwLock::new(tree));
        let token = CancellationToken::new();

        let scorer = tokio::spawn(run_scoring(
            Arc::clone(&layout),
            Arc::clone(&state),
            score_tx,
            score_tick,
            token.clone(),
        ));

        info!(kind = %layout.kind, "form session started");
        Ok(Self {
            layout,
            state,
            timers: Mutex::new(HashMap::new()),
            sink,
            outbox,
            notices,
            scores,
            token,
            scorer,
        })
    }

    pub fn kind(&self) -> FormKind {
        self.layout.kind
    }

    pub fn layout(&self) -> &FormLayout {
        &self.layout
    }

    /// Sections in display order, each with its descriptor tree.
    pub fn sections(&self) -> &[Section] {
        &self.layout.sections
    }

    pub fn descriptor(&self, path: &FieldPath) -> Option<&FieldDescriptor> {
        self.layout.find(path)
    }

    pub fn get(&self, path: &FieldPath) -> Option<LeafValue> {
        self.read().get(path).cloned()
    }

    /// Raw write. Bound paths still reject values of the wrong shape.
    pub fn set(&self, path: &FieldPath, value: impl Into<LeafValue>) -> Result<(), StateError> {
        self.write().set(path, value)
    }

    /// Checkbox interaction. Plain booleans store the flag; boolean-with-value
    /// fields store their point value when checked and 0 otherwise.
    pub fn set_checked(&self, path: &FieldPath, checked: bool) -> Result<(), StateError> {
        match &self.bound(path)?.spec {
            FieldSpec::Boolean { .. } => self.set(path, checked),
            FieldSpec::BooleanWithValue { points } => {
                self.set(path, if checked { *points } else { 0.0 })
            }
            _ => Err(unsupported(path, "a checkbox")),
        }
    }

    /// Add `delta` to a numeric field. Integer fields stay whole.
    pub fn adjust_number(&self, path: &FieldPath, delta: f64) -> Result<f64, StateError> {
        let round = match &self.bound(path)?.spec {
            FieldSpec::Integer => true,
            FieldSpec::Float => false,
            _ => return Err(unsupported(path, "numeric adjustment")),
        };
        let mut tree = self.write();
        let current = tree.get(path).and_then(LeafValue::as_number).unwrap_or(0.0);
        let next = if round {
            (current + delta).round()
        } else {
            current + delta
        };
        tree.set(path, next)?;
        Ok(next)
    }

    /// Bump one counter of a scoring pair. Counters never go below zero.
    pub fn record_attempt(
        &self,
        path: &FieldPath,
        attempt: Attempt,
        delta: i64,
    ) -> Result<ScoringPair, StateError> {
        if !matches!(self.bound(path)?.spec, FieldSpec::ScoringPair { .. }) {
            return Err(unsupported(path, "made/missed counts"));
        }
        let mut tree = self.write();
        let mut pair = tree.get(path).and_then(LeafValue::as_pair).unwrap_or_default();
        let counter = match attempt {
            Attempt::Made => &mut pair.made,
            Attempt::Missed => &mut pair.missed,
        };
        *counter = (i64::from(*counter) + delta).clamp(0, i64::from(u32::MAX)) as u32;
        tree.set(path, pair)?;
        Ok(pair)
    }

    /// Select or deselect one option of a multiple-choice field. Selection
    /// order is kept and an option is never recorded twice.
    pub fn toggle_option(
        &self,
        path: &FieldPath,
        option: &str,
        selected: bool,
    ) -> Result<Vec<String>, StateError> {
        if !matches!(self.bound(path)?.spec, FieldSpec::MultipleChoice { .. }) {
            return Err(unsupported(path, "multiple selection"));
        }
        let mut tree = self.write();
        let mut chosen: Vec<String> = tree
            .get(path)
            .and_then(LeafValue::selections)
            .map(|items| items.into_iter().map(str::to_string).collect())
            .unwrap_or_default();
        let present = chosen.iter().any(|item| item == option);
        if selected && !present {
            chosen.push(option.to_string());
        } else if !selected {
            chosen.retain(|item| item != option);
        }
        tree.set(path, chosen.clone())?;
        Ok(chosen)
    }

    /// Pick the option of a single-choice field.
    pub fn choose(&self, path: &FieldPath, option: &str) -> Result<(), StateError> {
        match &self.bound(path)?.spec {
            FieldSpec::SingleChoice { .. } => self.set(path, option),
            _ => Err(unsupported(path, "a single choice")),
        }
    }

    /// Store the reference returned by the upload endpoint.
    pub fn attach_reference(&self, path: &FieldPath, reference: &str) -> Result<(), StateError> {
        match &self.bound(path)?.spec {
            FieldSpec::ImageReference => self.set(path, reference),
            _ => Err(unsupported(path, "an image reference")),
        }
    }

    pub fn start_timer(&self, path: &FieldPath) -> Result<(), StateError> {
        self.ensure_timer(path)?;
        let resume = self
            .get(path)
            .and_then(|v| v.as_number())
            .map_or(0, |n| n.max(0.0) as u64);
        self.timers()
            .entry(path.clone())
            .or_insert_with(|| FieldTimer::resume_from(resume))
            .start();
        Ok(())
    }

    /// Pause the timer and commit its reading to the tree.
    pub fn stop_timer(&self, path: &FieldPath) -> Result<u64, StateError> {
        self.ensure_timer(path)?;
        let stopped = self.timers().get_mut(path).map(FieldTimer::stop);
        match stopped {
            Some(reading) => {
                self.set(path, reading as f64)?;
                Ok(reading)
            }
            None => Ok(self.timer_reading(path)),
        }
    }

    /// Zero the timer and commit 0.
    pub fn reset_timer(&self, path: &FieldPath) -> Result<(), StateError> {
        self.ensure_timer(path)?;
        let reading = self
            .timers()
            .get_mut(path)
            .map_or(0, FieldTimer::reset);
        self.set(path, reading as f64)
    }

    /// Live reading, including time not yet committed.
    pub fn timer_reading(&self, path: &FieldPath) -> u64 {
        match self.timers().get(path) {
            Some(timer) => timer.elapsed(),
            None => self
                .get(path)
                .and_then(|v| v.as_number())
                .map_or(0, |n| n.max(0.0) as u64),
        }
    }

    /// Score computed from the current state right now.
    pub fn score(&self) -> ScoreBreakdown {
        score_form(&self.layout, &self.read())
    }

    /// Scores published by the scoring tick.
    pub fn scores(&self) -> watch::Receiver<ScoreBreakdown> {
        self.scores.clone()
    }

    pub fn snapshot(&self) -> Value {
        self.read().snapshot()
    }

    /// Throw away every entry and start over from the defaults.
    pub fn clear(&self) -> Result<(), StateError> {
        let fresh = self.layout.initial_state()?;
        *self.write() = fresh;
        self.timers().clear();
        Ok(())
    }

    /// Deliver the current record, falling back to the outbox.
    ///
    /// The snapshot is taken before this returns, so the form can keep
    /// changing while the returned future runs. Only a failure to write the
    /// outbox is reported as an error.
    pub fn submit(&self) -> impl Future<Output = Result<SubmitOutcome, StoreError>> + Send + 'static {
        let payload = self.snapshot();
        let kind = self.layout.kind;
        let sink = Arc::clone(&self.sink);
        let outbox = self.outbox.clone();
        let notices = self.notices.clone();

        async move {
            match sink.deliver(kind, &payload).await {
                Ok(receipt) => {
                    info!(kind = %kind, id = ?receipt.id, "submission delivered");
                    Ok(SubmitOutcome::Delivered(receipt))
                }
                Err(e) => {
                    warn!(kind = %kind, "submission failed, saving offline: {}", e);
                    let entry = outbox.enqueue(kind, payload).await?;
                    let placeholder_id = format!("offline-{}", Utc::now().timestamp_millis());
                    if let Err(e) = notices.try_send(Notice::SavedOffline {
                        placeholder_id: placeholder_id.clone(),
                    }) {
                        debug!("notice dropped: {}", e);
                    }
                    Ok(SubmitOutcome::Offline {
                        placeholder_id,
                        entry_id: entry.id,
                    })
                }
            }
        }
    }

    /// Stop the scoring tick. Also happens on drop.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_scoring(&self) -> bool {
        !self.scorer.is_finished()
    }

    // --- internals ---

    fn bound(&self, path: &FieldPath) -> Result<&FieldDescriptor, StateError> {
        self.layout
            .find(path)
            .filter(|d| !d.is_group())
            .ok_or_else(|| StateError::Unbound(path.clone()))
    }

    fn ensure_timer(&self, path: &FieldPath) -> Result<(), StateError> {
        match self.bound(path)?.spec {
            FieldSpec::Timer => Ok(()),
            _ => Err(unsupported(path, "timing")),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, StateTree> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, StateTree> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn timers(&self) -> std::sync::MutexGuard<'_, HashMap<FieldPath, FieldTimer>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for FormSession {
    fn drop(&mut self) {
        self.token.cancel();
        self.scorer.abort();
    }
}

fn unsupported(path: &FieldPath, operation: &'static str) -> StateError {
    StateError::Unsupported {
        path: path.clone(),
        operation,
    }
}

async fn run_scoring(
    layout: Arc<FormLayout>,
    state: Arc<RwLock<StateTree>>,
    scores: watch::Sender<ScoreBreakdown>,
    tick: Duration,
    token: CancellationToken,
) {
    let mut cadence = interval(tick);
    cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = cadence.tick() => {
                let breakdown = {
                    let tree = state.read().unwrap_or_else(PoisonError::into_inner);
                    score_form(&layout, &tree)
                };
                scores.send_if_modified(|current| {
                    if *current == breakdown {
                        false
                    } else {
                        *current = breakdown;
                        true
                    }
                });
            }
        }
    }
    debug!("scoring tick stopped");
}
