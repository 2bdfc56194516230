//! Per-test-case verdicts and the ledger that reports them.
//!
//! Every produced test case gets a [`FeedbackHandle`]. Once the stream has
//! finished and every handle has a verdict, the ledger hands a single
//! [`FeedbackReport`] to its [`FeedbackSink`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use ecfeed_protocol::MethodHeader;
use serde::Serialize;
use tracing::debug;

use crate::session::SessionDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    #[serde(rename = "P")]
    Passed,
    #[serde(rename = "F")]
    Failed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Passed => "P",
            Status::Failed => "F",
        }
    }
}

impl From<bool> for Status {
    fn from(passed: bool) -> Self {
        if passed {
            Status::Passed
        } else {
            Status::Failed
        }
    }
}

/// Caller-supplied result for one test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub status: Status,
    /// Execution time in milliseconds.
    pub duration: Option<u64>,
    pub comment: Option<String>,
    pub custom: BTreeMap<String, String>,
}

impl Verdict {
    pub fn passed() -> Self {
        Self::new(Status::Passed)
    }

    pub fn failed() -> Self {
        Self::new(Status::Failed)
    }

    pub fn from_passed(passed: bool) -> Self {
        Self::new(Status::from(passed))
    }

    pub fn new(status: Status) -> Self {
        Self {
            status,
            duration: None,
            comment: None,
            custom: BTreeMap::new(),
        }
    }

    pub fn duration(mut self, millis: u64) -> Self {
        self.duration = Some(millis);
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    pub fn custom(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }
}

/// One produced test case as it is reported back.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
    /// Serialized test case payload.
    pub data: String,
    pub verdict: Option<Verdict>,
}

/// Everything the feedback POST needs, collected when the ledger completes.
#[derive(Debug, Clone)]
pub struct FeedbackReport {
    pub session: Arc<SessionDescriptor>,
    pub header: Option<MethodHeader>,
    pub records: BTreeMap<u64, FeedbackRecord>,
}

/// Receives the completed report.
pub trait FeedbackSink: Send + Sync {
    fn submit(&self, report: FeedbackReport);
}

#[derive(Debug, Default)]
struct LedgerState {
    produced: u64,
    resolved: u64,
    finished: bool,
    submitted: bool,
    header: Option<MethodHeader>,
    records: BTreeMap<u64, FeedbackRecord>,
}

pub struct FeedbackLedger {
    session: Arc<SessionDescriptor>,
    enabled: bool,
    sink: Arc<dyn FeedbackSink>,
    state: Mutex<LedgerState>,
}

impl std::fmt::Debug for FeedbackLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("FeedbackLedger")
            .field("enabled", &self.enabled)
            .field("produced", &state.produced)
            .field("resolved", &state.resolved)
            .field("finished", &state.finished)
            .field("submitted", &state.submitted)
            .finish()
    }
}

impl FeedbackLedger {
    pub fn new(session: Arc<SessionDescriptor>, sink: Arc<dyn FeedbackSink>) -> Self {
        Self {
            enabled: session.feedback_enabled(),
            session,
            sink,
            state: Mutex::new(LedgerState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn session(&self) -> &SessionDescriptor {
        &self.session
    }

    pub fn produced(&self) -> u64 {
        self.lock().produced
    }

    pub fn resolved(&self) -> u64 {
        self.lock().resolved
    }

    pub fn is_submitted(&self) -> bool {
        self.lock().submitted
    }

    /// Remember the server-assigned session identity for the report.
    pub fn set_header(&self, header: MethodHeader) {
        self.lock().header.get_or_insert(header);
    }

    /// Count a produced test case and hand out its handle.
    ///
    /// With feedback disabled nothing is counted and the handle is inert.
    pub fn register(self: &Arc<Self>, data: String) -> FeedbackHandle {
        let id = if self.enabled {
            let mut state = self.lock();
            let id = state.produced;
            state.produced += 1;
            state.records.insert(
                id,
                FeedbackRecord {
                    data,
                    verdict: None,
                },
            );
            id
        } else {
            0
        };

        FeedbackHandle {
            ledger: Arc::clone(self),
            id,
            comment: Mutex::new(None),
        }
    }

    /// Mark production complete; may complete the ledger.
    pub fn mark_finished(&self) {
        let report = {
            let mut state = self.lock();
            state.finished = true;
            self.take_report(&mut state)
        };
        self.deliver(report);
    }

    fn resolve(&self, id: u64, verdict: Verdict) {
        let report = {
            let mut state = self.lock();
            match state.records.get_mut(&id) {
                Some(record) if record.verdict.is_none() => {
                    record.verdict = Some(verdict);
                    state.resolved += 1;
                }
                _ => return,
            }
            self.take_report(&mut state)
        };
        self.deliver(report);
    }

    fn take_report(&self, state: &mut LedgerState) -> Option<FeedbackReport> {
        if !self.enabled || state.submitted || !state.finished {
            return None;
        }
        if state.produced == 0 {
            debug!("No test cases produced, nothing to report");
            return None;
        }
        if state.resolved < state.produced {
            return None;
        }

        state.submitted = true;
        Some(FeedbackReport {
            session: Arc::clone(&self.session),
            header: state.header.clone(),
            records: std::mem::take(&mut state.records),
        })
    }

    fn deliver(&self, report: Option<FeedbackReport>) {
        if let Some(report) = report {
            debug!(cases = report.records.len(), "Submitting feedback");
            self.sink.submit(report);
        }
    }
}

/// One-shot verdict slot of a single test case.
#[derive(Debug)]
pub struct FeedbackHandle {
    ledger: Arc<FeedbackLedger>,
    id: u64,
    /// Comment returned to the first caller; `Some` once resolved.
    comment: Mutex<Option<String>>,
}

impl FeedbackHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_resolved(&self) -> bool {
        self.comment
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Record a verdict. Only the first call counts.
    ///
    /// Returns the comment of the winning verdict, or `"feedback"` when it had
    /// none. A no-op when feedback is disabled for the session.
    pub fn add_feedback(&self, verdict: Verdict) -> String {
        let text = verdict
            .comment
            .clone()
            .unwrap_or_else(|| "feedback".to_string());

        if !self.ledger.is_enabled() {
            return text;
        }

        {
            let mut comment = self.comment.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = comment.as_ref() {
                return previous.clone();
            }
            *comment = Some(text.clone());
        }

        self.ledger.resolve(self.id, verdict);
        text
    }

    pub fn passed(&self) -> String {
        self.add_feedback(Verdict::passed())
    }

    pub fn failed(&self, comment: impl Into<String>) -> String {
        self.add_feedback(Verdict::failed().comment(comment))
    }
}
