use std::sync::{Arc, Mutex};

use ecfeed_core::{
    FeedbackHandle, FeedbackLedger, FeedbackReport, FeedbackSink, RequestKind, SessionDescriptor,
    Status, StreamQueue, TestCase, Verdict,
};
use ecfeed_params::{GeneratorParams, NWiseParams};
use ecfeed_protocol::{MethodHeader, MethodInfo, TestArguments};

#[derive(Default)]
struct RecordingSink {
    reports: Mutex<Vec<FeedbackReport>>,
}

impl RecordingSink {
    fn count(&self) -> usize {
        self.reports.lock().unwrap().len()
    }
}

impl FeedbackSink for RecordingSink {
    fn submit(&self, report: FeedbackReport) {
        self.reports.lock().unwrap().push(report);
    }
}

fn session(feedback: bool) -> Arc<SessionDescriptor> {
    Arc::new(SessionDescriptor {
        model: "M".into(),
        method: "T.m".into(),
        kind: RequestKind::Generate,
        request: NWiseParams::default().feedback(feedback).to_request(),
        generator_address: "gen.example.com".into(),
        client_id: "rust".into(),
    })
}

fn ledger(feedback: bool) -> (Arc<FeedbackLedger>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let ledger = Arc::new(FeedbackLedger::new(session(feedback), sink.clone()));
    (ledger, sink)
}

fn register(ledger: &Arc<FeedbackLedger>, count: usize) -> Vec<FeedbackHandle> {
    (0..count)
        .map(|i| ledger.register(format!("[{{\"value\":\"{i}\"}}]")))
        .collect()
}

#[test]
fn test_submits_after_finish_and_all_resolved() {
    let (ledger, sink) = ledger(true);
    let handles = register(&ledger, 2);

    handles[0].passed();
    ledger.mark_finished();
    assert_eq!(sink.count(), 0);

    handles[1].failed("boom");
    assert_eq!(sink.count(), 1);
    assert!(ledger.is_submitted());

    let reports = sink.reports.lock().unwrap();
    let report = &reports[0];
    assert_eq!(report.records.len(), 2);
    assert_eq!(
        report.records[&0].verdict.as_ref().unwrap().status,
        Status::Passed
    );
    let failed = report.records[&1].verdict.as_ref().unwrap();
    assert_eq!(failed.status, Status::Failed);
    assert_eq!(failed.comment.as_deref(), Some("boom"));
    assert_eq!(report.records[&1].data, "[{\"value\":\"1\"}]");
}

#[test]
fn test_submits_on_finish_when_already_resolved() {
    let (ledger, sink) = ledger(true);
    for handle in register(&ledger, 3) {
        handle.passed();
    }
    assert_eq!(sink.count(), 0);
    ledger.mark_finished();
    assert_eq!(sink.count(), 1);
    ledger.mark_finished();
    assert_eq!(sink.count(), 1);
}

#[test]
fn test_second_feedback_is_noop() {
    let (ledger, _sink) = ledger(true);
    let handles = register(&ledger, 1);

    let first = handles[0].add_feedback(Verdict::failed().comment("first").duration(12));
    assert_eq!(first, "first");
    let second = handles[0].add_feedback(Verdict::passed().comment("second"));
    assert_eq!(second, "first");
    assert_eq!(ledger.resolved(), 1);
    assert!(handles[0].is_resolved());
}

#[test]
fn test_second_feedback_without_comment_returns_literal() {
    let (ledger, _sink) = ledger(true);
    let handles = register(&ledger, 1);

    assert_eq!(handles[0].passed(), "feedback");
    assert_eq!(handles[0].failed("late"), "feedback");
}

#[test]
fn test_disabled_feedback_is_inert() {
    let (ledger, sink) = ledger(false);
    let handles = register(&ledger, 2);

    assert_eq!(ledger.produced(), 0);
    assert_eq!(handles[0].failed("x"), "x");
    assert!(!handles[0].is_resolved());
    handles[1].passed();
    ledger.mark_finished();
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_nothing_produced_nothing_sent() {
    let (ledger, sink) = ledger(true);
    ledger.mark_finished();
    assert_eq!(sink.count(), 0);
}

#[test]
fn test_report_carries_session_header() {
    let (ledger, sink) = ledger(true);
    ledger.set_header(MethodHeader {
        signature: "void T.m(int a)".into(),
        test_session_id: Some("S9".into()),
        timestamp: Some("17".into()),
        method: MethodInfo::default(),
    });
    let handles = register(&ledger, 1);
    ledger.mark_finished();
    handles[0].passed();

    let reports = sink.reports.lock().unwrap();
    let header = reports[0].header.as_ref().unwrap();
    assert_eq!(header.test_session_id.as_deref(), Some("S9"));
}

#[test]
fn test_exactly_once_across_threads() {
    for _ in 0..20 {
        let (ledger, sink) = ledger(true);
        let handles = register(&ledger, 64);

        crossbeam::scope(|scope| {
            for chunk in handles.chunks(16) {
                scope.spawn(move |_| {
                    for (i, handle) in chunk.iter().enumerate() {
                        handle.add_feedback(Verdict::from_passed(i % 2 == 0));
                        // Duplicate verdicts must not be counted twice.
                        handle.passed();
                    }
                });
            }
            scope.spawn(|_| ledger.mark_finished());
        })
        .unwrap();

        assert_eq!(sink.count(), 1);
        assert_eq!(ledger.resolved(), 64);
        let reports = sink.reports.lock().unwrap();
        assert!(reports[0].records.values().all(|r| r.verdict.is_some()));
    }
}

#[test]
fn test_queue_finish_completes_ledger() {
    let (ledger, sink) = ledger(true);
    let queue = StreamQueue::with_ledger(Arc::clone(&ledger));

    let mut args = TestArguments::new();
    args.add("a", "int", "1");
    let case = TestCase::new(args, ledger.register("[]".into()));
    queue.push(case);

    let case = queue.iter().next().unwrap();
    assert_eq!(case.get_int("a").unwrap(), 1);
    case.add_feedback(Verdict::passed().custom("k", "v"));
    assert_eq!(sink.count(), 0);

    queue.finish();
    assert_eq!(sink.count(), 1);
}
