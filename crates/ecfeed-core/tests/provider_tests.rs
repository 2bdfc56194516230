use std::sync::Arc;

use ecfeed_core::{ProviderConfig, ScriptedTransport, TestCase, TestProvider, Verdict};
use ecfeed_params::{GeneratorParams, NWiseParams, RandomParams, StaticParams, TemplateType};

const ALIVE: &str = r#"{"info":"alive"}"#;
const HEADER: &str = r#"{"info":"{'method': \"void T.m(int a, boolean b)\", 'testSessionId': \"S1\", 'timestamp': \"0\"}"}"#;

fn provider() -> (TestProvider, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::new());
    let provider = TestProvider::with_transport(ProviderConfig::new("M"), transport.clone())
        .expect("valid config");
    (provider, transport)
}

fn test_case(a: i32, b: bool) -> String {
    format!(r#"{{"testCase":[{{"value":"{a}"}},{{"value":"{b}"}}]}}"#)
}

#[test]
fn test_generate_end_to_end() {
    let (provider, transport) = provider();
    transport.add_lines([ALIVE, HEADER, test_case(3, true).as_str()]);

    let queue = provider
        .generate_nwise("T.m", &NWiseParams::default())
        .unwrap();
    let cases: Vec<TestCase> = queue.iter().collect();

    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].get::<i32>("a").unwrap(), 3);
    assert!(cases[0].get::<bool>("b").unwrap());
    assert_eq!(cases[0].to_string(), "int a = 3; boolean b = true; ");

    let info = queue.await_method_metadata().unwrap();
    assert_eq!(info.arg_names, vec!["a", "b"]);
    assert_eq!(info.arg_types, vec!["int", "boolean"]);
    assert_eq!(queue.session_id().as_deref(), Some("S1"));
    assert_eq!(queue.failure(), None);
    assert!(queue.is_done());

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].starts_with(
        "https://gen.ecfeed.com/testCaseService?requestType=requestData&client=rust&request="
    ));
    // Feedback is off by default.
    assert!(transport.posts().is_empty());
}

#[test]
fn test_generate_handles_arbitrary_chunking() {
    let (provider, transport) = provider();
    let body = format!("{HEADER}\n{}\n{}", test_case(1, false), test_case(2, true));
    let chunks = body
        .as_bytes()
        .chunks(7)
        .map(|c| c.to_vec())
        .collect();
    transport.add_chunks(chunks);

    let queue = provider
        .generate_random("T.m", &RandomParams::default())
        .unwrap();
    let values: Vec<i32> = queue.iter().map(|c| c.get_int(0).unwrap()).collect();
    assert_eq!(values, vec![1, 2]);
}

#[test]
fn test_test_case_before_header_is_dropped() {
    let (provider, transport) = provider();
    transport.add_lines([test_case(9, true).as_str(), HEADER, test_case(1, true).as_str()]);

    let queue = provider.generate_cartesian("T.m", &Default::default()).unwrap();
    let cases = queue.drain_blocking();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].get_int("a").unwrap(), 1);
}

#[test]
fn test_malformed_lines_are_skipped() {
    let (provider, transport) = provider();
    transport.add_lines([
        "not json",
        "[]",
        HEADER,
        r#"{"testCase":{"value":"1"}}"#,
        r#"{"status":"BEGIN_DATA"}"#,
        test_case(5, false).as_str(),
    ]);

    let queue = provider.generate("T.m", &NWiseParams::default()).unwrap();
    let cases = queue.drain_blocking();
    // The non-array test case still yields an (empty) record.
    assert_eq!(cases.len(), 2);
    assert!(cases[0].is_empty());
    assert_eq!(cases[1].get_int("a").unwrap(), 5);
    assert_eq!(queue.failure(), None);
}

#[test]
fn test_malformed_signature_gives_empty_metadata() {
    let (provider, transport) = provider();
    transport.add_lines([
        r#"{"info":"{'method': 'broken signature', 'testSessionId': 'S2', 'timestamp': '5'}"}"#,
        r#"{"testCase":[]}"#,
    ]);

    let queue = provider
        .generate("T.m", &NWiseParams::default().feedback(true))
        .unwrap();
    let info = queue.await_method_metadata().unwrap();
    assert!(info.arg_names.is_empty());
    assert!(info.arg_types.is_empty());
    assert_eq!(queue.session_id().as_deref(), Some("S2"));
    assert_eq!(queue.timestamp().as_deref(), Some("5"));

    let cases = queue.drain_blocking();
    assert_eq!(cases.len(), 1);
    cases[0].add_feedback(Verdict::passed());

    let posts = transport.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(
        posts[0].0,
        "https://gen.ecfeed.com/streamFeedback?client=rust&generationId=S2"
    );
    let body: serde_json::Value = serde_json::from_str(&posts[0].1).unwrap();
    assert_eq!(body["methodInfo"], "broken signature");
    assert_eq!(body["timestamp"], 5);
}

#[test]
fn test_error_message_aborts_stream() {
    let (provider, transport) = provider();
    transport.add_lines([
        HEADER,
        test_case(1, true).as_str(),
        r#"{"error":"Generator failed"}"#,
        test_case(2, true).as_str(),
    ]);

    let queue = provider.generate("T.m", &NWiseParams::default()).unwrap();
    let cases = queue.drain_blocking();
    assert_eq!(cases.len(), 1);
    assert_eq!(queue.failure().as_deref(), Some("Generator failed"));
    assert_eq!(transport.delivered(), 3);
}

#[test]
fn test_transport_failure_releases_consumers() {
    let (provider, transport) = provider();
    transport.add_failure("connection refused");

    let queue = provider.generate("T.m", &NWiseParams::default()).unwrap();
    assert_eq!(queue.iter().count(), 0);
    assert!(queue.failure().unwrap().contains("connection refused"));
    assert_eq!(queue.await_method_metadata(), None);
}

#[test]
fn test_feedback_posted_once_all_resolved() {
    let (provider, transport) = provider();
    transport.add_lines([HEADER, test_case(1, true).as_str(), test_case(2, false).as_str()]);

    let params = NWiseParams::default().feedback(true).label("nightly");
    let queue = provider.generate("T.m", &params).unwrap();

    for case in queue.iter() {
        if case.get_bool("b").unwrap() {
            case.add_feedback(Verdict::passed().duration(10));
        } else {
            case.add_feedback(Verdict::failed().comment("b is false"));
        }
    }

    let posts = transport.posts();
    assert_eq!(posts.len(), 1);
    let (url, body) = &posts[0];
    assert_eq!(
        url,
        "https://gen.ecfeed.com/streamFeedback?client=rust&generationId=S1"
    );

    let body: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(body["testSessionId"], "S1");
    assert_eq!(body["testSessionLabel"], "nightly");
    assert_eq!(body["methodInfo"], "void T.m(int a, boolean b)");
    assert_eq!(body["testResults"]["0:0"]["status"], "P");
    assert_eq!(body["testResults"]["0:1"]["status"], "F");
    assert_eq!(body["testResults"]["0:1"]["comment"], "b is false");
}

#[test]
fn test_feedback_waits_for_every_case() {
    let (provider, transport) = provider();
    transport.add_lines([HEADER, test_case(1, true).as_str(), test_case(2, true).as_str()]);

    let queue = provider
        .generate("T.m", &NWiseParams::default().feedback(true))
        .unwrap();
    let cases = queue.drain_blocking();

    cases[0].add_feedback(Verdict::passed());
    assert!(transport.posts().is_empty());
    cases[1].add_feedback(Verdict::passed());
    cases[1].add_feedback(Verdict::failed());
    assert_eq!(transport.posts().len(), 1);
}

#[test]
fn test_export_passes_lines_through() {
    let (provider, transport) = provider();
    transport.add_lines(["a,b", "1,true", r#"{"a":1,"b":2}"#, "3,false"]);

    let queue = provider
        .export_nwise("T.m", &NWiseParams::default())
        .unwrap();
    let lines: Vec<String> = queue.iter().collect();
    assert_eq!(lines, vec!["a,b", "1,true", r#"{"a":1,"b":2}"#, "3,false"]);
    assert!(transport.requests()[0].contains("requestType=requestExport"));
    assert!(transport.requests()[0].contains("%22template%22:%22CSV%22"));
}

#[test]
fn test_export_error_line_aborts() {
    let (provider, transport) = provider();
    transport.add_lines(["a,b", "1,2", r#"{"error":"Model not found"}"#, "3,4"]);

    let queue = provider
        .export_static("T.m", &StaticParams::default())
        .unwrap();
    let lines: Vec<String> = queue.iter().collect();
    assert_eq!(lines, vec!["a,b", "1,2"]);
    assert_eq!(queue.failure().as_deref(), Some("Model not found"));
    assert_eq!(transport.delivered(), 3);
}

#[test]
fn test_raw_export_streams_protocol_lines() {
    let (provider, transport) = provider();
    transport.add_lines([HEADER, test_case(1, true).as_str()]);

    let params = NWiseParams::default().template(TemplateType::Raw);
    let queue = provider.export("T.m", &params).unwrap();
    let lines = queue.drain_blocking();
    assert_eq!(lines, vec![HEADER.to_string(), test_case(1, true)]);

    let url = &transport.requests()[0];
    assert!(url.contains("requestType=requestData"));
    assert!(!url.contains("template"));
}

#[test]
fn test_model_override() {
    let (provider, transport) = provider();
    transport.add_lines([HEADER]);

    let params = NWiseParams::default().model("OTHER");
    provider.generate("T.m", &params).unwrap().drain_blocking();
    assert!(transport.requests()[0].contains("%22model%22:%22OTHER%22"));
}

#[test]
fn test_argument_names_and_types() {
    let (provider, transport) = provider();
    transport.add_lines([ALIVE, HEADER]);
    transport.add_lines([HEADER]);

    assert_eq!(provider.argument_names("T.m").unwrap(), vec!["a", "b"]);
    assert_eq!(provider.argument_types("T.m").unwrap(), vec!["int", "boolean"]);

    let requests = transport.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].contains("%27length%27:%270%27"));
    assert!(requests[0].contains("%27dataSource%27:%27genRandom%27"));
}

#[test]
fn test_requests_run_one_at_a_time() {
    let (provider, transport) = provider();
    for i in 0..4 {
        transport.add_lines([HEADER.to_string(), test_case(i, true)]);
    }

    let queues: Vec<_> = (0..4)
        .map(|_| provider.generate("T.m", &NWiseParams::default()).unwrap())
        .collect();

    let mut firsts: Vec<i32> = queues
        .iter()
        .map(|q| q.drain_blocking()[0].get_int("a").unwrap())
        .collect();
    firsts.sort_unstable();
    assert_eq!(firsts, vec![0, 1, 2, 3]);
    assert_eq!(transport.requests().len(), 4);
}

#[test]
fn test_empty_model_rejected() {
    let transport = Arc::new(ScriptedTransport::new());
    let result = TestProvider::with_transport(ProviderConfig::default(), transport);
    assert!(matches!(
        result,
        Err(ecfeed_core::ProviderError::Config(
            ecfeed_core::ConfigError::EmptyModel
        ))
    ));
}
