//! URLs and bodies sent to the generation service.

use ecfeed_params::serialize_entry;
use serde_json::{json, Map, Value};

use crate::feedback::FeedbackReport;
use crate::session::SessionDescriptor;

/// Percent-escape the characters the service requires escaped in `request`.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '"' => escaped.push_str("%22"),
            '\'' => escaped.push_str("%27"),
            '{' => escaped.push_str("%7B"),
            '}' => escaped.push_str("%7D"),
            '[' => escaped.push_str("%5B"),
            ']' => escaped.push_str("%5D"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// The `userData` object in the service's single-quoted notation.
pub fn user_data(session: &SessionDescriptor) -> String {
    let entries: Vec<String> = session
        .request
        .user_data()
        .iter()
        .map(|(key, value)| serialize_entry(key, value))
        .collect();
    format!("{{{}}}", entries.join(","))
}

/// The unescaped `request` parameter.
pub fn request_json(session: &SessionDescriptor) -> String {
    let mut request = format!(
        "{{\"method\":\"{}\",\"model\":\"{}\"",
        session.method, session.model
    );
    if let Some(template) = session.wire_template() {
        request.push_str(&format!(",\"template\":\"{}\"", template.url_param()));
    }
    request.push_str(&format!(",\"userData\":\"{}\"}}", user_data(session)));
    request
}

pub fn request_url(session: &SessionDescriptor) -> String {
    format!(
        "https://{}/testCaseService?requestType={}&client={}&request={}",
        session.generator_address,
        session.request_type(),
        session.client_id,
        escape(&request_json(session))
    )
}

pub fn feedback_url(session: &SessionDescriptor, session_id: &str) -> String {
    format!(
        "https://{}/streamFeedback?client={}&generationId={}",
        session.generator_address, session.client_id, session_id
    )
}

/// Local test case id as it appears in `testResults`.
pub fn case_key(id: u64) -> String {
    format!("0:{id}")
}

/// JSON body of the feedback POST.
pub fn feedback_body(report: &FeedbackReport) -> Value {
    let session = &report.session;
    let common = &session.request.common;
    let header = report.header.as_ref();

    let timestamp = header
        .and_then(|h| h.timestamp.as_deref())
        .map(|t| t.parse::<i64>().map(Value::from).unwrap_or_else(|_| json!(t)))
        .unwrap_or(Value::Null);

    let mut results = Map::new();
    for (id, record) in &report.records {
        let mut entry = json!({ "data": record.data });
        if let Some(verdict) = &record.verdict {
            entry["status"] = json!(verdict.status.as_str());
            if let Some(duration) = verdict.duration {
                entry["duration"] = json!(duration);
            }
            if let Some(comment) = &verdict.comment {
                entry["comment"] = json!(comment);
            }
            if !verdict.custom.is_empty() {
                entry["custom"] = json!(verdict.custom);
            }
        }
        results.insert(case_key(*id), entry);
    }

    let mut body = json!({
        "testSessionId": header.and_then(|h| h.test_session_id.clone()),
        "modelId": session.model,
        "methodInfo": header.map(|h| h.signature.clone()).unwrap_or_else(|| session.method.clone()),
        "framework": "Rust",
        "timestamp": timestamp,
        "generatorType": session.request.data_source.url_param(),
        "generatorOptions": session.request.generator_options(),
        "testResults": results,
    });

    if let Some(label) = &common.label {
        body["testSessionLabel"] = json!(label);
    }
    if let Some(constraints) = &common.constraints {
        body["constraints"] = constraints.to_option().to_json();
    }
    if let Some(choices) = &common.choices {
        body["choices"] = choices.to_option().to_json();
    }
    if let Some(suites) = &session.request.test_suites {
        body["testSuites"] = suites.to_option().to_json();
    }
    if !common.custom.is_empty() {
        body["custom"] = json!(common.custom);
    }

    body
}
