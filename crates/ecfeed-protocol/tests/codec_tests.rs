use ecfeed_protocol::{
    decode_line, decode_message, decode_method_header, parse_signature, CodecError, InfoMessage,
    ProtocolMessage,
};
use serde_json::json;

#[test]
fn test_parse_signature_round_trip() {
    let info = parse_signature("void T.m(int a, java.lang.String b)").unwrap();
    assert_eq!(info.name, "T.m");
    assert_eq!(info.arg_names, vec!["a", "b"]);
    assert_eq!(info.arg_types, vec!["int", "java.lang.String"]);
    assert_eq!(info.arity(), 2);
}

#[test]
fn test_parse_signature_without_return_type() {
    let info = parse_signature("com.example.Tests.method(int a, java.lang.String b)").unwrap();
    assert_eq!(info.name, "com.example.Tests.method");
    assert_eq!(info.arg_types, vec!["int", "java.lang.String"]);
}

#[test]
fn test_parse_signature_empty_parameters() {
    let info = parse_signature("void T.noArgs(  )").unwrap();
    assert_eq!(info.name, "T.noArgs");
    assert!(info.arg_names.is_empty());
    assert!(info.arg_types.is_empty());
}

#[test]
fn test_parse_signature_extra_whitespace() {
    let info = parse_signature("void T.m(int    a,\tboolean  flag )").unwrap();
    assert_eq!(info.arg_names, vec!["a", "flag"]);
    assert_eq!(info.arg_types, vec!["int", "boolean"]);
}

#[test]
fn test_parse_signature_generic_parameter() {
    let info = parse_signature("void T.m(Map<String, Integer> counts, int n)").unwrap();
    assert_eq!(info.arg_types, vec!["Map<String, Integer>", "int"]);
    assert_eq!(info.arg_names, vec!["counts", "n"]);
}

#[test]
fn test_parse_signature_malformed() {
    assert!(matches!(
        parse_signature("void T.m int a"),
        Err(CodecError::MalformedSignature(_))
    ));
    assert!(matches!(
        parse_signature("void T.m(int)"),
        Err(CodecError::MalformedSignature(_))
    ));
    assert!(matches!(
        parse_signature(")T.m("),
        Err(CodecError::MalformedSignature(_))
    ));
}

#[test]
fn test_decode_line_returns_single_pair() {
    let (tag, payload) = decode_line(r#"{"error": "no such model"}"#).unwrap();
    assert_eq!(tag, "error");
    assert_eq!(payload, json!("no such model"));
}

#[test]
fn test_decode_line_invalid_json() {
    let err = decode_line("id,name").unwrap_err();
    assert!(matches!(err, CodecError::InvalidJson { .. }));
    assert!(err.to_string().contains("id,name"));
}

#[test]
fn test_decode_line_not_an_object() {
    assert!(matches!(
        decode_line("[1, 2]"),
        Err(CodecError::NotAnObject(_))
    ));
    assert!(matches!(decode_line("{}"), Err(CodecError::EmptyObject)));
}

#[test]
fn test_decode_message_alive() {
    let msg = decode_message(r#"{"info":"alive"}"#).unwrap();
    assert_eq!(msg, ProtocolMessage::Info(InfoMessage::Alive));
}

#[test]
fn test_decode_message_variants() {
    let msg = decode_message(r#"{"testCase":[{"value":"3"}]}"#).unwrap();
    assert_eq!(msg, ProtocolMessage::TestCase(json!([{"value": "3"}])));

    let msg = decode_message(r#"{"error":"boom"}"#).unwrap();
    assert_eq!(msg, ProtocolMessage::Error("boom".into()));

    let msg = decode_message(r#"{"status":"END_DATA"}"#).unwrap();
    assert_eq!(msg, ProtocolMessage::Status("END_DATA".into()));

    let msg = decode_message(r#"{"progress": 42}"#).unwrap();
    assert_eq!(
        msg,
        ProtocolMessage::Other {
            tag: "progress".into(),
            payload: json!(42)
        }
    );
}

#[test]
fn test_decode_method_header() {
    let line = r#"{"info":"{'method': \"void T.m(int a, boolean b)\", 'testSessionId': \"S1\", 'timestamp': \"0\"}"}"#;
    let ProtocolMessage::Info(InfoMessage::Header(text)) = decode_message(line).unwrap() else {
        panic!("expected a header");
    };

    let header = decode_method_header(&text).unwrap();
    assert_eq!(header.signature, "void T.m(int a, boolean b)");
    assert_eq!(header.test_session_id.as_deref(), Some("S1"));
    assert_eq!(header.timestamp.as_deref(), Some("0"));
    assert_eq!(header.method.arg_names, vec!["a", "b"]);
    assert_eq!(header.method.arg_types, vec!["int", "boolean"]);
}

#[test]
fn test_decode_method_header_numeric_timestamp() {
    let header =
        decode_method_header("{'method': 'T.m()', 'testSessionId': 'abc', 'timestamp': 1700000000}")
            .unwrap();
    assert_eq!(header.timestamp.as_deref(), Some("1700000000"));
    assert_eq!(header.method.arity(), 0);
}

#[test]
fn test_decode_method_header_keeps_session_on_malformed_signature() {
    let header =
        decode_method_header("{'method': 'broken signature', 'testSessionId': 'S2', 'timestamp': '5'}")
            .unwrap();
    assert_eq!(header.signature, "broken signature");
    assert_eq!(header.test_session_id.as_deref(), Some("S2"));
    assert_eq!(header.timestamp.as_deref(), Some("5"));
    assert_eq!(header.method, ecfeed_protocol::MethodInfo::default());
}

#[test]
fn test_decode_method_header_missing_method() {
    let err = decode_method_header("{'testSessionId': 'S1'}").unwrap_err();
    assert!(matches!(err, CodecError::MissingMethod(_)));
}
