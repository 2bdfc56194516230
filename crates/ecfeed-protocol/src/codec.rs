use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("Cannot parse line '{line}': {source}")]
    InvalidJson {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Received line is not a JSON object: '{0}'")]
    NotAnObject(String),

    #[error("Received an empty JSON object")]
    EmptyObject,

    #[error("Method header has no 'method' field: '{0}'")]
    MissingMethod(String),

    #[error("Malformed method signature: '{0}'")]
    MalformedSignature(String),
}

/// Ordered parameter metadata learned from the method signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    /// Qualified method name without return type or parameters.
    pub name: String,
    pub arg_names: Vec<String>,
    pub arg_types: Vec<String>,
}

impl MethodInfo {
    pub fn arity(&self) -> usize {
        self.arg_names.len()
    }
}

/// Decoded payload of an `info` line carrying the method announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodHeader {
    /// Full signature text as sent by the server.
    pub signature: String,
    pub test_session_id: Option<String>,
    pub timestamp: Option<String>,
    pub method: MethodInfo,
}

/// Payload of an `info` line.
#[derive(Debug, Clone, PartialEq)]
pub enum InfoMessage {
    /// Liveness ping.
    Alive,
    /// Raw header text; decode with [`decode_method_header`].
    Header(String),
}

/// A decoded protocol line.
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolMessage {
    Info(InfoMessage),
    TestCase(Value),
    Error(String),
    Status(String),
    /// Any tag the client does not interpret.
    Other { tag: String, payload: Value },
}

/// Split a line into its single top-level `(tag, payload)` pair.
pub fn decode_line(line: &str) -> Result<(String, Value), CodecError> {
    let value: Value = serde_json::from_str(line).map_err(|source| CodecError::InvalidJson {
        line: line.to_string(),
        source,
    })?;

    let Value::Object(object) = value else {
        return Err(CodecError::NotAnObject(line.to_string()));
    };

    object.into_iter().next().ok_or(CodecError::EmptyObject)
}

/// Decode a line and classify it by tag.
pub fn decode_message(line: &str) -> Result<ProtocolMessage, CodecError> {
    let (tag, payload) = decode_line(line)?;

    Ok(match tag.as_str() {
        "info" => {
            let text = value_text(&payload);
            if text == "alive" {
                ProtocolMessage::Info(InfoMessage::Alive)
            } else {
                ProtocolMessage::Info(InfoMessage::Header(text))
            }
        }
        "testCase" => ProtocolMessage::TestCase(payload),
        "error" => ProtocolMessage::Error(value_text(&payload)),
        "status" => ProtocolMessage::Status(value_text(&payload)),
        _ => ProtocolMessage::Other { tag, payload },
    })
}

/// Decode the single-quoted header object of an `info` line.
///
/// A malformed signature does not reject the header: the session id and
/// timestamp are kept and the parameter metadata is left empty.
pub fn decode_method_header(header: &str) -> Result<MethodHeader, CodecError> {
    let normalized = header.replace('\'', "\"");
    let value: Value =
        serde_json::from_str(&normalized).map_err(|source| CodecError::InvalidJson {
            line: header.to_string(),
            source,
        })?;

    let Value::Object(object) = value else {
        return Err(CodecError::NotAnObject(header.to_string()));
    };

    let signature = object
        .get("method")
        .map(value_text)
        .ok_or_else(|| CodecError::MissingMethod(header.to_string()))?;

    let method = parse_signature(&signature).unwrap_or_else(|e| {
        warn!("{e}; method metadata left empty");
        MethodInfo::default()
    });

    Ok(MethodHeader {
        test_session_id: object.get("testSessionId").map(value_text),
        timestamp: object.get("timestamp").map(value_text),
        signature,
        method,
    })
}

/// Parse `qualifiedName(type1 name1, type2 name2, ...)` into parameter metadata.
///
/// A return type before the qualified name is tolerated and dropped. Commas
/// nested inside `<>`, `()` or `[]` do not split parameters.
pub fn parse_signature(signature: &str) -> Result<MethodInfo, CodecError> {
    let malformed = || CodecError::MalformedSignature(signature.to_string());

    let open = signature.find('(').ok_or_else(malformed)?;
    let close = signature.rfind(')').ok_or_else(malformed)?;
    if close < open {
        return Err(malformed());
    }

    let name = signature[..open]
        .split_whitespace()
        .last()
        .ok_or_else(malformed)?
        .to_string();

    let mut info = MethodInfo {
        name,
        ..MethodInfo::default()
    };

    let params = signature[open + 1..close].trim();
    if params.is_empty() {
        return Ok(info);
    }

    for token in split_top_level(params) {
        let token = token.trim();
        let split_at = token.find(char::is_whitespace).ok_or_else(malformed)?;
        let (arg_type, arg_name) = token.split_at(split_at);
        let arg_name = arg_name.trim_start();
        if arg_type.is_empty() || arg_name.is_empty() {
            return Err(malformed());
        }
        info.arg_types.push(arg_type.to_string());
        info.arg_names.push(arg_name.to_string());
    }

    Ok(info)
}

fn split_top_level(params: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, c) in params.char_indices() {
        match c {
            '<' | '(' | '[' => depth += 1,
            '>' | ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&params[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&params[start..]);
    parts
}

/// String content of a JSON value; non-strings use their JSON text.
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
