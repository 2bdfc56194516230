use serde_json::Value;
use tracing::warn;

use crate::arguments::TestArguments;
use crate::codec::MethodInfo;

/// Pair each `value` of a `testCase` payload with the parameter at the same
/// position.
///
/// Problems with individual elements are logged and skipped; a payload that
/// is not an array yields an empty record.
pub fn materialize(payload: &Value, info: &MethodInfo) -> TestArguments {
    let mut arguments = TestArguments::new();

    let Some(elements) = payload.as_array() else {
        warn!("Test case payload is not an array: {payload}");
        return arguments;
    };

    for (index, element) in elements.iter().enumerate() {
        let (Some(name), Some(type_tag)) = (info.arg_names.get(index), info.arg_types.get(index))
        else {
            warn!(
                "Test case has more values ({}) than declared parameters ({}); skipping value {index}",
                elements.len(),
                info.arity()
            );
            continue;
        };

        let value = match element.get("value") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => {
                warn!("Test case element {index} has no value: {element}");
                continue;
            }
            Some(other) => other.to_string(),
        };

        arguments.add(name.as_str(), type_tag.as_str(), value);
    }

    arguments
}
