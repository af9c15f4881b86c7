//! Locating a JSON array inside free-form model output.

use serde_json::{Map, Value};

use crate::ai_generation::AiResult;
use crate::error::{MalformedContentSnafu, ParseSnafu};

/// Returns the items of the first top-level JSON array in `text`.
///
/// Each `[` outside an array already parsed is tried as the start of a JSON
/// value, so prose before or after the array is ignored, as are stray brackets
/// that do not begin valid JSON. The first array holding at least one object
/// wins. An array of plain values is only used when no attempt failed, so a
/// truncated reply is a parse error rather than whatever array it happens to
/// contain.
pub fn extract_json_array(text: &str) -> AiResult<Vec<Value>> {
    let mut first_array: Option<Vec<Value>> = None;
    let mut last_error: Option<serde_json::Error> = None;
    let mut resume_at = 0;

    for (start, _) in text.match_indices('[') {
        if start < resume_at {
            continue;
        }
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Array(items))) => {
                resume_at = start + stream.byte_offset();
                if items.iter().any(Value::is_object) {
                    return Ok(items);
                }
                if first_array.is_none() {
                    first_array = Some(items);
                }
            }
            Some(Err(err)) if err.is_eof() => {
                // every later bracket sits inside this unterminated value
                last_error = Some(err);
                break;
            }
            Some(Err(err)) => last_error = Some(err),
            _ => {}
        }
    }

    match (first_array, last_error) {
        (_, Some(err)) => ParseSnafu {
            message: format!("response JSON array could not be parsed: {err}"),
        }
        .fail(),
        (Some(items), None) if !items.is_empty() => Ok(items),
        (Some(_), None) => ParseSnafu {
            message: "response contained an empty array",
        }
        .fail(),
        (None, None) => ParseSnafu {
            message: "response did not contain a JSON array",
        }
        .fail(),
    }
}

/// Looks up the first of `aliases` present on `object`, ignoring key case.
pub(crate) fn field<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases.iter().find_map(|alias| {
        object
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(alias))
            .map(|(_, value)| value)
    })
}

pub(crate) fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

pub(crate) fn malformed<T>(message: impl Into<String>) -> AiResult<T> {
    MalformedContentSnafu {
        message: message.into(),
    }
    .fail()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StudyError;

    #[test]
    fn ignores_surrounding_prose() {
        let items = extract_json_array(r#"Sure! [{"q":"1"},{"q":"2"}] Hope that helps."#).unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn handles_code_fences() {
        let raw = "```json\n[\n  {\"q\": \"Q1\", \"a\": \"A1\"}\n]\n```";
        assert_eq!(extract_json_array(raw).unwrap().len(), 1);
    }

    #[test]
    fn skips_unrelated_brackets_in_prose() {
        let raw = r#"As noted in [1], here are the cards: [{"q":"Q","a":"A"}] (see [2])"#;
        let items = extract_json_array(raw).unwrap();
        assert_eq!(items.len(), 1);
        assert!(items[0].is_object());
    }

    #[test]
    fn nested_arrays_resolve_to_the_outer_one() {
        let raw = r#"[{"q":"Q","o":["a","b"],"c":1}]"#;
        let items = extract_json_array(raw).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn missing_brackets_is_a_parse_error() {
        let err = extract_json_array("I cannot help with that.").unwrap_err();
        assert!(matches!(err, StudyError::Parse { .. }));
    }

    #[test]
    fn broken_json_is_a_parse_error() {
        let err = extract_json_array(r#"[{"q": "unterminated}"#).unwrap_err();
        assert!(matches!(err, StudyError::Parse { .. }));
    }

    #[test]
    fn truncated_reply_does_not_yield_an_inner_array() {
        let raw = r#"[{"q":"Q1","o":["a","b"],"c":0},{"q":"Q2","o":["x","y""#;
        let err = extract_json_array(raw).unwrap_err();
        assert!(matches!(err, StudyError::Parse { .. }));
    }

    #[test]
    fn truncated_reply_does_not_fall_back_to_an_earlier_citation() {
        let raw = r#"See [1]. [{"q":"Q1","a":"A1"},{"q":"Q2","#;
        let err = extract_json_array(raw).unwrap_err();
        assert!(matches!(err, StudyError::Parse { .. }));
    }

    #[test]
    fn brackets_inside_a_parsed_array_are_not_retried() {
        let items = extract_json_array(r#"[1, [{"q":"Q","a":"A"}]]"#).unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_number());
    }

    #[test]
    fn empty_array_is_a_parse_error() {
        let err = extract_json_array("Nothing to report: []").unwrap_err();
        assert!(matches!(err, StudyError::Parse { .. }));
    }

    #[test]
    fn field_lookup_ignores_case() {
        let Value::Object(object) = serde_json::json!({"Question": "Why?"}) else {
            unreachable!()
        };
        assert_eq!(
            field(&object, &["q", "question"]).and_then(value_to_string),
            Some("Why?".to_string())
        );
    }
}
