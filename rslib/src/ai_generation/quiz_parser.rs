use serde_json::{Map, Value};

use crate::ai_generation::extract::{extract_json_array, field, malformed, value_to_string};
use crate::ai_generation::{AiResult, QuizQuestion};

const QUESTION_KEYS: &[&str] = &["q", "question"];
const OPTION_KEYS: &[&str] = &["o", "options", "choices"];
const CORRECT_KEYS: &[&str] = &["c", "correct", "correctIndex", "correct_index", "answer"];
const EXPLANATION_KEYS: &[&str] = &["exp", "explanation"];

/// Parse the raw output from the model into multiple-choice questions.
///
/// Expects objects shaped like
/// `{"q": "...", "o": ["A", "B", "C", "D"], "c": 0, "exp": "..."}`, located
/// the same way as flashcards. Every question needs at least two options and
/// a correct index within range; the explanation is optional.
pub fn parse_raw_output(raw: &str) -> AiResult<Vec<QuizQuestion>> {
    extract_json_array(raw)?
        .iter()
        .enumerate()
        .map(|(idx, value)| match value {
            Value::Object(object) => parse_question(idx + 1, object),
            _ => malformed(format!("question {} is not an object", idx + 1)),
        })
        .collect()
}

fn parse_question(number: usize, object: &Map<String, Value>) -> AiResult<QuizQuestion> {
    let Some(question) = field(object, QUESTION_KEYS).and_then(value_to_string) else {
        return malformed(format!("question {number} has no text"));
    };

    let options = match field(object, OPTION_KEYS) {
        Some(Value::Array(values)) => values
            .iter()
            .map(value_to_string)
            .collect::<Option<Vec<_>>>(),
        _ => None,
    };
    let Some(options) = options.filter(|options| options.len() >= 2) else {
        return malformed(format!("question {number} needs at least two options"));
    };

    let Some(correct_index) = field(object, CORRECT_KEYS).and_then(correct_index) else {
        return malformed(format!("question {number} has no usable correct index"));
    };
    if correct_index >= options.len() {
        return malformed(format!(
            "question {number} marks option {correct_index} correct but has only {} options",
            options.len()
        ));
    }

    Ok(QuizQuestion {
        question,
        options,
        correct_index,
        explanation: field(object, EXPLANATION_KEYS).and_then(value_to_string),
    })
}

/// Accepts a zero-based number, a numeric string, or a single option letter.
fn correct_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(number) => number.as_u64().map(|idx| idx as usize),
        Value::String(text) => {
            let text = text.trim();
            if let Ok(idx) = text.parse::<usize>() {
                return Some(idx);
            }
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(letter), None) if letter.is_ascii_alphabetic() => {
                    Some((letter.to_ascii_uppercase() as u8 - b'A') as usize)
                }
                _ => None,
            }
        }
        _ => None,
    }
}
