use serde_json::{Map, Value};

use crate::ai_generation::extract::{extract_json_array, field, malformed, value_to_string};
use crate::ai_generation::{AiResult, Flashcard};

const QUESTION_KEYS: &[&str] = &["q", "question", "front", "prompt"];
const ANSWER_KEYS: &[&str] = &["a", "answer", "back", "response"];

/// Parse the raw output from the model into flashcards.
///
/// The model is asked for a bare JSON array of `{"q", "a"}` objects, but the
/// array may be wrapped in prose or code fences, keys may use longer names,
/// and an item may be a single `"question :: answer"` string.
pub fn parse_raw_output(raw: &str) -> AiResult<Vec<Flashcard>> {
    extract_json_array(raw)?
        .iter()
        .enumerate()
        .map(|(idx, value)| parse_card(idx + 1, value))
        .collect()
}

fn parse_card(number: usize, value: &Value) -> AiResult<Flashcard> {
    match value {
        Value::Object(object) => parse_card_object(number, object),
        Value::String(text) => match split_front_back(text) {
            Some(card) => Ok(card),
            None => malformed(format!(
                "flashcard {number} is text without a question/answer separator"
            )),
        },
        _ => malformed(format!("flashcard {number} is not an object")),
    }
}

fn parse_card_object(number: usize, object: &Map<String, Value>) -> AiResult<Flashcard> {
    let Some(question) = field(object, QUESTION_KEYS).and_then(value_to_string) else {
        return malformed(format!("flashcard {number} is missing a question"));
    };
    let Some(answer) = field(object, ANSWER_KEYS).and_then(value_to_string) else {
        return malformed(format!("flashcard {number} is missing an answer"));
    };

    Ok(Flashcard { question, answer })
}

fn split_front_back(text: &str) -> Option<Flashcard> {
    let (front, back) = ["::", "=>"]
        .into_iter()
        .find_map(|separator| text.split_once(separator))?;
    let (front, back) = (front.trim(), back.trim());
    if front.is_empty() || back.is_empty() {
        return None;
    }

    Some(Flashcard {
        question: front.to_string(),
        answer: back.to_string(),
    })
}
