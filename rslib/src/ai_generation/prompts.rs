//! Fixed system instructions, one per content kind. The extractors depend on
//! the exact output grammar these request, so they are constants rather than
//! assembled text.

use crate::ai_generation::ContentKind;

pub const FLASHCARD_COUNT: u32 = 8;
pub const DEFAULT_QUIZ_QUESTIONS: u32 = 8;
pub const MAX_QUIZ_QUESTIONS: u32 = 20;

pub const NOTES_SYSTEM_PROMPT: &str = "You are a study assistant for Zambian secondary school students. Summarise the notes given.
Respond in this EXACT format — use these labels, nothing else before or after:

TOPIC: [one-line topic name]

KEY POINTS:
• [concise point]
• [concise point]
• [concise point]
• [concise point]
• [concise point]

KEY TERMS:
[word] — [short definition]
[word] — [short definition]
[word] — [short definition]

Rules: 5–8 bullet points. 3–5 key terms. Plain English. No markdown or # symbols.";

pub const FLASHCARDS_SYSTEM_PROMPT: &str = r#"You are a flashcard maker for Zambian secondary school students.
Create exactly 8 question-and-answer flashcard pairs from the content given.
Reply ONLY with a valid JSON array — no explanation, no markdown fences, no extra text.
Format: [{"q":"Question?","a":"Short answer under 15 words"},...]
Make questions that test real understanding, not just word recall."#;

pub const QUIZ_SYSTEM_PROMPT: &str = r#"You are a quiz maker for Zambian secondary school students.
Create multiple-choice quiz questions on the topic given.
Reply ONLY with a valid JSON array — no explanation, no markdown, no extra text.
Format: [{"q":"Question?","o":["A","B","C","D"],"c":0,"exp":"One sentence explaining the correct answer"}]
Where "c" is the zero-based index of the correct option.
Make questions educational and clearly worded."#;

pub fn system_instruction(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Notes => NOTES_SYSTEM_PROMPT,
        ContentKind::Flashcards => FLASHCARDS_SYSTEM_PROMPT,
        ContentKind::Quiz => QUIZ_SYSTEM_PROMPT,
    }
}

pub fn notes_message(notes: &str) -> String {
    format!("Simplify these notes:\n\n{notes}")
}

pub fn flashcards_message(notes: &str) -> String {
    format!("Create {FLASHCARD_COUNT} flashcards from:\n\n{notes}")
}

pub fn quiz_message(topic: &str, count: u32) -> String {
    format!("Create {count} multiple-choice questions about: {topic}")
}

/// Missing or zero counts fall back to the default; large ones are capped.
pub fn quiz_question_count(requested: Option<u32>) -> u32 {
    requested
        .filter(|count| *count > 0)
        .unwrap_or(DEFAULT_QUIZ_QUESTIONS)
        .min(MAX_QUIZ_QUESTIONS)
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn every_kind_has_an_instruction() {
        for kind in ContentKind::iter() {
            assert!(system_instruction(kind).contains("Zambian secondary school students"));
        }
    }

    #[test]
    fn notes_prompt_names_the_extractor_labels() {
        for label in ["TOPIC:", "KEY POINTS:", "KEY TERMS:", "•", " — "] {
            assert!(NOTES_SYSTEM_PROMPT.contains(label), "missing {label}");
        }
    }

    #[test]
    fn user_messages() {
        assert_eq!(
            flashcards_message("cells"),
            "Create 8 flashcards from:\n\ncells"
        );
        assert_eq!(
            quiz_message("Photosynthesis", 5),
            "Create 5 multiple-choice questions about: Photosynthesis"
        );
    }

    #[test]
    fn quiz_count_is_clamped() {
        assert_eq!(quiz_question_count(None), 8);
        assert_eq!(quiz_question_count(Some(0)), 8);
        assert_eq!(quiz_question_count(Some(3)), 3);
        assert_eq!(quiz_question_count(Some(500)), 20);
    }
}
