use crate::ai_generation::{prompts, AiResult, ContentKind};

/// Notes shorter than this rarely give the model enough to summarise.
pub const MIN_NOTES_CHARS: usize = 40;

/// User input after validation, ready to be wrapped in a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedInput {
    pub kind: ContentKind,
    pub text: String,
}

impl ProcessedInput {
    pub fn user_message(&self, quiz_count: Option<u32>) -> String {
        match self.kind {
            ContentKind::Notes => prompts::notes_message(&self.text),
            ContentKind::Flashcards => prompts::flashcards_message(&self.text),
            ContentKind::Quiz => {
                prompts::quiz_message(&self.text, prompts::quiz_question_count(quiz_count))
            }
        }
    }
}

pub struct InputProcessor;

impl InputProcessor {
    pub fn prepare(kind: ContentKind, raw: &str) -> AiResult<ProcessedInput> {
        let trimmed = raw.trim();

        match kind {
            ContentKind::Notes if trimmed.chars().count() < MIN_NOTES_CHARS => {
                crate::invalid_input!("Please paste more detailed notes.")
            }
            ContentKind::Flashcards if trimmed.is_empty() => {
                crate::invalid_input!("Please paste some notes first.")
            }
            ContentKind::Quiz if trimmed.is_empty() => {
                crate::invalid_input!("Please enter a topic first.")
            }
            _ => {}
        }

        let text = match kind {
            // a topic is a single line
            ContentKind::Quiz => trimmed.split_whitespace().collect::<Vec<_>>().join(" "),
            ContentKind::Notes | ContentKind::Flashcards => normalize_whitespace(trimmed),
        };

        Ok(ProcessedInput { kind, text })
    }
}

fn normalize_whitespace(text: &str) -> String {
    let mut normalized = String::new();
    let mut previous_blank = true;

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !previous_blank && !normalized.is_empty() {
                normalized.push_str("\n\n");
            }
            previous_blank = true;
        } else {
            if !normalized.is_empty() && !previous_blank {
                normalized.push('\n');
            }
            normalized.push_str(trimmed);
            previous_blank = false;
        }
    }

    if normalized.is_empty() {
        text.trim().to_string()
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_notes_are_rejected() {
        let err = InputProcessor::prepare(ContentKind::Notes, "  too short  ").unwrap_err();
        assert_eq!(err.caller_message(), "Please paste more detailed notes.");
    }

    #[test]
    fn flashcards_accept_any_non_empty_text() {
        let input = InputProcessor::prepare(ContentKind::Flashcards, " cells ").unwrap();
        assert_eq!(input.text, "cells");
        assert!(InputProcessor::prepare(ContentKind::Flashcards, "\n\t").is_err());
    }

    #[test]
    fn collapses_blank_line_runs() {
        let raw = "Cells are the basic unit of life.\n\n\n\n   Mitosis divides one cell into two.  \n";
        let input = InputProcessor::prepare(ContentKind::Notes, raw).unwrap();
        assert_eq!(
            input.text,
            "Cells are the basic unit of life.\n\nMitosis divides one cell into two."
        );
    }

    #[test]
    fn quiz_topic_becomes_one_line() {
        let input = InputProcessor::prepare(ContentKind::Quiz, "  Photo\n synthesis ").unwrap();
        assert_eq!(input.text, "Photo synthesis");
        assert_eq!(
            input.user_message(Some(3)),
            "Create 3 multiple-choice questions about: Photo synthesis"
        );
    }
}
