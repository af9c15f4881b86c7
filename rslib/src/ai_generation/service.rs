use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use scopeguard::ScopeGuard;
use tracing::{debug, error, info};

use crate::ai_generation::input_processor::InputProcessor;
use crate::ai_generation::notes_parser::NotesOutcome;
use crate::ai_generation::providers::AiProvider;
use crate::ai_generation::{
    flashcard_parser, notes_parser, prompts, quiz_parser, AiResult, ChatRequest, CompletionRequest,
    ContentKind, Flashcard, QuizQuestion, DEFAULT_MAX_TOKENS,
};
use crate::error::StudyError;

/// Runs one generation action end to end: validate input, prompt, call the
/// backend, extract. At most one call per content kind is in flight.
pub struct AiGenerationController {
    backend: Arc<dyn AiProvider>,
    max_tokens: u32,
    in_flight: [AtomicBool; 3],
}

type InFlightGuard<'a> = ScopeGuard<&'a AtomicBool, fn(&AtomicBool)>;

fn release(flag: &AtomicBool) {
    flag.store(false, Ordering::Release);
}

impl AiGenerationController {
    pub fn new(backend: Arc<dyn AiProvider>) -> Self {
        Self {
            backend,
            max_tokens: DEFAULT_MAX_TOKENS,
            in_flight: Default::default(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub async fn simplify_notes(&self, notes: &str) -> AiResult<NotesOutcome> {
        let text = self.run(ContentKind::Notes, notes, None).await?;
        let outcome = notes_parser::parse_raw_output(&text);
        if let NotesOutcome::Raw(_) = outcome {
            info!("notes reply had no labelled sections; showing raw text");
        }
        Ok(outcome)
    }

    pub async fn generate_flashcards(&self, notes: &str) -> AiResult<Vec<Flashcard>> {
        let text = self.run(ContentKind::Flashcards, notes, None).await?;
        let cards = flashcard_parser::parse_raw_output(&text)
            .inspect_err(|err| error!("flashcard extraction failed: {err}"))?;
        info!(count = cards.len(), "flashcards ready");
        Ok(cards)
    }

    pub async fn generate_quiz(&self, topic: &str, count: Option<u32>) -> AiResult<Vec<QuizQuestion>> {
        let text = self.run(ContentKind::Quiz, topic, count).await?;
        let questions = quiz_parser::parse_raw_output(&text)
            .inspect_err(|err| error!("quiz extraction failed: {err}"))?;
        info!(count = questions.len(), "quiz ready");
        Ok(questions)
    }

    async fn run(&self, kind: ContentKind, raw: &str, quiz_count: Option<u32>) -> AiResult<String> {
        let _guard = self.claim(kind)?;

        let input = InputProcessor::prepare(kind, raw)?;
        let request: CompletionRequest = ChatRequest::new(
            prompts::system_instruction(kind),
            input.user_message(quiz_count),
        )?
        .with_max_tokens(self.max_tokens)
        .into();

        debug!(%kind, chars = input.text.len(), "requesting completion");
        let response = self
            .backend
            .complete(&request)
            .await
            .inspect_err(|err| error!(%kind, "completion failed: {err}"))?;
        Ok(response.text)
    }

    /// Marks `kind` as running until the returned guard drops.
    pub(crate) fn claim(&self, kind: ContentKind) -> AiResult<InFlightGuard<'_>> {
        let flag = &self.in_flight[kind as usize];
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(StudyError::InFlight {
                kind: match kind {
                    ContentKind::Notes => "notes",
                    ContentKind::Flashcards => "flashcards",
                    ContentKind::Quiz => "quiz",
                },
            });
        }
        Ok(scopeguard::guard(flag, release as fn(&AtomicBool)))
    }
}
