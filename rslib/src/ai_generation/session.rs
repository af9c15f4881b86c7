//! State held for whatever is currently on screen: flip state for flashcards,
//! answers and score for a quiz, and the last result of each action.

use tracing::warn;

use crate::ai_generation::notes_parser::NotesOutcome;
use crate::ai_generation::{AiResult, ContentKind, Flashcard, QuizQuestion};
use crate::error::StudyError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardDeck {
    cards: Vec<Flashcard>,
    flipped: Vec<bool>,
}

impl FlashcardDeck {
    pub fn new(cards: Vec<Flashcard>) -> Self {
        let flipped = vec![false; cards.len()];
        Self { cards, flipped }
    }

    pub fn cards(&self) -> &[Flashcard] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Toggles whether the answer is showing, returning the new state.
    pub fn flip(&mut self, index: usize) -> AiResult<bool> {
        let Some(flipped) = self.flipped.get_mut(index) else {
            crate::invalid_input!("no flashcard at position {index}");
        };
        *flipped = !*flipped;
        Ok(*flipped)
    }

    pub fn is_flipped(&self, index: usize) -> bool {
        self.flipped.get(index).copied().unwrap_or(false)
    }
}

/// Feedback band for a finished quiz. Boundaries belong to the upper band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackTier {
    Excellent,
    Good,
    KeepStudying,
}

impl FeedbackTier {
    pub fn for_percent(percent: u32) -> Self {
        if percent >= 80 {
            FeedbackTier::Excellent
        } else if percent >= 60 {
            FeedbackTier::Good
        } else {
            FeedbackTier::KeepStudying
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            FeedbackTier::Excellent => "🎉",
            FeedbackTier::Good => "💪",
            FeedbackTier::KeepStudying => "📚",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            FeedbackTier::Excellent => "Excellent work!",
            FeedbackTier::Good => "Good effort, keep going!",
            FeedbackTier::KeepStudying => "Keep studying, you've got this!",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizScore {
    pub correct: usize,
    pub total: usize,
    pub percent: u32,
    pub tier: FeedbackTier,
}

impl QuizScore {
    pub fn new(correct: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0
        } else {
            (correct as f64 / total as f64 * 100.0).round() as u32
        };
        Self {
            correct,
            total,
            percent,
            tier: FeedbackTier::for_percent(percent),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{} You scored {}/{} ({}%) - {}",
            self.tier.emoji(),
            self.correct,
            self.total,
            self.percent,
            self.tier.message()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub correct: bool,
    pub correct_index: usize,
    pub explanation: Option<String>,
    /// Set once the last unanswered question is answered.
    pub score: Option<QuizScore>,
}

/// Answers given so far for one generated quiz. Answering consumes the
/// session and hands back the updated one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizSession {
    questions: Vec<QuizQuestion>,
    answers: Vec<Option<usize>>,
}

impl QuizSession {
    pub fn new(questions: Vec<QuizQuestion>) -> Self {
        let answers = vec![None; questions.len()];
        Self { questions, answers }
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn answer_for(&self, question: usize) -> Option<usize> {
        self.answers.get(question).copied().flatten()
    }

    pub fn answered(&self) -> usize {
        self.answers.iter().filter(|answer| answer.is_some()).count()
    }

    pub fn correct(&self) -> usize {
        self.questions
            .iter()
            .zip(&self.answers)
            .filter(|(question, answer)| **answer == Some(question.correct_index))
            .count()
    }

    pub fn is_complete(&self) -> bool {
        self.answered() == self.questions.len()
    }

    /// The final score, once every question has been answered.
    pub fn score(&self) -> Option<QuizScore> {
        (self.is_complete() && !self.questions.is_empty())
            .then(|| QuizScore::new(self.correct(), self.questions.len()))
    }

    /// Records `choice` for `question`. Each question takes one answer.
    pub fn answer(mut self, question: usize, choice: usize) -> AiResult<(Self, AnswerOutcome)> {
        let Some(item) = self.questions.get(question) else {
            crate::invalid_input!("no question at position {question}");
        };
        if choice >= item.options.len() {
            crate::invalid_input!(
                "question {question} has {} options, got choice {choice}",
                item.options.len()
            );
        }
        if self.answers[question].is_some() {
            crate::invalid_input!("question {question} was already answered");
        }

        let correct_index = item.correct_index;
        let explanation = item.explanation.clone();
        self.answers[question] = Some(choice);

        let outcome = AnswerOutcome {
            correct: choice == correct_index,
            correct_index,
            explanation,
            score: self.score(),
        };
        Ok((self, outcome))
    }
}

/// A non-blocking message shown when an action fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    CouldNotReachAi,
    NeedsMoreDetail,
    AlreadyRunning,
    InvalidInput,
}

impl Notice {
    pub fn for_error(err: &StudyError) -> Self {
        match err {
            StudyError::InFlight { .. } => Notice::AlreadyRunning,
            StudyError::InvalidInput { .. } => Notice::InvalidInput,
            err if err.is_extraction_failure() => Notice::NeedsMoreDetail,
            _ => Notice::CouldNotReachAi,
        }
    }

    pub fn text(self, kind: ContentKind) -> &'static str {
        match (self, kind) {
            (Notice::CouldNotReachAi, _) => "Could not reach AI. Check your connection and try again.",
            (Notice::NeedsMoreDetail, ContentKind::Flashcards) => {
                "Could not generate flashcards. Try with more detailed notes."
            }
            (Notice::NeedsMoreDetail, ContentKind::Quiz) => {
                "Could not generate quiz. Please try again."
            }
            (Notice::NeedsMoreDetail, ContentKind::Notes) => {
                "Could not simplify notes. Try with more detail."
            }
            (Notice::AlreadyRunning, _) => "Still working on the last request.",
            (Notice::InvalidInput, ContentKind::Notes) => "Please paste more detailed notes.",
            (Notice::InvalidInput, ContentKind::Flashcards) => "Please paste some notes first.",
            (Notice::InvalidInput, ContentKind::Quiz) => "Please enter a topic first.",
        }
    }
}

/// The most recent successful result of each action. A failed action leaves
/// what is already shown untouched.
#[derive(Debug, Clone, Default)]
pub struct StudySession {
    notes: Option<NotesOutcome>,
    flashcards: Option<FlashcardDeck>,
    quiz: Option<QuizSession>,
}

impl StudySession {
    pub fn notes(&self) -> Option<&NotesOutcome> {
        self.notes.as_ref()
    }

    pub fn flashcards(&self) -> Option<&FlashcardDeck> {
        self.flashcards.as_ref()
    }

    pub fn flashcards_mut(&mut self) -> Option<&mut FlashcardDeck> {
        self.flashcards.as_mut()
    }

    pub fn quiz(&self) -> Option<&QuizSession> {
        self.quiz.as_ref()
    }

    pub fn take_quiz(&mut self) -> Option<QuizSession> {
        self.quiz.take()
    }

    pub fn set_quiz(&mut self, quiz: QuizSession) {
        self.quiz = Some(quiz);
    }

    pub fn accept_notes(&mut self, result: AiResult<NotesOutcome>) -> Result<(), Notice> {
        let notes = accept(ContentKind::Notes, result)?;
        self.notes = Some(notes);
        Ok(())
    }

    pub fn accept_flashcards(&mut self, result: AiResult<Vec<Flashcard>>) -> Result<(), Notice> {
        let cards = accept(ContentKind::Flashcards, result)?;
        self.flashcards = Some(FlashcardDeck::new(cards));
        Ok(())
    }

    pub fn accept_quiz(&mut self, result: AiResult<Vec<QuizQuestion>>) -> Result<(), Notice> {
        let questions = accept(ContentKind::Quiz, result)?;
        self.quiz = Some(QuizSession::new(questions));
        Ok(())
    }

    pub fn clear(&mut self, kind: ContentKind) {
        match kind {
            ContentKind::Notes => self.notes = None,
            ContentKind::Flashcards => self.flashcards = None,
            ContentKind::Quiz => self.quiz = None,
        }
    }
}

fn accept<T>(kind: ContentKind, result: AiResult<T>) -> Result<T, Notice> {
    result.map_err(|err| {
        warn!(%kind, "generation failed: {err}");
        Notice::for_error(&err)
    })
}
