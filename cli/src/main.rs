use std::io::{BufRead, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use std::{fs, io};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use studydesk::ai_generation::config::AiGenerationConfig;
use studydesk::ai_generation::notes_parser::NotesOutcome;
use studydesk::ai_generation::providers::proxy_client::{ProxyClient, DEFAULT_ENDPOINT};
use studydesk::ai_generation::providers::{provider_factory, AiProvider};
use studydesk::ai_generation::service::AiGenerationController;
use studydesk::ai_generation::session::{Notice, QuizSession, StudySession};
use studydesk::ai_generation::{notes_parser, ContentKind};
use studydesk::log::set_global_logger;

#[derive(Parser)]
#[command(name = "studydesk", version, about = "Study notes, flashcards and quizzes from an AI model")]
struct Cli {
    /// Completion proxy to call
    #[arg(long, env = "STUDYDESK_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,
    /// Call the configured provider directly instead of the proxy
    #[arg(long)]
    direct: bool,
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
    /// Print pipeline logs to stderr
    #[arg(short, long)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Simplify notes into a topic, key points and key terms
    Notes {
        /// Read notes from this file instead of stdin
        file: Option<PathBuf>,
    },
    /// Turn notes into question and answer cards
    Flashcards {
        file: Option<PathBuf>,
        /// Show every answer at once
        #[arg(long)]
        reveal: bool,
    },
    /// Take a multiple-choice quiz on a topic
    Quiz {
        topic: String,
        #[arg(short = 'n', long)]
        count: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    if cli.verbose {
        set_global_logger(None)?;
    }
    let controller = controller(&cli)?;
    let mut session = StudySession::default();

    match cli.command {
        Command::Notes { file } => {
            let notes = read_input(file.as_ref())?;
            let result = controller.simplify_notes(&notes).await;
            if let Err(notice) = session.accept_notes(result) {
                return Ok(report(notice, ContentKind::Notes));
            }
            match session.notes() {
                Some(NotesOutcome::Structured(notes)) => println!("{}", notes_parser::render(notes)),
                Some(NotesOutcome::Raw(text)) => println!("{text}"),
                None => {}
            }
        }
        Command::Flashcards { file, reveal } => {
            let interactive = !reveal && file.is_some() && io::stdin().is_terminal();
            let notes = read_input(file.as_ref())?;
            let result = controller.generate_flashcards(&notes).await;
            if let Err(notice) = session.accept_flashcards(result) {
                return Ok(report(notice, ContentKind::Flashcards));
            }
            if let Some(deck) = session.flashcards_mut() {
                let mut stdin = io::stdin().lock();
                for index in 0..deck.len() {
                    let card = deck.cards()[index].clone();
                    println!("\n{}/{}  {}", index + 1, deck.len(), card.question);
                    if interactive {
                        prompt("  (enter to flip) ")?;
                        read_line(&mut stdin)?;
                    }
                    if deck.flip(index)? {
                        println!("  -> {}", card.answer);
                    }
                }
            }
        }
        Command::Quiz { topic, count } => {
            let result = controller.generate_quiz(&topic, count).await;
            if let Err(notice) = session.accept_quiz(result) {
                return Ok(report(notice, ContentKind::Quiz));
            }
            if let Some(quiz) = session.take_quiz() {
                let quiz = take_quiz(quiz)?;
                session.set_quiz(quiz);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn controller(cli: &Cli) -> Result<AiGenerationController> {
    let timeout = Duration::from_secs(cli.timeout_secs);
    if cli.direct {
        let mut config = AiGenerationConfig::from_env()?;
        if config.timeout_secs.is_none() {
            config.timeout_secs = Some(cli.timeout_secs);
        }
        let max_tokens = config.max_tokens();
        let provider: Arc<dyn AiProvider> = Arc::from(provider_factory(&config)?);
        Ok(AiGenerationController::new(provider).with_max_tokens(max_tokens))
    } else {
        let client = ProxyClient::new(cli.endpoint.as_str(), timeout)?;
        Ok(AiGenerationController::new(Arc::new(client)))
    }
}

fn report(notice: Notice, kind: ContentKind) -> ExitCode {
    eprintln!("{}", notice.text(kind));
    ExitCode::FAILURE
}

fn read_input(file: Option<&PathBuf>) -> Result<String> {
    match file {
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
        }
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("reading stdin")?;
            Ok(text)
        }
    }
}

fn prompt(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    write!(stdout, "{text}")?;
    stdout.flush()?;
    Ok(())
}

/// `None` at end of input.
fn read_line(stdin: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if stdin.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn take_quiz(mut quiz: QuizSession) -> Result<QuizSession> {
    let mut stdin = io::stdin().lock();
    let total = quiz.questions().len();

    for index in 0..total {
        let question = quiz.questions()[index].clone();
        println!("\n{}/{total}  {}", index + 1, question.question);
        for (letter, option) in ('A'..='Z').zip(&question.options) {
            println!("  {letter}) {option}");
        }

        let choice = loop {
            prompt("answer: ")?;
            let Some(line) = read_line(&mut stdin)? else {
                return Ok(quiz);
            };
            match parse_choice(&line, question.options.len()) {
                Some(choice) => break choice,
                None => println!("  pick one of the letters above"),
            }
        };

        let (answered, outcome) = quiz.answer(index, choice)?;
        quiz = answered;
        if outcome.correct {
            println!("  correct");
        } else {
            let letter = ('A'..='Z').nth(outcome.correct_index).unwrap_or('?');
            println!("  incorrect, the answer was {letter}");
        }
        if let Some(explanation) = &outcome.explanation {
            println!("  {explanation}");
        }
        if let Some(score) = outcome.score {
            println!("\n{}", score.summary());
        }
    }
    Ok(quiz)
}

/// Accepts a letter (`b`) or a 1-based number (`2`).
fn parse_choice(input: &str, options: usize) -> Option<usize> {
    let input = input.trim();
    let index = match input.parse::<usize>() {
        Ok(number) => number.checked_sub(1)?,
        Err(_) => {
            let mut chars = input.chars();
            let letter = chars.next()?.to_ascii_uppercase();
            if chars.next().is_some() || !letter.is_ascii_uppercase() {
                return None;
            }
            (letter as u8 - b'A') as usize
        }
    };
    (index < options).then_some(index)
}
