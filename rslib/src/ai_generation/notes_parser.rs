use itertools::Itertools;

use crate::ai_generation::{KeyTerm, SimplifiedNotes};

const TOPIC_LABEL: &str = "TOPIC:";
const KEY_POINTS_LABEL: &str = "KEY POINTS:";
const KEY_TERMS_LABEL: &str = "KEY TERMS:";
const BULLET: char = '•';
const TERM_SEPARATOR: &str = " — ";
/// Looser separators, only trusted inside the key-terms section.
const LOOSE_TERM_SEPARATORS: &[&str] = &[" – ", " - ", ": "];

/// What a notes request produced. Unrecognised replies are kept verbatim so
/// the caller can still show something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotesOutcome {
    Structured(SimplifiedNotes),
    Raw(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    KeyPoints,
    KeyTerms,
}

/// Scan a labelled reply line by line. Never fails: lines that match nothing
/// are dropped, and a reply with no recognisable content comes back as
/// [NotesOutcome::Raw].
pub fn parse_raw_output(raw: &str) -> NotesOutcome {
    let mut notes = SimplifiedNotes::default();
    let mut section = Section::None;

    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        if let Some(topic) = strip_label(line, TOPIC_LABEL) {
            if notes.topic.is_empty() {
                notes.topic = topic.trim().to_string();
            }
        } else if is_label(line, KEY_POINTS_LABEL) {
            section = Section::KeyPoints;
        } else if is_label(line, KEY_TERMS_LABEL) {
            section = Section::KeyTerms;
        } else if let Some(point) = bullet_text(line, section) {
            if !point.is_empty() {
                notes.key_points.push(point.to_string());
            }
        } else if let Some(term) = key_term(line, section) {
            notes.key_terms.push(term);
        }
    }

    if notes.is_empty() {
        NotesOutcome::Raw(raw.to_string())
    } else {
        NotesOutcome::Structured(notes)
    }
}

/// Render notes back into the labelled format the model is asked for.
pub fn render(notes: &SimplifiedNotes) -> String {
    let mut sections = Vec::new();
    if !notes.topic.is_empty() {
        sections.push(format!("{TOPIC_LABEL} {}", notes.topic));
    }
    if !notes.key_points.is_empty() {
        sections.push(format!(
            "{KEY_POINTS_LABEL}\n{}",
            notes
                .key_points
                .iter()
                .map(|point| format!("{BULLET} {point}"))
                .join("\n")
        ));
    }
    if !notes.key_terms.is_empty() {
        sections.push(format!(
            "{KEY_TERMS_LABEL}\n{}",
            notes
                .key_terms
                .iter()
                .map(|term| format!("{}{TERM_SEPARATOR}{}", term.term, term.definition))
                .join("\n")
        ));
    }
    sections.join("\n\n")
}

fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    head.eq_ignore_ascii_case(label)
        .then(|| &line[label.len()..])
}

fn is_label(line: &str, label: &str) -> bool {
    line.eq_ignore_ascii_case(label) || line.eq_ignore_ascii_case(label.trim_end_matches(':'))
}

fn bullet_text(line: &str, section: Section) -> Option<&str> {
    if let Some(rest) = line.strip_prefix(BULLET) {
        return Some(rest.trim());
    }
    if section == Section::KeyPoints {
        for marker in ["- ", "* "] {
            if let Some(rest) = line.strip_prefix(marker) {
                return Some(rest.trim());
            }
        }
    }
    None
}

fn key_term(line: &str, section: Section) -> Option<KeyTerm> {
    let (term, definition) = line.split_once(TERM_SEPARATOR).or_else(|| {
        if section == Section::KeyTerms {
            LOOSE_TERM_SEPARATORS
                .iter()
                .find_map(|separator| line.split_once(separator))
        } else {
            None
        }
    })?;

    let term = term.trim().trim_start_matches(['-', '*']).trim();
    let definition = definition.trim();
    if term.is_empty() || definition.is_empty() {
        return None;
    }

    Some(KeyTerm {
        term: term.to_string(),
        definition: definition.to_string(),
    })
}
