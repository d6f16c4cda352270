//! Shared text helpers for the dimension heuristics.

use std::collections::BTreeSet;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "him", "his", "how", "its", "who", "did", "get", "may", "does",
    "what", "when", "where", "which", "with", "this", "that", "from", "have", "into", "your",
    "about", "would", "there", "their", "will", "could", "should", "some", "than", "then",
    "them", "they", "these", "those", "just", "like", "also", "been", "being", "were", "why",
    "use", "using", "please", "want", "need", "know", "tell",
];

const MIN_TERM_CHARS: usize = 3;

/// Lowercased content terms: alphanumeric tokens of 3+ chars that are not stop words.
pub(crate) fn terms(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TERM_CHARS)
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// `text` with fenced code blocks removed (prose-only heuristics skip code).
pub(crate) fn strip_code_blocks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_fence = false;
    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if !in_fence {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Sentences split on terminal punctuation and line breaks.
pub(crate) fn sentences(text: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '\n' => true,
            '.' | '!' | '?' => chars.peek().is_none_or(|(_, next)| next.is_whitespace()),
            _ => false,
        };
        if boundary {
            let end = i + c.len_utf8();
            let sentence = text[start..end].trim();
            if sentence.split_whitespace().next().is_some() {
                out.push(sentence);
            }
            start = end;
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        out.push(tail);
    }
    out
}

/// Mean words per sentence; 0 for empty text.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn mean_sentence_words(text: &str) -> f64 {
    let sentences = sentences(text);
    if sentences.is_empty() {
        return 0.0;
    }
    let words: usize = sentences
        .iter()
        .map(|s| s.split_whitespace().count())
        .sum();
    words as f64 / sentences.len() as f64
}

/// Content of a list item line without its marker, if the line is one.
pub(crate) fn list_item(line: &str) -> Option<(ListKind, &str)> {
    let trimmed = line.trim_start();
    for marker in ["- ", "* ", "+ "] {
        if let Some(rest) = trimmed.strip_prefix(marker) {
            return Some((ListKind::Bullet, rest));
        }
    }
    let digits = trimmed.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &trimmed[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some((ListKind::Numbered, rest));
        }
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListKind {
    Bullet,
    Numbered,
}

pub(crate) fn has_code_fence(text: &str) -> bool {
    text.contains("```")
}

pub(crate) fn contains_any(haystack_lower: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack_lower.contains(n))
}
