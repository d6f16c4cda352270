//! Cheap gate deciding whether a query is worth a refinement run.

use crate::catalog::PatternCatalog;

/// Queries shorter than this (in characters) are never refined.
const MIN_QUERY_CHARS: usize = 10;
/// Queries longer than this are refined even without complexity signals.
const LONG_QUERY_CHARS: usize = 100;
/// A greeting only counts as one when the whole query is this short.
const MAX_GREETING_WORDS: usize = 5;

const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "yo",
    "thanks",
    "thank you",
    "thx",
    "good morning",
    "good afternoon",
    "good evening",
    "good night",
    "bye",
    "goodbye",
    "see you",
    "ok",
    "okay",
    "こんにちは",
    "こんばんは",
    "おはよう",
    "ありがとう",
];

/// Phrases that signal a request needing a worked answer.
const COMPLEXITY_PHRASES: &[&str] = &[
    "how do",
    "how to",
    "how can",
    "how does",
    "how should",
    "step by step",
    "difference between",
    "what is the best way",
    "walk me through",
];

/// Single words that signal the same, matched on word boundaries.
const COMPLEXITY_WORDS: &[&str] = &[
    "explain",
    "why",
    "help",
    "error",
    "errors",
    "fix",
    "debug",
    "failing",
    "fails",
    "failed",
    "crash",
    "exception",
    "panic",
    "issue",
    "bug",
    "troubleshoot",
    "implement",
    "configure",
    "install",
    "compile",
    "deploy",
    "code",
    "function",
    "api",
    "database",
    "query",
    "algorithm",
    "regex",
    "script",
    "rust",
    "python",
    "javascript",
    "typescript",
    "sql",
    "docker",
    "git",
];

/// Whether `query` should go through the refinement loop.
///
/// Pure function of the query and the catalog: policy-sensitive, very short
/// and greeting-only queries are skipped; queries with complexity signals
/// or above [`LONG_QUERY_CHARS`] are refined; everything else is skipped.
pub fn should_engage(query: &str, catalog: &PatternCatalog) -> bool {
    let trimmed = query.trim();
    if !catalog.classify(trimmed).is_empty() {
        return false;
    }
    if trimmed.chars().count() < MIN_QUERY_CHARS {
        return false;
    }

    let lower = trimmed.to_lowercase();
    if is_greeting(&lower) {
        return false;
    }
    has_complexity_signal(&lower) || trimmed.chars().count() > LONG_QUERY_CHARS
}

fn words(lower: &str) -> Vec<&str> {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

fn is_greeting(lower: &str) -> bool {
    let words = words(lower);
    if words.len() > MAX_GREETING_WORDS {
        return false;
    }
    let normalized = words.join(" ");
    GREETINGS.iter().any(|g| {
        normalized == *g
            || normalized
                .strip_prefix(g)
                .is_some_and(|rest| rest.starts_with(' '))
    })
}

fn has_complexity_signal(lower: &str) -> bool {
    let words = words(lower);
    let normalized = words.join(" ");
    COMPLEXITY_PHRASES.iter().any(|p| normalized.contains(p))
        || words.iter().any(|w| COMPLEXITY_WORDS.contains(w))
}
