use super::DimensionScore;
use super::text::{ListKind, contains_any, has_code_fence, list_item};

const BASELINE: f64 = 0.3;
const LOW_HELPFULNESS: f64 = 0.5;

const SEQUENCE_WORDS: &[&str] = &["first", "then", "next", "finally", "afterwards", "step"];
const EXAMPLE_MARKERS: &[&str] = &["for example", "e.g.", "example:", "for instance"];
const COMMAND_VERBS: &[&str] = &[
    "run", "install", "use", "open", "click", "set", "create", "add", "type", "check", "update",
    "configure", "enable", "restart",
];

/// Rewards actionable content: steps, examples, commands, code, links.
pub(crate) fn score(text: &str) -> DimensionScore {
    let lower = text.to_lowercase();
    let mut value = BASELINE;

    let items: Vec<(ListKind, &str)> = text.lines().filter_map(list_item).collect();
    let numbered = items.iter().filter(|(k, _)| *k == ListKind::Numbered).count();
    let bullets = items.len() - numbered;

    if numbered >= 2 {
        value += 0.15;
    }
    if bullets >= 2 {
        value += 0.1;
    }
    if lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| SEQUENCE_WORDS.contains(&w))
    {
        value += 0.1;
    }
    let has_example = contains_any(&lower, EXAMPLE_MARKERS);
    if has_example {
        value += 0.1;
    }
    if starts_with_command(text, &items) {
        value += 0.1;
    }
    if has_code_fence(text) {
        value += 0.15;
    }
    if lower.contains("https://") || lower.contains("http://") {
        value += 0.1;
    }

    let mut result = DimensionScore::new(value);
    if value < LOW_HELPFULNESS {
        result.penalty("not_actionable");
        result.suggest("add_actionable_steps");
    }
    if !has_example {
        result.suggest("add_example");
    }
    result
}

fn starts_with_command(text: &str, items: &[(ListKind, &str)]) -> bool {
    let first_word = |line: &str| -> Option<String> {
        line.split_whitespace()
            .next()
            .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
    };
    items
        .iter()
        .map(|(_, rest)| *rest)
        .chain(text.lines())
        .filter_map(first_word)
        .any(|w| COMMAND_VERBS.contains(&w.as_str()))
}
