use super::DimensionScore;
use super::text::{has_code_fence, list_item, mean_sentence_words, strip_code_blocks};

const BASELINE: f64 = 0.6;
const STRUCTURE_BONUS: f64 = 0.1;
const DEFECT_PENALTY: f64 = 0.1;
const LONG_SENTENCE_PENALTY: f64 = 0.15;

const MAX_BLANK_RUN: usize = 2;
const MIN_PUNCT_RUN: usize = 3;
const MIN_CAPS_RUN: usize = 3;
/// Unstructured text longer than this gets an `add_structure` suggestion.
const STRUCTURE_HINT_CHARS: usize = 300;

pub(crate) fn score(text: &str, max_mean_sentence_words: usize) -> DimensionScore {
    let mut result = DimensionScore::new(BASELINE);

    let has_heading = text.lines().any(|l| {
        let t = l.trim_start();
        t.starts_with('#') && t.trim_start_matches('#').starts_with(' ')
    });
    let has_list = text.lines().any(|l| list_item(l).is_some());
    let has_code = has_code_fence(text);
    for present in [has_heading, has_list, has_code] {
        if present {
            result.value += STRUCTURE_BONUS;
        }
    }
    if !(has_heading || has_list || has_code) && text.chars().count() > STRUCTURE_HINT_CHARS {
        result.suggest("add_structure");
    }

    let prose = strip_code_blocks(text);

    if longest_blank_run(text) > MAX_BLANK_RUN {
        result.value -= DEFECT_PENALTY;
        result.penalty("excessive_blank_lines");
    }
    if has_punctuation_run(&prose) {
        result.value -= DEFECT_PENALTY;
        result.penalty("punctuation_run");
    }
    if has_caps_run(&prose) {
        result.value -= DEFECT_PENALTY;
        result.penalty("all_caps_run");
    }
    if has_repeated_word(&prose) {
        result.value -= DEFECT_PENALTY;
        result.penalty("repeated_words");
        result.suggest("remove_repetition");
    }

    #[allow(clippy::cast_precision_loss)]
    if mean_sentence_words(&prose) > max_mean_sentence_words as f64 {
        result.value -= LONG_SENTENCE_PENALTY;
        result.penalty("long_sentences");
        result.suggest("shorten_sentences");
    }

    result
}

fn longest_blank_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// `!!!`, `?!?`, or four or more dots.
fn has_punctuation_run(text: &str) -> bool {
    let mut bang_run = 0;
    let mut dot_run = 0;
    for c in text.chars() {
        if matches!(c, '!' | '?') {
            bang_run += 1;
        } else {
            bang_run = 0;
        }
        if c == '.' {
            dot_run += 1;
        } else {
            dot_run = 0;
        }
        if bang_run >= MIN_PUNCT_RUN || dot_run > MIN_PUNCT_RUN {
            return true;
        }
    }
    false
}

fn is_shouted(word: &str) -> bool {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
}

fn has_caps_run(text: &str) -> bool {
    let mut run = 0;
    for word in text.split_whitespace() {
        if is_shouted(word) {
            run += 1;
            if run >= MIN_CAPS_RUN {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

fn has_repeated_word(text: &str) -> bool {
    let words: Vec<String> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .collect();
    words.windows(2).any(|pair| {
        pair[0] == pair[1] && pair[0].chars().any(char::is_alphabetic)
    })
}
