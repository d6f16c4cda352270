use super::DimensionScore;
use crate::refine::RequestContext;

const SHORT_QUERY_CHARS: usize = 50;
const MEDIUM_QUERY_CHARS: usize = 150;
const SHORT_IDEAL: usize = 400;
const MEDIUM_IDEAL: usize = 800;
const LONG_IDEAL: usize = 1500;

/// Ratio above which the hard floor applies.
const HARD_FLOOR_RATIO: f64 = 3.0;
const HARD_FLOOR: f64 = 0.2;

/// Ideal response length in characters for a query, honoring a
/// `max_length` constraint and a `verbosity` preference when present.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub(crate) fn ideal_length(query: &str, ctx: &RequestContext) -> usize {
    if let Some(max) = ctx
        .constraints
        .get("max_length")
        .and_then(|v| v.trim().parse::<usize>().ok())
        .filter(|v| *v > 0)
    {
        return max;
    }

    let base = match query.chars().count() {
        n if n < SHORT_QUERY_CHARS => SHORT_IDEAL,
        n if n < MEDIUM_QUERY_CHARS => MEDIUM_IDEAL,
        _ => LONG_IDEAL,
    };

    let factor = match ctx.user_preferences.get("verbosity").map(String::as_str) {
        Some("concise") => 0.6,
        Some("detailed") => 1.5,
        _ => 1.0,
    };
    ((base as f64) * factor).round().max(1.0) as usize
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn score(text: &str, query: &str, ctx: &RequestContext) -> DimensionScore {
    let ideal = ideal_length(query, ctx);
    let ratio = text.chars().count() as f64 / ideal as f64;

    let mut result = match ratio {
        r if r < 0.1 => DimensionScore::new(0.4),
        r if r < 0.25 => DimensionScore::new(0.7),
        r if r <= 1.0 => DimensionScore::new(1.0),
        r if r <= 1.5 => DimensionScore::new(0.85),
        r if r <= 2.0 => DimensionScore::new(0.7),
        r if r <= HARD_FLOOR_RATIO => DimensionScore::new(0.5),
        _ => DimensionScore::new(HARD_FLOOR),
    };

    if ratio < 0.25 {
        result.penalty("too_short");
        result.suggest("expand_answer");
    } else if ratio > HARD_FLOOR_RATIO {
        result.penalty("far_too_long");
        result.suggest("condense_answer");
    } else if ratio > 1.0 {
        result.penalty("too_long");
        result.suggest("condense_answer");
    }
    result
}
