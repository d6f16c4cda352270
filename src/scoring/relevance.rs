use super::DimensionScore;
use super::text::{contains_any, terms};
use crate::refine::RequestContext;

const NO_TERMS_SCORE: f64 = 0.5;
const MARKER_BOOST: f64 = 0.1;
const LOW_OVERLAP: f64 = 0.3;

/// Phrases that acknowledge the question or walk through its parts.
const ACKNOWLEDGMENT_MARKERS: &[&str] = &[
    "regarding",
    "to answer",
    "in short",
    "in summary",
    "as for",
    "you asked",
    "your question",
    "first,",
    "second,",
    "finally,",
];

/// Query/response term overlap, boosted by topic-acknowledgment markers.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn score(text: &str, query: &str, ctx: &RequestContext) -> DimensionScore {
    let mut query_terms = terms(query);
    if !ctx.intent.trim().is_empty() {
        query_terms.extend(terms(&ctx.intent));
    }
    if query_terms.is_empty() {
        return DimensionScore::new(NO_TERMS_SCORE);
    }

    let response_terms = terms(text);
    let overlap = query_terms.intersection(&response_terms).count();
    let mut value = overlap as f64 / query_terms.len() as f64;

    if contains_any(&text.to_lowercase(), ACKNOWLEDGMENT_MARKERS) {
        value += MARKER_BOOST;
    }

    let mut result = DimensionScore::new(value);
    if value < LOW_OVERLAP {
        result.penalty("low_query_overlap");
        result.suggest("address_query_terms");
    }
    result
}
