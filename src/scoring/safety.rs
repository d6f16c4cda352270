use std::collections::BTreeSet;

use super::DimensionScore;
use crate::catalog::PatternCatalog;

const POLICY_TOPIC_PENALTY: f64 = 0.25;
const SENSITIVE_PATTERN_PENALTY: f64 = 0.1;

/// Restricted content is a hard floor of 0.0; policy topics and sensitive
/// patterns subtract from 1.0.
pub(crate) fn score(text: &str, catalog: &PatternCatalog) -> DimensionScore {
    let scan = catalog.scan(text);

    if scan.has_restricted() {
        let mut result = DimensionScore::new(0.0);
        let tags: BTreeSet<String> = scan
            .critical
            .iter()
            .chain(scan.internal.iter())
            .map(|m| m.kind.tag())
            .collect();
        for tag in tags {
            result.penalty(tag);
        }
        result.suggest("remove_restricted_content");
        return result;
    }

    let mut result = DimensionScore::new(1.0);
    for category in catalog.classify(text) {
        result.value -= POLICY_TOPIC_PENALTY;
        result.penalty(format!("policy_topic:{category}"));
    }

    let sensitive: BTreeSet<String> = scan.sensitive.iter().map(|m| m.kind.tag()).collect();
    for tag in sensitive {
        result.value -= SENSITIVE_PATTERN_PENALTY;
        result.penalty(tag);
    }

    if result.value < 1.0 {
        result.suggest("avoid_sensitive_topics");
    }
    result
}
