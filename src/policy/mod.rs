//! Final safety gate over outgoing text.
//!
//! [`PolicyFilter`] grades text against the shared [`PatternCatalog`],
//! redacts matched spans at `HIGH` and above, and attaches a canned
//! locale-specific reply. It fails closed: any internal failure yields a
//! `CRITICAL` verdict carrying the default reply.

mod locale;
mod redact;
mod types;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::catalog::{ContentScan, PatternCatalog, PolicyCategory};
use crate::error::FilterError;

pub use locale::normalise_locale;
pub use types::{FilterVerdict, SafetyLevel};

const MAX_REDACTION_PASSES: usize = 4;

pub struct PolicyFilter {
    catalog: Arc<PatternCatalog>,
    default_locale: String,
}

impl PolicyFilter {
    /// An empty `default_locale` falls back to the catalog's default.
    pub fn new(catalog: Arc<PatternCatalog>, default_locale: &str) -> Self {
        let mut default_locale = normalise_locale(default_locale);
        if default_locale.is_empty() {
            default_locale = catalog.default_locale().to_string();
        }
        Self {
            catalog,
            default_locale,
        }
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    /// Grade and redact `text` for `query`. Never fails: errors produce the
    /// fail-closed verdict.
    pub fn filter(&self, text: &str, query: &str, locale: &str) -> FilterVerdict {
        match self.try_filter(text, query, locale) {
            Ok(verdict) => verdict,
            Err(err) => {
                tracing::warn!(error = %err, "policy filter failed, failing closed");
                self.fail_closed(&err)
            }
        }
    }

    pub fn try_filter(
        &self,
        text: &str,
        query: &str,
        locale: &str,
    ) -> Result<FilterVerdict, FilterError> {
        let limit = self.catalog.max_scan_bytes();
        let size = text.len().max(query.len());
        if size > limit {
            return Err(FilterError::InputTooLarge { size, limit });
        }
        contain(|| self.evaluate(text, query, locale))?
    }

    /// Whether `query` alone should be answered with a canned reply, and
    /// with which category.
    pub fn should_use_policy_response(&self, query: &str) -> (bool, Option<PolicyCategory>) {
        let category = self.catalog.classify(query).first().copied();
        (category.is_some(), category)
    }

    /// Canned reply for `category` in `locale` (empty locale means default).
    pub fn policy_reply(&self, category: Option<PolicyCategory>, locale: &str) -> String {
        self.catalog
            .reply(category, self.resolve_locale(locale))
            .to_string()
    }

    /// The most restrictive verdict: `CRITICAL`, unsafe, default reply in the
    /// default locale.
    pub fn fail_closed(&self, err: &FilterError) -> FilterVerdict {
        let reply = self.catalog.reply(None, &self.default_locale).to_string();
        FilterVerdict {
            safety_level: SafetyLevel::Critical,
            is_safe: false,
            filtered_text: reply.clone(),
            violations: vec![format!("filter_error:{}", error_tag(err))],
            policy_response: Some(reply),
            category: None,
        }
    }

    fn evaluate(
        &self,
        text: &str,
        query: &str,
        locale: &str,
    ) -> Result<FilterVerdict, FilterError> {
        let scan = self.catalog.scan(text);
        let categories = self.catalog.classify(query);
        let category = categories.first().copied();

        let safety_level = severity(&scan, category.is_some());
        let mut violations = violation_tags(&scan);
        violations.extend(categories.iter().map(|c| format!("policy_category:{c}")));

        let (filtered_text, policy_response) = if safety_level.requires_redaction() {
            let reply = self.catalog.reply(category, self.resolve_locale(locale));
            (self.redact_stable(text, &scan)?, Some(reply.to_string()))
        } else {
            (text.to_string(), None)
        };

        if safety_level > SafetyLevel::Low {
            tracing::debug!(
                level = %safety_level,
                violations = violations.len(),
                category = ?category,
                "policy filter flagged text"
            );
        }

        Ok(FilterVerdict {
            safety_level,
            is_safe: safety_level != SafetyLevel::Critical,
            filtered_text,
            violations,
            policy_response,
            category,
        })
    }

    /// Redact until the output scans clean. A placeholder can complete a
    /// match with its neighbours, so one pass is not always enough.
    fn redact_stable(&self, text: &str, scan: &ContentScan) -> Result<String, FilterError> {
        let mut out = redact::redact(text, scan, &self.catalog);
        for _ in 1..MAX_REDACTION_PASSES {
            let rescan = self.catalog.scan(&out);
            if rescan.is_clean() {
                return Ok(out);
            }
            out = redact::redact(&out, &rescan, &self.catalog);
        }
        if self.catalog.scan(&out).is_clean() {
            Ok(out)
        } else {
            Err(FilterError::UnstableRedaction {
                passes: MAX_REDACTION_PASSES,
            })
        }
    }

    fn resolve_locale<'a>(&'a self, locale: &'a str) -> &'a str {
        if locale.trim().is_empty() {
            &self.default_locale
        } else {
            locale
        }
    }
}

fn severity(scan: &ContentScan, query_matched: bool) -> SafetyLevel {
    if !scan.critical.is_empty() {
        SafetyLevel::Critical
    } else if query_matched {
        SafetyLevel::High
    } else if !scan.internal.is_empty() || !scan.sensitive.is_empty() {
        SafetyLevel::Medium
    } else {
        SafetyLevel::Low
    }
}

fn violation_tags(scan: &ContentScan) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for m in scan.all() {
        let tag = m.kind.tag();
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

fn error_tag(err: &FilterError) -> &'static str {
    match err {
        FilterError::InputTooLarge { .. } => "input_too_large",
        FilterError::Panicked(_) => "panicked",
        FilterError::UnstableRedaction { .. } => "unstable_redaction",
    }
}

/// Run one filter evaluation, turning a panic into [`FilterError::Panicked`].
fn contain<T>(f: impl FnOnce() -> T) -> Result<T, FilterError> {
    catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| FilterError::Panicked(panic_message(payload.as_ref())))
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
