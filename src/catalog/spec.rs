//! On-disk shape of the pattern catalog. Compiled into [`super::PatternCatalog`].

use serde::Deserialize;
use std::collections::BTreeMap;

use super::PolicyCategory;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CatalogSpec {
    pub(crate) version: String,
    #[serde(default = "default_locale")]
    pub(crate) default_locale: String,
    #[serde(default)]
    pub(crate) limits: LimitsSpec,
    #[serde(default)]
    pub(crate) placeholders: PlaceholderSpec,
    #[serde(default)]
    pub(crate) critical: KeywordSpec,
    #[serde(default)]
    pub(crate) internal: InternalSpec,
    #[serde(default)]
    pub(crate) sensitive_patterns: Vec<SensitivePatternSpec>,
    #[serde(default)]
    pub(crate) categories: Vec<CategorySpec>,
    /// `reply key` (category name or `default`) -> locale -> text
    #[serde(default)]
    pub(crate) replies: BTreeMap<String, BTreeMap<String, String>>,
}

fn default_locale() -> String {
    "en".into()
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LimitsSpec {
    #[serde(default = "default_max_scan_bytes")]
    pub(crate) max_scan_bytes: usize,
}

fn default_max_scan_bytes() -> usize {
    256 * 1024
}

impl Default for LimitsSpec {
    fn default() -> Self {
        Self {
            max_scan_bytes: default_max_scan_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PlaceholderSpec {
    #[serde(default = "default_critical_placeholder")]
    pub(crate) critical: String,
    #[serde(default = "default_internal_placeholder")]
    pub(crate) internal: String,
    #[serde(default = "default_path_placeholder")]
    pub(crate) path: String,
    #[serde(default = "default_credential_placeholder")]
    pub(crate) credential: String,
}

fn default_critical_placeholder() -> String {
    "[REDACTED:CRITICAL]".into()
}
fn default_internal_placeholder() -> String {
    "[REDACTED:INTERNAL]".into()
}
fn default_path_placeholder() -> String {
    "[REDACTED:PATH]".into()
}
fn default_credential_placeholder() -> String {
    "[REDACTED:CREDENTIAL]".into()
}

impl Default for PlaceholderSpec {
    fn default() -> Self {
        Self {
            critical: default_critical_placeholder(),
            internal: default_internal_placeholder(),
            path: default_path_placeholder(),
            credential: default_credential_placeholder(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct KeywordSpec {
    #[serde(default)]
    pub(crate) keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct InternalSpec {
    #[serde(default)]
    pub(crate) keywords: Vec<String>,
    #[serde(default)]
    pub(crate) path_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SensitivePatternSpec {
    pub(crate) name: String,
    pub(crate) pattern: String,
    pub(crate) placeholder: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CategorySpec {
    pub(crate) name: PolicyCategory,
    #[serde(default)]
    pub(crate) query_patterns: Vec<String>,
}
