//! Versioned restricted-topic and sensitive-pattern catalog.
//!
//! The catalog is pure data: keyword lists, regex patterns, redaction
//! placeholders and canned replies. It is compiled once at startup and shared
//! read-only by the scorer, the policy filter and the engagement gate, so the
//! matchers can change without touching control flow.

pub mod leak_detect;
mod spec;

use anyhow::Context;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use std::path::Path;
use strum::{Display, EnumString};

use crate::config::RefineConfig;
use crate::error::CatalogError;
use crate::policy::normalise_locale;
pub use leak_detect::{DetectedLeak, LeakEncoding, scan_for_leaks};
use spec::CatalogSpec;

const BUILTIN_CATALOG: &str = include_str!("default_catalog.toml");
const DEFAULT_REPLY_KEY: &str = "default";

/// Surroundings a placeholder must also scan clean in, so that redacted text
/// does not match again on the next pass.
const PLACEHOLDER_CONTEXTS: [&str; 5] = ["x{p}x", "x{p}", "{p}x", "{p}.env", "{p}{p}"];

/// Policy-sensitive query category. Declaration order is the tie-break order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PolicyCategory {
    Architecture,
    Development,
    Technical,
}

impl PolicyCategory {
    pub const ALL: [PolicyCategory; 3] = [
        PolicyCategory::Architecture,
        PolicyCategory::Development,
        PolicyCategory::Technical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Architecture => "architecture",
            Self::Development => "development",
            Self::Technical => "technical",
        }
    }
}

/// What a content match was classified as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum MatchKind {
    Critical,
    Credential,
    Internal,
    Path,
    Sensitive(String),
}

impl MatchKind {
    pub fn tag(&self) -> String {
        match self {
            Self::Critical => "critical_keyword".into(),
            Self::Credential => "credential_leak".into(),
            Self::Internal => "internal_keyword".into(),
            Self::Path => "internal_path".into(),
            Self::Sensitive(name) => format!("sensitive_pattern:{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogMatch {
    pub kind: MatchKind,
    pub span: Range<usize>,
}

/// Result of scanning one piece of content against the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentScan {
    /// Critical keywords and credential-shaped tokens.
    pub critical: Vec<CatalogMatch>,
    /// Internal module names and internal file paths.
    pub internal: Vec<CatalogMatch>,
    pub sensitive: Vec<CatalogMatch>,
}

impl ContentScan {
    pub fn is_clean(&self) -> bool {
        self.critical.is_empty() && self.internal.is_empty() && self.sensitive.is_empty()
    }

    /// Critical or internal hit; sensitive patterns alone are not restricted.
    pub fn has_restricted(&self) -> bool {
        !self.critical.is_empty() || !self.internal.is_empty()
    }

    pub fn all(&self) -> impl Iterator<Item = &CatalogMatch> {
        self.critical
            .iter()
            .chain(self.internal.iter())
            .chain(self.sensitive.iter())
    }
}

#[derive(Debug, Clone)]
struct SensitivePattern {
    name: String,
    regex: Regex,
    placeholder: String,
}

#[derive(Debug, Clone)]
struct CompiledCategory {
    category: PolicyCategory,
    patterns: Vec<Regex>,
}

#[derive(Debug, Clone)]
struct Placeholders {
    critical: String,
    credential: String,
    internal: String,
    path: String,
}

#[derive(Debug, Clone)]
pub struct PatternCatalog {
    version: String,
    fingerprint: String,
    default_locale: String,
    max_scan_bytes: usize,
    critical: Option<Regex>,
    internal: Option<Regex>,
    paths: Vec<Regex>,
    sensitive: Vec<SensitivePattern>,
    categories: Vec<CompiledCategory>,
    replies: BTreeMap<String, BTreeMap<String, String>>,
    placeholders: Placeholders,
}

impl PatternCatalog {
    /// The catalog shipped inside the binary.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// The catalog named by `policy.catalog_path`, or the built-in one.
    pub fn from_config(config: &RefineConfig) -> anyhow::Result<Self> {
        let catalog = match config.catalog_path() {
            Some(path) => Self::load(&path)
                .with_context(|| format!("failed to load catalog {}", path.display()))?,
            None => Self::builtin().context("built-in catalog is invalid")?,
        };
        tracing::info!(
            version = %catalog.version(),
            fingerprint = %catalog.fingerprint(),
            "pattern catalog ready"
        );
        Ok(catalog)
    }

    pub fn from_toml_str(source: &str) -> Result<Self, CatalogError> {
        let spec: CatalogSpec = toml::from_str(source)?;
        let catalog = Self::compile(spec, fingerprint(source))?;
        catalog.validate()?;
        tracing::debug!(
            version = %catalog.version,
            fingerprint = %catalog.fingerprint,
            "pattern catalog loaded"
        );
        Ok(catalog)
    }

    fn compile(spec: CatalogSpec, fingerprint: String) -> Result<Self, CatalogError> {
        let critical = keyword_regex("critical.keywords", &spec.critical.keywords)?;
        let internal = keyword_regex("internal.keywords", &spec.internal.keywords)?;
        let paths = spec
            .internal
            .path_patterns
            .iter()
            .enumerate()
            .map(|(i, p)| compile_pattern(&format!("internal.path_patterns[{i}]"), p))
            .collect::<Result<Vec<_>, _>>()?;

        let sensitive = spec
            .sensitive_patterns
            .into_iter()
            .map(|s| {
                Ok(SensitivePattern {
                    regex: compile_pattern(&s.name, &s.pattern)?,
                    name: s.name,
                    placeholder: s.placeholder,
                })
            })
            .collect::<Result<Vec<_>, CatalogError>>()?;

        let mut categories: Vec<CompiledCategory> = Vec::with_capacity(spec.categories.len());
        for category in spec.categories {
            let patterns = category
                .query_patterns
                .iter()
                .enumerate()
                .map(|(i, p)| compile_pattern(&format!("{}[{i}]", category.name), p))
                .collect::<Result<Vec<_>, _>>()?;
            match categories.iter_mut().find(|c| c.category == category.name) {
                Some(existing) => existing.patterns.extend(patterns),
                None => categories.push(CompiledCategory {
                    category: category.name,
                    patterns,
                }),
            }
        }
        categories.sort_by_key(|c| c.category);

        let replies = spec
            .replies
            .into_iter()
            .map(|(key, by_locale)| {
                let by_locale = by_locale
                    .into_iter()
                    .map(|(locale, text)| (normalise_locale(&locale), text))
                    .collect();
                (key, by_locale)
            })
            .collect();

        Ok(Self {
            version: spec.version,
            fingerprint,
            default_locale: normalise_locale(&spec.default_locale),
            max_scan_bytes: spec.limits.max_scan_bytes,
            critical,
            internal,
            paths,
            sensitive,
            categories,
            replies,
            placeholders: Placeholders {
                critical: spec.placeholders.critical,
                credential: spec.placeholders.credential,
                internal: spec.placeholders.internal,
                path: spec.placeholders.path,
            },
        })
    }

    fn validate(&self) -> Result<(), CatalogError> {
        let has_default = self
            .replies
            .get(DEFAULT_REPLY_KEY)
            .and_then(|by_locale| by_locale.get(&self.default_locale))
            .is_some_and(|text| !text.trim().is_empty());
        if !has_default {
            return Err(CatalogError::MissingDefaultReply {
                locale: self.default_locale.clone(),
            });
        }

        let placeholders = [
            &self.placeholders.critical,
            &self.placeholders.credential,
            &self.placeholders.internal,
            &self.placeholders.path,
        ]
        .into_iter()
        .chain(self.sensitive.iter().map(|s| &s.placeholder));
        for placeholder in placeholders {
            let in_context = PLACEHOLDER_CONTEXTS
                .iter()
                .map(|context| context.replace("{p}", placeholder))
                .any(|text| !self.scan(&text).is_clean());
            if in_context
                || !self.scan(placeholder).is_clean()
                || !self.classify(placeholder).is_empty()
            {
                return Err(CatalogError::SelfMatchingPlaceholder {
                    placeholder: placeholder.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// SHA-256 of the catalog source, hex encoded.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn default_locale(&self) -> &str {
        &self.default_locale
    }

    pub fn max_scan_bytes(&self) -> usize {
        self.max_scan_bytes
    }

    /// Policy categories whose query patterns match `text`, in tie-break order.
    pub fn classify(&self, text: &str) -> BTreeSet<PolicyCategory> {
        self.categories
            .iter()
            .filter(|c| c.patterns.iter().any(|p| p.is_match(text)))
            .map(|c| c.category)
            .collect()
    }

    /// Every critical, internal and sensitive span in `text`.
    pub fn scan(&self, text: &str) -> ContentScan {
        let mut scan = ContentScan::default();

        if let Some(re) = &self.critical {
            scan.critical.extend(spans(re, text, &MatchKind::Critical));
        }
        scan.critical
            .extend(scan_for_leaks(text).into_iter().map(|leak| CatalogMatch {
                kind: MatchKind::Credential,
                span: leak.span,
            }));

        if let Some(re) = &self.internal {
            scan.internal.extend(spans(re, text, &MatchKind::Internal));
        }
        for re in &self.paths {
            scan.internal.extend(spans(re, text, &MatchKind::Path));
        }

        for pattern in &self.sensitive {
            let kind = MatchKind::Sensitive(pattern.name.clone());
            scan.sensitive.extend(spans(&pattern.regex, text, &kind));
        }

        scan
    }

    pub fn placeholder(&self, kind: &MatchKind) -> &str {
        match kind {
            MatchKind::Critical => &self.placeholders.critical,
            MatchKind::Credential => &self.placeholders.credential,
            MatchKind::Internal => &self.placeholders.internal,
            MatchKind::Path => &self.placeholders.path,
            MatchKind::Sensitive(name) => self
                .sensitive
                .iter()
                .find(|s| &s.name == name)
                .map_or(self.placeholders.critical.as_str(), |s| {
                    s.placeholder.as_str()
                }),
        }
    }

    /// Canned reply for `category` (or the default reply) in `locale`.
    ///
    /// Falls back to the catalog default locale, then to the default reply.
    pub fn reply(&self, category: Option<PolicyCategory>, locale: &str) -> &str {
        let key = category.map_or(DEFAULT_REPLY_KEY, PolicyCategory::as_str);
        let locale = normalise_locale(locale);
        let lookups = [
            (key, locale.as_str()),
            (key, self.default_locale.as_str()),
            (DEFAULT_REPLY_KEY, locale.as_str()),
            (DEFAULT_REPLY_KEY, self.default_locale.as_str()),
        ];
        lookups
            .into_iter()
            .find_map(|(k, l)| {
                self.replies
                    .get(k)
                    .and_then(|by_locale| by_locale.get(l))
                    .filter(|text| !text.trim().is_empty())
            })
            .map_or("", String::as_str)
    }
}

fn fingerprint(source: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hex::encode(hasher.finalize())
}

fn compile_pattern(name: &str, pattern: &str) -> Result<Regex, CatalogError> {
    Regex::new(pattern).map_err(|source| CatalogError::InvalidPattern {
        name: name.to_string(),
        source,
    })
}

/// Case-insensitive alternation of literal keywords, longest first.
fn keyword_regex(name: &str, keywords: &[String]) -> Result<Option<Regex>, CatalogError> {
    let mut literals: Vec<&str> = keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();
    if literals.is_empty() {
        return Ok(None);
    }
    literals.sort_by_key(|k| std::cmp::Reverse(k.len()));
    let alternation = literals
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&alternation)
        .case_insensitive(true)
        .build()
        .map(Some)
        .map_err(|source| CatalogError::InvalidPattern {
            name: name.to_string(),
            source,
        })
}

fn spans<'a>(
    re: &'a Regex,
    text: &'a str,
    kind: &'a MatchKind,
) -> impl Iterator<Item = CatalogMatch> + 'a {
    re.find_iter(text).map(|m| CatalogMatch {
        kind: kind.clone(),
        span: m.range(),
    })
}
