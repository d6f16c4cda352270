use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::catalog::PolicyCategory;

/// Severity of a filter verdict, ordered from least to most restrictive.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
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
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum SafetyLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl SafetyLevel {
    /// Levels at which matched spans are redacted and a canned reply attached.
    pub fn requires_redaction(self) -> bool {
        self >= Self::High
    }
}

/// Outcome of one [`super::PolicyFilter::filter`] call.
///
/// `Critical` always comes with `is_safe == false` and a non-empty
/// `policy_response`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterVerdict {
    pub safety_level: SafetyLevel,
    pub is_safe: bool,
    pub filtered_text: String,
    pub violations: Vec<String>,
    pub policy_response: Option<String>,
    /// Policy category the query matched, first in tie-break order.
    pub category: Option<PolicyCategory>,
}

impl FilterVerdict {
    /// The text a caller should show: the canned reply when unsafe,
    /// otherwise the (possibly redacted) text.
    pub fn effective_text(&self) -> &str {
        match (&self.policy_response, self.is_safe) {
            (Some(reply), false) => reply,
            _ => &self.filtered_text,
        }
    }
}
