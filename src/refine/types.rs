use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::Mode;
use crate::policy::FilterVerdict;
use crate::scoring::ScoreVector;

// ── Request context ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

/// Everything known about the request being refined. Read-only for the
/// duration of one `enhance` call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub intent: String,
    /// Empty means the policy default locale.
    #[serde(default)]
    pub locale: String,
    #[serde(default)]
    pub conversation_history: Vec<Turn>,
    /// Recognized key: `verbosity` = `concise` | `detailed`.
    #[serde(default)]
    pub user_preferences: BTreeMap<String, String>,
    /// Recognized key: `max_length` (characters).
    #[serde(default)]
    pub constraints: BTreeMap<String, String>,
}

impl RequestContext {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }
}

// ── Stop reasons ─────────────────────────────────────────────────────

/// Why a refinement run ended.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StopReason {
    MaxStepsReached,
    Timeout,
    InsufficientImprovement,
    Completed,
    PolicyResponse,
    Error,
}

impl StopReason {
    pub const ALL: [StopReason; 6] = [
        StopReason::MaxStepsReached,
        StopReason::Timeout,
        StopReason::InsufficientImprovement,
        StopReason::Completed,
        StopReason::PolicyResponse,
        StopReason::Error,
    ];
}

// ── Results ──────────────────────────────────────────────────────────

/// One accepted improvement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based index of the provider call that produced the candidate.
    pub step_index: usize,
    pub proposed_score: f64,
    pub delta: f64,
    #[serde(with = "duration_ms")]
    pub elapsed_at_step: Duration,
}

/// Outcome of one `enhance` call. Always well formed, even on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementResult {
    pub run_id: Uuid,
    pub mode: Mode,
    pub final_response: String,
    /// `None` when no scoring happened (policy short-circuit, early error).
    pub original_score: Option<ScoreVector>,
    pub final_score: Option<ScoreVector>,
    pub improvement_delta: f64,
    pub steps_taken: usize,
    pub provider_calls: usize,
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
    pub stop_reason: StopReason,
    pub trace: Vec<StepRecord>,
    pub verdict: Option<FilterVerdict>,
}

/// Caller-imposed limits on top of the mode budget.
#[derive(Debug, Clone, Default)]
pub struct EnhanceOptions {
    /// Upstream deadline, checked wherever the latency budget is.
    pub deadline: Option<tokio::time::Instant>,
    pub cancel: Option<CancellationToken>,
}

impl EnhanceOptions {
    pub fn with_deadline(mut self, deadline: tokio::time::Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled)
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
