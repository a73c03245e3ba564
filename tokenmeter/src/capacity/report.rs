//! The capacity report handed to presentation and submission gating.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

/// Recomputed on every relevant change; never persisted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CapacityReport {
    /// Smallest-limit model, surfaced only when limits diverge enough to matter.
    pub limiting_model_id: Option<String>,
    pub min_limit: u64,
    pub current_input_tokens: u64,
    pub history_tokens: u64,
    pub total_tokens: u64,
    pub percent_used: f64,
    pub percent_remaining: f64,
    pub is_exceeded: bool,
    pub is_accurate: bool,
    pub is_pending: bool,
}

/// Percent-used boundaries for [`UsageLevel`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UsageThresholds {
    pub warning_percent: f64,
    pub critical_percent: f64,
}

impl Default for UsageThresholds {
    fn default() -> Self {
        Self {
            warning_percent: 80.0,
            critical_percent: 95.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageLevel {
    Normal,
    Warning,
    Critical,
    Exceeded,
}

impl UsageLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
            Self::Exceeded => "exceeded",
        }
    }
}

impl std::fmt::Display for UsageLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CapacityReport {
    /// Report for "no models selected".
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn has_models(&self) -> bool {
        self.min_limit > 0
    }

    /// Whether a submission gate should refuse this input.
    pub fn blocks_submission(&self) -> bool {
        self.is_exceeded
    }

    pub fn level(&self, thresholds: &UsageThresholds) -> UsageLevel {
        if self.is_exceeded {
            UsageLevel::Exceeded
        } else if self.percent_used >= thresholds.critical_percent {
            UsageLevel::Critical
        } else if self.percent_used >= thresholds.warning_percent {
            UsageLevel::Warning
        } else {
            UsageLevel::Normal
        }
    }

    /// One-line human-readable message.
    pub fn summary(&self) -> String {
        if !self.has_models() {
            return "No models selected".to_string();
        }
        let mut out = if self.is_exceeded {
            format!(
                "Input exceeds the limit by {} tokens ({} / {})",
                self.total_tokens - self.min_limit,
                self.total_tokens,
                self.min_limit
            )
        } else {
            format!(
                "{:.0}% of the input limit used ({} / {} tokens)",
                self.percent_used, self.total_tokens, self.min_limit
            )
        };
        if let Some(model) = &self.limiting_model_id {
            let _ = write!(out, ", limited by {model}");
        }
        if self.history_tokens > 0 {
            let _ = write!(out, ", {} from conversation history", self.history_tokens);
        }
        if !self.is_accurate {
            out.push_str(" (approximate)");
        }
        out
    }
}
