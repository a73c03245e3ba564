//! Capacity calculation: how much of the tightest selected model's input budget the draft
//! plus history would use.

mod report;

pub use report::{CapacityReport, UsageLevel, UsageThresholds};

use crate::catalog::ModelLimit;
use crate::estimate::fallback_estimate;
use crate::estimation::{AccurateCount, InputFingerprint};

/// Minimum/maximum limit ratio below which the smallest model is surfaced as limiting.
pub const DEFAULT_LIMITING_RATIO: f64 = 0.5;

/// Token cost of the current draft, and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CurrentInput {
    pub tokens: u32,
    pub is_accurate: bool,
    pub is_pending: bool,
}

impl CurrentInput {
    /// The accurate count when it was obtained for exactly this input, else the fallback
    /// estimate of `text`.
    pub fn resolve(
        accurate: Option<&AccurateCount>,
        current: InputFingerprint,
        text: &str,
        is_pending: bool,
    ) -> Self {
        match accurate {
            Some(count) if count.fingerprint == current => Self {
                tokens: count.input_tokens,
                is_accurate: true,
                is_pending,
            },
            _ => Self {
                tokens: fallback_estimate(text),
                is_accurate: false,
                is_pending,
            },
        }
    }

    pub fn approximate(text: &str) -> Self {
        Self {
            tokens: fallback_estimate(text),
            is_accurate: false,
            is_pending: false,
        }
    }

    pub fn accurate(tokens: u32) -> Self {
        Self {
            tokens,
            is_accurate: true,
            is_pending: false,
        }
    }
}

/// Pure combiner of limits, history and current input into a [`CapacityReport`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapacityCalculator {
    limiting_ratio: f64,
}

impl Default for CapacityCalculator {
    fn default() -> Self {
        Self {
            limiting_ratio: DEFAULT_LIMITING_RATIO,
        }
    }
}

impl CapacityCalculator {
    pub fn new(limiting_ratio: f64) -> Self {
        Self { limiting_ratio }
    }

    pub fn limiting_ratio(&self) -> f64 {
        self.limiting_ratio
    }

    /// Builds the report.
    ///
    /// History only counts in follow-up mode. `is_exceeded` compares unclamped totals; the
    /// percentages are clamped to `[0, 100]`.
    pub fn compute(
        &self,
        selected_limits: &[ModelLimit],
        history_tokens: u64,
        current: CurrentInput,
        is_follow_up: bool,
    ) -> CapacityReport {
        let Some(tightest) = selected_limits.iter().min_by_key(|m| m.max_input_tokens) else {
            return CapacityReport::neutral();
        };
        let min_limit = u64::from(tightest.max_input_tokens);
        let max_limit = selected_limits
            .iter()
            .map(|m| u64::from(m.max_input_tokens))
            .max()
            .unwrap_or(min_limit);

        let limiting_model_id = (max_limit > 0
            && (min_limit as f64 / max_limit as f64) < self.limiting_ratio)
            .then(|| tightest.model_id.clone());

        let history_tokens = if is_follow_up { history_tokens } else { 0 };
        let current_input_tokens = u64::from(current.tokens);
        let total_tokens = current_input_tokens + history_tokens;

        let raw_percent = if min_limit > 0 {
            total_tokens as f64 * 100.0 / min_limit as f64
        } else {
            0.0
        };

        CapacityReport {
            limiting_model_id,
            min_limit,
            current_input_tokens,
            history_tokens,
            total_tokens,
            percent_used: raw_percent.clamp(0.0, 100.0),
            percent_remaining: (100.0 - raw_percent).max(0.0),
            is_exceeded: total_tokens > min_limit,
            is_accurate: current.is_accurate,
            is_pending: current.is_pending,
        }
    }
}
