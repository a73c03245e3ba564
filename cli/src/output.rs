//! Rendering of a [`CapacityReport`] as one text line or JSON.

use serde::Serialize;
use tokenmeter::{CapacityReport, UsageLevel, UsageThresholds};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    JsonPretty,
}

impl OutputFormat {
    pub fn from_flags(json: bool, pretty: bool) -> Self {
        match (json, pretty) {
            (false, _) => Self::Text,
            (true, false) => Self::Json,
            (true, true) => Self::JsonPretty,
        }
    }
}

/// JSON shape: the report fields plus the derived level and summary line.
#[derive(Serialize)]
struct ReportView<'a> {
    #[serde(flatten)]
    report: &'a CapacityReport,
    level: UsageLevel,
    summary: String,
}

/// Text: `[level] summary`.
pub fn render(
    report: &CapacityReport,
    thresholds: &UsageThresholds,
    format: OutputFormat,
) -> Result<String, serde_json::Error> {
    let level = report.level(thresholds);
    match format {
        OutputFormat::Text => Ok(format!("[{}] {}", level, report.summary())),
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let view = ReportView {
                report,
                level,
                summary: report.summary(),
            };
            if format == OutputFormat::JsonPretty {
                serde_json::to_string_pretty(&view)
            } else {
                serde_json::to_string(&view)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokenmeter::{CapacityCalculator, CurrentInput, ModelLimit};

    fn report(tokens: u32) -> CapacityReport {
        CapacityCalculator::default().compute(
            &[ModelLimit::new("m", 100)],
            0,
            CurrentInput::accurate(tokens),
            false,
        )
    }

    #[test]
    fn text_has_level_prefix() {
        let line = render(&report(90), &UsageThresholds::default(), OutputFormat::Text).unwrap();
        assert!(line.starts_with("[warning] "), "{line}");
        assert!(line.contains("90%"), "{line}");
    }

    #[test]
    fn json_is_flat_with_level_and_summary() {
        let line = render(&report(120), &UsageThresholds::default(), OutputFormat::Json).unwrap();
        assert!(!line.contains('\n'));
        let v: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["level"], "exceeded");
        assert_eq!(v["total_tokens"], 120);
        assert_eq!(v["is_exceeded"], true);
        assert!(v["summary"].as_str().unwrap().contains("exceeds"));
    }

    #[test]
    fn pretty_json_is_multiline() {
        let thresholds = UsageThresholds::default();
        let out = render(&report(1), &thresholds, OutputFormat::JsonPretty).unwrap();
        assert!(out.contains('\n'));
    }

    #[test]
    fn format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Text);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::JsonPretty);
    }
}
