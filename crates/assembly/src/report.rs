//! Per-step execution log and its plain text rendering.

use crate::error::Result;
use crate::plan::{MatchCandidate, SourceRef, StepAction};
use deck_pptx::ShapeReport;
use serde::Serialize;

/// What happened to one step during execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// A slide was added to the destination.
    Executed { slide: String },
    /// The step was unresolved and produced nothing.
    Skipped,
    /// The step's clone or populate failed outright.
    Failed { error: String },
    /// Execution was cancelled before the step ran.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepLog {
    /// Position in the plan.
    pub step: usize,
    pub keyword: String,
    pub action: StepAction,
    pub layout: Option<MatchCandidate>,
    pub content: Option<MatchCandidate>,
    pub outcome: StepOutcome,
    /// Shapes of the cloned slide that were not copied cleanly.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub shapes: Vec<ShapeReport>,
    /// Planning and execution warnings, in that order.
    pub warnings: Vec<String>,
}

/// The structured log of one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssemblyLog {
    pub steps: Vec<StepLog>,
}

impl AssemblyLog {
    pub fn executed_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s.outcome, StepOutcome::Executed { .. }))
            .count()
    }

    /// Every warning, prefixed with its step keyword.
    pub fn warnings(&self) -> Vec<String> {
        self.steps
            .iter()
            .flat_map(|s| s.warnings.iter().map(move |w| format!("{}: {}", s.keyword, w)))
            .collect()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// The result of executing a plan.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// The serialized destination package.
    pub bytes: Vec<u8>,
    pub log: AssemblyLog,
}

/// Renders an [`AssemblyLog`] as plain text, one block per step separated
/// by blank lines.
#[derive(Debug, Clone)]
pub struct LogFormatter {
    show_warnings: bool,
    show_justifications: bool,
}

impl Default for LogFormatter {
    fn default() -> Self {
        Self {
            show_warnings: true,
            show_justifications: true,
        }
    }
}

impl LogFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_warnings(mut self, show: bool) -> Self {
        self.show_warnings = show;
        self
    }

    pub fn with_justifications(mut self, show: bool) -> Self {
        self.show_justifications = show;
        self
    }

    /// # Example output
    /// ```text
    /// 1. Objectives (copy as is): executed as /ppt/slides/slide1.xml
    ///    content: content slide 3 (project goals)
    ///
    /// 2. Budget (copy as is): skipped
    ///    warning: no content candidate
    /// ```
    pub fn format(&self, log: &AssemblyLog) -> String {
        log.steps
            .iter()
            .map(|step| self.format_step(step).join("\n"))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Format with a trailing newline, for writing to a file.
    pub fn format_with_newline(&self, log: &AssemblyLog) -> String {
        let formatted = self.format(log);
        if formatted.is_empty() {
            formatted
        } else {
            format!("{}\n", formatted)
        }
    }

    fn format_step(&self, step: &StepLog) -> Vec<String> {
        let action = match step.action {
            StepAction::CopyAsIs => "copy as is",
            StepAction::MergeLayoutWithContent => "merge",
        };
        let outcome = match &step.outcome {
            StepOutcome::Executed { slide } => format!("executed as {}", slide),
            StepOutcome::Skipped => "skipped".to_string(),
            StepOutcome::Failed { error } => format!("failed: {}", error),
            StepOutcome::Cancelled => "cancelled".to_string(),
        };

        let mut lines = vec![format!("{}. {} ({}): {}", step.step + 1, step.keyword, action, outcome)];
        for (label, candidate) in [("layout", &step.layout), ("content", &step.content)] {
            if let Some(candidate) = candidate {
                lines.push(format!("   {}: {}", label, self.describe(candidate)));
            }
        }
        if self.show_warnings {
            lines.extend(step.warnings.iter().map(|w| format!("   warning: {}", w)));
        }
        lines
    }

    fn describe(&self, candidate: &MatchCandidate) -> String {
        let deck = match candidate.source {
            SourceRef::Template(i) => format!("template {} slide {}", i + 1, candidate.slide_index),
            SourceRef::Content => format!("content slide {}", candidate.slide_index),
        };
        if self.show_justifications && !candidate.justification.is_empty() {
            format!("{} ({})", deck, candidate.justification)
        } else {
            deck
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AssemblyLog {
        AssemblyLog {
            steps: vec![
                StepLog {
                    step: 0,
                    keyword: "Timeline".to_string(),
                    action: StepAction::MergeLayoutWithContent,
                    layout: Some(MatchCandidate {
                        source: SourceRef::Template(0),
                        slide_index: 2,
                        rank: 0,
                        justification: "two-column layout".to_string(),
                    }),
                    content: Some(MatchCandidate {
                        source: SourceRef::Content,
                        slide_index: 0,
                        rank: 0,
                        justification: "sequential phases".to_string(),
                    }),
                    outcome: StepOutcome::Executed {
                        slide: "/ppt/slides/slide1.xml".to_string(),
                    },
                    shapes: Vec::new(),
                    warnings: Vec::new(),
                },
                StepLog {
                    step: 1,
                    keyword: "Budget".to_string(),
                    action: StepAction::CopyAsIs,
                    layout: None,
                    content: None,
                    outcome: StepOutcome::Skipped,
                    shapes: Vec::new(),
                    warnings: vec!["no content candidate".to_string()],
                },
            ],
        }
    }

    #[test]
    fn test_format_blocks() {
        let text = LogFormatter::new().format(&sample());
        assert_eq!(
            text,
            "1. Timeline (merge): executed as /ppt/slides/slide1.xml\n\
             \x20  layout: template 1 slide 2 (two-column layout)\n\
             \x20  content: content slide 0 (sequential phases)\n\
             \n\
             2. Budget (copy as is): skipped\n\
             \x20  warning: no content candidate"
        );
    }

    #[test]
    fn test_format_without_extras() {
        let text = LogFormatter::new()
            .with_warnings(false)
            .with_justifications(false)
            .format_with_newline(&sample());
        assert!(!text.contains("warning"));
        assert!(!text.contains("two-column"));
        assert!(text.ends_with("skipped\n"));
    }

    #[test]
    fn test_empty_log() {
        assert_eq!(LogFormatter::new().format_with_newline(&AssemblyLog::default()), "");
    }

    #[test]
    fn test_json_log() {
        let log = sample();
        assert_eq!(log.executed_count(), 1);
        assert_eq!(log.warnings(), vec!["Budget: no content candidate".to_string()]);

        let json: serde_json::Value = serde_json::from_str(&log.to_json().unwrap()).unwrap();
        assert_eq!(json["steps"][0]["outcome"]["status"], "executed");
        assert_eq!(json["steps"][0]["outcome"]["slide"], "/ppt/slides/slide1.xml");
        assert_eq!(json["steps"][1]["outcome"]["status"], "skipped");
        assert!(json["steps"][1].get("shapes").is_none());
    }
}
