use super::{ResolutionTrace, TraceStep};

/// Formats resolution traces into human-readable strings
pub struct TraceFormatter;

impl TraceFormatter {
    /// One line per attempt, indented by nesting depth.
    pub fn format_trace(trace: &ResolutionTrace) -> String {
        if trace.is_empty() {
            return "(no strategies attempted)".to_string();
        }
        let base = trace.steps().iter().map(|s| s.depth).min().unwrap_or(0);
        trace
            .steps()
            .iter()
            .map(|step| Self::format_step(step, step.depth - base))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// A single-line explanation of which strategy resolved the outcome.
    pub fn format_reason(trace: &ResolutionTrace) -> String {
        match trace.winner() {
            Some(step) => format!(
                "{} for outcome {} -> {}",
                step.strategy,
                Self::format_outcome(step.outcome.as_deref()),
                step.view_id.as_deref().unwrap_or_default()
            ),
            None => "no navigation case matched".to_string(),
        }
    }

    fn format_step(step: &TraceStep, indent: usize) -> String {
        let result = match &step.view_id {
            Some(view_id) => format!("-> {}", view_id),
            None => "-> no match".to_string(),
        };
        format!(
            "{}{} ({}) {}",
            "  ".repeat(indent),
            step.strategy,
            Self::format_outcome(step.outcome.as_deref()),
            result
        )
    }

    fn format_outcome(outcome: Option<&str>) -> String {
        match outcome {
            Some(outcome) => format!("'{}'", outcome),
            None => "null".to_string(),
        }
    }
}
