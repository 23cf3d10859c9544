//! A record of the strategies tried while resolving an outcome.

pub mod formatter;

pub use formatter::TraceFormatter;

use std::fmt;

/// One way of turning an outcome into a target view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    ExactMatch,
    WildcardMatch,
    DefaultMatch,
    ExplicitFlowEntry,
    ViewNode,
    Switch,
    MethodCall,
    FlowCall,
    Return,
    Implicit,
    AbandonedFlowRoot,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::ExactMatch => "exact match",
            Strategy::WildcardMatch => "wildcard match",
            Strategy::DefaultMatch => "default match",
            Strategy::ExplicitFlowEntry => "flow entry from rule",
            Strategy::ViewNode => "view node",
            Strategy::Switch => "switch node",
            Strategy::MethodCall => "method-call node",
            Strategy::FlowCall => "flow-call node",
            Strategy::Return => "flow-return node",
            Strategy::Implicit => "implicit view",
            Strategy::AbandonedFlowRoot => "root rules after abandoning flow",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceStep {
    /// Nesting level; nested resolutions (flow entry, returns, switches) go deeper.
    pub depth: usize,
    pub strategy: Strategy,
    pub outcome: Option<String>,
    /// The resolved view id, `None` when the strategy did not match.
    pub view_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionTrace {
    steps: Vec<TraceStep>,
}

impl ResolutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        depth: usize,
        strategy: Strategy,
        outcome: Option<&str>,
        view_id: Option<&str>,
    ) {
        self.steps.push(TraceStep {
            depth,
            strategy,
            outcome: outcome.map(str::to_string),
            view_id: view_id.map(str::to_string),
        });
    }

    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    /// The outermost strategy that produced the result.
    pub fn winner(&self) -> Option<&TraceStep> {
        let top = self.steps.iter().map(|s| s.depth).min()?;
        self.steps
            .iter()
            .rev()
            .find(|s| s.depth == top && s.view_id.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }
}
