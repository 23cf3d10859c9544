use super::{Flow, FlowKey};
use std::sync::Arc;

#[derive(Debug, Clone)]
struct FlowFrame {
    flow: Arc<Flow>,
    last_displayed_view_id: String,
}

/// The stack of active flows for one client window.
///
/// Each frame remembers the view that was displayed when its flow was entered.
/// While in return mode the frames above the return depth are hidden, so
/// `current` and `last_displayed_view_id` answer for the calling flow.
/// Every mutation bumps `version`, which makes snapshots easy to compare.
#[derive(Debug, Clone, Default)]
pub struct FlowStack {
    frames: Vec<FlowFrame>,
    return_depth: usize,
    version: u64,
}

impl FlowStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn return_depth(&self) -> usize {
        self.return_depth
    }

    fn visible_index(&self) -> Option<usize> {
        self.frames
            .len()
            .checked_sub(1 + self.return_depth)
    }

    /// The active flow, honouring return mode.
    pub fn current(&self) -> Option<&Arc<Flow>> {
        self.visible_index().map(|idx| &self.frames[idx].flow)
    }

    /// The view displayed when the active flow was entered, honouring return mode.
    pub fn last_displayed_view_id(&self) -> Option<&str> {
        self.visible_index()
            .map(|idx| self.frames[idx].last_displayed_view_id.as_str())
    }

    /// The top of the stack, ignoring return mode.
    pub fn top(&self) -> Option<&Arc<Flow>> {
        self.frames.last().map(|frame| &frame.flow)
    }

    pub fn push(&mut self, flow: Arc<Flow>, last_displayed_view_id: impl Into<String>) {
        self.frames.push(FlowFrame {
            flow,
            last_displayed_view_id: last_displayed_view_id.into(),
        });
        self.version += 1;
    }

    pub fn pop(&mut self) -> Option<Arc<Flow>> {
        let frame = self.frames.pop()?;
        self.version += 1;
        Some(frame.flow)
    }

    pub fn contains(&self, key: &FlowKey) -> bool {
        self.frames.iter().any(|frame| frame.flow.key() == key)
    }

    /// Flows from the top of the stack downwards.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Flow>> {
        self.frames.iter().rev().map(|frame| &frame.flow)
    }

    pub fn push_return_mode(&mut self) {
        self.return_depth += 1;
        self.version += 1;
    }

    pub fn pop_return_mode(&mut self) {
        self.return_depth = self.return_depth.saturating_sub(1);
        self.version += 1;
    }
}

/// A restorable snapshot of the per-request flow state.
#[derive(Debug, Clone)]
pub struct FlowCheckpoint {
    pub(crate) stack: FlowStack,
    pub(crate) max_return_depth: Option<usize>,
}
