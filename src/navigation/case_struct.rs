use crate::case::NavigationCase;
use crate::flow::{Flow, FlowCallNode, FlowTarget};
use std::sync::Arc;

/// The outcome of one resolution: where to go and what that does to the flow stack.
#[derive(Debug, Clone)]
pub struct CaseStruct {
    pub view_id: String,
    pub nav_case: NavigationCase,
    pub current_flow: Option<Arc<Flow>>,
    pub new_flow: FlowTarget,
    pub flow_call_node: Option<FlowCallNode>,
    pub is_flow_entry_from_explicit_rule: bool,
    /// Produced by a return node whose exit transition already ran.
    pub(crate) synthesized_return: bool,
}

impl CaseStruct {
    pub(crate) fn new(view_id: impl Into<String>, nav_case: NavigationCase) -> Self {
        Self {
            view_id: view_id.into(),
            nav_case,
            current_flow: None,
            new_flow: FlowTarget::Outside,
            flow_call_node: None,
            is_flow_entry_from_explicit_rule: false,
            synthesized_return: false,
        }
    }

    /// Whether dispatching this case changes the flow stack.
    pub fn changes_flow(&self) -> bool {
        !self.new_flow.is_same_as(self.current_flow.as_deref())
    }
}
