use super::{Flow, FlowCallNode, FlowCheckpoint, FlowRegistry, FlowTarget};
use crate::context::RequestContext;
use crate::el::{ExpressionEvaluator, Value};
use crate::error::NavigationError;
use std::sync::Arc;
use tracing::{debug, trace};

/// Document id passed when resolving the outcome of a return node.
pub const NULL_FLOW: &str = "jakarta.faces.flow.NULL_FLOW";
/// Document id written to a redirect that abandons the active flows.
pub const ABANDONED_FLOW: &str = "jakarta.faces.flow.AbandonedFlow";
pub const TO_FLOW_DOCUMENT_ID_PARAM: &str = "jakarta.faces.flow.documentId";
pub const FLOW_ID_PARAM: &str = "jakarta.faces.flow.id";
pub const FLOW_RETURN_DEPTH_PARAM: &str = "jffrd";

/// Owner of the flow call stack.
///
/// The navigation handler only observes the stack through `current_flow` and
/// changes it through `transition` and the return-mode pair. `checkpoint` and
/// `rollback` undo a speculative transition.
pub trait FlowHandler: Send + Sync {
    fn current_flow(&self, ctx: &RequestContext) -> Option<Arc<Flow>>;

    fn flow(&self, document_id: &str, flow_id: &str) -> Option<Arc<Flow>>;

    fn transition(
        &self,
        ctx: &mut RequestContext,
        source: Option<&Arc<Flow>>,
        target: &FlowTarget,
        call_node: Option<&FlowCallNode>,
        to_view_id: &str,
    ) -> Result<(), NavigationError>;

    fn push_return_mode(&self, ctx: &mut RequestContext);

    fn pop_return_mode(&self, ctx: &mut RequestContext);

    fn last_displayed_view_id(&self, ctx: &RequestContext) -> Option<String>;

    /// Returns the number of flows a pending return must pop and forgets it.
    fn take_return_mode_depth(&self, ctx: &mut RequestContext) -> usize;

    fn checkpoint(&self, ctx: &RequestContext) -> FlowCheckpoint {
        ctx.flow_checkpoint()
    }

    fn rollback(&self, ctx: &mut RequestContext, checkpoint: FlowCheckpoint) {
        ctx.restore_flow_checkpoint(checkpoint);
    }
}

/// The stock flow handler over the request's [`FlowStack`](super::FlowStack).
pub struct DefaultFlowHandler {
    registry: FlowRegistry,
    evaluator: Arc<dyn ExpressionEvaluator>,
}

impl DefaultFlowHandler {
    pub fn new(registry: FlowRegistry, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        Self {
            registry,
            evaluator,
        }
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    /// Whether the flow is anywhere on the stack.
    pub fn is_active(&self, ctx: &RequestContext, document_id: &str, flow_id: &str) -> bool {
        ctx.flow_stack
            .iter()
            .any(|flow| flow.id() == flow_id && flow.defining_document_id() == document_id)
    }

    /// Applies the flow transition announced by the redirect parameters of this request.
    pub fn client_window_transition(&self, ctx: &mut RequestContext) -> Result<(), NavigationError> {
        let Some(document_id) = ctx.request_parameter(TO_FLOW_DOCUMENT_ID_PARAM).map(str::to_string)
        else {
            return Ok(());
        };
        let flow_id = ctx.request_parameter(FLOW_ID_PARAM).map(str::to_string);
        let source = self.current_flow(ctx);
        let mut target = FlowTarget::Outside;
        let mut call_node = None;

        match flow_id {
            _ if document_id == ABANDONED_FLOW => target = FlowTarget::Abandoned,
            Some(flow_id) if document_id != NULL_FLOW => {
                if let Some(flow) = self.flow(&document_id, &flow_id) {
                    call_node = source.as_ref().and_then(|s| s.flow_call(&flow)).cloned();
                    target = FlowTarget::Within(flow);
                }
            }
            _ => {
                let raw = ctx.request_parameter(FLOW_RETURN_DEPTH_PARAM).unwrap_or("0");
                let depth = raw.parse::<usize>().map_err(|_| {
                    NavigationError::Flow(format!(
                        "invalid '{}' request parameter '{}'",
                        FLOW_RETURN_DEPTH_PARAM, raw
                    ))
                })?;
                ctx.attributes.max_return_depth = Some(depth);
            }
        }

        let view_id = ctx.view_id().unwrap_or_default().to_string();
        self.transition(ctx, source.as_ref(), &target, call_node.as_ref(), &view_id)
    }

    fn invoke_hook(&self, expression: Option<&str>) -> Result<(), NavigationError> {
        if let Some(expression) = expression {
            self.evaluator
                .invoke(expression, &[])
                .map_err(|e| NavigationError::evaluation(expression, e))?;
        }
        Ok(())
    }

    fn pop_flow(&self, ctx: &mut RequestContext) -> Result<(), NavigationError> {
        if let Some(top) = ctx.flow_stack.top().cloned() {
            self.invoke_hook(top.finalizer())?;
            ctx.flow_stack.pop();
            debug!(flow = %top.key(), "Exited flow");
        }
        Ok(())
    }

    fn perform_pops(
        &self,
        ctx: &mut RequestContext,
        source: Option<&Arc<Flow>>,
        target: &FlowTarget,
    ) -> Result<(), NavigationError> {
        let Some(source) = source else {
            return Ok(());
        };
        match target {
            FlowTarget::Outside => {
                let returns = self.take_return_mode_depth(ctx);
                for _ in 0..returns {
                    self.pop_flow(ctx)?;
                }
            }
            FlowTarget::Abandoned => {
                for _ in 0..ctx.flow_stack.len() {
                    self.pop_flow(ctx)?;
                }
            }
            FlowTarget::Within(target) => {
                if source.flow_call(target).is_none() {
                    self.pop_flow(ctx)?;
                }
            }
        }
        Ok(())
    }

    fn evaluate_outbound(
        &self,
        call_node: Option<&FlowCallNode>,
        target: &FlowTarget,
    ) -> Result<Vec<(String, Value)>, NavigationError> {
        let (Some(call_node), Some(target)) = (call_node, target.flow()) else {
            return Ok(Vec::new());
        };
        call_node
            .outbound_parameters
            .iter()
            .filter(|outbound| target.inbound_parameter(&outbound.name).is_some())
            .map(|outbound| {
                self.evaluator
                    .value(&outbound.value)
                    .map(|value| (outbound.name.clone(), value))
                    .map_err(|e| NavigationError::evaluation(&outbound.value, e))
            })
            .collect()
    }

    fn assign_inbound(&self, flow: &Flow, values: Vec<(String, Value)>) -> Result<(), NavigationError> {
        for (name, value) in values {
            if let Some(inbound) = flow.inbound_parameter(&name) {
                self.evaluator
                    .set_value(&inbound.value, value)
                    .map_err(|e| NavigationError::evaluation(&inbound.value, e))?;
            }
        }
        Ok(())
    }
}

impl FlowHandler for DefaultFlowHandler {
    fn current_flow(&self, ctx: &RequestContext) -> Option<Arc<Flow>> {
        if self.registry.is_empty() {
            return None;
        }
        ctx.flow_stack.current().cloned()
    }

    fn flow(&self, document_id: &str, flow_id: &str) -> Option<Arc<Flow>> {
        self.registry.get(document_id, flow_id)
    }

    fn transition(
        &self,
        ctx: &mut RequestContext,
        source: Option<&Arc<Flow>>,
        target: &FlowTarget,
        call_node: Option<&FlowCallNode>,
        to_view_id: &str,
    ) -> Result<(), NavigationError> {
        if self.registry.is_empty() || target.is_same_as(source.map(Arc::as_ref)) {
            return Ok(());
        }
        trace!(
            source = source.map(|f| f.key().to_string()).unwrap_or_default(),
            target = %target,
            to_view_id,
            "Flow transition"
        );

        // Evaluated before popping so the expressions still see the calling flow.
        let outbound = self.evaluate_outbound(call_node, target)?;
        self.perform_pops(ctx, source, target)?;

        if let FlowTarget::Within(flow) = target {
            ctx.flow_stack.push(flow.clone(), to_view_id);
            debug!(flow = %flow.key(), "Entered flow");
            self.assign_inbound(flow, outbound)?;
            self.invoke_hook(flow.initializer())?;
        }
        Ok(())
    }

    fn push_return_mode(&self, ctx: &mut RequestContext) {
        let depth = ctx.attributes.max_return_depth.unwrap_or(0);
        ctx.attributes.max_return_depth = Some(depth + 1);
        ctx.flow_stack.push_return_mode();
    }

    fn pop_return_mode(&self, ctx: &mut RequestContext) {
        if ctx.attributes.is_reset_flow_handler_state() {
            ctx.attributes.max_return_depth = match ctx.attributes.max_return_depth {
                Some(depth) if depth > 1 => Some(depth - 1),
                _ => None,
            };
        }
        ctx.flow_stack.pop_return_mode();
    }

    fn last_displayed_view_id(&self, ctx: &RequestContext) -> Option<String> {
        ctx.flow_stack.last_displayed_view_id().map(str::to_string)
    }

    fn take_return_mode_depth(&self, ctx: &mut RequestContext) -> usize {
        ctx.attributes.max_return_depth.take().unwrap_or(0)
    }
}
