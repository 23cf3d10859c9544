//! Common test utilities for building handlers, flows and request contexts.
use michi::flow::{
    FlowCallNode, FlowCheckpoint, MethodCallNode, Parameter, ReturnNode, SwitchCase, SwitchNode,
    ViewNode,
};
use michi::prelude::*;
use michi::view::CapturingExternalContext;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Wraps the default flow handler and records how the navigation core drives it.
pub struct RecordingFlowHandler {
    inner: DefaultFlowHandler,
    transitions: Mutex<Vec<String>>,
    pushes: AtomicUsize,
    pops: AtomicUsize,
    rollbacks: AtomicUsize,
}

#[allow(dead_code)]
impl RecordingFlowHandler {
    pub fn new(inner: DefaultFlowHandler) -> Self {
        Self {
            inner,
            transitions: Mutex::new(Vec::new()),
            pushes: AtomicUsize::new(0),
            pops: AtomicUsize::new(0),
            rollbacks: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &DefaultFlowHandler {
        &self.inner
    }

    /// Every transition as `"source -> target"`.
    pub fn transitions(&self) -> Vec<String> {
        self.transitions.lock().unwrap().clone()
    }

    pub fn return_mode_pushes(&self) -> usize {
        self.pushes.load(Ordering::SeqCst)
    }

    pub fn return_mode_pops(&self) -> usize {
        self.pops.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }
}

impl FlowHandler for RecordingFlowHandler {
    fn current_flow(&self, ctx: &RequestContext) -> Option<Arc<Flow>> {
        self.inner.current_flow(ctx)
    }

    fn flow(&self, document_id: &str, flow_id: &str) -> Option<Arc<Flow>> {
        self.inner.flow(document_id, flow_id)
    }

    fn transition(
        &self,
        ctx: &mut RequestContext,
        source: Option<&Arc<Flow>>,
        target: &FlowTarget,
        call_node: Option<&FlowCallNode>,
        to_view_id: &str,
    ) -> std::result::Result<(), NavigationError> {
        let source_name = source.map(|f| f.id().to_string()).unwrap_or("<none>".to_string());
        self.transitions
            .lock()
            .unwrap()
            .push(format!("{} -> {}", source_name, target));
        self.inner.transition(ctx, source, target, call_node, to_view_id)
    }

    fn push_return_mode(&self, ctx: &mut RequestContext) {
        self.pushes.fetch_add(1, Ordering::SeqCst);
        self.inner.push_return_mode(ctx)
    }

    fn pop_return_mode(&self, ctx: &mut RequestContext) {
        self.pops.fetch_add(1, Ordering::SeqCst);
        self.inner.pop_return_mode(ctx)
    }

    fn last_displayed_view_id(&self, ctx: &RequestContext) -> Option<String> {
        self.inner.last_displayed_view_id(ctx)
    }

    fn take_return_mode_depth(&self, ctx: &mut RequestContext) -> usize {
        self.inner.take_return_mode_depth(ctx)
    }

    fn rollback(&self, ctx: &mut RequestContext, checkpoint: FlowCheckpoint) {
        self.rollbacks.fetch_add(1, Ordering::SeqCst);
        self.inner.rollback(ctx, checkpoint)
    }
}

/// An external context whose redirects always fail.
pub struct FailingExternalContext;

impl ExternalContext for FailingExternalContext {
    fn redirect(&self, url: &str) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            format!("client went away before {}", url),
        ))
    }
}

/// Everything needed to set up one navigation scenario.
#[allow(dead_code)]
#[derive(Default)]
pub struct Fixture {
    pub rules: Vec<NavigationRule>,
    pub flows: Vec<Flow>,
    pub evaluator: ScopedEvaluator,
    /// When set, only these views exist.
    pub known_views: Option<Vec<&'static str>>,
    pub development: bool,
    /// Route redirects through `FailingExternalContext`.
    pub failing_redirects: bool,
}

/// A built handler plus handles on its collaborators.
#[allow(dead_code)]
pub struct Harness {
    pub handler: NavigationHandler,
    pub flow_handler: Arc<RecordingFlowHandler>,
    pub external: Arc<CapturingExternalContext>,
    pub evaluator: Arc<ScopedEvaluator>,
    pub registry: FlowRegistry,
}

#[allow(dead_code)]
impl Fixture {
    pub fn build(self) -> Harness {
        let mut registry = FlowRegistry::new();
        for flow in self.flows {
            registry.add(flow).expect("flow should register");
        }

        let evaluator = Arc::new(self.evaluator);
        let flow_handler = Arc::new(RecordingFlowHandler::new(DefaultFlowHandler::new(
            registry.clone(),
            evaluator.clone(),
        )));
        let external = Arc::new(CapturingExternalContext::new());
        let view_handler = match self.known_views {
            Some(views) => DefaultViewHandler::new().with_views(views),
            None => DefaultViewHandler::new(),
        };
        let stage = if self.development {
            ProjectStage::Development
        } else {
            ProjectStage::Production
        };

        let external_context: Arc<dyn ExternalContext> = if self.failing_redirects {
            Arc::new(FailingExternalContext)
        } else {
            external.clone()
        };

        let application = Application::builder()
            .flow_handler(flow_handler.clone())
            .evaluator(evaluator.clone())
            .external_context(external_context)
            .view_handler(Arc::new(view_handler))
            .project_stage(stage)
            .build();
        let builder = NavigationHandler::builder(application).rules(self.rules);
        let handler = registry
            .iter()
            .fold(builder, |builder, flow| builder.inspect_flow(flow))
            .build();

        Harness {
            handler,
            flow_handler,
            external,
            evaluator,
            registry,
        }
    }
}

#[allow(dead_code)]
impl Harness {
    pub fn flow(&self, flow_id: &str) -> Arc<Flow> {
        self.registry.get("", flow_id).expect("flow should be registered")
    }

    /// A request on `view_id` with the given flows already on the stack, outermost first.
    pub fn request_in(&self, view_id: &str, flow_ids: &[&str]) -> RequestContext {
        let mut ctx = RequestContext::for_view(view_id);
        for flow_id in flow_ids {
            let flow = self.flow(flow_id);
            let entry_view = format!("/{}/{}.xhtml", flow_id, flow_id);
            ctx.flow_stack.push(flow, entry_view);
        }
        ctx
    }

    pub fn current_flow_id(&self, ctx: &RequestContext) -> Option<String> {
        self.flow_handler
            .current_flow(ctx)
            .map(|flow| flow.id().to_string())
    }
}

/// A root rule with a single outcome case.
#[allow(dead_code)]
pub fn rule(from_view_id: &str, outcome: &str, to_view_id: &str) -> NavigationRule {
    NavigationRule::new(from_view_id)
        .case(NavigationCase::new(from_view_id, to_view_id).with_from_outcome(outcome))
}

#[allow(dead_code)]
pub fn view_node(id: &str, vdl_document_id: &str) -> FlowNode {
    FlowNode::View(ViewNode {
        id: id.to_string(),
        vdl_document_id: vdl_document_id.to_string(),
    })
}

#[allow(dead_code)]
pub fn return_node(id: &str, from_outcome: &str) -> FlowNode {
    FlowNode::Return(ReturnNode {
        id: id.to_string(),
        from_outcome: from_outcome.to_string(),
    })
}

#[allow(dead_code)]
pub fn switch_node(id: &str, cases: &[(&str, &str)], default_outcome: Option<&str>) -> FlowNode {
    FlowNode::Switch(SwitchNode {
        id: id.to_string(),
        cases: cases
            .iter()
            .map(|(condition, outcome)| SwitchCase {
                condition: condition.to_string(),
                from_outcome: outcome.to_string(),
            })
            .collect(),
        default_outcome: default_outcome.map(str::to_string),
    })
}

#[allow(dead_code)]
pub fn method_call_node(id: &str, method: &str, outcome: Option<&str>) -> FlowNode {
    FlowNode::MethodCall(MethodCallNode {
        id: id.to_string(),
        method_expression: method.to_string(),
        parameters: Vec::new(),
        outcome: outcome.map(str::to_string),
    })
}

#[allow(dead_code)]
pub fn flow_call_node(id: &str, called_flow_id: &str, outbound: &[(&str, &str)]) -> FlowNode {
    FlowNode::FlowCall(FlowCallNode {
        id: id.to_string(),
        called_flow_id: called_flow_id.to_string(),
        called_flow_document_id: String::new(),
        outbound_parameters: outbound
            .iter()
            .map(|(name, value)| Parameter::new(*name, *value))
            .collect(),
    })
}

/// A flow whose start node is a view at `/<id>/<id>.xhtml`.
#[allow(dead_code)]
pub fn simple_flow(id: &str) -> Flow {
    Flow::new("", id).with_node(view_node(id, &format!("/{}/{}.xhtml", id, id)))
}

#[allow(dead_code)]
pub const NAVIGATION_JSON: &str = r##"{
    "navigationRules": [
        {
            "fromViewId": "/cart.xhtml",
            "cases": [
                { "fromOutcome": "checkout", "toViewId": "/checkout.xhtml", "redirect": {} },
                { "fromOutcome": "shop", "toViewId": "catalog.xhtml" }
            ]
        },
        {
            "cases": [
                { "fromOutcome": "home", "toViewId": "/home.xhtml" },
                { "fromOutcome": "admin", "if": "#{user.admin}", "toViewId": "/admin.xhtml" }
            ]
        }
    ],
    "flows": [
        {
            "id": "booking",
            "startNode": "route",
            "views": [
                { "id": "standard", "vdlDocumentId": "/booking/standard.xhtml" },
                { "id": "express", "vdlDocumentId": "booking/express.xhtml" }
            ],
            "switches": [
                {
                    "id": "route",
                    "cases": [ { "if": "#{booking.express}", "fromOutcome": "express" } ],
                    "defaultOutcome": "standard"
                }
            ],
            "returns": [ { "id": "done", "fromOutcome": "home" } ]
        }
    ]
}"##;
