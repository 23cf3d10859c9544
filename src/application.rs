use crate::context::ProjectStage;
use crate::el::{ExpressionEvaluator, ScopedEvaluator};
use crate::flow::{DefaultFlowHandler, FlowHandler, FlowRegistry};
use crate::view::{CapturingExternalContext, DefaultViewHandler, ExternalContext, ViewHandler};
use std::sync::Arc;

/// The collaborators a navigation handler works with, for one deployment.
#[derive(Clone)]
pub struct Application {
    pub view_handler: Arc<dyn ViewHandler>,
    pub flow_handler: Arc<dyn FlowHandler>,
    pub evaluator: Arc<dyn ExpressionEvaluator>,
    pub external_context: Arc<dyn ExternalContext>,
    pub project_stage: ProjectStage,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    pub fn is_development(&self) -> bool {
        self.project_stage == ProjectStage::Development
    }
}

/// Builds an [`Application`], defaulting every collaborator not supplied.
#[derive(Default)]
pub struct ApplicationBuilder {
    view_handler: Option<Arc<dyn ViewHandler>>,
    flow_handler: Option<Arc<dyn FlowHandler>>,
    flows: FlowRegistry,
    evaluator: Option<Arc<dyn ExpressionEvaluator>>,
    external_context: Option<Arc<dyn ExternalContext>>,
    project_stage: ProjectStage,
}

impl ApplicationBuilder {
    pub fn view_handler(mut self, view_handler: Arc<dyn ViewHandler>) -> Self {
        self.view_handler = Some(view_handler);
        self
    }

    /// Supplies a custom flow handler; `flows` is then ignored.
    pub fn flow_handler(mut self, flow_handler: Arc<dyn FlowHandler>) -> Self {
        self.flow_handler = Some(flow_handler);
        self
    }

    /// Flows served by the default flow handler.
    pub fn flows(mut self, flows: FlowRegistry) -> Self {
        self.flows = flows;
        self
    }

    pub fn evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn external_context(mut self, external_context: Arc<dyn ExternalContext>) -> Self {
        self.external_context = Some(external_context);
        self
    }

    pub fn project_stage(mut self, project_stage: ProjectStage) -> Self {
        self.project_stage = project_stage;
        self
    }

    pub fn build(self) -> Application {
        let evaluator: Arc<dyn ExpressionEvaluator> = match self.evaluator {
            Some(evaluator) => evaluator,
            None => Arc::new(ScopedEvaluator::new()),
        };
        let flow_handler: Arc<dyn FlowHandler> = match self.flow_handler {
            Some(flow_handler) => flow_handler,
            None => Arc::new(DefaultFlowHandler::new(self.flows, evaluator.clone())),
        };
        let view_handler: Arc<dyn ViewHandler> = match self.view_handler {
            Some(view_handler) => view_handler,
            None => Arc::new(DefaultViewHandler::new()),
        };
        let external_context: Arc<dyn ExternalContext> = match self.external_context {
            Some(external_context) => external_context,
            None => Arc::new(CapturingExternalContext::new()),
        };
        Application {
            view_handler,
            flow_handler,
            evaluator,
            external_context,
            project_stage: self.project_stage,
        }
    }
}
