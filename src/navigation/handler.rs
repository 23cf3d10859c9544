use super::{CaseStruct, NavigationMap, NavigationRegistry};
use crate::application::Application;
use crate::case::{NavigationCase, NavigationRule, Parameters};
use crate::config::NavigationConfig;
use crate::context::RequestContext;
use crate::el::{ExpressionEvaluator, is_expression};
use crate::error::NavigationError;
use crate::flow::{
    ABANDONED_FLOW, FLOW_ID_PARAM, FLOW_RETURN_DEPTH_PARAM, Flow, FlowHandler, FlowTarget,
    TO_FLOW_DOCUMENT_ID_PARAM, NULL_FLOW,
};
use crate::view::ViewHandler;
use tracing::{debug, trace};

/// What `handle_navigation` did with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationResult {
    /// A client redirect was issued and the response is complete.
    Redirect { view_id: String, url: String },
    /// The new view replaced the request's view root.
    Render { view_id: String },
    /// No case matched; the current view stays.
    Unresolved,
}

impl NavigationResult {
    pub fn view_id(&self) -> Option<&str> {
        match self {
            NavigationResult::Redirect { view_id, .. } | NavigationResult::Render { view_id } => {
                Some(view_id)
            }
            NavigationResult::Unresolved => None,
        }
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self, NavigationResult::Redirect { .. })
    }
}

/// Resolves outcomes to views and performs the navigation.
///
/// The rule registry is fixed once built; all per-request state lives in the
/// [`RequestContext`] passed to each call.
pub struct NavigationHandler {
    pub(super) application: Application,
    pub(super) registry: NavigationRegistry,
}

impl NavigationHandler {
    pub fn builder(application: Application) -> NavigationHandlerBuilder {
        NavigationHandlerBuilder::new(application)
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn registry(&self) -> &NavigationRegistry {
        &self.registry
    }

    pub(super) fn flow_handler(&self) -> &dyn FlowHandler {
        self.application.flow_handler.as_ref()
    }

    pub(super) fn view_handler(&self) -> &dyn ViewHandler {
        self.application.view_handler.as_ref()
    }

    pub(super) fn evaluator(&self) -> &dyn ExpressionEvaluator {
        self.application.evaluator.as_ref()
    }

    /// [`handle_navigation`](Self::handle_navigation) for flows defined without a
    /// defining document.
    pub fn navigate(
        &self,
        ctx: &mut RequestContext,
        from_action: Option<&str>,
        outcome: Option<&str>,
    ) -> Result<NavigationResult, NavigationError> {
        self.handle_navigation(ctx, from_action, outcome, "")
    }

    /// Resolves `outcome` and either redirects or swaps in the new view.
    pub fn handle_navigation(
        &self,
        ctx: &mut RequestContext,
        from_action: Option<&str>,
        outcome: Option<&str>,
        to_flow_document_id: &str,
    ) -> Result<NavigationResult, NavigationError> {
        ctx.trace.clear();
        let checkpoint = self.flow_handler().checkpoint(ctx);
        let Some(case) = self.get_view_id(ctx, from_action, outcome, to_flow_document_id)? else {
            return Ok(NavigationResult::Unresolved);
        };

        let result = self.dispatch(ctx, case, outcome);
        // A flow entered while resolving must not outlive a failed dispatch.
        if result.is_err() && ctx.attributes.did_transition {
            debug!("dispatch failed after entering a flow, rolling back");
            self.flow_handler().rollback(ctx, checkpoint);
        }
        ctx.attributes.did_transition = false;
        result
    }

    /// The navigation case `handle_navigation` would use, without navigating.
    ///
    /// Any flow state touched while resolving is restored before returning.
    pub fn get_navigation_case(
        &self,
        ctx: &mut RequestContext,
        from_action: Option<&str>,
        outcome: Option<&str>,
        to_flow_document_id: &str,
    ) -> Result<Option<NavigationCase>, NavigationError> {
        if ctx.attributes.reset_flow_handler_state.is_none() {
            ctx.attributes.reset_flow_handler_state = Some(true);
        }
        ctx.trace.clear();
        let checkpoint = self.flow_handler().checkpoint(ctx);
        let did_transition = ctx.attributes.did_transition;

        let result = self.get_view_id(ctx, from_action, outcome, to_flow_document_id);

        self.flow_handler().rollback(ctx, checkpoint);
        ctx.attributes.did_transition = did_transition;
        ctx.attributes.reset_flow_handler_state = None;
        Ok(result?.map(|case| case.nav_case))
    }

    /// The rules in effect for the request: the current flow's, or the root rules.
    pub fn navigation_cases(&self, ctx: &RequestContext) -> &NavigationMap {
        let current = self.flow_handler().current_flow(ctx);
        self.registry.navigation_map(current.as_deref())
    }

    fn dispatch(
        &self,
        ctx: &mut RequestContext,
        case: CaseStruct,
        outcome: Option<&str>,
    ) -> Result<NavigationResult, NavigationError> {
        let mut view_action_changes_view = false;
        if ctx.is_processing_view_action() {
            ctx.flash.keep_messages = true;
            view_action_changes_view = ctx.view_id().unwrap_or_default() != case.view_id;
        }

        if case.nav_case.is_redirect() || view_action_changes_view {
            self.redirect(ctx, case, outcome)
        } else {
            self.forward(ctx, case)
        }
    }

    fn redirect(
        &self,
        ctx: &mut RequestContext,
        case: CaseStruct,
        outcome: Option<&str>,
    ) -> Result<NavigationResult, NavigationError> {
        let mut parameters = case.nav_case.parameters().cloned().unwrap_or_default();

        if case.changes_flow() {
            match &case.new_flow {
                FlowTarget::Outside => {
                    parameters.set(TO_FLOW_DOCUMENT_ID_PARAM, vec![NULL_FLOW.to_string()]);
                    parameters.set(FLOW_ID_PARAM, vec![String::new()]);
                    let depth = self.flow_handler().take_return_mode_depth(ctx);
                    parameters.set(FLOW_RETURN_DEPTH_PARAM, vec![depth.to_string()]);
                }
                FlowTarget::Abandoned => {
                    parameters.set(TO_FLOW_DOCUMENT_ID_PARAM, vec![ABANDONED_FLOW.to_string()]);
                    parameters.set(FLOW_ID_PARAM, vec![String::new()]);
                }
                FlowTarget::Within(flow) => {
                    if !parameters.contains(TO_FLOW_DOCUMENT_ID_PARAM)
                        || !parameters.contains(FLOW_ID_PARAM)
                    {
                        let document_id = case
                            .nav_case
                            .to_flow_document_id()
                            .unwrap_or(flow.defining_document_id());
                        parameters.set(TO_FLOW_DOCUMENT_ID_PARAM, vec![document_id.to_string()]);
                        parameters.set(FLOW_ID_PARAM, vec![flow.id().to_string()]);
                    }
                }
            }
        }

        let parameters = self.evaluate_parameters(&parameters)?;
        let url = self.view_handler().redirect_url(
            ctx,
            &case.view_id,
            &parameters,
            case.nav_case.is_include_view_params(),
        );
        debug!(
            url = %url,
            outcome = outcome.unwrap_or_default(),
            view_id = %case.view_id,
            "Redirecting"
        );

        self.update_render_targets(ctx, &case.view_id);
        ctx.flash.redirect = true;
        self.application
            .external_context
            .redirect(&url)
            .map_err(|source| {
                debug!(url = %url, "Redirect failed");
                NavigationError::Redirect {
                    url: url.clone(),
                    source,
                }
            })?;
        ctx.response_complete();
        debug!(view_id = %case.view_id, "Response complete");

        clear_view_map_if_necessary(ctx, &case.view_id);
        Ok(NavigationResult::Redirect {
            view_id: case.view_id,
            url,
        })
    }

    fn forward(
        &self,
        ctx: &mut RequestContext,
        case: CaseStruct,
    ) -> Result<NavigationResult, NavigationError> {
        let root = self.view_handler().create_view(ctx, &case.view_id)?;
        self.update_render_targets(ctx, &case.view_id);
        clear_view_map_if_necessary(ctx, &case.view_id);
        ctx.set_view_root(root);

        if !ctx.attributes.did_transition {
            self.flow_handler().transition(
                ctx,
                case.current_flow.as_ref(),
                &case.new_flow,
                case.flow_call_node.as_ref(),
                &case.view_id,
            )?;
        }
        debug!(view_id = %case.view_id, "Set new view in request context");

        Ok(NavigationResult::Render {
            view_id: case.view_id,
        })
    }

    fn evaluate_parameters(&self, parameters: &Parameters) -> Result<Parameters, NavigationError> {
        let mut evaluated = Parameters::new();
        for (name, values) in parameters.iter() {
            let mut resolved = Vec::with_capacity(values.len());
            for value in values {
                if is_expression(value) {
                    let result = self
                        .evaluator()
                        .value(value)
                        .map_err(|e| NavigationError::evaluation(value, e))?;
                    resolved.push(result.as_string().unwrap_or_default());
                } else {
                    resolved.push(value.clone());
                }
            }
            evaluated.set(name, resolved);
        }
        Ok(evaluated)
    }

    fn update_render_targets(&self, ctx: &mut RequestContext, view_id: &str) {
        let changes_view = ctx.view_id() != Some(view_id);
        if changes_view && ctx.partial.ajax_request && !ctx.partial.render_all {
            trace!(view_id, "Switching partial response to render all");
            ctx.partial.render_all = true;
        }
    }
}

fn clear_view_map_if_necessary(ctx: &mut RequestContext, view_id: &str) {
    if let Some(root) = ctx.view_root_mut() {
        if root.view_id() != view_id {
            root.view_map_mut().clear();
        }
    }
}

/// Collects rules and flows, then builds an immutable [`NavigationHandler`].
pub struct NavigationHandlerBuilder {
    application: Application,
    registry: NavigationRegistry,
}

impl NavigationHandlerBuilder {
    pub fn new(application: Application) -> Self {
        debug!("Created NavigationHandler builder");
        Self {
            application,
            registry: NavigationRegistry::new(),
        }
    }

    pub fn rule(mut self, rule: NavigationRule) -> Self {
        self.registry.add_rule(&rule);
        self
    }

    pub fn rules<I: IntoIterator<Item = NavigationRule>>(self, rules: I) -> Self {
        rules.into_iter().fold(self, |builder, rule| builder.rule(rule))
    }

    /// Registers the navigation rules and switch nodes declared by `flow`.
    pub fn inspect_flow(mut self, flow: &Flow) -> Self {
        self.registry.inspect_flow(flow);
        self
    }

    /// Adds the root rules and inspects every flow of `config`.
    pub fn config(self, config: &NavigationConfig) -> Self {
        let builder = self.rules(config.rules.iter().cloned());
        config
            .flows
            .iter()
            .fold(builder, |builder, flow| builder.inspect_flow(flow))
    }

    pub fn build(self) -> NavigationHandler {
        debug!(
            root_patterns = self.registry.root().len(),
            "Created NavigationHandler instance"
        );
        NavigationHandler {
            application: self.application,
            registry: self.registry,
        }
    }
}
