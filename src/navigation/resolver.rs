use super::implicit::{flow_or_node_id, flow_view_id, parse_outcome, resolve_view_id};
use super::{CaseStruct, NavigationHandler, NavigationMap};
use crate::case::NavigationCase;
use crate::context::{RequestContext, Severity};
use crate::error::NavigationError;
use crate::flow::{Flow, FlowCallNode, FlowNode, FlowTarget, NULL_FLOW};
use crate::trace::Strategy;
use itertools::Itertools;
use std::sync::Arc;
use tracing::{error, warn};

/// Nesting bound for resolutions that recurse through flow nodes.
pub const MAX_RESOLUTION_DEPTH: usize = 64;

/// Strategies tried, in order, once no navigation rule matched.
pub const RESOLUTION_ORDER: [Strategy; 7] = [
    Strategy::ViewNode,
    Strategy::Switch,
    Strategy::MethodCall,
    Strategy::FlowCall,
    Strategy::Return,
    Strategy::Implicit,
    Strategy::AbandonedFlowRoot,
];

type Resolved = Result<Option<CaseStruct>, NavigationError>;

/// Where a navigation case sits in the preference order for an action/outcome pair.
///
/// Lower is preferred: 0 matches action and outcome, 1 outcome only, 2 action
/// only, 3 neither. `None` means the case does not apply.
pub fn case_specificity(
    case: &NavigationCase,
    from_action: Option<&str>,
    outcome: Option<&str>,
) -> Option<u8> {
    let action_matches = case.from_action().is_some() && case.from_action() == from_action;
    let outcome_matches = case.from_outcome().is_some() && case.from_outcome() == outcome;
    let open = outcome.is_some() || case.has_condition();

    match (case.from_action(), case.from_outcome()) {
        (Some(_), Some(_)) if action_matches && outcome_matches => Some(0),
        (None, Some(_)) if outcome_matches => Some(1),
        (Some(_), None) if action_matches && open => Some(2),
        (None, None) if open => Some(3),
        _ => None,
    }
}

impl NavigationHandler {
    /// Resolves where `outcome` leads from the current view.
    ///
    /// Returns `Ok(None)` when nothing matches. May enter a flow speculatively;
    /// `ctx.attributes.did_transition` reports whether it stayed entered.
    pub fn get_view_id(
        &self,
        ctx: &mut RequestContext,
        from_action: Option<&str>,
        outcome: Option<&str>,
        to_flow_document_id: &str,
    ) -> Resolved {
        self.guarded(ctx, outcome, |ctx| {
            self.resolve(ctx, from_action, outcome, to_flow_document_id)
        })
    }

    fn guarded<T>(
        &self,
        ctx: &mut RequestContext,
        outcome: Option<&str>,
        resolve: impl FnOnce(&mut RequestContext) -> Result<T, NavigationError>,
    ) -> Result<T, NavigationError> {
        if ctx.attributes.resolution_depth >= MAX_RESOLUTION_DEPTH {
            return Err(NavigationError::RecursionLimit {
                outcome: outcome.unwrap_or_default().to_string(),
                limit: MAX_RESOLUTION_DEPTH,
            });
        }
        ctx.attributes.resolution_depth += 1;
        let result = resolve(ctx);
        ctx.attributes.resolution_depth -= 1;
        result
    }

    fn record(&self, ctx: &mut RequestContext, strategy: Strategy, outcome: Option<&str>, result: &Resolved) {
        let view_id = match result {
            Ok(Some(case)) => Some(case.view_id.as_str()),
            _ => None,
        };
        let depth = ctx.attributes.resolution_depth;
        ctx.trace.record(depth, strategy, outcome, view_id);
    }

    fn resolve(
        &self,
        ctx: &mut RequestContext,
        from_action: Option<&str>,
        outcome: Option<&str>,
        to_flow_document_id: &str,
    ) -> Resolved {
        let view_id = ctx.view_id().map(str::to_string);
        let mut outcome = outcome.map(str::to_string);
        let mut to_flow_document_id = to_flow_document_id.to_string();
        let current = self.flow_handler().current_flow(ctx);
        let map = self.registry.navigation_map(current.as_deref());

        let mut case =
            self.find_rule_match(ctx, map, view_id.as_deref(), from_action, outcome.as_deref(), &to_flow_document_id)?;

        if let Some(matched) = &case {
            let node_id = flow_or_node_id(&matched.view_id).to_string();
            if matched.is_flow_entry_from_explicit_rule {
                if let Some(document_id) = matched.nav_case.to_flow_document_id() {
                    to_flow_document_id = document_id.to_string();
                }
                let result = self.find_flow_call_match(ctx, from_action, &node_id, &to_flow_document_id);
                self.record(ctx, Strategy::ExplicitFlowEntry, Some(&node_id), &result);
                case = result?;
            } else if let Some(current) = self.flow_handler().current_flow(ctx) {
                if current.node(&node_id).is_some() {
                    case = None;
                    outcome = Some(node_id);
                }
            }
        }

        for strategy in RESOLUTION_ORDER {
            if case.is_some() {
                break;
            }
            if strategy == Strategy::Implicit && outcome.as_deref() == Some("") {
                outcome = None;
            }
            let result = match (strategy, from_action, outcome.as_deref(), view_id.as_deref()) {
                (Strategy::ViewNode, Some(action), Some(out), _) => {
                    self.find_view_node_match(ctx, action, out)
                }
                (Strategy::Switch, Some(action), Some(out), _) => {
                    self.find_switch_match(ctx, action, out, &to_flow_document_id)
                }
                (Strategy::MethodCall, Some(action), Some(out), _) => {
                    self.find_method_call_match(ctx, action, out, &to_flow_document_id)
                }
                (Strategy::FlowCall, _, Some(out), _) => {
                    self.find_flow_call_match(ctx, from_action, out, &to_flow_document_id)
                }
                (Strategy::Return, _, Some(out), _) => self.find_return_match(ctx, from_action, out),
                (Strategy::Implicit, _, Some(out), Some(view)) => {
                    self.find_implicit_match(ctx, view, from_action, out, &to_flow_document_id)
                }
                (Strategy::AbandonedFlowRoot, _, Some(out), Some(view)) => {
                    if self.flow_handler().current_flow(ctx).is_none() {
                        continue;
                    }
                    self.find_abandoned_flow_match(ctx, view, from_action, out, &to_flow_document_id)
                }
                _ => continue,
            };
            self.record(ctx, strategy, outcome.as_deref(), &result);
            case = result?;
        }

        if case.is_none() && self.application.is_development() {
            if let Some(outcome) = &outcome {
                let view_id = view_id.as_deref().unwrap_or_default();
                let summary = match from_action {
                    Some(action) => format!(
                        "Unable to find matching navigation case with from-view-id '{}' for action '{}' with outcome '{}'",
                        view_id, action, outcome
                    ),
                    None => format!(
                        "Unable to find matching navigation case with from-view-id '{}' for outcome '{}'",
                        view_id, outcome
                    ),
                };
                ctx.add_message(Severity::Warn, summary);
            }
        }
        Ok(case)
    }

    /// Exact, then wildcard, then default rules of `map`.
    fn find_rule_match(
        &self,
        ctx: &mut RequestContext,
        map: &NavigationMap,
        view_id: Option<&str>,
        from_action: Option<&str>,
        outcome: Option<&str>,
        to_flow_document_id: &str,
    ) -> Resolved {
        if let Some(view_id) = view_id {
            let result = self.find_exact_match(ctx, map, view_id, from_action, outcome, to_flow_document_id);
            self.record(ctx, Strategy::ExactMatch, outcome, &result);
            if let Some(case) = result? {
                return Ok(Some(case));
            }
            let result = self.find_wildcard_match(ctx, map, view_id, from_action, outcome, to_flow_document_id);
            self.record(ctx, Strategy::WildcardMatch, outcome, &result);
            if let Some(case) = result? {
                return Ok(Some(case));
            }
        }
        let result = self.find_default_match(ctx, map, from_action, outcome, to_flow_document_id);
        self.record(ctx, Strategy::DefaultMatch, outcome, &result);
        result
    }

    fn with_current_flow(&self, ctx: &RequestContext, mut case: CaseStruct) -> CaseStruct {
        case.current_flow = self.flow_handler().current_flow(ctx);
        case.new_flow = FlowTarget::from_current(case.current_flow.clone());
        case
    }

    fn find_exact_match(
        &self,
        ctx: &mut RequestContext,
        map: &NavigationMap,
        view_id: &str,
        from_action: Option<&str>,
        outcome: Option<&str>,
        to_flow_document_id: &str,
    ) -> Resolved {
        let Some(cases) = map.get(view_id) else {
            return Ok(None);
        };
        let result = self.determine_view_from_action_outcome(cases, from_action, outcome, to_flow_document_id)?;
        Ok(result.map(|case| self.with_current_flow(ctx, case)))
    }

    fn find_wildcard_match(
        &self,
        ctx: &mut RequestContext,
        map: &NavigationMap,
        view_id: &str,
        from_action: Option<&str>,
        outcome: Option<&str>,
        to_flow_document_id: &str,
    ) -> Resolved {
        for prefix in map.wildcard_prefixes() {
            if !view_id.starts_with(prefix) {
                continue;
            }
            let Some(cases) = map.get(&format!("{}*", prefix)) else {
                return Ok(None);
            };
            if let Some(case) =
                self.determine_view_from_action_outcome(cases, from_action, outcome, to_flow_document_id)?
            {
                return Ok(Some(self.with_current_flow(ctx, case)));
            }
        }
        Ok(None)
    }

    fn find_default_match(
        &self,
        ctx: &mut RequestContext,
        map: &NavigationMap,
        from_action: Option<&str>,
        outcome: Option<&str>,
        to_flow_document_id: &str,
    ) -> Resolved {
        let Some(cases) = map.get("*") else {
            return Ok(None);
        };
        let result = self.determine_view_from_action_outcome(cases, from_action, outcome, to_flow_document_id)?;
        Ok(result.map(|case| self.with_current_flow(ctx, case)))
    }

    /// Picks the most specific applicable case whose condition is not false.
    fn determine_view_from_action_outcome(
        &self,
        cases: &[NavigationCase],
        from_action: Option<&str>,
        outcome: Option<&str>,
        to_flow_document_id: &str,
    ) -> Resolved {
        let el = self.evaluator();
        let candidates = cases
            .iter()
            .filter_map(|case| case_specificity(case, from_action, outcome).map(|tier| (tier, case)))
            .sorted_by_key(|(tier, _)| *tier);

        for (_, case) in candidates {
            if let Some(condition) = case.condition_expression() {
                let holds = case
                    .condition(el)
                    .map_err(|e| NavigationError::evaluation(condition, e))?;
                if holds == Some(false) {
                    continue;
                }
            }

            let view_id = case
                .to_view_id(el)
                .map_err(|e| NavigationError::evaluation(case.raw_to_view_id(), e))?;
            let mut result = CaseStruct::new(view_id, case.clone());
            if outcome.is_some() {
                let document_id = case.to_flow_document_id().unwrap_or(to_flow_document_id);
                let node_id = flow_or_node_id(&result.view_id);
                result.is_flow_entry_from_explicit_rule =
                    self.flow_handler().flow(document_id, node_id).is_some();
            }
            return Ok(Some(result));
        }
        Ok(None)
    }

    fn find_abandoned_flow_match(
        &self,
        ctx: &mut RequestContext,
        view_id: &str,
        from_action: Option<&str>,
        outcome: &str,
        to_flow_document_id: &str,
    ) -> Resolved {
        let root = self.registry.root();
        let mut case = self.find_exact_match(ctx, root, view_id, from_action, Some(outcome), to_flow_document_id)?;
        if case.is_none() {
            case = self.find_wildcard_match(ctx, root, view_id, from_action, Some(outcome), to_flow_document_id)?;
        }
        if case.is_none() {
            case = self.find_default_match(ctx, root, from_action, Some(outcome), to_flow_document_id)?;
        }
        Ok(case.map(|mut case| {
            case.new_flow = FlowTarget::Abandoned;
            case
        }))
    }

    fn find_implicit_match(
        &self,
        ctx: &mut RequestContext,
        view_id: &str,
        from_action: Option<&str>,
        outcome: &str,
        flow_document_id: &str,
    ) -> Resolved {
        let parsed = parse_outcome(outcome);
        if parsed.invalid_query {
            error!(outcome, "Invalid query string in navigation outcome");
            if self.application.is_development() {
                ctx.add_message(
                    Severity::Warn,
                    format!("Invalid query string in navigation outcome '{}'", outcome),
                );
            }
        }
        if parsed.view_id.is_empty() {
            return Ok(None);
        }

        let mut candidate = Some(resolve_view_id(&parsed.view_id, view_id));
        let current = self.flow_handler().current_flow(ctx);
        let mut new_flow = FlowTarget::from_current(current.clone());
        if let (Some(flow), Some(view)) = (&current, &candidate) {
            if !view.starts_with(&format!("/{}", flow.id())) {
                if flow_document_id == NULL_FLOW {
                    new_flow = FlowTarget::Outside;
                    candidate = None;
                } else {
                    new_flow = FlowTarget::Abandoned;
                }
            }
        }

        let Some(derived) = candidate.and_then(|view| self.view_handler().derive_view_id(ctx, &view)) else {
            return Ok(None);
        };

        let mut nav_case = NavigationCase::new(view_id, derived.clone())
            .with_from_outcome(outcome)
            .with_redirect(parsed.redirect)
            .with_include_view_params(parsed.include_view_params);
        if let Some(action) = from_action {
            nav_case = nav_case.with_from_action(action);
        }
        if current.is_some() || flow_document_id == NULL_FLOW {
            nav_case = nav_case.with_to_flow_document_id(flow_document_id);
        }
        if let Some(parameters) = parsed.parameters {
            nav_case = nav_case.with_parameters(parameters);
        }

        let mut result = CaseStruct::new(derived, nav_case);
        result.current_flow = current;
        result.new_flow = new_flow;
        Ok(Some(result))
    }

    fn find_view_node_match(&self, ctx: &mut RequestContext, from_action: &str, outcome: &str) -> Resolved {
        let Some(current) = self.flow_handler().current_flow(ctx) else {
            return Ok(None);
        };
        if !matches!(current.node(outcome), Some(FlowNode::View(_))) {
            return Ok(None);
        }
        let result = self.synthesize_case_struct(ctx, &current, Some(from_action), outcome)?;
        Ok(result.map(|mut case| {
            case.new_flow = FlowTarget::Within(current.clone());
            case.current_flow = Some(current);
            case.flow_call_node = None;
            case
        }))
    }

    fn find_switch_match(
        &self,
        ctx: &mut RequestContext,
        from_action: &str,
        outcome: &str,
        to_flow_document_id: &str,
    ) -> Resolved {
        self.guarded(ctx, Some(outcome), |ctx| {
            self.resolve_switch(ctx, from_action, outcome, to_flow_document_id)
        })
    }

    fn resolve_switch(
        &self,
        ctx: &mut RequestContext,
        from_action: &str,
        outcome: &str,
        to_flow_document_id: &str,
    ) -> Resolved {
        let current = self.flow_handler().current_flow(ctx);
        let info = self
            .flow_handler()
            .flow(to_flow_document_id, from_action)
            .and_then(|flow| self.registry.flow_info(flow.key()))
            .or_else(|| {
                current
                    .as_ref()
                    .and_then(|flow| self.registry.flow_info(flow.key()))
            });
        let Some(switch) = info.and_then(|info| info.switch(outcome)).cloned() else {
            return Ok(None);
        };

        let mut next = None;
        for case in &switch.cases {
            if self.evaluate_bool(&case.condition)? {
                next = Some(case.from_outcome.clone());
                break;
            }
        }
        if next.is_none() {
            if let Some(default_outcome) = &switch.default_outcome {
                next = self.evaluate_string(default_outcome)?;
            }
        }
        let Some(next) = next else {
            return Ok(None);
        };

        let (result, keeps_flow) = self.follow_node(ctx, current.as_ref(), from_action, &next, to_flow_document_id)?;
        let mut result = match result {
            Some(case) => Some(case),
            None => match self.flow_handler().flow(to_flow_document_id, from_action) {
                Some(flow) => self.synthesize_case_struct(ctx, &flow, Some(from_action), &next)?,
                None => match self.flow_handler().current_flow(ctx) {
                    Some(flow) => self.synthesize_case_struct(ctx, &flow, Some(from_action), &next)?,
                    None => None,
                },
            },
        };

        if let Some(case) = &mut result {
            if !keeps_flow {
                case.current_flow = current.clone();
                case.new_flow = if case.synthesized_return {
                    FlowTarget::Outside
                } else {
                    FlowTarget::from_current(current)
                };
            }
        }
        Ok(result)
    }

    /// Continues resolution at the node `outcome` names when it is a method
    /// call, switch or flow call. The flag is set for flow-call results, whose
    /// flow fields describe the callee.
    fn follow_node(
        &self,
        ctx: &mut RequestContext,
        current: Option<&Arc<Flow>>,
        from_action: &str,
        outcome: &str,
        to_flow_document_id: &str,
    ) -> Result<(Option<CaseStruct>, bool), NavigationError> {
        let Some(current) = current else {
            return Ok((None, false));
        };
        match current.node(outcome) {
            Some(FlowNode::MethodCall(_)) => Ok((
                self.find_method_call_match(ctx, from_action, outcome, to_flow_document_id)?,
                false,
            )),
            Some(FlowNode::Switch(_)) => Ok((
                self.find_switch_match(ctx, from_action, outcome, to_flow_document_id)?,
                false,
            )),
            Some(FlowNode::FlowCall(_)) => {
                let result = self.find_flow_call_match(ctx, Some(from_action), outcome, to_flow_document_id)?;
                let keeps_flow = result.is_some();
                Ok((result, keeps_flow))
            }
            _ => Ok((None, false)),
        }
    }

    fn find_method_call_match(
        &self,
        ctx: &mut RequestContext,
        from_action: &str,
        outcome: &str,
        to_flow_document_id: &str,
    ) -> Resolved {
        self.guarded(ctx, Some(outcome), |ctx| {
            self.resolve_method_call(ctx, from_action, outcome, to_flow_document_id)
        })
    }

    fn resolve_method_call(
        &self,
        ctx: &mut RequestContext,
        from_action: &str,
        outcome: &str,
        to_flow_document_id: &str,
    ) -> Resolved {
        let Some(current) = self.flow_handler().current_flow(ctx) else {
            return Ok(None);
        };
        let Some(FlowNode::MethodCall(node)) = current.node(outcome) else {
            return Ok(None);
        };

        let el = self.evaluator();
        let params = node
            .parameters
            .iter()
            .map(|p| el.value(&p.value).map_err(|e| NavigationError::evaluation(&p.value, e)))
            .collect::<Result<Vec<_>, _>>()?;
        let mut value = el
            .invoke(&node.method_expression, &params)
            .map_err(|e| NavigationError::evaluation(&node.method_expression, e))?;
        if value.is_null() {
            if let Some(fallback) = &node.outcome {
                value = el
                    .value(fallback)
                    .map_err(|e| NavigationError::evaluation(fallback, e))?;
            }
        }
        let Some(next) = value.as_string() else {
            warn!(
                node = %node.id,
                method = %node.method_expression,
                "Method call node produced no outcome"
            );
            return Ok(None);
        };

        if let (Some(case), _) = self.follow_node(ctx, Some(&current), from_action, &next, to_flow_document_id)? {
            return Ok(Some(case));
        }
        let result = self.synthesize_case_struct(ctx, &current, Some(from_action), &next)?;
        Ok(result.map(|mut case| {
            case.new_flow = if case.synthesized_return {
                FlowTarget::Outside
            } else {
                FlowTarget::Within(current.clone())
            };
            case.current_flow = Some(current);
            case
        }))
    }

    fn find_flow_call_match(
        &self,
        ctx: &mut RequestContext,
        from_action: Option<&str>,
        outcome: &str,
        to_flow_document_id: &str,
    ) -> Resolved {
        let current = self.flow_handler().current_flow(ctx);
        let mut result = None;
        let mut new_flow = None;
        let mut call_node = None;

        if let Some(current_flow) = &current {
            if let Some(FlowNode::FlowCall(call)) = current_flow.node(outcome) {
                let flow_id = self.evaluate_string(&call.called_flow_id)?;
                let document_id = self
                    .evaluate_string(&call.called_flow_document_id)?
                    .unwrap_or_default();
                if let Some(flow) = flow_id.and_then(|id| self.flow_handler().flow(&document_id, &id)) {
                    let start_node_id = flow.start_node_id().to_string();
                    result = self.synthesize_case_struct(ctx, &flow, from_action, &start_node_id)?;
                    if result.is_none() {
                        result = self.enter_flow_speculatively(
                            ctx,
                            Some(current_flow),
                            &flow,
                            Some(call),
                            from_action,
                            &start_node_id,
                            to_flow_document_id,
                        )?;
                    }
                    new_flow = Some(flow);
                }
                call_node = Some(call.clone());
            }
        } else if let Some(flow) = self.flow_handler().flow(to_flow_document_id, outcome) {
            let start_node_id = flow.start_node_id().to_string();
            result = match self.synthesize_case_struct(ctx, &flow, from_action, &start_node_id)? {
                None => self.enter_flow_speculatively(
                    ctx,
                    None,
                    &flow,
                    None,
                    from_action,
                    &start_node_id,
                    to_flow_document_id,
                )?,
                Some(mut case) => {
                    if outcome != start_node_id {
                        case.nav_case = case.nav_case.with_from_outcome(outcome);
                    }
                    Some(case)
                }
            };
            new_flow = Some(flow);
        }

        Ok(result.map(|mut case| {
            case.current_flow = current;
            case.new_flow = FlowTarget::from_current(new_flow);
            case.flow_call_node = call_node;
            case
        }))
    }

    /// Enters `flow`, then resolves its start node inside it. Without a result
    /// the flow state is restored.
    #[allow(clippy::too_many_arguments)]
    fn enter_flow_speculatively(
        &self,
        ctx: &mut RequestContext,
        source: Option<&Arc<Flow>>,
        flow: &Arc<Flow>,
        call_node: Option<&FlowCallNode>,
        from_action: Option<&str>,
        start_node_id: &str,
        to_flow_document_id: &str,
    ) -> Resolved {
        let fh = self.flow_handler();
        let checkpoint = fh.checkpoint(ctx);
        ctx.attributes.did_transition = true;

        let target = FlowTarget::Within(flow.clone());
        let attempt = match fh.transition(ctx, source, &target, call_node, start_node_id) {
            Ok(()) => self.get_view_id(ctx, from_action, Some(start_node_id), to_flow_document_id),
            Err(e) => Err(e),
        };

        match attempt {
            Ok(Some(case)) => Ok(Some(case)),
            other => {
                fh.rollback(ctx, checkpoint);
                ctx.attributes.did_transition = false;
                other
            }
        }
    }

    fn find_return_match(&self, ctx: &mut RequestContext, from_action: Option<&str>, outcome: &str) -> Resolved {
        let Some(current) = self.flow_handler().current_flow(ctx) else {
            return Ok(None);
        };
        let Some(node) = current.return_node(outcome) else {
            return Ok(None);
        };
        let from_outcome = self.evaluate_string(&node.from_outcome)?;

        let fh = self.flow_handler();
        fh.push_return_mode(ctx);
        let result = self.resolve_return(ctx, from_action, outcome, from_outcome.as_deref());
        fh.pop_return_mode(ctx);

        Ok(result?.map(|(mut case, _)| {
            if case.flow_call_node.is_none() {
                case.current_flow = Some(current);
                case.new_flow = FlowTarget::Outside;
            }
            case
        }))
    }

    /// Resolves a return node's outcome in return mode, falling back to the view
    /// last displayed by the calling flow. The flag is `true` when the outcome
    /// itself resolved.
    fn resolve_return(
        &self,
        ctx: &mut RequestContext,
        from_action: Option<&str>,
        outcome: &str,
        from_outcome: Option<&str>,
    ) -> Result<Option<(CaseStruct, bool)>, NavigationError> {
        if let Some(case) = self.get_view_id(ctx, from_action, from_outcome, NULL_FLOW)? {
            return Ok(Some((case, true)));
        }

        let fh = self.flow_handler();
        if fh.current_flow(ctx).is_none() {
            return Ok(None);
        }
        let Some(to_view_id) = fh.last_displayed_view_id(ctx) else {
            return Ok(None);
        };
        let mut nav_case = NavigationCase::new(ctx.view_id().unwrap_or_default(), to_view_id.clone())
            .with_from_outcome(outcome)
            .with_to_flow_document_id(NULL_FLOW);
        if let Some(action) = from_action {
            nav_case = nav_case.with_from_action(action);
        }
        Ok(Some((CaseStruct::new(to_view_id, nav_case), false)))
    }

    /// Builds a case for `outcome` straight from the nodes of `flow`.
    fn synthesize_case_struct(
        &self,
        ctx: &mut RequestContext,
        flow: &Arc<Flow>,
        from_action: Option<&str>,
        outcome: &str,
    ) -> Resolved {
        match flow.node(outcome) {
            Some(FlowNode::View(node)) => {
                let view_id = node.vdl_document_id.clone();
                let mut nav_case = NavigationCase::new(from_action.unwrap_or_default(), view_id.clone())
                    .with_from_outcome(outcome)
                    .with_to_flow_document_id(flow.defining_document_id());
                if let Some(action) = from_action {
                    nav_case = nav_case.with_from_action(action);
                }
                Ok(Some(CaseStruct::new(view_id, nav_case)))
            }
            Some(FlowNode::Return(node)) => {
                let from_outcome = self.evaluate_string(&node.from_outcome)?;
                let fh = self.flow_handler();
                fh.push_return_mode(ctx);
                let result = self.synthesize_return(ctx, flow, from_action, outcome, from_outcome.as_deref());
                fh.pop_return_mode(ctx);
                result
            }
            Some(_) => Ok(None),
            None => {
                let candidate = flow_view_id(flow.id(), outcome);
                let Some(view_id) = self.view_handler().derive_view_id(ctx, &candidate) else {
                    return Ok(None);
                };
                let mut nav_case = NavigationCase::new(from_action.unwrap_or_default(), view_id.clone())
                    .with_from_outcome(outcome);
                if let Some(action) = from_action {
                    nav_case = nav_case.with_from_action(action);
                }
                Ok(Some(CaseStruct::new(view_id, nav_case)))
            }
        }
    }

    fn synthesize_return(
        &self,
        ctx: &mut RequestContext,
        flow: &Arc<Flow>,
        from_action: Option<&str>,
        outcome: &str,
        from_outcome: Option<&str>,
    ) -> Resolved {
        match self.resolve_return(ctx, from_action, outcome, from_outcome)? {
            Some((mut case, true)) => {
                self.flow_handler()
                    .transition(ctx, Some(flow), &FlowTarget::Outside, None, &case.view_id)?;
                ctx.attributes.did_transition = true;
                case.synthesized_return = true;
                Ok(Some(case))
            }
            Some((case, false)) => Ok(Some(case)),
            None => Ok(None),
        }
    }

    fn evaluate_bool(&self, expression: &str) -> Result<bool, NavigationError> {
        let value = self
            .evaluator()
            .value(expression)
            .map_err(|e| NavigationError::evaluation(expression, e))?;
        Ok(value.as_bool().unwrap_or(false))
    }

    fn evaluate_string(&self, expression: &str) -> Result<Option<String>, NavigationError> {
        let value = self
            .evaluator()
            .value(expression)
            .map_err(|e| NavigationError::evaluation(expression, e))?;
        Ok(value.as_string())
    }
}
