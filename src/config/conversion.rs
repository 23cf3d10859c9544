use super::definition::{
    CaseDefinition, FlowDefinition, NavigationDocument, ParameterDefinition, RuleDefinition,
};
use crate::case::{NavigationCase, NavigationRule, Parameters};
use crate::el::{is_expression, is_mixed_expression};
use crate::error::ConfigError;
use crate::flow::{
    Flow, FlowCallNode, FlowNode, FlowRegistry, MethodCallNode, Parameter, ReturnNode, SwitchCase,
    SwitchNode, ViewNode,
};
use ahash::AHashSet;
use std::path::Path;
use tracing::{debug, warn};

/// The canonical navigation model: root rules and the flows that own their own.
#[derive(Debug, Clone, Default)]
pub struct NavigationConfig {
    pub rules: Vec<NavigationRule>,
    pub flows: FlowRegistry,
}

impl NavigationConfig {
    /// Parses and normalises a JSON [`NavigationDocument`].
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let document: NavigationDocument =
            serde_json::from_str(json).map_err(|e| ConfigError::JsonParseError(e.to_string()))?;
        document.into_navigation()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&json)
    }
}

/// A trait for configuration formats that can be converted into a [`NavigationConfig`].
///
/// Implement it on the structs your own format deserializes into; the handler
/// builder only ever sees the canonical model.
///
/// # Example
///
/// ```rust,no_run
/// use michi::case::{NavigationCase, NavigationRule};
/// use michi::config::{IntoNavigation, NavigationConfig};
/// use michi::error::ConfigError;
///
/// // A format that only knows "outcome -> page" pairs.
/// struct SiteMap {
///     pages: Vec<(String, String)>,
/// }
///
/// impl IntoNavigation for SiteMap {
///     fn into_navigation(self) -> Result<NavigationConfig, ConfigError> {
///         let rule = self.pages.into_iter().fold(NavigationRule::new("*"), |rule, (outcome, page)| {
///             rule.case(NavigationCase::new("*", page).with_from_outcome(outcome))
///         });
///         Ok(NavigationConfig { rules: vec![rule], ..NavigationConfig::default() })
///     }
/// }
/// ```
pub trait IntoNavigation {
    /// Consumes the object and converts it into the canonical navigation model.
    fn into_navigation(self) -> Result<NavigationConfig, ConfigError>;
}

impl IntoNavigation for NavigationConfig {
    fn into_navigation(self) -> Result<NavigationConfig, ConfigError> {
        Ok(self)
    }
}

impl IntoNavigation for NavigationDocument {
    fn into_navigation(self) -> Result<NavigationConfig, ConfigError> {
        let rules = self.navigation_rules.into_iter().map(convert_rule).collect();
        let mut flows = FlowRegistry::new();
        for definition in self.flows {
            flows.add(convert_flow(definition)?)?;
        }
        debug!(flows = flows.len(), "Converted navigation document");
        Ok(NavigationConfig { rules, flows })
    }
}

fn convert_rule(rule: RuleDefinition) -> NavigationRule {
    let from_view_id = match rule.from_view_id {
        Some(id) if !id.is_empty() => id,
        _ => "*".to_string(),
    };
    let from_view_id = if from_view_id.starts_with('/') || from_view_id.starts_with('*') {
        from_view_id
    } else {
        warn!(
            from_view_id = %from_view_id,
            "from-view-id does not start with '/', prepending one"
        );
        format!("/{}", from_view_id)
    };

    rule.cases
        .into_iter()
        .fold(NavigationRule::new(from_view_id.as_str()), |rule, case| {
            let case = convert_case(&from_view_id, case);
            rule.case(case)
        })
}

fn convert_case(from_view_id: &str, definition: CaseDefinition) -> NavigationCase {
    let to_view_id = definition.to_view_id.trim().to_string();
    let to_view_id = if to_view_id.starts_with('/') || to_view_id.starts_with('#') {
        to_view_id
    } else {
        warn!(
            to_view_id = %to_view_id,
            from_view_id,
            "to-view-id does not start with '/', prepending one"
        );
        format!("/{}", to_view_id)
    };

    let mut case = NavigationCase::new(from_view_id, to_view_id);
    if let Some(action) = definition.from_action {
        case = case.with_from_action(action);
    }
    if let Some(outcome) = definition.from_outcome {
        case = case.with_from_outcome(outcome);
    }
    if let Some(condition) = definition.condition {
        if is_expression(&condition) && !is_mixed_expression(&condition) {
            case = case.with_condition(condition);
        } else {
            warn!(
                condition = %condition,
                from_view_id,
                "Ignoring 'if' that is not a single expression"
            );
        }
    }
    if let Some(document_id) = definition.to_flow_document_id {
        case = case.with_to_flow_document_id(document_id);
    }
    if let Some(redirect) = definition.redirect {
        case = case
            .with_redirect(true)
            .with_include_view_params(redirect.include_view_params);
        if !redirect.parameters.is_empty() {
            let parameters: Parameters = redirect
                .parameters
                .into_iter()
                .map(|p| (p.name, p.value))
                .collect();
            case = case.with_parameters(parameters);
        }
    }
    case
}

fn convert_parameters(parameters: Vec<ParameterDefinition>) -> Vec<Parameter> {
    parameters
        .into_iter()
        .map(|p| Parameter::new(p.name, p.value))
        .collect()
}

fn convert_flow(definition: FlowDefinition) -> Result<Flow, ConfigError> {
    let flow_id = definition.id.trim().to_string();
    if flow_id.is_empty() {
        return Err(ConfigError::EmptyFlowId(definition.defining_document_id));
    }

    let invalid = |node_id: &str, message: &str| ConfigError::InvalidNode {
        flow_id: flow_id.clone(),
        node_id: node_id.to_string(),
        message: message.to_string(),
    };

    let mut nodes = Vec::new();
    for view in definition.views {
        if view.vdl_document_id.is_empty() {
            return Err(invalid(&view.id, "a view node needs a vdlDocumentId"));
        }
        let vdl_document_id = if view.vdl_document_id.starts_with('/') {
            view.vdl_document_id
        } else {
            format!("/{}", view.vdl_document_id)
        };
        nodes.push(FlowNode::View(ViewNode {
            id: view.id,
            vdl_document_id,
        }));
    }
    for switch in definition.switches {
        nodes.push(FlowNode::Switch(SwitchNode {
            id: switch.id,
            cases: switch
                .cases
                .into_iter()
                .map(|c| SwitchCase {
                    condition: c.condition,
                    from_outcome: c.from_outcome,
                })
                .collect(),
            default_outcome: switch.default_outcome,
        }));
    }
    for call in definition.method_calls {
        if !is_expression(&call.method) {
            return Err(invalid(&call.id, "method must be a method expression"));
        }
        nodes.push(FlowNode::MethodCall(MethodCallNode {
            id: call.id,
            method_expression: call.method,
            parameters: convert_parameters(call.parameters),
            outcome: call.default_outcome,
        }));
    }
    for call in definition.flow_calls {
        if call.called_flow_id.is_empty() {
            return Err(invalid(&call.id, "a flow-call node needs a calledFlowId"));
        }
        nodes.push(FlowNode::FlowCall(FlowCallNode {
            id: call.id,
            called_flow_id: call.called_flow_id,
            called_flow_document_id: call.called_flow_document_id,
            outbound_parameters: convert_parameters(call.outbound_parameters),
        }));
    }
    for node in definition.returns {
        nodes.push(FlowNode::Return(ReturnNode {
            id: node.id,
            from_outcome: node.from_outcome,
        }));
    }

    let mut seen = AHashSet::new();
    for node in &nodes {
        if node.id().is_empty() {
            return Err(invalid("", "node id may not be empty"));
        }
        if !seen.insert(node.id().to_string()) {
            return Err(ConfigError::DuplicateNode {
                flow_id: flow_id.clone(),
                node_id: node.id().to_string(),
            });
        }
    }

    let mut flow = Flow::new(definition.defining_document_id, flow_id.as_str());
    if let Some(start) = definition.start_node {
        if start.trim().is_empty() {
            return Err(invalid(&start, "startNode may not be empty"));
        }
        flow = flow.with_start_node(start);
    }
    flow = nodes.into_iter().fold(flow, Flow::with_node);
    flow = definition
        .navigation_rules
        .into_iter()
        .map(convert_rule)
        .fold(flow, Flow::with_navigation_rule);
    flow = convert_parameters(definition.inbound_parameters)
        .into_iter()
        .fold(flow, Flow::with_inbound_parameter);
    if let Some(initializer) = definition.initializer {
        flow = flow.with_initializer(initializer);
    }
    if let Some(finalizer) = definition.finalizer {
        flow = flow.with_finalizer(finalizer);
    }
    Ok(flow)
}
