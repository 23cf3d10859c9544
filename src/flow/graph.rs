use crate::case::NavigationRule;
use ahash::AHashMap;
use std::fmt;
use std::sync::Arc;

/// Identity of a flow: the document that defines it plus its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowKey {
    pub document_id: String,
    pub flow_id: String,
}

impl FlowKey {
    pub fn new(document_id: impl Into<String>, flow_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            flow_id: flow_id.into(),
        }
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.document_id.is_empty() {
            write!(f, "{}", self.flow_id)
        } else {
            write!(f, "{}#{}", self.document_id, self.flow_id)
        }
    }
}

/// A name/value-expression pair used for method arguments and flow parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewNode {
    pub id: String,
    pub vdl_document_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchCase {
    pub condition: String,
    pub from_outcome: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchNode {
    pub id: String,
    pub cases: Vec<SwitchCase>,
    pub default_outcome: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCallNode {
    pub id: String,
    pub method_expression: String,
    pub parameters: Vec<Parameter>,
    /// Consulted when the method returns null.
    pub outcome: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowCallNode {
    pub id: String,
    pub called_flow_id: String,
    pub called_flow_document_id: String,
    pub outbound_parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnNode {
    pub id: String,
    pub from_outcome: String,
}

/// A node of a flow graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowNode {
    View(ViewNode),
    Switch(SwitchNode),
    MethodCall(MethodCallNode),
    FlowCall(FlowCallNode),
    Return(ReturnNode),
}

impl FlowNode {
    pub fn id(&self) -> &str {
        match self {
            FlowNode::View(n) => &n.id,
            FlowNode::Switch(n) => &n.id,
            FlowNode::MethodCall(n) => &n.id,
            FlowNode::FlowCall(n) => &n.id,
            FlowNode::Return(n) => &n.id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FlowNode::View(_) => "view",
            FlowNode::Switch(_) => "switch",
            FlowNode::MethodCall(_) => "method-call",
            FlowNode::FlowCall(_) => "flow-call",
            FlowNode::Return(_) => "flow-return",
        }
    }
}

/// A read-only flow definition: its nodes, its own navigation rules and its
/// parameter and lifecycle hooks.
#[derive(Debug, Clone)]
pub struct Flow {
    key: FlowKey,
    start_node_id: Option<String>,
    nodes: Vec<FlowNode>,
    index: AHashMap<String, usize>,
    navigation_rules: Vec<NavigationRule>,
    inbound_parameters: Vec<Parameter>,
    initializer: Option<String>,
    finalizer: Option<String>,
}

impl Flow {
    pub fn new(document_id: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            key: FlowKey::new(document_id, id),
            start_node_id: None,
            nodes: Vec::new(),
            index: AHashMap::new(),
            navigation_rules: Vec::new(),
            inbound_parameters: Vec::new(),
            initializer: None,
            finalizer: None,
        }
    }

    pub fn with_start_node(mut self, node_id: impl Into<String>) -> Self {
        self.start_node_id = Some(node_id.into());
        self
    }

    /// Adds a node; a node with the same id replaces the earlier one.
    pub fn with_node(mut self, node: FlowNode) -> Self {
        match self.index.get(node.id()) {
            Some(&pos) => self.nodes[pos] = node,
            None => {
                self.index.insert(node.id().to_string(), self.nodes.len());
                self.nodes.push(node);
            }
        }
        self
    }

    pub fn with_navigation_rule(mut self, rule: NavigationRule) -> Self {
        self.navigation_rules.push(rule);
        self
    }

    pub fn with_inbound_parameter(mut self, parameter: Parameter) -> Self {
        self.inbound_parameters.push(parameter);
        self
    }

    pub fn with_initializer(mut self, method_expression: impl Into<String>) -> Self {
        self.initializer = Some(method_expression.into());
        self
    }

    pub fn with_finalizer(mut self, method_expression: impl Into<String>) -> Self {
        self.finalizer = Some(method_expression.into());
        self
    }

    pub fn into_shared(self) -> Arc<Flow> {
        Arc::new(self)
    }

    pub fn key(&self) -> &FlowKey {
        &self.key
    }

    pub fn defining_document_id(&self) -> &str {
        &self.key.document_id
    }

    pub fn id(&self) -> &str {
        &self.key.flow_id
    }

    /// The configured start node, or the flow id when none was declared.
    pub fn start_node_id(&self) -> &str {
        self.start_node_id.as_deref().unwrap_or(&self.key.flow_id)
    }

    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.index.get(id).map(|&pos| &self.nodes[pos])
    }

    pub fn nodes(&self) -> &[FlowNode] {
        &self.nodes
    }

    pub fn navigation_rules(&self) -> &[NavigationRule] {
        &self.navigation_rules
    }

    pub fn switches(&self) -> impl Iterator<Item = &SwitchNode> {
        self.nodes.iter().filter_map(|node| match node {
            FlowNode::Switch(switch) => Some(switch),
            _ => None,
        })
    }

    pub fn returns(&self) -> impl Iterator<Item = &ReturnNode> {
        self.nodes.iter().filter_map(|node| match node {
            FlowNode::Return(ret) => Some(ret),
            _ => None,
        })
    }

    pub fn return_node(&self, id: &str) -> Option<&ReturnNode> {
        match self.node(id) {
            Some(FlowNode::Return(ret)) => Some(ret),
            _ => None,
        }
    }

    /// The flow-call node of this flow that calls `target`, if any.
    pub fn flow_call(&self, target: &Flow) -> Option<&FlowCallNode> {
        self.nodes.iter().find_map(|node| match node {
            FlowNode::FlowCall(call)
                if call.called_flow_id == target.id()
                    && call.called_flow_document_id == target.defining_document_id() =>
            {
                Some(call)
            }
            _ => None,
        })
    }

    pub fn inbound_parameters(&self) -> &[Parameter] {
        &self.inbound_parameters
    }

    pub fn inbound_parameter(&self, name: &str) -> Option<&Parameter> {
        self.inbound_parameters.iter().find(|p| p.name == name)
    }

    pub fn initializer(&self) -> Option<&str> {
        self.initializer.as_deref()
    }

    pub fn finalizer(&self) -> Option<&str> {
        self.finalizer.as_deref()
    }
}

impl PartialEq for Flow {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Flow {}

/// Where a navigation leaves the flow stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowTarget {
    /// No flow is active afterwards.
    Outside,
    Within(Arc<Flow>),
    /// The active flows were left without passing a return node.
    Abandoned,
}

impl FlowTarget {
    pub fn from_current(flow: Option<Arc<Flow>>) -> Self {
        match flow {
            Some(flow) => FlowTarget::Within(flow),
            None => FlowTarget::Outside,
        }
    }

    pub fn flow(&self) -> Option<&Arc<Flow>> {
        match self {
            FlowTarget::Within(flow) => Some(flow),
            _ => None,
        }
    }

    /// Whether moving from `current` to this target leaves the flow stack untouched.
    pub fn is_same_as(&self, current: Option<&Flow>) -> bool {
        match (self, current) {
            (FlowTarget::Outside, None) => true,
            (FlowTarget::Within(target), Some(current)) => target.as_ref() == current,
            _ => false,
        }
    }
}

impl fmt::Display for FlowTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowTarget::Outside => write!(f, "<none>"),
            FlowTarget::Within(flow) => write!(f, "{}", flow.key()),
            FlowTarget::Abandoned => write!(f, "<abandoned>"),
        }
    }
}
