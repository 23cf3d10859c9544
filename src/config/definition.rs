use serde::Deserialize;

/// A navigation document: root rules plus flow definitions.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct NavigationDocument {
    #[serde(default)]
    #[serde(alias = "navigationRules")]
    pub navigation_rules: Vec<RuleDefinition>,
    #[serde(default)]
    pub flows: Vec<FlowDefinition>,
}

/// A `<navigation-rule>`; a missing from-view-id applies to every view.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RuleDefinition {
    #[serde(alias = "fromViewId")]
    pub from_view_id: Option<String>,
    #[serde(default)]
    pub cases: Vec<CaseDefinition>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct CaseDefinition {
    #[serde(alias = "fromAction")]
    pub from_action: Option<String>,
    #[serde(alias = "fromOutcome")]
    pub from_outcome: Option<String>,
    #[serde(rename = "if")]
    pub condition: Option<String>,
    #[serde(alias = "toViewId")]
    pub to_view_id: String,
    #[serde(alias = "toFlowDocumentId")]
    pub to_flow_document_id: Option<String>,
    pub redirect: Option<RedirectDefinition>,
}

/// Present when the case redirects.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RedirectDefinition {
    #[serde(default)]
    #[serde(alias = "includeViewParams")]
    pub include_view_params: bool,
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ParameterDefinition {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct FlowDefinition {
    pub id: String,
    #[serde(default)]
    #[serde(alias = "definingDocumentId")]
    pub defining_document_id: String,
    #[serde(alias = "startNode")]
    pub start_node: Option<String>,
    #[serde(default)]
    pub views: Vec<ViewDefinition>,
    #[serde(default)]
    pub switches: Vec<SwitchDefinition>,
    #[serde(default)]
    #[serde(alias = "methodCalls")]
    pub method_calls: Vec<MethodCallDefinition>,
    #[serde(default)]
    #[serde(alias = "flowCalls")]
    pub flow_calls: Vec<FlowCallDefinition>,
    #[serde(default)]
    pub returns: Vec<ReturnDefinition>,
    #[serde(default)]
    #[serde(alias = "navigationRules")]
    pub navigation_rules: Vec<RuleDefinition>,
    #[serde(default)]
    #[serde(alias = "inboundParameters")]
    pub inbound_parameters: Vec<ParameterDefinition>,
    pub initializer: Option<String>,
    pub finalizer: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ViewDefinition {
    pub id: String,
    #[serde(alias = "vdlDocumentId")]
    pub vdl_document_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SwitchDefinition {
    pub id: String,
    #[serde(default)]
    pub cases: Vec<SwitchCaseDefinition>,
    #[serde(alias = "defaultOutcome")]
    pub default_outcome: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SwitchCaseDefinition {
    #[serde(rename = "if")]
    pub condition: String,
    #[serde(alias = "fromOutcome")]
    pub from_outcome: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MethodCallDefinition {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub parameters: Vec<ParameterDefinition>,
    /// Used when the method returns null.
    #[serde(alias = "defaultOutcome")]
    pub default_outcome: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FlowCallDefinition {
    pub id: String,
    #[serde(alias = "calledFlowId")]
    pub called_flow_id: String,
    #[serde(default)]
    #[serde(alias = "calledFlowDocumentId")]
    pub called_flow_document_id: String,
    #[serde(default)]
    #[serde(alias = "outboundParameters")]
    pub outbound_parameters: Vec<ParameterDefinition>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReturnDefinition {
    pub id: String,
    #[serde(alias = "fromOutcome")]
    pub from_outcome: String,
}
