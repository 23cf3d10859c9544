use super::Parameters;
use crate::el::{ExpressionEvaluator, is_expression};
use crate::error::ElError;
use std::fmt;
use std::hash::{Hash, Hasher};

/// An immutable navigation rule entry.
///
/// Two cases are equal when every field except `include_view_params` is equal.
#[derive(Debug, Clone)]
pub struct NavigationCase {
    from_view_id: String,
    from_action: Option<String>,
    from_outcome: Option<String>,
    condition: Option<String>,
    to_view_id: String,
    to_flow_document_id: Option<String>,
    parameters: Option<Parameters>,
    redirect: bool,
    include_view_params: bool,
}

impl NavigationCase {
    pub fn new(from_view_id: impl Into<String>, to_view_id: impl Into<String>) -> Self {
        Self {
            from_view_id: from_view_id.into(),
            from_action: None,
            from_outcome: None,
            condition: None,
            to_view_id: to_view_id.into(),
            to_flow_document_id: None,
            parameters: None,
            redirect: false,
            include_view_params: false,
        }
    }

    pub fn with_from_action(mut self, from_action: impl Into<String>) -> Self {
        self.from_action = Some(from_action.into());
        self
    }

    /// Returns this case answering to a different outcome.
    pub fn with_from_outcome(mut self, from_outcome: impl Into<String>) -> Self {
        self.from_outcome = Some(from_outcome.into());
        self
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_to_flow_document_id(mut self, document_id: impl Into<String>) -> Self {
        self.to_flow_document_id = Some(document_id.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn with_redirect(mut self, redirect: bool) -> Self {
        self.redirect = redirect;
        self
    }

    pub fn with_include_view_params(mut self, include_view_params: bool) -> Self {
        self.include_view_params = include_view_params;
        self
    }

    pub fn from_view_id(&self) -> &str {
        &self.from_view_id
    }

    pub fn from_action(&self) -> Option<&str> {
        self.from_action.as_deref()
    }

    pub fn from_outcome(&self) -> Option<&str> {
        self.from_outcome.as_deref()
    }

    pub fn condition_expression(&self) -> Option<&str> {
        self.condition.as_deref()
    }

    pub fn has_condition(&self) -> bool {
        self.condition.is_some()
    }

    /// Evaluates the condition; `None` when there is none or it evaluated to null.
    pub fn condition(&self, el: &dyn ExpressionEvaluator) -> Result<Option<bool>, ElError> {
        match &self.condition {
            Some(expression) => Ok(el.value(expression)?.as_bool()),
            None => Ok(None),
        }
    }

    /// The configured target, unevaluated.
    pub fn raw_to_view_id(&self) -> &str {
        &self.to_view_id
    }

    /// The target view id, evaluated when it is an expression and always starting with `/`.
    pub fn to_view_id(&self, el: &dyn ExpressionEvaluator) -> Result<String, ElError> {
        let view_id = if is_expression(&self.to_view_id) {
            el.value(&self.to_view_id)?.as_string().unwrap_or_default()
        } else {
            self.to_view_id.clone()
        };
        if view_id.starts_with('/') {
            Ok(view_id)
        } else {
            Ok(format!("/{}", view_id))
        }
    }

    pub fn to_flow_document_id(&self) -> Option<&str> {
        self.to_flow_document_id.as_deref()
    }

    pub fn parameters(&self) -> Option<&Parameters> {
        self.parameters.as_ref()
    }

    pub fn is_redirect(&self) -> bool {
        self.redirect
    }

    pub fn is_include_view_params(&self) -> bool {
        self.include_view_params
    }
}

impl PartialEq for NavigationCase {
    fn eq(&self, other: &Self) -> bool {
        self.from_view_id == other.from_view_id
            && self.from_action == other.from_action
            && self.from_outcome == other.from_outcome
            && self.condition == other.condition
            && self.to_view_id == other.to_view_id
            && self.to_flow_document_id == other.to_flow_document_id
            && self.parameters == other.parameters
            && self.redirect == other.redirect
    }
}

impl Eq for NavigationCase {}

impl Hash for NavigationCase {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.from_view_id.hash(state);
        self.from_action.hash(state);
        self.from_outcome.hash(state);
        self.condition.hash(state);
        self.to_view_id.hash(state);
        self.to_flow_document_id.hash(state);
        self.parameters.hash(state);
        self.redirect.hash(state);
    }
}

impl fmt::Display for NavigationCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "NavigationCase{{fromViewId='{}', fromAction='{}', fromOutcome='{}', if='{}', toViewId='{}', toFlowDocumentId='{}', redirect={}, includeViewParams={}}}",
            self.from_view_id,
            self.from_action.as_deref().unwrap_or(""),
            self.from_outcome.as_deref().unwrap_or(""),
            self.condition.as_deref().unwrap_or(""),
            self.to_view_id,
            self.to_flow_document_id.as_deref().unwrap_or(""),
            self.redirect,
            self.include_view_params,
        )
    }
}

/// All cases sharing one from-view-id pattern, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationRule {
    pub from_view_id: String,
    pub cases: Vec<NavigationCase>,
}

impl NavigationRule {
    pub fn new(from_view_id: impl Into<String>) -> Self {
        Self {
            from_view_id: from_view_id.into(),
            cases: Vec::new(),
        }
    }

    /// Adds a case, rebuilding it under this rule's from-view-id.
    pub fn case(mut self, case: NavigationCase) -> Self {
        let case = NavigationCase {
            from_view_id: self.from_view_id.clone(),
            ..case
        };
        self.cases.push(case);
        self
    }
}
