//! Outcome strings read as view ids.

use crate::case::Parameters;
use tracing::info;

const FACES_REDIRECT: &str = "faces-redirect=true";
const INCLUDE_VIEW_PARAMS: &str = "includeViewParams=true";

/// An outcome split into its view id fragment and query string settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImplicitOutcome {
    pub view_id: String,
    pub parameters: Option<Parameters>,
    pub redirect: bool,
    pub include_view_params: bool,
    /// The outcome ended with a bare `?`.
    pub invalid_query: bool,
}

/// Splits `outcome` at `?` and parses the query string.
///
/// `faces-redirect=true` and `includeViewParams=true` become flags. The rest is
/// split on `&amp;` or `&` into `name=value` pairs; elements without `=` are
/// skipped and values carrying an expression are replaced by `""`.
pub fn parse_outcome(outcome: &str) -> ImplicitOutcome {
    let Some((view_id, query)) = outcome.split_once('?') else {
        return ImplicitOutcome {
            view_id: outcome.to_string(),
            ..ImplicitOutcome::default()
        };
    };

    let mut parsed = ImplicitOutcome {
        view_id: view_id.to_string(),
        ..ImplicitOutcome::default()
    };
    if query.is_empty() {
        parsed.invalid_query = true;
        return parsed;
    }

    let mut query = query.to_string();
    if query.contains(FACES_REDIRECT) {
        parsed.redirect = true;
        query = query.replace(FACES_REDIRECT, "");
    }
    if query.contains(INCLUDE_VIEW_PARAMS) {
        parsed.include_view_params = true;
        query = query.replace(INCLUDE_VIEW_PARAMS, "");
    }

    let mut parameters: Option<Parameters> = None;
    for element in query.replace("&amp;", "&").split('&') {
        let Some((name, value)) = element.split_once('=') else {
            continue;
        };
        parameters
            .get_or_insert_with(Parameters::new)
            .add(name, sanitize_query_value(value));
    }
    parsed.parameters = parameters;
    parsed
}

/// Returns `""` for a query value that carries an expression, the value otherwise.
pub fn sanitize_query_value(value: &str) -> String {
    let check = if value.len() > 2 { value.trim() } else { "" };
    if check.contains("#{") || check.contains("${") {
        info!(value, "Dropping expression from navigation query string");
        return String::new();
    }
    value.to_string()
}

/// Completes a view id fragment against the current view.
///
/// A fragment without an extension takes the current view's extension; a
/// relative fragment is placed in the current view's directory.
pub fn resolve_view_id(fragment: &str, current_view_id: &str) -> String {
    let mut view_id = fragment.to_string();
    if !fragment.contains('.') {
        if let Some(idx) = current_view_id.rfind('.') {
            view_id.push_str(&current_view_id[idx..]);
        }
    }
    if !fragment.starts_with('/') {
        let directory = current_view_id
            .rfind('/')
            .map(|idx| &current_view_id[..=idx])
            .unwrap_or("/");
        view_id.insert_str(0, directory);
    }
    view_id
}

/// The last path segment of a view id, naming a flow or a flow node.
pub fn flow_or_node_id(view_id: &str) -> &str {
    view_id.rsplit('/').next().unwrap_or(view_id)
}

/// The implicit view of `outcome` inside the flow `flow_id`.
pub fn flow_view_id(flow_id: &str, outcome: &str) -> String {
    if outcome.contains('.') {
        format!("/{}/{}", flow_id, outcome)
    } else {
        format!("/{}/{}.xhtml", flow_id, outcome)
    }
}
