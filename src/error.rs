use crate::el::Value;
use thiserror::Error;

/// Errors that can occur while loading or normalising navigation configuration.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Failed to parse navigation document: {0}")]
    JsonParseError(String),

    #[error("Could not read navigation document '{path}': {message}")]
    Io { path: String, message: String },

    #[error("The id of a flow may not be empty (defining document '{0}')")]
    EmptyFlowId(String),

    #[error("Flow with id '{flow_id}' and definingDocumentId '{document_id}' already exists")]
    DuplicateFlow {
        document_id: String,
        flow_id: String,
    },

    #[error("Node '{node_id}' is declared more than once in flow '{flow_id}'")]
    DuplicateNode { flow_id: String, node_id: String },

    #[error("Invalid definition for node '{node_id}' in flow '{flow_id}': {message}")]
    InvalidNode {
        flow_id: String,
        node_id: String,
        message: String,
    },
}

/// Errors raised by the expression layer.
#[derive(Error, Debug, Clone)]
pub enum ElError {
    #[error("Syntax error in expression '{expression}': {message}")]
    Syntax { expression: String, message: String },

    #[error(
        "Type mismatch during operation '{operation}': expected {expected}, but found value '{found}'"
    )]
    TypeMismatch {
        operation: String,
        expected: String,
        found: Value,
    },

    #[error("No method is bound to expression '{0}'")]
    MethodNotFound(String),

    #[error("Method expression '{expression}' failed: {message}")]
    MethodFailed { expression: String, message: String },

    #[error("Expression '{0}' cannot be assigned to")]
    NotAssignable(String),
}

/// Errors that abort a navigation attempt.
///
/// An unresolvable outcome is not an error; it yields no navigation.
#[derive(Error, Debug)]
pub enum NavigationError {
    #[error("Error evaluating expression '{expression}': {source}")]
    Evaluation {
        expression: String,
        #[source]
        source: ElError,
    },

    #[error("Redirect to '{url}' failed: {source}")]
    Redirect {
        url: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Could not create view '{view_id}': {message}")]
    ViewCreation { view_id: String, message: String },

    #[error("Navigation for outcome '{outcome}' recursed more than {limit} times")]
    RecursionLimit { outcome: String, limit: usize },

    #[error("Flow transition failed: {0}")]
    Flow(String),
}

impl NavigationError {
    /// Wraps an expression failure together with the expression text it came from.
    pub fn evaluation(expression: &str, source: ElError) -> Self {
        NavigationError::Evaluation {
            expression: expression.to_string(),
            source,
        }
    }
}
