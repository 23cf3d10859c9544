use crate::el::Value;
use crate::flow::{FlowCheckpoint, FlowStack};
use crate::trace::ResolutionTrace;
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The deployment stage; development adds diagnostics for unresolved navigation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectStage {
    Development,
    #[default]
    Production,
}

/// The view currently bound to a request.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRoot {
    view_id: String,
    view_map: AHashMap<String, Value>,
}

impl ViewRoot {
    pub fn new(view_id: impl Into<String>) -> Self {
        Self {
            view_id: view_id.into(),
            view_map: AHashMap::new(),
        }
    }

    pub fn view_id(&self) -> &str {
        &self.view_id
    }

    /// View-scoped storage.
    pub fn view_map(&self) -> &AHashMap<String, Value> {
        &self.view_map
    }

    pub fn view_map_mut(&mut self) -> &mut AHashMap<String, Value> {
        &mut self.view_map
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// A message queued for display to the end user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacesMessage {
    pub severity: Severity,
    pub summary: String,
}

impl fmt::Display for FacesMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.severity, self.summary)
    }
}

/// Per-request flags shared between the navigation and flow handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestAttributes {
    /// A flow transition was already committed while resolving.
    pub did_transition: bool,
    /// Set while a navigation case is only being looked up.
    pub reset_flow_handler_state: Option<bool>,
    /// How many flows a pending return must pop.
    pub max_return_depth: Option<usize>,
    pub(crate) resolution_depth: usize,
}

impl RequestAttributes {
    pub fn is_reset_flow_handler_state(&self) -> bool {
        self.reset_flow_handler_state.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartialViewContext {
    pub ajax_request: bool,
    pub render_all: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flash {
    pub keep_messages: bool,
    pub redirect: bool,
}

/// Everything the navigation core reads and writes while handling one request.
#[derive(Debug, Default)]
pub struct RequestContext {
    view_root: Option<ViewRoot>,
    pub attributes: RequestAttributes,
    messages: Vec<FacesMessage>,
    pub partial: PartialViewContext,
    pub flash: Flash,
    response_complete: bool,
    processing_view_action: bool,
    pub flow_stack: FlowStack,
    request_parameters: AHashMap<String, String>,
    pub(crate) trace: ResolutionTrace,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A request currently displaying `view_id`.
    pub fn for_view(view_id: impl Into<String>) -> Self {
        Self {
            view_root: Some(ViewRoot::new(view_id)),
            ..Self::default()
        }
    }

    pub fn view_root(&self) -> Option<&ViewRoot> {
        self.view_root.as_ref()
    }

    pub fn view_root_mut(&mut self) -> Option<&mut ViewRoot> {
        self.view_root.as_mut()
    }

    pub fn view_id(&self) -> Option<&str> {
        self.view_root.as_ref().map(ViewRoot::view_id)
    }

    pub fn set_view_root(&mut self, root: ViewRoot) {
        self.view_root = Some(root);
    }

    pub fn add_message(&mut self, severity: Severity, summary: impl Into<String>) {
        self.messages.push(FacesMessage {
            severity,
            summary: summary.into(),
        });
    }

    pub fn messages(&self) -> &[FacesMessage] {
        &self.messages
    }

    pub fn response_complete(&mut self) {
        self.response_complete = true;
    }

    pub fn is_response_complete(&self) -> bool {
        self.response_complete
    }

    /// Marks whether a view action is currently being broadcast.
    pub fn set_processing_view_action(&mut self, processing: bool) {
        self.processing_view_action = processing;
    }

    pub fn is_processing_view_action(&self) -> bool {
        self.processing_view_action
    }

    pub fn set_request_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.request_parameters.insert(name.into(), value.into());
    }

    pub fn request_parameter(&self, name: &str) -> Option<&str> {
        self.request_parameters.get(name).map(String::as_str)
    }

    /// The strategies tried by the most recent resolution.
    pub fn resolution_trace(&self) -> &ResolutionTrace {
        &self.trace
    }

    pub fn flow_checkpoint(&self) -> FlowCheckpoint {
        FlowCheckpoint {
            stack: self.flow_stack.clone(),
            max_return_depth: self.attributes.max_return_depth,
        }
    }

    pub fn restore_flow_checkpoint(&mut self, checkpoint: FlowCheckpoint) {
        self.flow_stack = checkpoint.stack;
        self.attributes.max_return_depth = checkpoint.max_return_depth;
    }
}
