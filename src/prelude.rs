//! Prelude module for convenient imports
//!
//! Re-exports the types needed to load rules, build a handler and navigate.
//!
//! # Example
//!
//! ```rust,no_run
//! use michi::prelude::*;
//!
//! # fn run_example() -> Result<()> {
//! let config = NavigationConfig::from_file("path/to/navigation.json")?;
//! let application = Application::builder().flows(config.flows.clone()).build();
//! let handler = NavigationHandler::builder(application).config(&config).build();
//!
//! let mut ctx = RequestContext::for_view("/index.xhtml");
//! let case = handler.get_navigation_case(&mut ctx, None, Some("next"), "")?;
//! println!("Would navigate with: {:?}", case);
//! # Ok(())
//! # }
//! ```

// Handler and results
pub use crate::application::{Application, ApplicationBuilder};
pub use crate::navigation::{CaseStruct, NavigationHandler, NavigationResult};

// Rules and configuration
pub use crate::case::{NavigationCase, NavigationRule, Parameters};
pub use crate::config::{IntoNavigation, NavigationConfig, NavigationDocument};

// Flows
pub use crate::flow::{DefaultFlowHandler, Flow, FlowHandler, FlowNode, FlowRegistry, FlowTarget, NULL_FLOW};

// Request state
pub use crate::context::{ProjectStage, RequestContext, Severity};

// Collaborators
pub use crate::el::{ExpressionEvaluator, ScopedEvaluator, Value};
pub use crate::view::{DefaultViewHandler, ExternalContext, ViewHandler};

// Error types
pub use crate::error::{ConfigError, ElError, NavigationError};

// Trace formatting
pub use crate::trace::TraceFormatter;

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
