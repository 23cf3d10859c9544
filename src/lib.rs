//! # Michi - Outcome Navigation and Flow Resolution
//!
//! **Michi** decides where a server-side component UI goes next. Given the view a
//! request is on, the action that ran and the outcome string it returned, it
//! resolves the target view from declarative navigation rules, from the nodes of
//! the flow the user is in, or from the outcome itself read as a view id. It then
//! either redirects or swaps in the new view, entering and leaving flows along
//! the way.
//!
//! ## Core Workflow
//!
//! 1.  **Load Your Rules**: Parse a JSON [`config::NavigationDocument`], or implement
//!     [`config::IntoNavigation`] for your own format, to get a [`config::NavigationConfig`].
//! 2.  **Assemble the Application**: An [`application::Application`] bundles the view
//!     handler, flow handler, expression evaluator and external context. Every
//!     collaborator has a default.
//! 3.  **Build the Handler**: `NavigationHandler::builder` takes the rules and
//!     inspects every flow once. The built handler is immutable and shareable.
//! 4.  **Navigate**: Call `navigate` (or `handle_navigation`) with a per-request [`context::RequestContext`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use michi::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let config = NavigationConfig::from_json(r#"{
//!         "navigationRules": [
//!             { "fromViewId": "/cart.xhtml",
//!               "cases": [ { "fromOutcome": "checkout", "toViewId": "/checkout.xhtml",
//!                            "redirect": {} } ] }
//!         ]
//!     }"#)?;
//!
//!     let application = Application::builder()
//!         .flows(config.flows.clone())
//!         .project_stage(ProjectStage::Development)
//!         .build();
//!     let handler = NavigationHandler::builder(application).config(&config).build();
//!
//!     let mut ctx = RequestContext::for_view("/cart.xhtml");
//!     match handler.navigate(&mut ctx, None, Some("checkout"))? {
//!         NavigationResult::Redirect { url, .. } => println!("-> redirect to {}", url),
//!         NavigationResult::Render { view_id } => println!("-> render {}", view_id),
//!         NavigationResult::Unresolved => println!("-> stay on the current view"),
//!     }
//!     println!("{}", TraceFormatter::format_reason(ctx.resolution_trace()));
//!
//!     Ok(())
//! }
//! ```

pub mod application;
pub mod case;
pub mod config;
pub mod context;
pub mod el;
pub mod error;
pub mod flow;
pub mod navigation;
pub mod prelude;
pub mod trace;
pub mod view;
