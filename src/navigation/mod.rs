//! Outcome resolution and navigation dispatch.
//!
//! A [`NavigationHandler`] turns an action outcome into a target view by
//! trying, in order, the navigation rules of the current scope, the nodes of the
//! current flow, and finally the outcome read as a view id. See
//! [`RESOLUTION_ORDER`] for the strategies tried after the rules.

pub mod case_struct;
pub mod handler;
pub mod implicit;
pub mod info;
pub mod map;
pub mod resolver;

pub use case_struct::CaseStruct;
pub use handler::{NavigationHandler, NavigationHandlerBuilder, NavigationResult};
pub use info::{NavigationInfo, NavigationRegistry};
pub use map::NavigationMap;
pub use resolver::{MAX_RESOLUTION_DEPTH, RESOLUTION_ORDER, case_specificity};
