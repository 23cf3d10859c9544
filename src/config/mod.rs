//! Loading navigation rules and flow definitions.
//!
//! [`NavigationDocument`] is the JSON form; anything implementing
//! [`IntoNavigation`] can feed a [`NavigationConfig`] to the handler builder.

pub mod conversion;
pub mod definition;

pub use conversion::{IntoNavigation, NavigationConfig};
pub use definition::*;
