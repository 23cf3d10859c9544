//! A small expression layer used for conditions, outcomes and method bindings.

pub mod evaluator;
pub mod expression;
pub mod value;

pub use evaluator::*;
pub use expression::*;
pub use value::*;
