//! Flow definitions, the flow registry and the flow call stack.

pub mod graph;
pub mod handler;
pub mod registry;
pub mod stack;

pub use graph::*;
pub use handler::*;
pub use registry::*;
pub use stack::*;
