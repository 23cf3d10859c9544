pub mod navigation_case;
pub mod parameters;

pub use navigation_case::*;
pub use parameters::*;
