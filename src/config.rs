//! JSON run configurations for the command-line tools.
pub mod localize;
pub mod step_fit;
