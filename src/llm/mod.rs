mod client_core;
#[cfg(test)]
pub(crate) mod test_utils;
mod tool_def;
pub mod tool_execution;
mod tool_runtime;
pub mod types;

pub use client_core::*;
pub use tool_def::*;
pub use tool_execution::*;
pub use tool_runtime::*;
pub use types::*;
