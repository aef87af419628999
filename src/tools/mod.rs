mod browse;
mod common;
mod error;
mod execute;
mod profile;
mod read;
mod search;
mod security;
mod write;

pub use browse::BrowseArgs;
pub use common::Toolbox;
pub use error::ToolError;
