pub mod error;
pub mod store;

pub use error::SessionError;
pub use store::{SessionHandle, SessionStore};
