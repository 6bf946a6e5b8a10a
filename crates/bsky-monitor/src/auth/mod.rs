//! Authentication for the monitoring account.
//!
//! Provides the session value and the manager that logs in and refreshes it.

mod manager;
mod session;

pub use manager::{SessionManager, REFRESH_AFTER_MINUTES};
pub use session::Session;
