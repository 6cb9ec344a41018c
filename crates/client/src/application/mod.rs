//! Application layer - the notification pipeline and its session context.

pub mod services;
pub mod session;

pub use session::{AppSession, SessionConfig, SessionDeps};
