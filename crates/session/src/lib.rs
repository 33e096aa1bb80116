//! `till-session`
//!
//! **Responsibility:** one explicit context object per till session.
//!
//! A [`PosSession`] owns exactly one cart and one notification bus; nothing
//! is process-global. The presentation layer gets a session handed to it,
//! subscribes to its change streams and calls its operations in response to
//! the cashier.
//!
//! This crate provides:
//! - Session configuration from the environment
//! - The checkout lifecycle (lock → complete or cancel)
//! - A line-oriented JSON request surface used by the `till` driver binary

pub mod config;
pub mod request;
pub mod session;

pub use config::{ConfigError, SessionConfig};
pub use request::SessionRequest;
pub use session::{CartSnapshot, PosSession, SessionSnapshot};
