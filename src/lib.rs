//! goform-session - unattended router admin client
//!
//! Speaks the session, CSRF and command protocol of goform-style router
//! web panels (`/reqproc/proc_get`, `/reqproc/proc_post`) so administrative
//! actions such as band locking can run without a browser.

pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod protocol;
pub mod quiescence;

pub use client::{AuthState, RouterClient};
pub use error::{Result, RouterError};
pub use protocol::{Command, ParsedResponse, SuccessSignal};
