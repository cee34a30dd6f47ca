//! goform wire protocol
//!
//! - `command`: command descriptions, query/form field layout, success rules
//! - `credentials`: login and CSRF hashing
//! - `response`: duplicate-key tolerant body decoding

pub mod command;
pub mod credentials;
pub mod response;

pub use command::{Command, Method, SuccessSignal};
pub use credentials::LoginCredentials;
pub use response::{FieldMap, FieldValue, ParsedResponse};

/// Read endpoint
pub const GET_PATH: &str = "/reqproc/proc_get";
/// Write endpoint
pub const POST_PATH: &str = "/reqproc/proc_post";
/// Session cookie issued on login
pub const SESSION_COOKIE: &str = "random";
