//! API middleware stack.
//!
//! Execution order for protected routes (outermost → innermost):
//! 1. Session validator — bearer token → `SessionContext`
//! 2. Access log — logs after auth, has user_id

pub mod access_log;
pub mod auth;
