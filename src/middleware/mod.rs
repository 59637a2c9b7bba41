//! HTTP middleware components.
//!
//! Middleware run before route handlers and can short-circuit a request,
//! e.g. reject it when the caller is not logged in.

/// Session-token authentication middleware
pub mod auth;
