//! HTTP request handlers (route handlers).
//!
//! One module per page of the application. Each handler:
//! 1. Receives HTTP request data (JSON body, URL params, query string)
//! 2. Delegates to a service or runs a tenant-scoped query
//! 3. Returns HTTP response (JSON, status code)

/// Login, logout and company registration
pub mod auth;
/// Bank accounts page
pub mod bank_accounts;
/// Cash boxes page
pub mod cash_boxes;
/// Collections page
pub mod collections;
/// Liveness and database check
pub mod health;
/// Payment-term templates
pub mod payment_terms;
/// Profile page
pub mod profile;
/// Rubros page
pub mod rubros;
/// Support page
pub mod support;
