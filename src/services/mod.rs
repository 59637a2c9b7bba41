//! Business logic services.
//!
//! Services contain the logic that spans several tables or needs a
//! database transaction. Plain single-table CRUD stays in the handlers.

pub mod auth_service;
pub mod collection_service;
pub mod support_service;
pub mod treasury_service;
