//! Pure business rules with no I/O.
//!
//! Everything here is deterministic given its inputs (including "today"),
//! so services can call it inside database transactions and tests can
//! call it directly.

/// Installment schedules generated from payment terms
pub mod installments;
/// Filter / sort / paginate parameters shared by list endpoints
pub mod listing;
/// Collection status derivation and overdue reconciliation
pub mod status;
