//! Collection status derivation.
//!
//! A collection's status is never edited directly. It is always recomputed
//! from the amount owed, the amount paid so far, and the due date relative
//! to "today".

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of an accounts-receivable record.
///
/// Stored in the `collection_status` Postgres enum and serialized as
/// `PENDING`, `PARTIAL`, `PAID` or `OVERDUE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "collection_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
}

impl CollectionStatus {
    pub const ALL: [CollectionStatus; 4] = [
        CollectionStatus::Pending,
        CollectionStatus::Partial,
        CollectionStatus::Paid,
        CollectionStatus::Overdue,
    ];
}

/// Derive the status of a collection.
///
/// Rules, first match wins:
/// 1. fully paid → `Paid`
/// 2. due date strictly before `today` → `Overdue` (partial payments included)
/// 3. something paid → `Partial`
/// 4. otherwise → `Pending`
pub fn derive_status(
    amount_cents: i64,
    amount_paid_cents: i64,
    due_date: NaiveDate,
    today: NaiveDate,
) -> CollectionStatus {
    if amount_paid_cents >= amount_cents {
        CollectionStatus::Paid
    } else if due_date < today {
        CollectionStatus::Overdue
    } else if amount_paid_cents > 0 {
        CollectionStatus::Partial
    } else {
        CollectionStatus::Pending
    }
}

/// Minimal view of a stored collection needed to reconcile its status.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatusSnapshot {
    pub id: Uuid,
    pub amount_cents: i64,
    pub amount_paid_cents: i64,
    pub due_date: NaiveDate,
    pub status: CollectionStatus,
}

/// Recompute statuses and return only the ones that changed.
pub fn reconcile(items: &[StatusSnapshot], today: NaiveDate) -> Vec<(Uuid, CollectionStatus)> {
    items
        .iter()
        .filter_map(|item| {
            let derived =
                derive_status(item.amount_cents, item.amount_paid_cents, item.due_date, today);
            (derived != item.status).then_some((item.id, derived))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn unpaid_before_due_date_is_pending() {
        let today = date(2025, 3, 10);
        assert_eq!(
            derive_status(10_000, 0, date(2025, 3, 20), today),
            CollectionStatus::Pending
        );
    }

    #[test]
    fn due_today_is_not_overdue() {
        let today = date(2025, 3, 10);
        assert_eq!(
            derive_status(10_000, 0, today, today),
            CollectionStatus::Pending
        );
    }

    #[test]
    fn unpaid_after_due_date_is_overdue() {
        let today = date(2025, 3, 10);
        assert_eq!(
            derive_status(10_000, 0, date(2025, 3, 9), today),
            CollectionStatus::Overdue
        );
    }

    #[test]
    fn partially_paid_follows_due_date() {
        let today = date(2025, 3, 10);
        assert_eq!(
            derive_status(10_000, 2_500, date(2025, 4, 1), today),
            CollectionStatus::Partial
        );
        assert_eq!(
            derive_status(10_000, 2_500, date(2025, 2, 1), today),
            CollectionStatus::Overdue
        );
    }

    #[test]
    fn fully_paid_wins_over_due_date() {
        let today = date(2025, 3, 10);
        assert_eq!(
            derive_status(10_000, 10_000, date(2024, 1, 1), today),
            CollectionStatus::Paid
        );
    }

    #[test]
    fn reconcile_reports_only_changes() {
        let today = date(2025, 6, 1);
        let stale = StatusSnapshot {
            id: Uuid::new_v4(),
            amount_cents: 5_000,
            amount_paid_cents: 0,
            due_date: date(2025, 5, 1),
            status: CollectionStatus::Pending,
        };
        let current = StatusSnapshot {
            id: Uuid::new_v4(),
            amount_cents: 5_000,
            amount_paid_cents: 1_000,
            due_date: date(2025, 7, 1),
            status: CollectionStatus::Partial,
        };
        // Due date moved forward after it had been flagged overdue
        let rescheduled = StatusSnapshot {
            id: Uuid::new_v4(),
            amount_cents: 5_000,
            amount_paid_cents: 0,
            due_date: date(2025, 8, 1),
            status: CollectionStatus::Overdue,
        };

        let changes = reconcile(&[stale.clone(), current, rescheduled.clone()], today);

        assert_eq!(
            changes,
            vec![
                (stale.id, CollectionStatus::Overdue),
                (rescheduled.id, CollectionStatus::Pending),
            ]
        );
    }

    #[test]
    fn status_serializes_in_upper_case() {
        let json = serde_json::to_string(&CollectionStatus::Overdue).unwrap();
        assert_eq!(json, "\"OVERDUE\"");
        let parsed: CollectionStatus = serde_json::from_str("\"PARTIAL\"").unwrap();
        assert_eq!(parsed, CollectionStatus::Partial);
    }
}
