//! Collection (accounts receivable) models and API request/response types.
//!
//! This module defines:
//! - `Collection`: Database entity for one receivable (or one installment)
//! - `CollectionPayment`: A payment applied against a collection
//! - Request types for create, update, payment and installment generation
//! - Response and summary types returned to clients

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{default_currency, validate_currency};
use crate::{
    domain::{listing::SortSpec, status::CollectionStatus},
    error::AppError,
};

/// Represents a collection record from the database.
///
/// # Money
///
/// Amounts are stored as `i64` cents. `amount_paid_cents` grows with each
/// registered payment and never exceeds `amount_cents` (CHECK constraint).
///
/// # Installments
///
/// Collections generated from a payment term share an `installment_group_id`
/// and are numbered `1..=installment_count`. A standalone collection is
/// installment 1 of 1 with no group.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Collection {
    pub id: Uuid,
    pub rubro_id: Option<Uuid>,
    pub payment_term_id: Option<Uuid>,
    pub installment_group_id: Option<Uuid>,
    pub installment_number: i32,
    pub installment_count: i32,
    pub client_name: String,
    pub invoice_number: Option<String>,
    pub description: Option<String>,
    pub amount_cents: i64,
    pub amount_paid_cents: i64,
    pub currency: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,

    /// Date the last payment settled the balance; NULL until then
    pub paid_date: Option<NaiveDate>,

    /// Always derived, see `domain::status::derive_status`
    pub status: CollectionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Collection {
    pub fn outstanding_cents(&self) -> i64 {
        self.amount_cents - self.amount_paid_cents
    }
}

/// A payment applied to a collection.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct CollectionPayment {
    pub id: Uuid,
    pub collection_id: Uuid,
    pub amount_cents: i64,
    pub paid_on: NaiveDate,
    pub bank_account_id: Option<Uuid>,
    pub cash_box_id: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Sortable columns for `GET /api/collections`.
pub const COLLECTION_SORT: SortSpec = SortSpec {
    columns: &[
        ("due_date", "due_date"),
        ("amount", "amount_cents"),
        ("client_name", "client_name"),
        ("status", "status"),
        ("created_at", "created_at"),
    ],
    default_key: "due_date",
};

/// Collection-specific list filters.
///
/// `GET /api/collections?status=OVERDUE&due_from=2025-01-01&due_to=2025-03-31`
#[derive(Debug, Default, Deserialize)]
pub struct CollectionFilters {
    pub status: Option<CollectionStatus>,
    pub rubro_id: Option<Uuid>,
    pub due_from: Option<NaiveDate>,
    pub due_to: Option<NaiveDate>,
}

impl CollectionFilters {
    pub fn validate(&self) -> Result<(), AppError> {
        if let (Some(from), Some(to)) = (self.due_from, self.due_to) {
            if from > to {
                return Err(AppError::InvalidRequest(
                    "due_from must not be after due_to".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Request body for creating a single collection.
///
/// ```json
/// {
///   "client_name": "Municipalidad de Rosario",
///   "invoice_number": "A-0001-00001234",
///   "rubro_id": "550e8400-e29b-41d4-a716-446655440000",
///   "amount_cents": 1500000,
///   "issue_date": "2025-03-01",
///   "due_date": "2025-03-31"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreateCollectionRequest {
    pub client_name: String,
    pub invoice_number: Option<String>,
    pub description: Option<String>,
    pub rubro_id: Option<Uuid>,
    pub amount_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}

impl CreateCollectionRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_common(
            &self.client_name,
            self.amount_cents,
            self.issue_date,
            self.due_date,
        )?;
        validate_currency(&self.currency)
    }
}

/// Request body for `PUT /api/collections/{id}`.
///
/// Status is not accepted; it is re-derived from the new values. Currency
/// is fixed at creation.
#[derive(Debug, Deserialize)]
pub struct UpdateCollectionRequest {
    pub client_name: String,
    pub invoice_number: Option<String>,
    pub description: Option<String>,
    pub rubro_id: Option<Uuid>,
    pub amount_cents: i64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}

impl UpdateCollectionRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_common(
            &self.client_name,
            self.amount_cents,
            self.issue_date,
            self.due_date,
        )
    }
}

/// Request body for `POST /api/collections/{id}/payments`.
///
/// At most one of `bank_account_id` / `cash_box_id` may be given; that
/// account is credited with the payment.
#[derive(Debug, Deserialize)]
pub struct RegisterPaymentRequest {
    pub amount_cents: i64,
    /// Defaults to today
    pub paid_on: Option<NaiveDate>,
    pub bank_account_id: Option<Uuid>,
    pub cash_box_id: Option<Uuid>,
    pub note: Option<String>,
}

impl RegisterPaymentRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.amount_cents <= 0 {
            return Err(AppError::InvalidRequest(
                "Amount must be positive".to_string(),
            ));
        }
        if self.bank_account_id.is_some() && self.cash_box_id.is_some() {
            return Err(AppError::InvalidRequest(
                "Choose either a bank account or a cash box, not both".to_string(),
            ));
        }
        Ok(())
    }
}

/// Request body for `POST /api/collections/generate`.
///
/// ```json
/// {
///   "payment_term_id": "660e8400-e29b-41d4-a716-446655440001",
///   "client_name": "Obra Norte SRL",
///   "total_amount_cents": 900000,
///   "issue_date": "2025-01-15"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct GenerateInstallmentsRequest {
    pub payment_term_id: Uuid,
    pub client_name: String,
    pub invoice_number: Option<String>,
    pub description: Option<String>,
    pub rubro_id: Option<Uuid>,
    pub total_amount_cents: i64,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub issue_date: NaiveDate,
}

impl GenerateInstallmentsRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.client_name.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "Client name is required".to_string(),
            ));
        }
        validate_currency(&self.currency)
    }
}

fn validate_common(
    client_name: &str,
    amount_cents: i64,
    issue_date: NaiveDate,
    due_date: NaiveDate,
) -> Result<(), AppError> {
    if client_name.trim().is_empty() {
        return Err(AppError::InvalidRequest(
            "Client name is required".to_string(),
        ));
    }
    if amount_cents <= 0 {
        return Err(AppError::InvalidRequest(
            "Amount must be positive".to_string(),
        ));
    }
    if due_date < issue_date {
        return Err(AppError::InvalidRequest(
            "Due date cannot be before the issue date".to_string(),
        ));
    }
    Ok(())
}

/// Response body for collection endpoints.
#[derive(Debug, Serialize)]
pub struct CollectionResponse {
    pub id: Uuid,
    pub rubro_id: Option<Uuid>,
    pub payment_term_id: Option<Uuid>,
    pub installment_group_id: Option<Uuid>,
    pub installment_number: i32,
    pub installment_count: i32,
    pub client_name: String,
    pub invoice_number: Option<String>,
    pub description: Option<String>,
    pub amount_cents: i64,
    pub amount_paid_cents: i64,
    pub outstanding_cents: i64,
    pub currency: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub status: CollectionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Convert database Collection to API CollectionResponse.
///
/// Adds the computed outstanding balance.
impl From<Collection> for CollectionResponse {
    fn from(collection: Collection) -> Self {
        Self {
            outstanding_cents: collection.outstanding_cents(),
            id: collection.id,
            rubro_id: collection.rubro_id,
            payment_term_id: collection.payment_term_id,
            installment_group_id: collection.installment_group_id,
            installment_number: collection.installment_number,
            installment_count: collection.installment_count,
            client_name: collection.client_name,
            invoice_number: collection.invoice_number,
            description: collection.description,
            amount_cents: collection.amount_cents,
            amount_paid_cents: collection.amount_paid_cents,
            currency: collection.currency,
            issue_date: collection.issue_date,
            due_date: collection.due_date,
            paid_date: collection.paid_date,
            status: collection.status,
            created_at: collection.created_at,
            updated_at: collection.updated_at,
        }
    }
}

/// Result of registering a payment.
#[derive(Debug, Serialize)]
pub struct PaymentReceipt {
    pub payment: CollectionPayment,
    pub collection: CollectionResponse,
}

/// Result of generating installments from a payment term.
#[derive(Debug, Serialize)]
pub struct GeneratedInstallments {
    pub installment_group_id: Uuid,
    pub collections: Vec<CollectionResponse>,
}

/// Per-status totals for the collections dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StatusTotals {
    pub status: CollectionStatus,
    pub count: i64,
    pub outstanding_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct CollectionSummary {
    pub by_status: Vec<StatusTotals>,
    pub total_outstanding_cents: i64,
}

impl CollectionSummary {
    /// Build a summary that lists every status, including ones with no rows.
    pub fn from_rows(rows: Vec<StatusTotals>) -> Self {
        let by_status: Vec<StatusTotals> = CollectionStatus::ALL
            .iter()
            .map(|status| {
                rows.iter()
                    .find(|row| row.status == *status)
                    .cloned()
                    .unwrap_or(StatusTotals {
                        status: *status,
                        count: 0,
                        outstanding_cents: 0,
                    })
            })
            .collect();
        let total_outstanding_cents = by_status.iter().map(|s| s.outstanding_cents).sum();
        Self {
            by_status,
            total_outstanding_cents,
        }
    }
}

/// Response for `POST /api/collections/reconcile`.
#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub updated: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_request() -> CreateCollectionRequest {
        CreateCollectionRequest {
            client_name: "Obra Norte SRL".to_string(),
            invoice_number: None,
            description: None,
            rubro_id: None,
            amount_cents: 150_000,
            currency: "ARS".to_string(),
            issue_date: date(2025, 3, 1),
            due_date: date(2025, 3, 31),
        }
    }

    #[test]
    fn valid_create_request_passes() {
        assert!(create_request().validate().is_ok());
    }

    #[test]
    fn create_request_rejects_bad_values() {
        let mut request = create_request();
        request.amount_cents = 0;
        assert!(request.validate().is_err());

        let mut request = create_request();
        request.due_date = date(2025, 2, 1);
        assert!(request.validate().is_err());

        let mut request = create_request();
        request.currency = "pesos".to_string();
        assert!(request.validate().is_err());

        let mut request = create_request();
        request.client_name = "   ".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn currency_defaults_when_omitted() {
        let request: CreateCollectionRequest = serde_json::from_str(
            r#"{"client_name":"X","amount_cents":100,"issue_date":"2025-01-01","due_date":"2025-01-10"}"#,
        )
        .unwrap();
        assert_eq!(request.currency, "ARS");
    }

    #[test]
    fn payment_cannot_target_two_accounts() {
        let request = RegisterPaymentRequest {
            amount_cents: 1_000,
            paid_on: None,
            bank_account_id: Some(Uuid::new_v4()),
            cash_box_id: Some(Uuid::new_v4()),
            note: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn inverted_due_range_is_rejected() {
        let filters = CollectionFilters {
            due_from: Some(date(2025, 5, 1)),
            due_to: Some(date(2025, 4, 1)),
            ..Default::default()
        };
        assert!(filters.validate().is_err());
    }

    #[test]
    fn summary_fills_missing_statuses() {
        let summary = CollectionSummary::from_rows(vec![
            StatusTotals {
                status: CollectionStatus::Overdue,
                count: 2,
                outstanding_cents: 7_500,
            },
            StatusTotals {
                status: CollectionStatus::Pending,
                count: 1,
                outstanding_cents: 2_500,
            },
        ]);
        let statuses: Vec<CollectionStatus> = summary.by_status.iter().map(|s| s.status).collect();
        assert_eq!(statuses, CollectionStatus::ALL.to_vec());
        assert_eq!(summary.by_status[2].count, 0);
        assert_eq!(summary.total_outstanding_cents, 10_000);
    }
}
