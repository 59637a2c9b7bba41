//! Collection service - receivables, payments and installment generation.
//!
//! This service handles:
//! - Status reconciliation (the overdue recompute run before every list)
//! - Filtered, sorted, paginated listing
//! - Payment registration, crediting the receiving bank account or cash box
//! - Generating installment collections from a payment term
//!
//! # Atomicity Guarantees
//!
//! Payments and installment generation run inside a single PostgreSQL
//! transaction with the affected rows locked (`FOR UPDATE`).

use chrono::{NaiveDate, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    db::DbPool,
    domain::{
        installments,
        listing::{ListParams, Page},
        status::{self, CollectionStatus, StatusSnapshot},
    },
    error::AppError,
    models::{
        collection::{
            COLLECTION_SORT, Collection, CollectionFilters, CollectionPayment, CollectionSummary,
            CreateCollectionRequest, GenerateInstallmentsRequest, PaymentReceipt,
            RegisterPaymentRequest, StatusTotals, UpdateCollectionRequest,
        },
        payment_term::PaymentTerm,
    },
};

const COLLECTION_COLUMNS: &str = "id, rubro_id, payment_term_id, installment_group_id, \
     installment_number, installment_count, client_name, invoice_number, description, \
     amount_cents, amount_paid_cents, currency, issue_date, due_date, paid_date, status, \
     created_at, updated_at";

/// Open collections of one company, locked in id order until the status
/// writes commit.
const LOCK_OPEN_SNAPSHOTS: &str = r#"
    SELECT id, amount_cents, amount_paid_cents, due_date, status
    FROM collections
    WHERE company_id = $1 AND status <> 'PAID'
    ORDER BY id
    FOR UPDATE
"#;

/// Deletes only while nothing has been paid.
const DELETE_UNPAID: &str =
    "DELETE FROM collections WHERE id = $1 AND company_id = $2 AND amount_paid_cents = 0";

/// Business date used for status derivation.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Recompute the status of every open collection of a company.
///
/// # Returns
///
/// The number of collections whose status changed.
pub async fn reconcile_statuses(
    pool: &DbPool,
    company_id: Uuid,
    today: NaiveDate,
) -> Result<usize, AppError> {
    let mut tx = pool.begin().await?;

    let snapshots = sqlx::query_as::<_, StatusSnapshot>(LOCK_OPEN_SNAPSHOTS)
        .bind(company_id)
        .fetch_all(&mut *tx)
        .await?;

    let changes = status::reconcile(&snapshots, today);
    if changes.is_empty() {
        tx.commit().await?;
        return Ok(0);
    }

    for target in CollectionStatus::ALL {
        let ids: Vec<Uuid> = changes
            .iter()
            .filter(|(_, s)| *s == target)
            .map(|(id, _)| *id)
            .collect();
        if ids.is_empty() {
            continue;
        }
        sqlx::query(
            "UPDATE collections SET status = $1, updated_at = NOW() WHERE company_id = $2 AND id = ANY($3)",
        )
        .bind(target)
        .bind(company_id)
        .bind(&ids)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    tracing::info!(company_id = %company_id, updated = changes.len(), "collection statuses reconciled");
    Ok(changes.len())
}

fn push_filters(
    qb: &mut QueryBuilder<'_, Postgres>,
    company_id: Uuid,
    params: &ListParams,
    filters: &CollectionFilters,
) {
    qb.push(" WHERE company_id = ").push_bind(company_id);

    if let Some(pattern) = params.search_pattern() {
        qb.push(" AND (client_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR invoice_number ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(status) = filters.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(rubro_id) = filters.rubro_id {
        qb.push(" AND rubro_id = ").push_bind(rubro_id);
    }
    if let Some(from) = filters.due_from {
        qb.push(" AND due_date >= ").push_bind(from);
    }
    if let Some(to) = filters.due_to {
        qb.push(" AND due_date <= ").push_bind(to);
    }
}

/// List a company's collections after reconciling their statuses.
pub async fn list_collections(
    pool: &DbPool,
    company_id: Uuid,
    params: &ListParams,
    filters: &CollectionFilters,
) -> Result<Page<Collection>, AppError> {
    filters.validate()?;
    let sort_column = COLLECTION_SORT
        .resolve(params.sort.as_deref())
        .map_err(AppError::InvalidRequest)?;

    reconcile_statuses(pool, company_id, today()).await?;

    let mut count_query = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM collections");
    push_filters(&mut count_query, company_id, params, filters);
    let total: i64 = count_query.build_query_scalar().fetch_one(pool).await?;

    let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {COLLECTION_COLUMNS} FROM collections"));
    push_filters(&mut query, company_id, params, filters);
    query.push(format!(" ORDER BY {} {}, id", sort_column, params.order.as_sql()));
    query.push(" LIMIT ").push_bind(params.per_page());
    query.push(" OFFSET ").push_bind(params.offset());

    let items = query.build_query_as::<Collection>().fetch_all(pool).await?;

    Ok(Page::new(items, total, params))
}

/// Count and outstanding amount per status.
pub async fn summarize(pool: &DbPool, company_id: Uuid) -> Result<CollectionSummary, AppError> {
    reconcile_statuses(pool, company_id, today()).await?;

    let rows = sqlx::query_as::<_, StatusTotals>(
        r#"
        SELECT status,
               COUNT(*) AS count,
               COALESCE(SUM(amount_cents - amount_paid_cents), 0)::BIGINT AS outstanding_cents
        FROM collections
        WHERE company_id = $1
        GROUP BY status
        "#,
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    Ok(CollectionSummary::from_rows(rows))
}

pub async fn get_collection(
    pool: &DbPool,
    company_id: Uuid,
    collection_id: Uuid,
) -> Result<Collection, AppError> {
    sqlx::query_as::<_, Collection>(&format!(
        "SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = $1 AND company_id = $2"
    ))
    .bind(collection_id)
    .bind(company_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Collection"))
}

/// Make sure a referenced rubro belongs to the same company.
async fn ensure_rubro<'e, E>(executor: E, company_id: Uuid, rubro_id: Option<Uuid>) -> Result<(), AppError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    if let Some(rubro_id) = rubro_id {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM rubros WHERE id = $1 AND company_id = $2)",
        )
        .bind(rubro_id)
        .bind(company_id)
        .fetch_one(executor)
        .await?;
        if !exists {
            return Err(AppError::NotFound("Rubro"));
        }
    }
    Ok(())
}

/// Create a single collection (installment 1 of 1).
pub async fn create_collection(
    pool: &DbPool,
    company_id: Uuid,
    request: CreateCollectionRequest,
) -> Result<Collection, AppError> {
    request.validate()?;
    ensure_rubro(pool, company_id, request.rubro_id).await?;

    let status = status::derive_status(request.amount_cents, 0, request.due_date, today());

    let collection = sqlx::query_as::<_, Collection>(&format!(
        r#"
        INSERT INTO collections (
            company_id, rubro_id, client_name, invoice_number, description,
            amount_cents, currency, issue_date, due_date, status
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {COLLECTION_COLUMNS}
        "#
    ))
    .bind(company_id)
    .bind(request.rubro_id)
    .bind(request.client_name.trim())
    .bind(request.invoice_number)
    .bind(request.description)
    .bind(request.amount_cents)
    .bind(&request.currency)
    .bind(request.issue_date)
    .bind(request.due_date)
    .bind(status)
    .fetch_one(pool)
    .await?;

    Ok(collection)
}

/// Edit a collection and re-derive its status.
///
/// The amount cannot drop below what has already been paid.
pub async fn update_collection(
    pool: &DbPool,
    company_id: Uuid,
    collection_id: Uuid,
    request: UpdateCollectionRequest,
) -> Result<Collection, AppError> {
    request.validate()?;

    let mut tx = pool.begin().await?;
    ensure_rubro(&mut *tx, company_id, request.rubro_id).await?;

    let current = sqlx::query_as::<_, Collection>(&format!(
        "SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = $1 AND company_id = $2 FOR UPDATE"
    ))
    .bind(collection_id)
    .bind(company_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Collection"))?;

    if request.amount_cents < current.amount_paid_cents {
        tx.rollback().await?;
        return Err(AppError::Unprocessable(format!(
            "Amount cannot be lower than the {} cents already paid",
            current.amount_paid_cents
        )));
    }

    let today = today();
    let status = status::derive_status(
        request.amount_cents,
        current.amount_paid_cents,
        request.due_date,
        today,
    );
    let paid_date = match status {
        CollectionStatus::Paid => current.paid_date.or(Some(today)),
        _ => None,
    };

    let updated = sqlx::query_as::<_, Collection>(&format!(
        r#"
        UPDATE collections
        SET client_name = $1, invoice_number = $2, description = $3, rubro_id = $4,
            amount_cents = $5, issue_date = $6, due_date = $7, status = $8,
            paid_date = $9, updated_at = NOW()
        WHERE id = $10
        RETURNING {COLLECTION_COLUMNS}
        "#
    ))
    .bind(request.client_name.trim())
    .bind(request.invoice_number)
    .bind(request.description)
    .bind(request.rubro_id)
    .bind(request.amount_cents)
    .bind(request.issue_date)
    .bind(request.due_date)
    .bind(status)
    .bind(paid_date)
    .bind(collection_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(updated)
}

/// Delete a collection that has no payments.
pub async fn delete_collection(
    pool: &DbPool,
    company_id: Uuid,
    collection_id: Uuid,
) -> Result<(), AppError> {
    let deleted = sqlx::query(DELETE_UNPAID)
        .bind(collection_id)
        .bind(company_id)
        .execute(pool)
        .await?
        .rows_affected();
    if deleted > 0 {
        return Ok(());
    }

    // Nothing deleted: either it is not ours or it already has payments
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM collections WHERE id = $1 AND company_id = $2)",
    )
    .bind(collection_id)
    .bind(company_id)
    .fetch_one(pool)
    .await?;
    Err(undeletable(exists))
}

fn undeletable(exists: bool) -> AppError {
    if exists {
        AppError::Conflict("Collection has registered payments and cannot be deleted".to_string())
    } else {
        AppError::NotFound("Collection")
    }
}

/// Register a payment against a collection.
///
/// # Process
///
/// 1. Lock the collection and check the outstanding balance
/// 2. Lock and credit the receiving bank account or cash box, if any
/// 3. Record the payment
/// 4. Update paid amount, status and paid date
/// 5. Commit (or rollback on error)
///
/// # Errors
///
/// - `NotFound`: collection, bank account or cash box missing
/// - `Unprocessable`: already paid, overpayment, currency mismatch
pub async fn register_payment(
    pool: &DbPool,
    company_id: Uuid,
    collection_id: Uuid,
    request: RegisterPaymentRequest,
) -> Result<PaymentReceipt, AppError> {
    request.validate()?;
    let today = today();
    let paid_on = request.paid_on.unwrap_or(today);

    let mut tx = pool.begin().await?;

    let collection = sqlx::query_as::<_, Collection>(&format!(
        "SELECT {COLLECTION_COLUMNS} FROM collections WHERE id = $1 AND company_id = $2 FOR UPDATE"
    ))
    .bind(collection_id)
    .bind(company_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Collection"))?;

    if collection.status == CollectionStatus::Paid {
        tx.rollback().await?;
        return Err(AppError::Unprocessable(
            "Collection is already paid".to_string(),
        ));
    }
    if request.amount_cents > collection.outstanding_cents() {
        tx.rollback().await?;
        return Err(AppError::Unprocessable(format!(
            "Payment exceeds the outstanding balance of {} cents",
            collection.outstanding_cents()
        )));
    }

    if let Some(bank_account_id) = request.bank_account_id {
        let currency: String = sqlx::query_scalar(
            "SELECT currency FROM bank_accounts WHERE id = $1 AND company_id = $2 AND is_active = true FOR UPDATE",
        )
        .bind(bank_account_id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Bank account"))?;
        ensure_same_currency(&collection.currency, &currency)?;

        sqlx::query(
            "UPDATE bank_accounts SET balance_cents = balance_cents + $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(request.amount_cents)
        .bind(bank_account_id)
        .execute(&mut *tx)
        .await?;
    }

    if let Some(cash_box_id) = request.cash_box_id {
        let currency: String = sqlx::query_scalar(
            "SELECT currency FROM cash_boxes WHERE id = $1 AND company_id = $2 AND is_active = true FOR UPDATE",
        )
        .bind(cash_box_id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("Cash box"))?;
        ensure_same_currency(&collection.currency, &currency)?;

        sqlx::query(
            "UPDATE cash_boxes SET balance_cents = balance_cents + $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(request.amount_cents)
        .bind(cash_box_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO cash_movements (company_id, cash_box_id, kind, amount_cents, description)
            VALUES ($1, $2, 'DEPOSIT', $3, $4)
            "#,
        )
        .bind(company_id)
        .bind(cash_box_id)
        .bind(request.amount_cents)
        .bind(format!("Collection payment: {}", collection.client_name))
        .execute(&mut *tx)
        .await?;
    }

    let payment = sqlx::query_as::<_, CollectionPayment>(
        r#"
        INSERT INTO collection_payments (
            collection_id, amount_cents, paid_on, bank_account_id, cash_box_id, note
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, collection_id, amount_cents, paid_on, bank_account_id, cash_box_id, note, created_at
        "#,
    )
    .bind(collection_id)
    .bind(request.amount_cents)
    .bind(paid_on)
    .bind(request.bank_account_id)
    .bind(request.cash_box_id)
    .bind(request.note)
    .fetch_one(&mut *tx)
    .await?;

    let amount_paid_cents = collection.amount_paid_cents + request.amount_cents;
    let status = status::derive_status(
        collection.amount_cents,
        amount_paid_cents,
        collection.due_date,
        today,
    );
    let paid_date = (status == CollectionStatus::Paid).then_some(paid_on);

    let updated = sqlx::query_as::<_, Collection>(&format!(
        r#"
        UPDATE collections
        SET amount_paid_cents = $1, status = $2, paid_date = $3, updated_at = NOW()
        WHERE id = $4
        RETURNING {COLLECTION_COLUMNS}
        "#
    ))
    .bind(amount_paid_cents)
    .bind(status)
    .bind(paid_date)
    .bind(collection_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        collection_id = %collection_id,
        amount_cents = request.amount_cents,
        status = ?status,
        "payment registered"
    );

    Ok(PaymentReceipt {
        payment,
        collection: updated.into(),
    })
}

fn ensure_same_currency(collection: &str, account: &str) -> Result<(), AppError> {
    if collection.trim() != account.trim() {
        return Err(AppError::Unprocessable(format!(
            "Currency mismatch: collection is {}, receiving account is {}",
            collection, account
        )));
    }
    Ok(())
}

pub async fn list_payments(
    pool: &DbPool,
    company_id: Uuid,
    collection_id: Uuid,
) -> Result<Vec<CollectionPayment>, AppError> {
    // Ownership check first so other tenants get a 404
    get_collection(pool, company_id, collection_id).await?;

    let payments = sqlx::query_as::<_, CollectionPayment>(
        r#"
        SELECT id, collection_id, amount_cents, paid_on, bank_account_id, cash_box_id, note, created_at
        FROM collection_payments
        WHERE collection_id = $1
        ORDER BY paid_on DESC, created_at DESC
        "#,
    )
    .bind(collection_id)
    .fetch_all(pool)
    .await?;

    Ok(payments)
}

/// Generate one collection per installment of a payment term.
///
/// All installments share a fresh `installment_group_id` and are inserted
/// in one transaction.
pub async fn generate_installments(
    pool: &DbPool,
    company_id: Uuid,
    request: GenerateInstallmentsRequest,
) -> Result<(Uuid, Vec<Collection>), AppError> {
    request.validate()?;

    let term = sqlx::query_as::<_, PaymentTerm>(
        r#"
        SELECT id, name, installment_count, frequency, first_due_offset_days, percentages, created_at
        FROM payment_terms
        WHERE id = $1 AND company_id = $2
        "#,
    )
    .bind(request.payment_term_id)
    .bind(company_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound("Payment term"))?;

    let schedule = installments::generate_schedule(
        request.total_amount_cents,
        request.issue_date,
        &term.template(),
    )?;

    let today = today();
    let group_id = Uuid::new_v4();
    let installment_count = schedule.len() as i32;

    let mut tx = pool.begin().await?;
    ensure_rubro(&mut *tx, company_id, request.rubro_id).await?;

    let mut created = Vec::with_capacity(schedule.len());
    for installment in schedule {
        let status = status::derive_status(installment.amount_cents, 0, installment.due_date, today);
        let collection = sqlx::query_as::<_, Collection>(&format!(
            r#"
            INSERT INTO collections (
                company_id, rubro_id, payment_term_id, installment_group_id,
                installment_number, installment_count, client_name, invoice_number,
                description, amount_cents, currency, issue_date, due_date, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {COLLECTION_COLUMNS}
            "#
        ))
        .bind(company_id)
        .bind(request.rubro_id)
        .bind(term.id)
        .bind(group_id)
        .bind(installment.number)
        .bind(installment_count)
        .bind(request.client_name.trim())
        .bind(&request.invoice_number)
        .bind(&request.description)
        .bind(installment.amount_cents)
        .bind(&request.currency)
        .bind(request.issue_date)
        .bind(installment.due_date)
        .bind(status)
        .fetch_one(&mut *tx)
        .await?;
        created.push(collection);
    }

    tx.commit().await?;

    tracing::info!(
        company_id = %company_id,
        payment_term_id = %term.id,
        installments = created.len(),
        "installments generated"
    );

    Ok((group_id, created))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn currency_mismatch_is_unprocessable() {
        assert!(ensure_same_currency("ARS", "ARS").is_ok());
        assert!(matches!(
            ensure_same_currency("ARS", "USD"),
            Err(AppError::Unprocessable(_))
        ));
    }

    #[test]
    fn reconcile_locks_open_rows_in_id_order() {
        let sql = LOCK_OPEN_SNAPSHOTS.split_whitespace().collect::<Vec<_>>().join(" ");
        assert!(sql.ends_with("WHERE company_id = $1 AND status <> 'PAID' ORDER BY id FOR UPDATE"));
    }

    #[test]
    fn delete_is_guarded_by_paid_amount() {
        assert!(DELETE_UNPAID.ends_with("AND amount_paid_cents = 0"));
        assert!(matches!(undeletable(true), AppError::Conflict(_)));
        assert!(matches!(undeletable(false), AppError::NotFound("Collection")));
    }

    #[test]
    fn filters_bind_only_requested_conditions() {
        let params = ListParams {
            search: Some("norte".to_string()),
            ..Default::default()
        };
        let filters = CollectionFilters {
            status: Some(CollectionStatus::Overdue),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM collections");
        push_filters(&mut qb, Uuid::new_v4(), &params, &filters);

        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM collections WHERE company_id = $1 \
             AND (client_name ILIKE $2 OR invoice_number ILIKE $3 OR description ILIKE $4) \
             AND status = $5"
        );
    }

    #[test]
    fn filters_without_search_only_scope_by_company() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM collections");
        push_filters(
            &mut qb,
            Uuid::new_v4(),
            &ListParams::default(),
            &CollectionFilters::default(),
        );
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM collections WHERE company_id = $1");
    }
}
