//! Treasury service - cash box deposits and withdrawals.
//!
//! # Atomicity Guarantees
//!
//! The cash box row is locked with `FOR UPDATE` before its balance is read,
//! so two concurrent withdrawals cannot both pass the balance check.

use uuid::Uuid;

use crate::{
    db::DbPool,
    error::AppError,
    models::cash_box::{CashMovement, CashMovementReceipt, CashMovementRequest, MovementKind},
};

/// Post a deposit or withdrawal to a cash box.
///
/// # Process
///
/// 1. Validate amount
/// 2. Start database transaction
/// 3. Lock the cash box and read its balance
/// 4. Reject withdrawals larger than the balance
/// 5. Update balance and record the movement
/// 6. Commit (or rollback on error)
///
/// # Errors
///
/// - `NotFound`: cash box missing, inactive, or owned by another company
/// - `InvalidRequest`: amount is zero or negative
/// - `InsufficientBalance`: withdrawal exceeds balance
pub async fn post_movement(
    pool: &DbPool,
    company_id: Uuid,
    cash_box_id: Uuid,
    request: CashMovementRequest,
) -> Result<CashMovementReceipt, AppError> {
    if request.amount_cents <= 0 {
        return Err(AppError::InvalidRequest(
            "Amount must be positive".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;

    let balance_cents: i64 = sqlx::query_scalar(
        "SELECT balance_cents FROM cash_boxes WHERE id = $1 AND company_id = $2 AND is_active = true FOR UPDATE",
    )
    .bind(cash_box_id)
    .bind(company_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("Cash box"))?;

    let delta = match request.kind {
        MovementKind::Deposit => request.amount_cents,
        MovementKind::Withdrawal => {
            if balance_cents < request.amount_cents {
                tx.rollback().await?;
                return Err(AppError::InsufficientBalance);
            }
            -request.amount_cents
        }
    };

    let new_balance: i64 = sqlx::query_scalar(
        r#"
        UPDATE cash_boxes
        SET balance_cents = balance_cents + $1,
            updated_at = NOW()
        WHERE id = $2
        RETURNING balance_cents
        "#,
    )
    .bind(delta)
    .bind(cash_box_id)
    .fetch_one(&mut *tx)
    .await?;

    let movement = sqlx::query_as::<_, CashMovement>(
        r#"
        INSERT INTO cash_movements (company_id, cash_box_id, kind, amount_cents, description)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, cash_box_id, kind, amount_cents, description, created_at
        "#,
    )
    .bind(company_id)
    .bind(cash_box_id)
    .bind(request.kind.as_str())
    .bind(request.amount_cents)
    .bind(request.description)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        cash_box_id = %cash_box_id,
        kind = request.kind.as_str(),
        amount_cents = request.amount_cents,
        balance_cents = new_balance,
        "cash movement posted"
    );

    Ok(CashMovementReceipt {
        movement,
        balance_cents: new_balance,
    })
}

/// Movements of one cash box, newest first.
pub async fn list_movements(
    pool: &DbPool,
    company_id: Uuid,
    cash_box_id: Uuid,
) -> Result<Vec<CashMovement>, AppError> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM cash_boxes WHERE id = $1 AND company_id = $2)",
    )
    .bind(cash_box_id)
    .bind(company_id)
    .fetch_one(pool)
    .await?;
    if !exists {
        return Err(AppError::NotFound("Cash box"));
    }

    let movements = sqlx::query_as::<_, CashMovement>(
        r#"
        SELECT id, cash_box_id, kind, amount_cents, description, created_at
        FROM cash_movements
        WHERE cash_box_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(cash_box_id)
    .fetch_all(pool)
    .await?;

    Ok(movements)
}
