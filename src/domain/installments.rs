//! Installment schedules generated from payment-term templates.
//!
//! A payment term says "split the total into N installments, one every
//! <frequency>, the first one K days after the invoice". Percentages are
//! optional and kept in basis points (10000 = 100%).

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

/// 100% expressed in basis points.
pub const FULL_BASIS_POINTS: i32 = 10_000;

/// Upper bound on installments per term (ten years of monthly payments).
pub const MAX_INSTALLMENTS: i32 = 120;

/// How far apart consecutive installments fall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_frequency", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Frequency {
    /// Due date of the installment `steps` periods after `start`.
    ///
    /// Month-based frequencies clamp to the last day of shorter months.
    pub fn advance(self, start: NaiveDate, steps: u32) -> Option<NaiveDate> {
        match self {
            Frequency::Weekly => start.checked_add_days(Days::new(7 * u64::from(steps))),
            Frequency::Biweekly => start.checked_add_days(Days::new(14 * u64::from(steps))),
            Frequency::Monthly => start.checked_add_months(Months::new(steps)),
            Frequency::Quarterly => start.checked_add_months(Months::new(3 * steps)),
            Frequency::Yearly => start.checked_add_months(Months::new(12 * steps)),
        }
    }
}

/// Errors raised while validating a term or building its schedule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("installment count must be between 1 and {MAX_INSTALLMENTS}")]
    InvalidCount,

    #[error("first due offset cannot be negative")]
    NegativeOffset,

    #[error("expected {expected} percentages, got {actual}")]
    PercentageCountMismatch { expected: usize, actual: usize },

    #[error("every percentage must be positive")]
    NonPositivePercentage,

    #[error("every percentage must be a number no greater than 100")]
    PercentageOutOfRange,

    #[error("percentages must sum to 100 (got {0} basis points)")]
    PercentageSum(i64),

    #[error("total is too large to split")]
    TotalTooLarge,

    #[error("total must be positive and at least one cent per installment")]
    TotalTooSmall,

    #[error("due date out of range")]
    DateOutOfRange,
}

/// The parts of a payment term that shape a schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermTemplate {
    pub installment_count: i32,
    pub frequency: Frequency,
    pub first_due_offset_days: i32,
    /// Basis points per installment; `None` means equal split
    pub percentages: Option<Vec<i32>>,
}

/// One generated installment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Installment {
    /// 1-based position within the schedule
    pub number: i32,
    pub due_date: NaiveDate,
    pub amount_cents: i64,
}

/// Convert a list of percentages (e.g. `33.33`) into basis points.
///
/// Values must be finite and within `0..=100` before the cast so they can
/// never saturate.
pub fn percentages_to_basis_points(percentages: &[f64]) -> Result<Vec<i32>, ScheduleError> {
    percentages
        .iter()
        .map(|p| {
            if !p.is_finite() || *p > 100.0 {
                return Err(ScheduleError::PercentageOutOfRange);
            }
            if *p <= 0.0 {
                return Err(ScheduleError::NonPositivePercentage);
            }
            Ok((p * 100.0).round() as i32)
        })
        .collect()
}

/// Check a term's shape before it is stored or used.
pub fn validate_term(term: &TermTemplate) -> Result<(), ScheduleError> {
    if term.installment_count < 1 || term.installment_count > MAX_INSTALLMENTS {
        return Err(ScheduleError::InvalidCount);
    }
    if term.first_due_offset_days < 0 {
        return Err(ScheduleError::NegativeOffset);
    }
    if let Some(ref percentages) = term.percentages {
        validate_percentages(term.installment_count as usize, percentages)?;
    }
    Ok(())
}

/// Percentages need one entry per installment, all positive, summing to 100%.
pub fn validate_percentages(count: usize, basis_points: &[i32]) -> Result<(), ScheduleError> {
    if basis_points.len() != count {
        return Err(ScheduleError::PercentageCountMismatch {
            expected: count,
            actual: basis_points.len(),
        });
    }
    if basis_points.iter().any(|bp| *bp <= 0) {
        return Err(ScheduleError::NonPositivePercentage);
    }
    if basis_points.iter().any(|bp| *bp > FULL_BASIS_POINTS) {
        return Err(ScheduleError::PercentageOutOfRange);
    }
    let sum: i64 = basis_points.iter().map(|bp| i64::from(*bp)).sum();
    if sum != i64::from(FULL_BASIS_POINTS) {
        return Err(ScheduleError::PercentageSum(sum));
    }
    Ok(())
}

/// Split `total_cents` across the term's installments.
///
/// Every share is floored and the last installment absorbs the remainder, so
/// the amounts always add up to the total.
pub fn split_amount(total_cents: i64, term: &TermTemplate) -> Result<Vec<i64>, ScheduleError> {
    let count = term.installment_count as i64;
    if total_cents <= 0 || total_cents < count {
        return Err(ScheduleError::TotalTooSmall);
    }

    let mut amounts: Vec<i64> = match term.percentages {
        Some(ref bps) => bps
            .iter()
            .map(|bp| {
                let share = i128::from(total_cents) * i128::from(*bp)
                    / i128::from(FULL_BASIS_POINTS);
                i64::try_from(share).map_err(|_| ScheduleError::TotalTooLarge)
            })
            .collect::<Result<_, _>>()?,
        None => vec![total_cents / count; count as usize],
    };

    let assigned = amounts
        .iter()
        .try_fold(0i64, |acc, a| acc.checked_add(*a))
        .ok_or(ScheduleError::TotalTooLarge)?;
    if let Some(last) = amounts.last_mut() {
        *last += total_cents - assigned;
    }

    // Tiny percentages of a tiny total can floor to zero
    if amounts.iter().any(|a| *a <= 0) {
        return Err(ScheduleError::TotalTooSmall);
    }
    Ok(amounts)
}

/// Build the full schedule for an invoice issued on `issue_date`.
pub fn generate_schedule(
    total_cents: i64,
    issue_date: NaiveDate,
    term: &TermTemplate,
) -> Result<Vec<Installment>, ScheduleError> {
    validate_term(term)?;
    let amounts = split_amount(total_cents, term)?;

    let first_due = issue_date
        .checked_add_days(Days::new(term.first_due_offset_days as u64))
        .ok_or(ScheduleError::DateOutOfRange)?;

    amounts
        .into_iter()
        .enumerate()
        .map(|(index, amount_cents)| {
            let due_date = term
                .frequency
                .advance(first_due, index as u32)
                .ok_or(ScheduleError::DateOutOfRange)?;
            Ok(Installment {
                number: index as i32 + 1,
                due_date,
                amount_cents,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly(count: i32, percentages: Option<Vec<i32>>) -> TermTemplate {
        TermTemplate {
            installment_count: count,
            frequency: Frequency::Monthly,
            first_due_offset_days: 30,
            percentages,
        }
    }

    #[test]
    fn equal_split_puts_remainder_on_last_installment() {
        let schedule = generate_schedule(100_000, date(2025, 1, 15), &monthly(3, None)).unwrap();

        let amounts: Vec<i64> = schedule.iter().map(|i| i.amount_cents).collect();
        assert_eq!(amounts, vec![33_333, 33_333, 33_334]);
        assert_eq!(amounts.iter().sum::<i64>(), 100_000);
    }

    #[test]
    fn due_dates_start_after_offset_and_advance_monthly() {
        let schedule = generate_schedule(90_000, date(2025, 1, 1), &monthly(3, None)).unwrap();

        let dates: Vec<NaiveDate> = schedule.iter().map(|i| i.due_date).collect();
        assert_eq!(dates, vec![date(2025, 1, 31), date(2025, 2, 28), date(2025, 3, 31)]);
        assert_eq!(
            schedule.iter().map(|i| i.number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn weekly_and_yearly_frequencies() {
        let start = date(2024, 2, 29);
        assert_eq!(Frequency::Weekly.advance(start, 2), Some(date(2024, 3, 14)));
        assert_eq!(Frequency::Biweekly.advance(start, 1), Some(date(2024, 3, 14)));
        assert_eq!(Frequency::Quarterly.advance(start, 1), Some(date(2024, 5, 29)));
        assert_eq!(Frequency::Yearly.advance(start, 1), Some(date(2025, 2, 28)));
    }

    #[test]
    fn percentage_split_follows_weights() {
        let term = monthly(3, Some(vec![5_000, 3_000, 2_000]));
        let schedule = generate_schedule(123_457, date(2025, 5, 1), &term).unwrap();

        let amounts: Vec<i64> = schedule.iter().map(|i| i.amount_cents).collect();
        assert_eq!(amounts, vec![61_728, 37_037, 24_692]);
        assert_eq!(amounts.iter().sum::<i64>(), 123_457);
    }

    #[test]
    fn percentages_must_sum_to_one_hundred() {
        assert_eq!(
            validate_percentages(2, &[5_000, 4_000]),
            Err(ScheduleError::PercentageSum(9_000))
        );
        assert_eq!(
            validate_percentages(3, &[5_000, 5_000]),
            Err(ScheduleError::PercentageCountMismatch {
                expected: 3,
                actual: 2
            })
        );
        assert_eq!(
            validate_percentages(2, &[10_000, 0]),
            Err(ScheduleError::NonPositivePercentage)
        );
        assert!(validate_percentages(3, &[3_333, 3_333, 3_334]).is_ok());
    }

    #[test]
    fn decimal_percentages_convert_to_basis_points() {
        assert_eq!(
            percentages_to_basis_points(&[33.33, 33.33, 33.34]),
            Ok(vec![3_333, 3_333, 3_334])
        );
    }

    #[test]
    fn oversized_percentages_cannot_wrap_into_a_valid_sum() {
        // Each would saturate to i32::MAX and an i32 sum would wrap to 10000
        assert_eq!(
            percentages_to_basis_points(&[21474836.47, 21474836.47, 100.02]),
            Err(ScheduleError::PercentageOutOfRange)
        );
        assert_eq!(
            validate_percentages(3, &[i32::MAX, i32::MAX, 10_002]),
            Err(ScheduleError::PercentageOutOfRange)
        );
        assert_eq!(
            percentages_to_basis_points(&[f64::NAN]),
            Err(ScheduleError::PercentageOutOfRange)
        );
        assert_eq!(
            percentages_to_basis_points(&[f64::INFINITY]),
            Err(ScheduleError::PercentageOutOfRange)
        );
        assert_eq!(
            percentages_to_basis_points(&[-5.0]),
            Err(ScheduleError::NonPositivePercentage)
        );
    }

    #[test]
    fn huge_totals_split_without_overflow() {
        let term = monthly(2, Some(vec![5_000, 5_000]));
        assert_eq!(
            split_amount(2_000_000_000_000_000, &term),
            Ok(vec![1_000_000_000_000_000, 1_000_000_000_000_000])
        );
        assert_eq!(
            split_amount(i64::MAX, &term),
            Ok(vec![i64::MAX / 2, i64::MAX / 2 + 1])
        );
    }

    #[test]
    fn rejects_invalid_terms_and_totals() {
        assert_eq!(
            generate_schedule(1_000, date(2025, 1, 1), &monthly(0, None)),
            Err(ScheduleError::InvalidCount)
        );
        assert_eq!(
            generate_schedule(2, date(2025, 1, 1), &monthly(3, None)),
            Err(ScheduleError::TotalTooSmall)
        );
        let mut term = monthly(1, None);
        term.first_due_offset_days = -1;
        assert_eq!(
            generate_schedule(1_000, date(2025, 1, 1), &term),
            Err(ScheduleError::NegativeOffset)
        );
    }

    #[test]
    fn single_installment_takes_everything() {
        let mut term = monthly(1, None);
        term.first_due_offset_days = 0;
        let schedule = generate_schedule(4_999, date(2025, 8, 8), &term).unwrap();
        assert_eq!(
            schedule,
            vec![Installment {
                number: 1,
                due_date: date(2025, 8, 8),
                amount_cents: 4_999
            }]
        );
    }
}
