//! Payment term (installment template) models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use uuid::Uuid;

use crate::domain::installments::{
    self, Frequency, FULL_BASIS_POINTS, ScheduleError, TermTemplate,
};

/// Represents a payment term record from the database.
///
/// `percentages` is a JSONB array of basis points, or NULL for an equal split.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PaymentTerm {
    pub id: Uuid,
    pub name: String,
    pub installment_count: i32,
    pub frequency: Frequency,
    pub first_due_offset_days: i32,
    pub percentages: Option<Json<Vec<i32>>>,
    pub created_at: DateTime<Utc>,
}

impl PaymentTerm {
    pub fn template(&self) -> TermTemplate {
        TermTemplate {
            installment_count: self.installment_count,
            frequency: self.frequency,
            first_due_offset_days: self.first_due_offset_days,
            percentages: self.percentages.as_ref().map(|p| p.0.clone()),
        }
    }
}

/// Request body for `POST /api/payment-terms`.
///
/// Percentages are plain numbers (`33.33`) and must add up to 100.
///
/// ```json
/// {
///   "name": "3 cuotas mensuales",
///   "installment_count": 3,
///   "frequency": "MONTHLY",
///   "first_due_offset_days": 30,
///   "percentages": [40, 30, 30]
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CreatePaymentTermRequest {
    pub name: String,
    pub installment_count: i32,
    pub frequency: Frequency,
    #[serde(default)]
    pub first_due_offset_days: i32,
    pub percentages: Option<Vec<f64>>,
}

impl CreatePaymentTermRequest {
    /// Validate and convert into the domain template.
    pub fn to_template(&self) -> Result<TermTemplate, ScheduleError> {
        let template = TermTemplate {
            installment_count: self.installment_count,
            frequency: self.frequency,
            first_due_offset_days: self.first_due_offset_days,
            percentages: self
                .percentages
                .as_deref()
                .map(installments::percentages_to_basis_points)
                .transpose()?,
        };
        installments::validate_term(&template)?;
        Ok(template)
    }
}

#[derive(Debug, Serialize)]
pub struct PaymentTermResponse {
    pub id: Uuid,
    pub name: String,
    pub installment_count: i32,
    pub frequency: Frequency,
    pub first_due_offset_days: i32,
    /// Percent per installment, e.g. `[40.0, 30.0, 30.0]`
    pub percentages: Option<Vec<f64>>,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentTerm> for PaymentTermResponse {
    fn from(term: PaymentTerm) -> Self {
        let scale = f64::from(FULL_BASIS_POINTS) / 100.0;
        Self {
            id: term.id,
            name: term.name,
            installment_count: term.installment_count,
            frequency: term.frequency,
            first_due_offset_days: term.first_due_offset_days,
            percentages: term
                .percentages
                .map(|p| p.0.iter().map(|bp| f64::from(*bp) / scale).collect()),
            created_at: term.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_converts_percentages_to_basis_points() {
        let request: CreatePaymentTermRequest = serde_json::from_str(
            r#"{"name":"3 cuotas","installment_count":3,"frequency":"MONTHLY","percentages":[40,30,30]}"#,
        )
        .unwrap();
        let template = request.to_template().unwrap();
        assert_eq!(template.percentages, Some(vec![4_000, 3_000, 3_000]));
        assert_eq!(template.first_due_offset_days, 0);
    }

    #[test]
    fn request_with_bad_percentages_is_rejected() {
        let request: CreatePaymentTermRequest = serde_json::from_str(
            r#"{"name":"2 cuotas","installment_count":2,"frequency":"WEEKLY","percentages":[60,30]}"#,
        )
        .unwrap();
        assert_eq!(
            request.to_template(),
            Err(ScheduleError::PercentageSum(9_000))
        );
    }

    #[test]
    fn request_with_saturating_percentages_is_rejected() {
        let request: CreatePaymentTermRequest = serde_json::from_str(
            r#"{"name":"x","installment_count":3,"frequency":"MONTHLY","percentages":[21474836.47,21474836.47,100.02]}"#,
        )
        .unwrap();
        assert_eq!(
            request.to_template(),
            Err(ScheduleError::PercentageOutOfRange)
        );
    }

    #[test]
    fn response_reports_percent_values() {
        let term = PaymentTerm {
            id: Uuid::new_v4(),
            name: "50/50".to_string(),
            installment_count: 2,
            frequency: Frequency::Biweekly,
            first_due_offset_days: 0,
            percentages: Some(Json(vec![5_000, 5_000])),
            created_at: Utc::now(),
        };
        let response = PaymentTermResponse::from(term);
        assert_eq!(response.percentages, Some(vec![50.0, 50.0]));
    }
}
