use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RfpStatus {
    Draft,
    Open,
    Closed,
    Awarded,
}

impl RfpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RfpStatus::Draft => "draft",
            RfpStatus::Open => "open",
            RfpStatus::Closed => "closed",
            RfpStatus::Awarded => "awarded",
        }
    }
}

impl FromStr for RfpStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(RfpStatus::Draft),
            "open" => Ok(RfpStatus::Open),
            "closed" => Ok(RfpStatus::Closed),
            "awarded" => Ok(RfpStatus::Awarded),
            other => Err(format!("unknown RFP status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    Pending,
    Sent,
    Failed,
}

impl EmailStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmailStatus::Pending => "pending",
            EmailStatus::Sent => "sent",
            EmailStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationCriterion {
    pub criterion: String,
    pub weight: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
    pub uploaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RfpRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub budget: Option<f64>,
    pub currency: String,
    pub deadline: DateTime<Utc>,
    pub category: Option<String>,
    pub attachments: Json<Vec<Attachment>>,
    pub evaluation_criteria: Json<Vec<EvaluationCriterion>>,
    pub created_by: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RfpRow {
    pub fn status(&self) -> Option<RfpStatus> {
        self.status.parse().ok()
    }

    /// Open and before its deadline.
    pub fn accepts_proposals_at(&self, now: DateTime<Utc>) -> Result<(), String> {
        if self.status() != Some(RfpStatus::Open) {
            return Err(format!(
                "RFP is {} and not accepting proposals",
                self.status
            ));
        }
        if now > self.deadline {
            return Err("RFP deadline has passed".to_string());
        }
        Ok(())
    }

    /// "<budget> <currency>" or "N/A".
    pub fn budget_label(&self) -> String {
        match self.budget {
            Some(budget) => format!("{budget} {}", self.currency),
            None => format!("N/A {}", self.currency),
        }
    }
}

/// A vendor the RFP was sent to.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecipientRow {
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub vendor_email: String,
    pub vendor_company: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub email_status: String,
}

/// Buyer reference embedded in RFP responses.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BuyerRef {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub company: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RfpDetail {
    #[serde(flatten)]
    pub rfp: RfpRow,
    pub created_by_user: Option<BuyerRef>,
    pub sent_to: Vec<RecipientRow>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::make_rfp;
    use chrono::Duration;

    #[test]
    fn test_open_rfp_before_deadline_accepts_proposals() {
        let now = Utc::now();
        let rfp = make_rfp("open", now + Duration::days(3));
        assert!(rfp.accepts_proposals_at(now).is_ok());
    }

    #[test]
    fn test_closed_rfp_rejects_proposals() {
        let now = Utc::now();
        let rfp = make_rfp("closed", now + Duration::days(3));
        let err = rfp.accepts_proposals_at(now).unwrap_err();
        assert_eq!(err, "RFP is closed and not accepting proposals");
    }

    #[test]
    fn test_past_deadline_rejects_proposals() {
        let now = Utc::now();
        let rfp = make_rfp("open", now - Duration::hours(1));
        assert_eq!(
            rfp.accepts_proposals_at(now).unwrap_err(),
            "RFP deadline has passed"
        );
    }

    #[test]
    fn test_budget_label() {
        let mut rfp = make_rfp("open", Utc::now());
        assert_eq!(rfp.budget_label(), "50000 USD");
        rfp.budget = None;
        assert_eq!(rfp.budget_label(), "N/A USD");
    }
}
