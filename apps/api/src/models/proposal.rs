use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::rfp::Attachment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Draft,
    Submitted,
    UnderReview,
    Accepted,
    Rejected,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Draft => "draft",
            ProposalStatus::Submitted => "submitted",
            ProposalStatus::UnderReview => "under_review",
            ProposalStatus::Accepted => "accepted",
            ProposalStatus::Rejected => "rejected",
        }
    }

    /// Statuses that take part in comparison and recommendation.
    pub const EVALUABLE: [&'static str; 2] = ["submitted", "under_review"];

    /// Accepted and rejected proposals are frozen.
    pub fn is_decided(&self) -> bool {
        matches!(self, ProposalStatus::Accepted | ProposalStatus::Rejected)
    }
}

impl FromStr for ProposalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(ProposalStatus::Draft),
            "submitted" => Ok(ProposalStatus::Submitted),
            "under_review" => Ok(ProposalStatus::UnderReview),
            "accepted" => Ok(ProposalStatus::Accepted),
            "rejected" => Ok(ProposalStatus::Rejected),
            other => Err(format!("unknown proposal status '{other}'")),
        }
    }
}

/// Where the proposal came from.
pub const SOURCE_PORTAL: &str = "portal";
pub const SOURCE_EMAIL: &str = "email";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub item: String,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub total_price: Option<f64>,
}

/// LLM-derived assessment of a proposal against its RFP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub compliance_score: i32,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProposalRow {
    pub id: Uuid,
    pub rfp_id: Uuid,
    pub vendor_id: Uuid,
    pub cover_letter: String,
    pub technical_proposal: String,
    pub deliverables: String,
    pub total_cost: f64,
    pub currency: String,
    pub cost_breakdown: Json<Vec<LineItem>>,
    pub duration_weeks: Option<i32>,
    pub estimated_start_date: Option<DateTime<Utc>>,
    pub estimated_end_date: Option<DateTime<Utc>>,
    pub attachments: Json<Vec<Attachment>>,
    pub status: String,
    pub source: String,
    pub submitted_at: Option<DateTime<Utc>>,
    pub evaluation_score: Option<i32>,
    pub evaluation_notes: Option<String>,
    pub compliance_score: Option<i32>,
    pub ai_strengths: Vec<String>,
    pub ai_weaknesses: Vec<String>,
    pub ai_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProposalRow {
    pub fn status(&self) -> Option<ProposalStatus> {
        self.status.parse().ok()
    }

    pub fn ai_analysis(&self) -> Option<AiAnalysis> {
        self.compliance_score.map(|score| AiAnalysis {
            compliance_score: score,
            strengths: self.ai_strengths.clone(),
            weaknesses: self.ai_weaknesses.clone(),
            summary: self.ai_summary.clone().unwrap_or_default(),
        })
    }
}

/// Proposal joined with the submitting vendor and the RFP title.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ProposalWithVendor {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub proposal: ProposalRow,
    pub vendor_name: String,
    pub vendor_company: String,
    pub vendor_email: String,
    pub vendor_phone: Option<String>,
    pub rfp_title: String,
}

impl ProposalWithVendor {
    /// Company when present, otherwise the contact name.
    pub fn vendor_label(&self) -> &str {
        if self.vendor_company.trim().is_empty() {
            &self.vendor_name
        } else {
            &self.vendor_company
        }
    }
}

/// Column list for `ProposalWithVendor` queries; expects aliases `p`, `v`, `r`.
pub const PROPOSAL_WITH_VENDOR_COLUMNS: &str = "p.*, v.name AS vendor_name, \
    v.company AS vendor_company, v.email AS vendor_email, v.phone AS vendor_phone, \
    r.title AS rfp_title";
