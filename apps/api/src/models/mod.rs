pub mod evaluation;
pub mod proposal;
pub mod rfp;
pub mod user;
pub mod vendor;

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{DateTime, Utc};
    use sqlx::types::Json;
    use uuid::Uuid;

    use super::proposal::{ProposalRow, ProposalWithVendor};
    use super::rfp::RfpRow;

    pub fn make_rfp(status: &str, deadline: DateTime<Utc>) -> RfpRow {
        RfpRow {
            id: Uuid::new_v4(),
            title: "Office laptops".to_string(),
            description: "Laptops for the new office".to_string(),
            requirements: "50 laptops, 16GB RAM, 3 year warranty".to_string(),
            budget: Some(50_000.0),
            currency: "USD".to_string(),
            deadline,
            category: Some("hardware".to_string()),
            attachments: Json(vec![]),
            evaluation_criteria: Json(vec![]),
            created_by: Uuid::new_v4(),
            status: status.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn make_proposal(
        vendor_company: &str,
        total_cost: f64,
        compliance_score: Option<i32>,
        evaluation_score: Option<i32>,
    ) -> ProposalWithVendor {
        ProposalWithVendor {
            proposal: ProposalRow {
                id: Uuid::new_v4(),
                rfp_id: Uuid::new_v4(),
                vendor_id: Uuid::new_v4(),
                cover_letter: "We are pleased to respond.".to_string(),
                technical_proposal: "We will deliver 50 laptops.".to_string(),
                deliverables: "50 laptops".to_string(),
                total_cost,
                currency: "USD".to_string(),
                cost_breakdown: Json(vec![]),
                duration_weeks: Some(4),
                estimated_start_date: None,
                estimated_end_date: None,
                attachments: Json(vec![]),
                status: "submitted".to_string(),
                source: "portal".to_string(),
                submitted_at: Some(Utc::now()),
                evaluation_score,
                evaluation_notes: None,
                compliance_score,
                ai_strengths: vec![],
                ai_weaknesses: vec![],
                ai_summary: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            vendor_name: format!("{vendor_company} Contact"),
            vendor_company: vendor_company.to_string(),
            vendor_email: "sales@example.com".to_string(),
            vendor_phone: None,
            rfp_title: "Office laptops".to_string(),
        }
    }
}
