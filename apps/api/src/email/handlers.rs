//! Inbound email webhook: turns a vendor's reply into a stored proposal.

use std::collections::HashMap;

use axum::{
    async_trait,
    extract::{FromRequest, Request, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    Form, Json,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::email::inbound::normalize;
use crate::email::parser::{parse_proposal_email, validate_parsed, VendorInfo};
use crate::errors::AppError;
use crate::models::proposal::SOURCE_EMAIL;
use crate::models::vendor::VendorRow;
use crate::proposals::lifecycle::{analyze_and_store, attach_files, invalidate_evaluation, notify_buyer};
use crate::proposals::store::{self as proposal_store, NewProposal};
use crate::rfps::store as rfp_store;
use crate::state::AppState;
use crate::storage::store_attachments;
use crate::vendors::store::{self as vendor_store, NewVendor};

const SECRET_HEADER: &str = "x-inbound-secret";
const UNKNOWN_COMPANY: &str = "Unknown Company";

/// Webhook body as JSON, whether it was posted as JSON or as a URL-encoded form.
pub struct InboundBody(pub Value);

#[async_trait]
impl FromRequest<AppState> for InboundBody {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let is_form = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/x-www-form-urlencoded"));

        if is_form {
            let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            let object = fields
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect();
            Ok(InboundBody(Value::Object(object)))
        } else {
            let Json(value) = Json::<Value>::from_request(req, state)
                .await
                .map_err(|e| AppError::Validation(e.body_text()))?;
            Ok(InboundBody(value))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct InboundVendor {
    pub id: Uuid,
    pub name: String,
    pub company: String,
}

#[derive(Debug, Serialize)]
pub struct InboundResponse {
    pub message: String,
    pub proposal_id: Uuid,
    pub rfp_id: Uuid,
    pub vendor: InboundVendor,
    pub provider: &'static str,
    pub warnings: Vec<String>,
}

fn check_secret(expected: Option<&str>, headers: &HeaderMap) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let presented = headers.get(SECRET_HEADER).and_then(|v| v.to_str().ok());
    if presented != Some(expected) {
        return Err(AppError::Unauthorized(
            "Invalid inbound email secret".to_string(),
        ));
    }
    Ok(())
}

/// Name and company for a vendor first seen through email.
fn new_vendor_identity(info: &VendorInfo, email: &str) -> (String, String) {
    let name = info
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| email.split('@').next().unwrap_or(email).to_string());
    let company = info
        .company
        .clone()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_COMPANY.to_string());
    (name, company)
}

/// Finds the sender's vendor record, creating one owned by the RFP's buyer if needed.
async fn resolve_vendor(
    state: &AppState,
    info: &VendorInfo,
    email: &str,
    created_by: Uuid,
) -> Result<VendorRow, AppError> {
    if let Some(vendor) = vendor_store::find_by_email(&state.db, email).await? {
        return Ok(vendor);
    }

    let (name, company) = new_vendor_identity(info, email);
    let created = vendor_store::insert(
        &state.db,
        NewVendor {
            name: &name,
            email,
            company: &company,
            phone: info.phone.as_deref(),
            address: None,
            categories: &[],
            website: None,
            user_id: None,
            created_by,
        },
    )
    .await;

    match created {
        Ok(vendor) => {
            info!(vendor_id = %vendor.id, %email, "Vendor created from inbound email");
            Ok(vendor)
        }
        // Another request created the same vendor first.
        Err(e) if is_unique_violation(&e) => vendor_store::find_by_email(&state.db, email)
            .await?
            .ok_or_else(|| AppError::Conflict("Vendor email already exists".to_string())),
        Err(e) => Err(e.into()),
    }
}

/// POST /api/email/inbound
pub async fn handle_inbound_email(
    State(state): State<AppState>,
    headers: HeaderMap,
    InboundBody(body): InboundBody,
) -> Result<(StatusCode, Json<InboundResponse>), AppError> {
    check_secret(state.config.inbound_email_secret.as_deref(), &headers)?;

    let (provider, email) = normalize(&body, &headers);
    info!(provider = provider.as_str(), from = ?email.from, subject = %email.subject, "Inbound email received");

    let parsed = parse_proposal_email(&email);
    let report = validate_parsed(&parsed);
    if !report.is_valid() {
        warn!(errors = ?report.errors, "Inbound email rejected");
        return Err(AppError::Validation(format!(
            "Failed to parse proposal email: {}",
            report.errors.join("; ")
        )));
    }

    let (Some(rfp_id), Some(sender)) = (parsed.rfp_id, parsed.vendor.email.as_deref()) else {
        return Err(AppError::Validation(
            "Failed to parse proposal email".to_string(),
        ));
    };
    let sender = sender.trim().to_lowercase();

    let rfp = rfp_store::find_by_id(&state.db, rfp_id)
        .await?
        .ok_or_else(|| AppError::NotFound("RFP not found".to_string()))?;
    rfp.accepts_proposals_at(Utc::now())
        .map_err(AppError::Validation)?;

    let vendor = resolve_vendor(&state, &parsed.vendor, &sender, rfp.created_by).await?;
    if proposal_store::exists_for(&state.db, rfp.id, vendor.id).await? {
        return Err(AppError::Validation(
            "Vendor has already submitted a proposal for this RFP".to_string(),
        ));
    }

    let proposal = proposal_store::insert(
        &state.db,
        NewProposal {
            rfp_id: rfp.id,
            vendor_id: vendor.id,
            cover_letter: &parsed.sections.cover_letter,
            technical_proposal: &parsed.sections.technical_proposal,
            deliverables: "",
            total_cost: parsed.pricing.total_cost,
            currency: &parsed.pricing.currency,
            cost_breakdown: &[],
            duration_weeks: parsed.timeline.duration_weeks(),
            estimated_start_date: parsed.timeline.start_date,
            estimated_end_date: parsed.timeline.end_date,
            attachments: &[],
            source: SOURCE_EMAIL,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Validation("Vendor has already submitted a proposal for this RFP".to_string())
        } else {
            AppError::Database(e)
        }
    })?;

    if !parsed.attachments.is_empty() {
        let stored = store_attachments(
            &state.s3,
            &state.config.s3_bucket,
            proposal.id,
            &parsed.attachments,
        )
        .await;
        attach_files(&state.db, proposal.id, &stored).await;
    }

    info!(proposal_id = %proposal.id, rfp_id = %rfp.id, vendor_id = %vendor.id, "Proposal created from email");

    invalidate_evaluation(&state, rfp.id).await;

    {
        let state = state.clone();
        let rfp = rfp.clone();
        let proposal = proposal.clone();
        tokio::spawn(async move {
            analyze_and_store(&state, &rfp, &proposal).await;
        });
    }

    if let Some(with_vendor) = proposal_store::find_with_vendor(&state.db, proposal.id).await? {
        notify_buyer(&state, &rfp, &with_vendor).await;
    }

    Ok((
        StatusCode::CREATED,
        Json(InboundResponse {
            message: "Proposal received and processed".to_string(),
            proposal_id: proposal.id,
            rfp_id: rfp.id,
            vendor: InboundVendor {
                id: vendor.id,
                name: vendor.name,
                company: vendor.company,
            },
            provider: provider.as_str(),
            warnings: report.warnings,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_secret_not_configured_allows_all() {
        assert!(check_secret(None, &HeaderMap::new()).is_ok());
    }

    #[test]
    fn test_secret_must_match() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            check_secret(Some("s3cret"), &headers),
            Err(AppError::Unauthorized(_))
        ));

        headers.insert(SECRET_HEADER, HeaderValue::from_static("wrong"));
        assert!(check_secret(Some("s3cret"), &headers).is_err());

        headers.insert(SECRET_HEADER, HeaderValue::from_static("s3cret"));
        assert!(check_secret(Some("s3cret"), &headers).is_ok());
    }

    #[test]
    fn test_new_vendor_defaults_from_address() {
        let (name, company) = new_vendor_identity(&VendorInfo::default(), "jane.doe@globex.test");
        assert_eq!(name, "jane.doe");
        assert_eq!(company, UNKNOWN_COMPANY);
    }

    #[test]
    fn test_new_vendor_prefers_signature() {
        let info = VendorInfo {
            name: Some("Jane Doe".to_string()),
            company: Some("Globex Ltd".to_string()),
            ..Default::default()
        };
        let (name, company) = new_vendor_identity(&info, "jane@globex.test");
        assert_eq!(name, "Jane Doe");
        assert_eq!(company, "Globex Ltd");
    }
}
