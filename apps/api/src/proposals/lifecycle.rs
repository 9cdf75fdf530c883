//! Side effects that follow a change to an RFP's proposal set.
//!
//! None of these fail the request that triggered them: errors are logged.

use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::email::mailer::{MailError, Mailer};
use crate::email::templates::{proposal_received, ProposalNotice};
use crate::evaluation::store as evaluation_store;
use crate::models::proposal::{AiAnalysis, ProposalRow, ProposalWithVendor};
use crate::models::rfp::{Attachment, BuyerRef, RfpRow};
use crate::proposals::analysis::analyze_proposal;
use crate::proposals::store;
use crate::rfps::store as rfp_store;
use crate::state::AppState;

/// Runs the compliance analysis and stores it on the proposal.
pub async fn analyze_and_store(state: &AppState, rfp: &RfpRow, proposal: &ProposalRow) -> AiAnalysis {
    let analysis = analyze_proposal(&state.llm, rfp, proposal).await;
    match store::save_analysis(&state.db, proposal.id, &analysis).await {
        Ok(()) => info!(
            proposal_id = %proposal.id,
            compliance_score = analysis.compliance_score,
            "Proposal analysis stored"
        ),
        Err(e) => warn!(proposal_id = %proposal.id, "Failed to store proposal analysis: {e}"),
    }
    analysis
}

/// Flags the RFP's cached evaluation so the next request regenerates it.
pub async fn invalidate_evaluation(state: &AppState, rfp_id: Uuid) {
    mark_evaluation_outdated(&state.db, rfp_id).await;
}

async fn mark_evaluation_outdated(pool: &PgPool, rfp_id: Uuid) {
    match evaluation_store::mark_outdated(pool, rfp_id).await {
        Ok(true) => info!(%rfp_id, "Evaluation marked outdated"),
        Ok(false) => {}
        Err(e) => warn!(%rfp_id, "Failed to mark evaluation outdated: {e}"),
    }
}

/// Stores the buyer's score; a new score changes the ranking, so the evaluation goes stale.
pub async fn record_review(
    pool: &PgPool,
    rfp_id: Uuid,
    proposal_id: Uuid,
    score: i32,
    notes: Option<&str>,
) -> Result<Option<ProposalRow>, sqlx::Error> {
    let reviewed = store::record_review(pool, proposal_id, score, notes).await?;
    if reviewed.is_some() {
        mark_evaluation_outdated(pool, rfp_id).await;
    }
    Ok(reviewed)
}

/// Links uploaded attachments to a new proposal. The proposal stands even if this fails.
pub async fn attach_files(pool: &PgPool, proposal_id: Uuid, attachments: &[Attachment]) -> bool {
    match store::set_attachments(pool, proposal_id, attachments).await {
        Ok(()) => true,
        Err(e) => {
            warn!(%proposal_id, count = attachments.len(), "Failed to record proposal attachments: {e}");
            false
        }
    }
}

pub async fn send_proposal_notice(
    mailer: &dyn Mailer,
    buyer: &BuyerRef,
    proposal: &ProposalWithVendor,
) -> Result<(), MailError> {
    let notice = ProposalNotice {
        rfp_title: &proposal.rfp_title,
        vendor_name: &proposal.vendor_name,
        vendor_company: &proposal.vendor_company,
        vendor_email: &proposal.vendor_email,
        total_cost: proposal.proposal.total_cost,
        currency: &proposal.proposal.currency,
        submitted_at: proposal
            .proposal
            .submitted_at
            .unwrap_or(proposal.proposal.created_at),
    };
    let mut message = proposal_received(&buyer.email, &notice)?;
    message.to_name = buyer.name.clone();
    mailer.send(&message).await
}

/// Emails the RFP owner about a new proposal.
pub async fn notify_buyer(state: &AppState, rfp: &RfpRow, proposal: &ProposalWithVendor) {
    let buyer = match rfp_store::find_buyer(&state.db, rfp.created_by).await {
        Ok(Some(buyer)) => buyer,
        Ok(None) => {
            warn!(rfp_id = %rfp.id, "RFP owner not found; skipping proposal notification");
            return;
        }
        Err(e) => {
            warn!(rfp_id = %rfp.id, "Failed to load RFP owner: {e}");
            return;
        }
    };

    match send_proposal_notice(state.mailer.as_ref(), &buyer, proposal).await {
        Ok(()) => info!(proposal_id = %proposal.proposal.id, to = %buyer.email, "Buyer notified of proposal"),
        Err(e) => warn!(proposal_id = %proposal.proposal.id, "Buyer notification failed: {e}"),
    }
}
