//! Structured best-proposal recommendation, with a score-based fallback.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::evaluation::prompts::RECOMMENDATION_PROMPT_TEMPLATE;
use crate::evaluation::{combined_score, rank_by_combined_score, timeline_label};
use crate::llm_client::prompts::{fill_template, JSON_ONLY_SYSTEM};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::evaluation::{
    AiOutcome, Alternative, FallbackMetadata, RecommendationOutcome, RecommendationReport,
    Recommendations, TopPick,
};
use crate::models::proposal::ProposalWithVendor;
use crate::models::rfp::RfpRow;

const FAILURE_MESSAGE: &str = "AI recommendation temporarily unavailable";
const MAX_ALTERNATIVES: usize = 2;

const FALLBACK_KEY_POINTS: [&str; 5] = [
    "AI analysis is temporarily unavailable",
    "Recommendations are based solely on compliance and evaluation scores",
    "Manual review of all proposals is strongly recommended",
    "Consider reviewing vendor qualifications, timeline feasibility, and detailed proposals",
    "Contact support if AI analysis continues to fail",
];

#[derive(Debug, Serialize)]
struct RecommendationInput<'a> {
    id: u32,
    vendor: &'a str,
    cost: f64,
    currency: &'a str,
    timeline: String,
    compliance_score: i32,
    evaluation_score: i32,
}

pub fn recommendation_prompt(rfp: &RfpRow, proposals: &[ProposalWithVendor]) -> String {
    let inputs: Vec<RecommendationInput<'_>> = (1u32..)
        .zip(proposals)
        .map(|(id, p)| RecommendationInput {
            id,
            vendor: p.vendor_label(),
            cost: p.proposal.total_cost,
            currency: &p.proposal.currency,
            timeline: timeline_label(p),
            compliance_score: p.proposal.compliance_score.unwrap_or(0),
            evaluation_score: p.proposal.evaluation_score.unwrap_or(0),
        })
        .collect();
    let proposals_json =
        serde_json::to_string_pretty(&inputs).unwrap_or_else(|_| "[]".to_string());

    let budget = rfp.budget_label();
    fill_template(
        RECOMMENDATION_PROMPT_TEMPLATE,
        &[
            ("title", rfp.title.as_str()),
            ("budget", budget.as_str()),
            ("proposals_json", proposals_json.as_str()),
        ],
    )
}

/// Top pick and alternatives by combined score. `None` only for an empty set.
pub fn fallback_recommendation(proposals: &[ProposalWithVendor]) -> Option<RecommendationReport> {
    let ranked = rank_by_combined_score(proposals);
    let (top_id, top) = ranked.first().copied()?;

    let top_pick = TopPick {
        proposal_id: top_id,
        vendor: top.vendor_label().to_string(),
        justification: format!(
            "AI recommendation is temporarily unavailable. This proposal was selected based on the \
             highest combined compliance score ({}) and evaluation score ({}). Please review \
             manually for final decision.",
            top.proposal.compliance_score.unwrap_or(0),
            top.proposal.evaluation_score.unwrap_or(0),
        ),
        automated_selection: true,
        note: Some(
            "This is an automated fallback recommendation. Manual review is strongly recommended."
                .to_string(),
        ),
    };

    let alternatives = ranked
        .iter()
        .skip(1)
        .take(MAX_ALTERNATIVES)
        .map(|(id, p)| Alternative {
            proposal_id: *id,
            vendor: p.vendor_label().to_string(),
            reason: format!(
                "Combined score: {}/200. Cost: {}. Please review detailed proposal information.",
                combined_score(p),
                p.proposal.total_cost
            ),
            automated_selection: true,
        })
        .collect();

    Some(RecommendationReport {
        recommendations: Recommendations {
            top_pick,
            alternatives,
            key_points: FALLBACK_KEY_POINTS.iter().map(|s| s.to_string()).collect(),
        },
        metadata: Some(FallbackMetadata {
            is_fallback: true,
            fallback_reason: "AI service temporarily unavailable".to_string(),
            selection_criteria: "Highest combined compliance and evaluation scores".to_string(),
            generated_at: Utc::now(),
        }),
    })
}

/// Rejects recommendations that point at proposals outside `1..=count`.
fn check_references(report: &RecommendationReport, count: usize) -> Result<(), String> {
    let in_range = |id: u32| id >= 1 && (id as usize) <= count;
    let recs = &report.recommendations;
    if !in_range(recs.top_pick.proposal_id) {
        return Err(format!(
            "top_pick references unknown proposal {}",
            recs.top_pick.proposal_id
        ));
    }
    if let Some(alt) = recs.alternatives.iter().find(|a| !in_range(a.proposal_id)) {
        return Err(format!(
            "alternative references unknown proposal {}",
            alt.proposal_id
        ));
    }
    Ok(())
}

/// `None` only when `proposals` is empty.
pub async fn generate_recommendation(
    llm: &LlmClient,
    rfp: &RfpRow,
    proposals: &[ProposalWithVendor],
) -> Option<RecommendationOutcome> {
    let fallback = fallback_recommendation(proposals)?;
    let prompt = recommendation_prompt(rfp, proposals);

    let generated = llm
        .call_json::<RecommendationReport>(&prompt, JSON_ONLY_SYSTEM)
        .await
        .map_err(|e: LlmError| e.to_string())
        .and_then(|report| check_references(&report, proposals.len()).map(|()| report));

    Some(match generated {
        Ok(mut report) => {
            report.metadata = None;
            info!(
                rfp_id = %rfp.id,
                top_pick = report.recommendations.top_pick.proposal_id,
                "Recommendation generated"
            );
            AiOutcome::generated(report)
        }
        Err(details) => {
            warn!(rfp_id = %rfp.id, "Recommendation fell back to score ranking: {details}");
            AiOutcome::fallback(fallback, FAILURE_MESSAGE, details)
        }
    })
}
