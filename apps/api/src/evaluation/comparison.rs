//! Free-text comparison of an RFP's proposals, with a score-ranked markdown fallback.

use std::fmt::Write;

use serde::Serialize;
use tracing::{info, warn};

use crate::evaluation::prompts::COMPARISON_PROMPT_TEMPLATE;
use crate::evaluation::{combined_score, rank_by_combined_score, timeline_label};
use crate::llm_client::prompts::{fill_template, truncate_text, PROCUREMENT_OFFICER_SYSTEM};
use crate::llm_client::LlmClient;
use crate::models::evaluation::{AiOutcome, ComparisonOutcome};
use crate::models::proposal::ProposalWithVendor;
use crate::models::rfp::RfpRow;

const REQUIREMENTS_MAX_CHARS: usize = 500;
const FAILURE_MESSAGE: &str = "AI comparison temporarily unavailable";

/// What the model sees of each proposal. `id` is the 1-based position.
#[derive(Debug, Serialize)]
pub struct ProposalSummary<'a> {
    pub id: u32,
    pub vendor: &'a str,
    pub cost: f64,
    pub currency: &'a str,
    pub timeline: String,
    pub compliance_score: i32,
    pub strengths: &'a [String],
    pub weaknesses: &'a [String],
}

pub fn summarize(proposals: &[ProposalWithVendor]) -> Vec<ProposalSummary<'_>> {
    (1u32..)
        .zip(proposals)
        .map(|(id, p)| ProposalSummary {
            id,
            vendor: p.vendor_label(),
            cost: p.proposal.total_cost,
            currency: &p.proposal.currency,
            timeline: timeline_label(p),
            compliance_score: p.proposal.compliance_score.unwrap_or(0),
            strengths: &p.proposal.ai_strengths[..p.proposal.ai_strengths.len().min(3)],
            weaknesses: &p.proposal.ai_weaknesses[..p.proposal.ai_weaknesses.len().min(2)],
        })
        .collect()
}

pub fn comparison_prompt(rfp: &RfpRow, proposals: &[ProposalWithVendor]) -> String {
    let proposals_json =
        serde_json::to_string_pretty(&summarize(proposals)).unwrap_or_else(|_| "[]".to_string());
    let budget = rfp.budget_label();
    let requirements = truncate_text(&rfp.requirements, REQUIREMENTS_MAX_CHARS);
    fill_template(
        COMPARISON_PROMPT_TEMPLATE,
        &[
            ("title", rfp.title.as_str()),
            ("budget", budget.as_str()),
            ("requirements", requirements.as_str()),
            ("proposals_json", proposals_json.as_str()),
        ],
    )
}

/// Deterministic markdown ranking by combined score.
pub fn fallback_comparison(rfp: &RfpRow, proposals: &[ProposalWithVendor]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Proposal Comparison for {}\n", rfp.title);
    let _ = writeln!(
        out,
        "Note: This is an automated fallback comparison. AI analysis is temporarily unavailable.\n"
    );
    let _ = writeln!(out, "## Budget: {}\n", rfp.budget_label());
    let _ = writeln!(out, "## Proposals Summary\n");

    for (rank, (_, p)) in (1..).zip(rank_by_combined_score(proposals)) {
        let _ = writeln!(out, "### {rank}. {}", p.vendor_label());
        let _ = writeln!(
            out,
            "- **Cost:** {} {}",
            p.proposal.total_cost, p.proposal.currency
        );
        let _ = writeln!(out, "- **Timeline:** {}", timeline_label(p));
        let _ = writeln!(
            out,
            "- **Compliance Score:** {}/100",
            p.proposal.compliance_score.unwrap_or(0)
        );
        let _ = writeln!(
            out,
            "- **Evaluation Score:** {}/100",
            p.proposal.evaluation_score.unwrap_or(0)
        );
        let _ = writeln!(out, "- **Combined Score:** {}/200\n", combined_score(p));
    }

    let _ = writeln!(out, "## Recommendation");
    let _ = writeln!(
        out,
        "Please review the proposals manually and use the detailed proposal information to make an informed decision."
    );
    out
}

pub async fn compare_proposals(
    llm: &LlmClient,
    rfp: &RfpRow,
    proposals: &[ProposalWithVendor],
) -> ComparisonOutcome {
    let prompt = comparison_prompt(rfp, proposals);
    match llm.call_text(&prompt, PROCUREMENT_OFFICER_SYSTEM).await {
        Ok(text) => {
            info!(rfp_id = %rfp.id, proposals = proposals.len(), "Comparison generated");
            AiOutcome::generated(text)
        }
        Err(e) => {
            warn!(rfp_id = %rfp.id, "Comparison fell back to score ranking: {e}");
            AiOutcome::fallback(fallback_comparison(rfp, proposals), FAILURE_MESSAGE, e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{rejecting, replying};
    use crate::models::fixtures::{make_proposal, make_rfp};
    use chrono::Utc;

    fn three_proposals() -> Vec<ProposalWithVendor> {
        let mut acme = make_proposal("Acme", 42_000.0, Some(70), Some(20));
        acme.proposal.ai_strengths = vec!["a".into(), "b".into(), "c".into(), "d".into()];
        acme.proposal.ai_weaknesses = vec!["x".into(), "y".into(), "z".into()];
        let mut globex = make_proposal("Globex", 39_000.0, Some(95), None);
        globex.proposal.duration_weeks = None;
        let initech = make_proposal("", 45_000.0, None, None);
        vec![acme, globex, initech]
    }

    #[test]
    fn test_summaries_are_positional_and_trimmed() {
        let proposals = three_proposals();
        let summaries = summarize(&proposals);
        assert_eq!(summaries[0].id, 1);
        assert_eq!(summaries[0].strengths.len(), 3);
        assert_eq!(summaries[0].weaknesses.len(), 2);
        assert_eq!(summaries[1].timeline, "N/A");
        assert_eq!(summaries[2].vendor, " Contact");
        assert_eq!(summaries[2].compliance_score, 0);
    }

    #[test]
    fn test_fallback_ranks_by_combined_score() {
        let rfp = make_rfp("open", Utc::now());
        let text = fallback_comparison(&rfp, &three_proposals());
        assert!(text.starts_with("# Proposal Comparison for Office laptops"));
        assert!(text.contains("## Budget: 50000 USD"));
        let globex = text.find("### 1. Globex").unwrap();
        let acme = text.find("### 2. Acme").unwrap();
        assert!(globex < acme);
        assert!(text.contains("- **Timeline:** N/A"));
        assert!(text.contains("- **Combined Score:** 90/200"));
        assert!(text.contains("review the proposals manually"));
    }

    #[tokio::test]
    async fn test_llm_text_is_returned() {
        let (_server, llm) = replying("Globex offers the best value.").await;
        let rfp = make_rfp("open", Utc::now());
        let outcome = compare_proposals(&llm, &rfp, &three_proposals()).await;
        assert!(outcome.success);
        assert_eq!(outcome.data, "Globex offers the best value.");
        assert!(outcome.error.is_none());
    }

    #[tokio::test]
    async fn test_llm_failure_falls_back() {
        let (_server, llm) = rejecting().await;
        let rfp = make_rfp("open", Utc::now());
        let outcome = compare_proposals(&llm, &rfp, &three_proposals()).await;
        assert!(!outcome.success);
        assert!(outcome.data.contains("automated fallback comparison"));
        let failure = outcome.error.unwrap();
        assert_eq!(failure.message, "AI comparison temporarily unavailable");
        assert!(failure.details.contains("model unavailable"));
    }

    #[tokio::test]
    async fn test_blank_llm_output_falls_back() {
        let (_server, llm) = replying("  ").await;
        let rfp = make_rfp("open", Utc::now());
        let outcome = compare_proposals(&llm, &rfp, &three_proposals()).await;
        assert!(!outcome.success);
    }
}
