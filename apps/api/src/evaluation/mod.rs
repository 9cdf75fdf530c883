pub mod cache;
pub mod comparison;
pub mod handlers;
pub mod prompts;
pub mod recommendation;
pub mod store;

use serde::Serialize;

use crate::models::proposal::ProposalWithVendor;

/// Combined score used by the deterministic rankings: compliance plus buyer score, 0 to 200.
pub fn combined_score(proposal: &ProposalWithVendor) -> i32 {
    proposal.proposal.compliance_score.unwrap_or(0) + proposal.proposal.evaluation_score.unwrap_or(0)
}

/// "N weeks" or "N/A".
pub fn timeline_label(proposal: &ProposalWithVendor) -> String {
    proposal
        .proposal
        .duration_weeks
        .map(|w| format!("{w} weeks"))
        .unwrap_or_else(|| "N/A".to_string())
}

/// Proposals ordered by [`combined_score`], highest first. Ties keep their input order.
/// Each entry carries its 1-based position in the input.
pub fn rank_by_combined_score(proposals: &[ProposalWithVendor]) -> Vec<(u32, &ProposalWithVendor)> {
    let mut ranked: Vec<(u32, &ProposalWithVendor)> = (1u32..).zip(proposals.iter()).collect();
    ranked.sort_by_key(|(_, p)| std::cmp::Reverse(combined_score(p)));
    ranked
}

/// Compact per-proposal view returned alongside evaluation results.
#[derive(Debug, Clone, Serialize)]
pub struct ProposalBrief {
    pub id: uuid::Uuid,
    pub vendor: String,
    pub cost: f64,
    pub currency: String,
    pub compliance_score: Option<i32>,
    pub evaluation_score: Option<i32>,
    pub submitted_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&ProposalWithVendor> for ProposalBrief {
    fn from(p: &ProposalWithVendor) -> Self {
        Self {
            id: p.proposal.id,
            vendor: p.vendor_label().to_string(),
            cost: p.proposal.total_cost,
            currency: p.proposal.currency.clone(),
            compliance_score: p.proposal.compliance_score,
            evaluation_score: p.proposal.evaluation_score,
            submitted_at: p.proposal.submitted_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::make_proposal;

    #[test]
    fn test_ranking_is_stable_and_descending() {
        let proposals = vec![
            make_proposal("Acme", 100.0, Some(50), Some(10)),
            make_proposal("Globex", 90.0, Some(80), None),
            make_proposal("Initech", 80.0, Some(40), Some(20)),
        ];
        let ranked: Vec<(u32, &str)> = rank_by_combined_score(&proposals)
            .into_iter()
            .map(|(id, p)| (id, p.vendor_label()))
            .collect();
        assert_eq!(ranked, vec![(2, "Globex"), (1, "Acme"), (3, "Initech")]);
    }

    #[test]
    fn test_missing_scores_count_as_zero() {
        let p = make_proposal("Acme", 1.0, None, None);
        assert_eq!(combined_score(&p), 0);
        assert_eq!(timeline_label(&p), "4 weeks");
    }
}
