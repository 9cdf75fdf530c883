//! When a stored evaluation can be served instead of calling the LLM again.

use crate::models::evaluation::EvaluationRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    Comparison,
    Recommendation,
}

/// True when `artifact` must be generated afresh for the current proposal set.
pub fn should_regenerate(
    existing: Option<&EvaluationRow>,
    artifact: Artifact,
    force_refresh: bool,
    proposals_count: usize,
) -> bool {
    let Some(evaluation) = existing else {
        return true;
    };
    let missing = match artifact {
        Artifact::Comparison => evaluation.comparison.is_none(),
        Artifact::Recommendation => evaluation.recommendation.is_none(),
    };
    force_refresh
        || missing
        || usize::try_from(evaluation.proposals_count).ok() != Some(proposals_count)
        || evaluation.is_outdated()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::evaluation::{AiOutcome, EvaluationStatus};
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn stored(count: i32, status: EvaluationStatus) -> EvaluationRow {
        EvaluationRow {
            id: Uuid::new_v4(),
            rfp_id: Uuid::new_v4(),
            proposal_ids: vec![],
            comparison: Some(Json(AiOutcome::generated("text".to_string()))),
            recommendation: None,
            evaluated_by: Uuid::new_v4(),
            proposals_count: count,
            last_evaluated_at: Utc::now(),
            status: status.as_str().to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_nothing_stored_regenerates() {
        assert!(should_regenerate(None, Artifact::Comparison, false, 2));
    }

    #[test]
    fn test_fresh_comparison_is_served_from_cache() {
        let row = stored(2, EvaluationStatus::Completed);
        assert!(!should_regenerate(Some(&row), Artifact::Comparison, false, 2));
    }

    #[test]
    fn test_force_count_change_and_outdated_regenerate() {
        let row = stored(2, EvaluationStatus::Completed);
        assert!(should_regenerate(Some(&row), Artifact::Comparison, true, 2));
        assert!(should_regenerate(Some(&row), Artifact::Comparison, false, 3));

        let outdated = stored(2, EvaluationStatus::Outdated);
        assert!(should_regenerate(Some(&outdated), Artifact::Comparison, false, 2));
    }

    #[test]
    fn test_missing_recommendation_regenerates() {
        let row = stored(2, EvaluationStatus::Completed);
        assert!(should_regenerate(Some(&row), Artifact::Recommendation, false, 2));
    }
}
