use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    Pending,
    Completed,
    Outdated,
}

impl EvaluationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationStatus::Pending => "pending",
            EvaluationStatus::Completed => "completed",
            EvaluationStatus::Outdated => "outdated",
        }
    }
}

/// Why an AI step fell back to deterministic output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiFailure {
    pub message: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

/// Result of an AI step. `data` is always usable: on failure it holds the fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiOutcome<T> {
    pub success: bool,
    pub data: T,
    pub error: Option<AiFailure>,
}

impl<T> AiOutcome<T> {
    pub fn generated(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn fallback(data: T, message: &str, details: impl ToString) -> Self {
        Self {
            success: false,
            data,
            error: Some(AiFailure {
                message: message.to_string(),
                details: details.to_string(),
                timestamp: Utc::now(),
            }),
        }
    }
}

/// Free-text (markdown) comparison of an RFP's proposals.
pub type ComparisonOutcome = AiOutcome<String>;

pub type RecommendationOutcome = AiOutcome<RecommendationReport>;

fn is_false(value: &bool) -> bool {
    !*value
}

/// Proposal positions arrive as `2`, `2.0` or `"2"`; anything unreadable becomes 0,
/// which no proposal uses.
fn lenient_position<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let position = match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(position.and_then(|p| u32::try_from(p).ok()).unwrap_or(0))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationReport {
    pub recommendations: Recommendations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FallbackMetadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub top_pick: TopPick,
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
    #[serde(default)]
    pub key_points: Vec<String>,
}

/// `proposal_id` is the 1-based position of the proposal in the evaluated set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPick {
    #[serde(default, deserialize_with = "lenient_position")]
    pub proposal_id: u32,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub justification: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub automated_selection: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    #[serde(default, deserialize_with = "lenient_position")]
    pub proposal_id: u32,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub reason: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub automated_selection: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackMetadata {
    pub is_fallback: bool,
    pub fallback_reason: String,
    pub selection_criteria: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EvaluationRow {
    pub id: Uuid,
    pub rfp_id: Uuid,
    pub proposal_ids: Vec<Uuid>,
    pub comparison: Option<Json<ComparisonOutcome>>,
    pub recommendation: Option<Json<RecommendationOutcome>>,
    pub evaluated_by: Uuid,
    pub proposals_count: i32,
    pub last_evaluated_at: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EvaluationRow {
    pub fn is_outdated(&self) -> bool {
        self.status == EvaluationStatus::Outdated.as_str()
    }
}

/// Evaluation joined with its RFP for listings.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct EvaluationListing {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub evaluation: EvaluationRow,
    pub rfp_title: String,
    pub rfp_description: String,
    pub rfp_budget: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_recommendation_shape_deserializes() {
        let json = r#"{
            "recommendations": {
                "top_pick": {"proposal_id": 2, "vendor": "Acme", "justification": "Cheapest compliant"},
                "alternatives": [{"proposal_id": 1, "vendor": "Globex", "reason": "Faster"}],
                "key_points": ["Check references"]
            }
        }"#;
        let report: RecommendationReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.recommendations.top_pick.proposal_id, 2);
        assert!(!report.recommendations.top_pick.automated_selection);
        assert_eq!(report.recommendations.alternatives.len(), 1);
        assert!(report.metadata.is_none());
    }

    #[test]
    fn test_missing_top_pick_is_rejected() {
        let json = r#"{"recommendations": {"alternatives": [], "key_points": []}}"#;
        assert!(serde_json::from_str::<RecommendationReport>(json).is_err());
    }

    #[test]
    fn test_partial_pick_fields_are_tolerated() {
        let json = r#"{
            "recommendations": {
                "top_pick": {"proposal_id": "2", "vendor": "Acme", "reason": "Best fit"},
                "alternatives": [{"proposal_id": 1.0}]
            }
        }"#;
        let report: RecommendationReport = serde_json::from_str(json).unwrap();
        let recs = report.recommendations;
        assert_eq!(recs.top_pick.proposal_id, 2);
        assert_eq!(recs.top_pick.justification, "");
        assert_eq!(recs.alternatives[0].proposal_id, 1);
        assert_eq!(recs.alternatives[0].vendor, "");
        assert!(recs.key_points.is_empty());
    }

    #[test]
    fn test_unreadable_position_becomes_zero() {
        let json = r#"{"recommendations": {"top_pick": {"proposal_id": "first"}}}"#;
        let report: RecommendationReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.recommendations.top_pick.proposal_id, 0);
    }

    #[test]
    fn test_fallback_outcome_records_failure() {
        let outcome = AiOutcome::fallback("text".to_string(), "AI down", "timeout");
        assert!(!outcome.success);
        let failure = outcome.error.unwrap();
        assert_eq!(failure.message, "AI down");
        assert_eq!(failure.details, "timeout");
    }

    #[test]
    fn test_automated_flag_omitted_when_false() {
        let pick = TopPick {
            proposal_id: 1,
            vendor: "Acme".to_string(),
            justification: "why".to_string(),
            automated_selection: false,
            note: None,
        };
        let value = serde_json::to_value(&pick).unwrap();
        assert!(value.get("automated_selection").is_none());
        assert!(value.get("note").is_none());
    }
}
