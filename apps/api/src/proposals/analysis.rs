//! LLM compliance analysis of one proposal against its RFP.
//!
//! The model's JSON is read leniently: a malformed field falls back to its
//! default instead of discarding the whole analysis, and any transport or
//! parse failure yields [`default_analysis`].

use serde_json::Value;
use tracing::{info, warn};

use crate::llm_client::prompts::{fill_template, truncate_text, JSON_ONLY_SYSTEM};
use crate::llm_client::LlmClient;
use crate::models::proposal::{AiAnalysis, ProposalRow};
use crate::models::rfp::RfpRow;
use crate::proposals::prompts::ANALYSIS_PROMPT_TEMPLATE;

const REQUIREMENTS_MAX_CHARS: usize = 800;
const PROPOSAL_MAX_CHARS: usize = 1200;

const DEFAULT_STRENGTH: &str = "Unable to analyze";
const DEFAULT_WEAKNESS: &str = "Analysis error";
const DEFAULT_SUMMARY: &str = "Automated analysis unavailable";

pub fn default_analysis() -> AiAnalysis {
    AiAnalysis {
        compliance_score: 0,
        strengths: vec![DEFAULT_STRENGTH.to_string()],
        weaknesses: vec![DEFAULT_WEAKNESS.to_string()],
        summary: DEFAULT_SUMMARY.to_string(),
    }
}

fn score_from(value: Option<&Value>) -> i32 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if raw.is_finite() {
        raw.round().clamp(0.0, 100.0) as i32
    } else {
        0
    }
}

fn string_list(value: Option<&Value>, fallback: &str) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => vec![fallback.to_string()],
    }
}

/// Coerces whatever JSON the model produced into an [`AiAnalysis`].
pub fn coerce_analysis(value: &Value) -> AiAnalysis {
    let field = |camel: &str, snake: &str| value.get(camel).or_else(|| value.get(snake));
    AiAnalysis {
        compliance_score: score_from(field("complianceScore", "compliance_score")),
        strengths: string_list(value.get("strengths"), DEFAULT_STRENGTH),
        weaknesses: string_list(value.get("weaknesses"), DEFAULT_WEAKNESS),
        summary: value
            .get("summary")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SUMMARY)
            .to_string(),
    }
}

pub fn analysis_prompt(rfp: &RfpRow, proposal: &ProposalRow) -> String {
    let duration = proposal
        .duration_weeks
        .map(|w| format!("{w} weeks"))
        .unwrap_or_else(|| "N/A".to_string());
    let completion = proposal
        .estimated_end_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "N/A".to_string());

    let requirements = truncate_text(&rfp.requirements, REQUIREMENTS_MAX_CHARS);
    let technical = truncate_text(&proposal.technical_proposal, PROPOSAL_MAX_CHARS);
    let budget = rfp.budget_label();
    let cost = format!("{} {}", proposal.total_cost, proposal.currency);
    let deadline = rfp.deadline.format("%Y-%m-%d").to_string();
    fill_template(
        ANALYSIS_PROMPT_TEMPLATE,
        &[
            ("requirements", requirements.as_str()),
            ("proposal", technical.as_str()),
            ("budget", budget.as_str()),
            ("cost", cost.as_str()),
            ("deadline", deadline.as_str()),
            ("duration", duration.as_str()),
            ("completion", completion.as_str()),
        ],
    )
}

/// Never fails; LLM problems are logged and produce the default analysis.
pub async fn analyze_proposal(llm: &LlmClient, rfp: &RfpRow, proposal: &ProposalRow) -> AiAnalysis {
    let prompt = analysis_prompt(rfp, proposal);
    match llm.call_json::<Value>(&prompt, JSON_ONLY_SYSTEM).await {
        Ok(value) => {
            let analysis = coerce_analysis(&value);
            info!(
                proposal_id = %proposal.id,
                compliance_score = analysis.compliance_score,
                "Proposal analyzed"
            );
            analysis
        }
        Err(e) => {
            warn!(proposal_id = %proposal.id, "Proposal analysis failed: {e}");
            default_analysis()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{rejecting, replying};
    use crate::models::fixtures::{make_proposal, make_rfp};
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_coerce_well_formed_analysis() {
        let analysis = coerce_analysis(&json!({
            "complianceScore": 87,
            "strengths": ["Meets warranty terms"],
            "weaknesses": ["Long lead time"],
            "summary": "Solid bid"
        }));
        assert_eq!(analysis.compliance_score, 87);
        assert_eq!(analysis.strengths, vec!["Meets warranty terms"]);
        assert_eq!(analysis.summary, "Solid bid");
    }

    #[test]
    fn test_coerce_clamps_and_defaults() {
        let analysis = coerce_analysis(&json!({
            "complianceScore": "140",
            "strengths": "not a list",
            "summary": ""
        }));
        assert_eq!(analysis.compliance_score, 100);
        assert_eq!(analysis.strengths, vec!["Unable to analyze"]);
        assert_eq!(analysis.weaknesses, vec!["Analysis error"]);
        assert_eq!(analysis.summary, "Automated analysis unavailable");

        assert_eq!(coerce_analysis(&json!({"complianceScore": -5})).compliance_score, 0);
        assert_eq!(coerce_analysis(&json!({"complianceScore": "high"})).compliance_score, 0);
        assert_eq!(coerce_analysis(&json!({"compliance_score": 64.6})).compliance_score, 65);
    }

    #[test]
    fn test_prompt_truncates_long_text() {
        let mut rfp = make_rfp("open", Utc::now());
        rfp.requirements = "r".repeat(900);
        let mut proposal = make_proposal("Acme", 1000.0, None, None).proposal;
        proposal.technical_proposal = "t".repeat(1300);

        let prompt = analysis_prompt(&rfp, &proposal);
        assert!(prompt.contains(&format!("{}...", "r".repeat(800))));
        assert!(!prompt.contains(&"r".repeat(801)));
        assert!(prompt.contains(&format!("{}...", "t".repeat(1200))));
        assert!(prompt.contains("Proposed Duration: 4 weeks"));
        assert!(prompt.contains("Estimated Completion: N/A"));
    }

    #[tokio::test]
    async fn test_analyze_parses_fenced_json() {
        let (_server, llm) = replying(
            "```json\n{\"complianceScore\": 72, \"strengths\": [\"a\"], \"weaknesses\": [], \"summary\": \"ok\"}\n```",
        )
        .await;
        let rfp = make_rfp("open", Utc::now());
        let proposal = make_proposal("Acme", 1000.0, None, None).proposal;
        let analysis = analyze_proposal(&llm, &rfp, &proposal).await;
        assert_eq!(analysis.compliance_score, 72);
        assert!(analysis.weaknesses.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_falls_back_on_llm_error() {
        let (_server, llm) = rejecting().await;
        let rfp = make_rfp("open", Utc::now());
        let proposal = make_proposal("Acme", 1000.0, None, None).proposal;
        assert_eq!(analyze_proposal(&llm, &rfp, &proposal).await, default_analysis());
    }

    #[tokio::test]
    async fn test_analyze_falls_back_on_non_json() {
        let (_server, llm) = replying("I cannot score this.").await;
        let rfp = make_rfp("open", Utc::now());
        let proposal = make_proposal("Acme", 1000.0, None, None).proposal;
        assert_eq!(analyze_proposal(&llm, &rfp, &proposal).await, default_analysis());
    }
}
