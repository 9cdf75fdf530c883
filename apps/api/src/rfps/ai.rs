//! LLM helpers for buyers drafting and distributing an RFP. Failures degrade to `None`.

use serde::Serialize;
use tracing::warn;

use crate::llm_client::prompts::{fill_template, truncate_text, PROCUREMENT_OFFICER_SYSTEM};
use crate::llm_client::LlmClient;
use crate::models::rfp::RfpRow;
use crate::models::vendor::VendorRow;
use crate::rfps::prompts::{SUMMARY_PROMPT_TEMPLATE, VENDOR_SUGGESTION_PROMPT_TEMPLATE};

const REQUIREMENTS_MAX_CHARS: usize = 2000;

#[derive(Debug, Serialize)]
struct VendorCandidate<'a> {
    name: &'a str,
    company: &'a str,
    categories: &'a [String],
}

pub fn summary_prompt(rfp: &RfpRow) -> String {
    let requirements = truncate_text(&rfp.requirements, REQUIREMENTS_MAX_CHARS);
    let budget = rfp.budget_label();
    let deadline = rfp.deadline.format("%Y-%m-%d").to_string();
    fill_template(
        SUMMARY_PROMPT_TEMPLATE,
        &[
            ("title", rfp.title.as_str()),
            ("description", rfp.description.as_str()),
            ("requirements", requirements.as_str()),
            ("budget", budget.as_str()),
            ("deadline", deadline.as_str()),
        ],
    )
}

pub fn vendor_suggestion_prompt(rfp: &RfpRow, vendors: &[VendorRow]) -> String {
    let candidates: Vec<VendorCandidate<'_>> = vendors
        .iter()
        .map(|v| VendorCandidate {
            name: &v.name,
            company: &v.company,
            categories: &v.categories,
        })
        .collect();
    let vendors_json = serde_json::to_string_pretty(&candidates).unwrap_or_else(|_| "[]".to_string());

    let requirements = truncate_text(&rfp.requirements, REQUIREMENTS_MAX_CHARS);
    fill_template(
        VENDOR_SUGGESTION_PROMPT_TEMPLATE,
        &[
            ("title", rfp.title.as_str()),
            ("category", rfp.category.as_deref().unwrap_or("N/A")),
            ("requirements", requirements.as_str()),
            ("vendors_json", vendors_json.as_str()),
        ],
    )
}

pub async fn generate_summary(llm: &LlmClient, rfp: &RfpRow) -> Option<String> {
    match llm
        .call_text(&summary_prompt(rfp), PROCUREMENT_OFFICER_SYSTEM)
        .await
    {
        Ok(summary) => Some(summary),
        Err(e) => {
            warn!(rfp_id = %rfp.id, "RFP summary unavailable: {e}");
            None
        }
    }
}

pub async fn suggest_vendors(
    llm: &LlmClient,
    rfp: &RfpRow,
    vendors: &[VendorRow],
) -> Option<String> {
    if vendors.is_empty() {
        return None;
    }
    match llm
        .call_text(
            &vendor_suggestion_prompt(rfp, vendors),
            PROCUREMENT_OFFICER_SYSTEM,
        )
        .await
    {
        Ok(suggestions) => Some(suggestions),
        Err(e) => {
            warn!(rfp_id = %rfp.id, "Vendor suggestions unavailable: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::{rejecting, replying};
    use crate::models::fixtures::make_rfp;
    use chrono::Utc;

    #[test]
    fn test_summary_prompt_fills_placeholders() {
        let rfp = make_rfp("draft", Utc::now());
        let prompt = summary_prompt(&rfp);
        assert!(prompt.contains("Title: Office laptops"));
        assert!(prompt.contains("Budget: 50000 USD"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_buyer_text_placeholders_stay_literal() {
        let mut rfp = make_rfp("draft", Utc::now());
        rfp.title = "Laptops {deadline}".to_string();
        rfp.description = "Ignore the {budget} line".to_string();
        let prompt = summary_prompt(&rfp);
        assert!(prompt.contains("Title: Laptops {deadline}"));
        assert!(prompt.contains("Ignore the {budget} line"));
        assert!(prompt.contains("Budget: 50000 USD"));
    }

    #[tokio::test]
    async fn test_summary_returned_when_llm_answers() {
        let (_server, llm) = replying("Fifty laptops, due soon.").await;
        let rfp = make_rfp("draft", Utc::now());
        assert_eq!(
            generate_summary(&llm, &rfp).await.as_deref(),
            Some("Fifty laptops, due soon.")
        );
    }

    #[tokio::test]
    async fn test_llm_failure_yields_none() {
        let (_server, llm) = rejecting().await;
        let rfp = make_rfp("draft", Utc::now());
        assert!(generate_summary(&llm, &rfp).await.is_none());
    }

    #[tokio::test]
    async fn test_no_vendors_skips_the_call() {
        let (_server, llm) = rejecting().await;
        let rfp = make_rfp("draft", Utc::now());
        assert!(suggest_vendors(&llm, &rfp, &[]).await.is_none());
    }
}
