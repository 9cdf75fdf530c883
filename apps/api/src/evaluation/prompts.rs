// Prompt templates for multi-proposal evaluation.

/// Replace: {title}, {budget}, {requirements}, {proposals_json}
pub const COMPARISON_PROMPT_TEMPLATE: &str = r#"Compare the proposals received for: {title}

Budget: {budget}
Requirements: {requirements}

Proposals:
{proposals_json}

Provide a detailed comparison including:
1) Ranking of proposals (best to worst)
2) Key differences between proposals
3) Cost analysis
4) Timeline comparison
5) Overall recommendation

Format your response in clear, structured markdown."#;

/// Replace: {title}, {budget}, {proposals_json}
pub const RECOMMENDATION_PROMPT_TEMPLATE: &str = r#"Analyze the proposals received for: {title}

Budget: {budget}

Proposals:
{proposals_json}

Recommend the best proposal. Return a JSON object with this EXACT schema, where
proposal_id is the "id" of a proposal listed above:
{
  "recommendations": {
    "top_pick": {
      "proposal_id": 1,
      "vendor": "Vendor Name",
      "justification": "Detailed explanation of why this is the best choice"
    },
    "alternatives": [
      {
        "proposal_id": 2,
        "vendor": "Vendor Name",
        "reason": "Why this is a good alternative"
      }
    ],
    "key_points": [
      "Important consideration 1",
      "Important consideration 2"
    ]
  }
}"#;
