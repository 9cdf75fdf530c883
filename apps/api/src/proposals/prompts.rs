// Prompt template for scoring a single proposal against its RFP.

/// Replace: {requirements}, {proposal}, {budget}, {cost}, {deadline}, {duration}, {completion}
pub const ANALYSIS_PROMPT_TEMPLATE: &str = r#"Analyze the proposal against the RFP requirements.

RFP Requirements:
{requirements}

Proposal:
{proposal}

Budget: {budget}
Cost for Proposal: {cost}

RFP Deadline: {deadline}
Proposed Duration: {duration}
Estimated Completion: {completion}

Return a JSON object with this EXACT schema:
{
  "complianceScore": <integer 0-100>,
  "strengths": ["point 1", "point 2"],
  "weaknesses": ["gap 1", "gap 2"],
  "summary": "short summary"
}"#;
