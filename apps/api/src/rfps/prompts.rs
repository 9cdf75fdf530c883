// Prompt templates for the RFP helpers.

/// Replace: {title}, {description}, {requirements}, {budget}, {deadline}
pub const SUMMARY_PROMPT_TEMPLATE: &str = r#"Summarize the following RFP in a clear and concise manner.

Title: {title}
Description: {description}
Requirements: {requirements}
Budget: {budget}
Deadline: {deadline}

Provide a brief summary highlighting the key points a vendor needs to know."#;

/// Replace: {title}, {category}, {requirements}, {vendors_json}
pub const VENDOR_SUGGESTION_PROMPT_TEMPLATE: &str = r#"Based on the following RFP requirements, suggest the most suitable vendors from the list.

RFP Title: {title}
RFP Category: {category}
Requirements: {requirements}

Available Vendors:
{vendors_json}

Provide a ranked list of the top 5 vendors with a brief explanation for each.
Only rank vendors that appear in the list above."#;
