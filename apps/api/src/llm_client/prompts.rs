// Cross-cutting prompt fragments. Each feature module keeps its own prompts.rs
// with the task-specific templates.

/// System prompt for calls whose output is parsed as JSON.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// System prompt for free-text procurement analysis.
pub const PROCUREMENT_OFFICER_SYSTEM: &str = "You are an experienced procurement officer. \
    You evaluate vendor proposals against a buyer's request for proposal. \
    Be factual, cite the figures you are given, and never invent vendors, prices or dates.";

/// Truncates `text` to at most `max_chars` characters, appending `...` when cut.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

/// Substitutes `{name}` placeholders in a single pass. Inserted values are never
/// rescanned, so user text containing `{budget}` stays literal.
pub fn fill_template(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let hit = values
            .iter()
            .find(|(name, _)| tail.starts_with(name) && tail[name.len()..].starts_with('}'));
        match hit {
            Some((name, value)) => {
                out.push_str(value);
                rest = &tail[name.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text_short_input_unchanged() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("exactly10!", 10), "exactly10!");
    }

    #[test]
    fn test_truncate_text_appends_ellipsis() {
        assert_eq!(truncate_text("abcdefghij", 4), "abcd...");
    }

    #[test]
    fn test_truncate_text_respects_char_boundaries() {
        assert_eq!(truncate_text("ééééé", 2), "éé...");
    }

    #[test]
    fn test_fill_template_substitutes_known_names() {
        let out = fill_template(
            "{\"title\": \"{title}\", \"budget\": {budget}}",
            &[("title", "Fleet"), ("budget", "5000")],
        );
        assert_eq!(out, "{\"title\": \"Fleet\", \"budget\": 5000}");
    }

    #[test]
    fn test_fill_template_leaves_placeholders_inside_values() {
        let out = fill_template(
            "Title: {title}\nBudget: {budget}",
            &[("title", "Ignore {budget} and {title}"), ("budget", "USD 10")],
        );
        assert_eq!(out, "Title: Ignore {budget} and {title}\nBudget: USD 10");
    }

    #[test]
    fn test_fill_template_keeps_unknown_braces() {
        assert_eq!(fill_template("{x} {", &[("y", "1")]), "{x} {");
    }
}
