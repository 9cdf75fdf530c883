//! Heuristic extraction of proposal data from a vendor's reply email.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Months, NaiveDate, Utc};
use regex::Regex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::email::inbound::{InboundAttachment, InboundEmail};
use crate::validation::is_valid_email;

const UUID_PATTERN: &str = r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}";
const DATE_PATTERN: &str = r"(\d{1,2}[/\-]\d{1,2}[/\-]\d{2,4}|\d{4}[/\-]\d{1,2}[/\-]\d{1,2})";

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("valid regex")
}

/// Tried in order; the last one accepts any UUID.
static RFP_ID_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        regex(&format!(r"(?i)RFP[:\-\s#]+({UUID_PATTERN})")),
        regex(&format!(r"(?i)Reference[:\-\s]+RFP[:\-\s#]+({UUID_PATTERN})")),
        regex(&format!(r"(?i)Proposal\s+for\s+RFP[:\-\s#]+({UUID_PATTERN})")),
        regex(&format!(r"(?i)({UUID_PATTERN})")),
    ]
});

static PRICING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        regex(r"(?i)(?:total\s+cost|price|budget|amount)[:\s]+\$?([\d,]+(?:\.\d{2})?)\s*(USD|EUR|GBP)?"),
        regex(r"\$\s*([\d,]+(?:\.\d{2})?)"),
        regex(r"(?i)([\d,]+(?:\.\d{2})?)\s+(USD|EUR|GBP|INR)\b"),
    ]
});

static START_DATE: LazyLock<Regex> = LazyLock::new(|| {
    regex(&format!(r"(?i)(?:start\s+date|project\s+start|begin)[:\s]+{DATE_PATTERN}"))
});
static END_DATE: LazyLock<Regex> = LazyLock::new(|| {
    regex(&format!(r"(?i)(?:end\s+date|project\s+end|completion)[:\s]+{DATE_PATTERN}"))
});
static DURATION: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)(?:duration|timeline)[:\s]+(\d+)\s+(weeks?|months?)"));

static ANGLE_ADDRESS: LazyLock<Regex> = LazyLock::new(|| regex(r"<([^<>\s]+@[^<>\s]+)>"));
static COMPANY: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?im)^\s*(?:company|organization|firm)\s*:\s*(.+)$"));
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)\b(?:phone|tel|mobile)[:\s]+([\d \t\-()+]{6,})"));
static SIGNATURE_NAME: LazyLock<Regex> =
    LazyLock::new(|| regex(r"(?i)(?:regards|sincerely|thanks),?[ \t]*\r?\n\s*([^\r\n]+)"));

static COVER_LETTER: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?is)(?:cover\s+letter|introduction)(.*?)(?:technical\s+proposal|technical\s+approach|$)")
});
static TECHNICAL: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?is)(?:technical\s+proposal|technical\s+approach|methodology)(.*?)(?:pricing|budget|cost|$)")
});

#[derive(Debug, Clone, PartialEq)]
pub struct Pricing {
    pub total_cost: f64,
    pub currency: String,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            total_cost: 0.0,
            currency: "USD".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Stated duration converted to weeks (a month counts as four).
    pub stated_weeks: Option<i32>,
}

impl Timeline {
    /// Whole weeks between the dates (rounded up, at least one), else the stated duration.
    pub fn duration_weeks(&self) -> Option<i32> {
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            let days = (end - start).num_days();
            if days > 0 {
                return Some(((days + 6) / 7).max(1) as i32);
            }
        }
        self.stated_weeks.filter(|w| *w >= 1)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VendorInfo {
    pub email: Option<String>,
    pub name: Option<String>,
    pub company: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sections {
    pub cover_letter: String,
    pub technical_proposal: String,
    pub full_content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedProposal {
    pub rfp_id: Option<Uuid>,
    pub vendor: VendorInfo,
    pub pricing: Pricing,
    pub timeline: Timeline,
    pub sections: Sections,
    pub attachments: Vec<InboundAttachment>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ParseReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub fn extract_rfp_id(subject: &str, body: &str) -> Option<Uuid> {
    let text = format!("{subject} {body}");
    RFP_ID_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(&text)
            .and_then(|caps| Uuid::parse_str(&caps[1]).ok())
    })
}

pub fn extract_pricing(text: &str) -> Pricing {
    for pattern in PRICING_PATTERNS.iter() {
        let Some(caps) = pattern.captures(text) else {
            continue;
        };
        let Ok(total_cost) = caps[1].replace(',', "").parse::<f64>() else {
            continue;
        };
        let currency = caps
            .get(2)
            .map(|m| m.as_str().to_uppercase())
            .unwrap_or_else(|| "USD".to_string());
        debug!(total_cost, %currency, "Pricing extracted");
        return Pricing {
            total_cost,
            currency,
        };
    }
    Pricing::default()
}

/// Parses `y-m-d`, `m/d/y` and `m-d-y` (two-digit years are 20xx) as midnight UTC.
pub fn parse_loose_date(raw: &str) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = raw.split(['/', '-']).collect();
    let [a, b, c] = parts.as_slice() else {
        return None;
    };
    let (year, month, day) = if a.len() == 4 {
        (a.parse::<i32>().ok()?, b.parse::<u32>().ok()?, c.parse::<u32>().ok()?)
    } else {
        let year = match c.len() {
            2 => 2000 + c.parse::<i32>().ok()?,
            4 => c.parse::<i32>().ok()?,
            _ => return None,
        };
        (year, a.parse::<u32>().ok()?, b.parse::<u32>().ok()?)
    };
    NaiveDate::from_ymd_opt(year, month, day)?
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
}

pub fn extract_timeline(text: &str) -> Timeline {
    let date_after = |pattern: &Regex| {
        pattern
            .captures(text)
            .and_then(|caps| parse_loose_date(&caps[1]))
    };

    let mut timeline = Timeline {
        start_date: date_after(&START_DATE),
        end_date: date_after(&END_DATE),
        stated_weeks: None,
    };

    if let Some(caps) = DURATION.captures(text) {
        let Ok(amount) = caps[1].parse::<u32>() else {
            return timeline;
        };
        let is_weeks = caps[2].to_lowercase().starts_with("week");
        timeline.stated_weeks = i32::try_from(amount)
            .ok()
            .map(|n| if is_weeks { n } else { n.saturating_mul(4) });

        if let Some(start) = timeline.start_date {
            let end = if is_weeks {
                start.checked_add_signed(Duration::days(i64::from(amount) * 7))
            } else {
                start.checked_add_months(Months::new(amount))
            };
            if end.is_some() {
                timeline.end_date = end;
            }
        }
    }

    timeline
}

/// Bare address from `Name <addr>` or a plain address, lowercased.
/// `None` when what remains is not an email address.
pub fn sender_address(from: &str) -> Option<String> {
    let address = match ANGLE_ADDRESS.captures(from) {
        Some(caps) => caps[1].to_string(),
        None => from.trim().to_string(),
    };
    is_valid_email(&address).then(|| address.to_lowercase())
}

pub fn extract_vendor_info(from: Option<&str>, text: &str) -> VendorInfo {
    let capture = |pattern: &Regex| {
        pattern
            .captures(text)
            .map(|caps| caps[1].trim().to_string())
            .filter(|s| !s.is_empty())
    };
    VendorInfo {
        email: from.and_then(sender_address),
        name: capture(&SIGNATURE_NAME),
        company: capture(&COMPANY),
        phone: capture(&PHONE),
    }
}

fn section_body(raw: &str) -> String {
    raw.trim_start_matches(|c: char| c == ':' || c == '-' || c.is_whitespace())
        .trim()
        .to_string()
}

pub fn extract_sections(text: Option<&str>, html: Option<&str>) -> Sections {
    let full_content = text
        .filter(|t| !t.trim().is_empty())
        .or(html)
        .unwrap_or_default()
        .to_string();

    let mut cover_letter = COVER_LETTER
        .captures(&full_content)
        .map(|caps| section_body(&caps[1]))
        .unwrap_or_default();
    let mut technical_proposal = TECHNICAL
        .captures(&full_content)
        .map(|caps| section_body(&caps[1]))
        .unwrap_or_default();

    if cover_letter.is_empty() && technical_proposal.is_empty() {
        let split = full_content.chars().count() * 3 / 10;
        let split_at = full_content
            .char_indices()
            .nth(split)
            .map(|(i, _)| i)
            .unwrap_or(full_content.len());
        cover_letter = full_content[..split_at].to_string();
        technical_proposal = full_content[split_at..].to_string();
    }

    Sections {
        cover_letter,
        technical_proposal,
        full_content,
    }
}

pub fn parse_proposal_email(email: &InboundEmail) -> ParsedProposal {
    let full_text = email
        .text
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .or(email.html.as_deref())
        .unwrap_or_default();

    let parsed = ParsedProposal {
        rfp_id: extract_rfp_id(&email.subject, full_text),
        vendor: extract_vendor_info(email.from.as_deref(), full_text),
        pricing: extract_pricing(full_text),
        timeline: extract_timeline(full_text),
        sections: extract_sections(email.text.as_deref(), email.html.as_deref()),
        attachments: email.attachments.clone(),
    };

    info!(
        rfp_id = ?parsed.rfp_id,
        vendor_email = ?parsed.vendor.email,
        attachments = parsed.attachments.len(),
        "Proposal email parsed"
    );
    parsed
}

pub fn validate_parsed(parsed: &ParsedProposal) -> ParseReport {
    let mut report = ParseReport::default();
    if parsed.rfp_id.is_none() {
        report.errors.push("Could not extract RFP ID from email".to_string());
    }
    if parsed.vendor.email.is_none() {
        report.errors.push("Vendor email is missing".to_string());
    }
    if parsed.sections.cover_letter.trim().is_empty()
        && parsed.sections.technical_proposal.trim().is_empty()
    {
        report.errors.push("Could not extract proposal content".to_string());
    }
    if parsed.pricing.total_cost == 0.0 {
        report
            .warnings
            .push("Could not extract pricing information".to_string());
    }
    report
}
