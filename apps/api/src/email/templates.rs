//! HTML bodies for outbound notifications. Every interpolated value is escaped.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::email::mailer::{EmailMessage, MailError};
use crate::models::rfp::RfpRow;

const FOOTER: &str = r#"<hr style="margin-top: 30px; border: none; border-top: 1px solid #ddd;">
<p style="color: #666; font-size: 12px;">This is an automated message from the RFP Management System.</p>"#;

/// Subject/body token that lets the inbound parser tie a reply back to its RFP.
pub fn rfp_reference(rfp_id: Uuid) -> String {
    format!("RFP-{rfp_id}")
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders an amount with thousands separators and at most two decimals.
pub fn format_amount(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let (whole, frac) = (cents / 100, cents % 100);
    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    if frac == 0 {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac:02}")
    }
}

/// Who sent the RFP, as shown to vendors.
pub struct BuyerIdentity<'a> {
    pub name: &'a str,
    pub company: Option<&'a str>,
}

/// Invitation sent to each vendor when an RFP goes out.
pub fn rfp_invitation(rfp: &RfpRow, buyer: &BuyerIdentity<'_>, vendor_email: &str) -> EmailMessage {
    let from = buyer.company.filter(|c| !c.is_empty()).unwrap_or(buyer.name);
    let budget = match rfp.budget {
        Some(budget) => format!("{} {}", escape_html(&rfp.currency), format_amount(budget)),
        None => "Not specified".to_string(),
    };
    let reference = rfp_reference(rfp.id);

    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
<h2>New Request for Proposal</h2>
<p>Dear Vendor,</p>
<p>You have received a new RFP from <strong>{from}</strong>.</p>
<div style="background-color: #f5f5f5; padding: 20px; border-radius: 5px; margin: 20px 0;">
<h3>{title}</h3>
<p><strong>Description:</strong></p>
<p>{description}</p>
<p><strong>Requirements:</strong></p>
<p>{requirements}</p>
<p><strong>Budget:</strong> {budget}</p>
<p><strong>Deadline:</strong> {deadline}</p>
</div>
<p>Please submit your proposal before the deadline. You can reply to this email with your proposal;
keep the reference <strong>{reference}</strong> in the subject line and include your total cost, timeline and technical approach.</p>
<p>Best regards,<br>{buyer_name}<br>{buyer_company}</p>
{FOOTER}
</div>"#,
        from = escape_html(from),
        title = escape_html(&rfp.title),
        description = escape_html(&rfp.description),
        requirements = escape_html(&rfp.requirements),
        deadline = rfp.deadline.format("%b %d, %Y"),
        buyer_name = escape_html(buyer.name),
        buyer_company = escape_html(buyer.company.unwrap_or_default()),
    );

    EmailMessage {
        to_email: vendor_email.to_string(),
        to_name: "Vendor".to_string(),
        subject: format!("New RFP: {} [{reference}]", rfp.title),
        html,
    }
}

/// Facts about a freshly submitted proposal, as shown to the buyer.
pub struct ProposalNotice<'a> {
    pub rfp_title: &'a str,
    pub vendor_name: &'a str,
    pub vendor_company: &'a str,
    pub vendor_email: &'a str,
    pub total_cost: f64,
    pub currency: &'a str,
    pub submitted_at: DateTime<Utc>,
}

/// Notification sent to the buyer when a proposal arrives.
pub fn proposal_received(
    buyer_email: &str,
    notice: &ProposalNotice<'_>,
) -> Result<EmailMessage, MailError> {
    if buyer_email.trim().is_empty() {
        return Err(MailError::Invalid("Buyer email is required".to_string()));
    }

    let company = [notice.vendor_company, notice.vendor_name]
        .into_iter()
        .find(|s| !s.trim().is_empty())
        .unwrap_or("Unknown Company");
    let contact = if notice.vendor_name.trim().is_empty() {
        "Unknown"
    } else {
        notice.vendor_name
    };
    let contact_email = if notice.vendor_email.trim().is_empty() {
        "Not provided"
    } else {
        notice.vendor_email
    };
    let currency = if notice.currency.is_empty() {
        "USD"
    } else {
        notice.currency
    };

    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
<h2>New Proposal Received</h2>
<p>A new proposal has been submitted for your RFP <strong>{rfp_title}</strong>.</p>
<div style="background-color: #f5f5f5; padding: 20px; border-radius: 5px; margin: 20px 0;">
<p><strong>Vendor:</strong> {company}</p>
<p><strong>Contact:</strong> {contact} ({contact_email})</p>
<p><strong>Total Cost:</strong> {cost} {currency}</p>
<p><strong>Submitted:</strong> {submitted}</p>
</div>
<p>Please log in to the system to review the full proposal.</p>
{FOOTER}
</div>"#,
        rfp_title = escape_html(notice.rfp_title),
        company = escape_html(company),
        contact = escape_html(contact),
        contact_email = escape_html(contact_email),
        cost = format_amount(notice.total_cost),
        currency = escape_html(currency),
        submitted = notice.submitted_at.format("%b %d, %Y %H:%M UTC"),
    );

    Ok(EmailMessage {
        to_email: buyer_email.to_string(),
        to_name: "Buyer".to_string(),
        subject: format!("New Proposal Received from {company}"),
        html,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::make_rfp;
    use chrono::TimeZone;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>"a" & 'b'</script>"#),
            "&lt;script&gt;&quot;a&quot; &amp; &#39;b&#39;&lt;/script&gt;"
        );
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(999.0), "999");
        assert_eq!(format_amount(50_000.0), "50,000");
        assert_eq!(format_amount(1_234_567.5), "1,234,567.50");
        assert_eq!(format_amount(-1200.0), "-1,200");
    }

    #[test]
    fn test_invitation_carries_reference_and_escapes_content() {
        let deadline = Utc.with_ymd_and_hms(2026, 3, 5, 17, 0, 0).unwrap();
        let mut rfp = make_rfp("open", deadline);
        rfp.title = "Laptops <urgent>".to_string();
        let buyer = BuyerIdentity {
            name: "Pat Buyer",
            company: Some("Initech"),
        };

        let msg = rfp_invitation(&rfp, &buyer, "sales@acme.test");
        assert_eq!(msg.to_email, "sales@acme.test");
        assert!(msg.subject.starts_with("New RFP: Laptops <urgent> [RFP-"));
        assert!(msg.subject.contains(&rfp.id.to_string()));
        assert!(msg.html.contains("Laptops &lt;urgent&gt;"));
        assert!(msg.html.contains("<strong>Initech</strong>"));
        assert!(msg.html.contains("USD 50,000"));
        assert!(msg.html.contains("Mar 05, 2026"));
    }

    #[test]
    fn test_invitation_without_budget() {
        let mut rfp = make_rfp("open", Utc::now());
        rfp.budget = None;
        let buyer = BuyerIdentity {
            name: "Pat Buyer",
            company: None,
        };
        let msg = rfp_invitation(&rfp, &buyer, "v@x.test");
        assert!(msg.html.contains("Not specified"));
        assert!(msg.html.contains("<strong>Pat Buyer</strong>"));
    }

    #[test]
    fn test_proposal_received_requires_buyer_email() {
        let notice = ProposalNotice {
            rfp_title: "Laptops",
            vendor_name: "Jane",
            vendor_company: "Acme",
            vendor_email: "jane@acme.test",
            total_cost: 42_000.0,
            currency: "USD",
            submitted_at: Utc::now(),
        };
        assert!(proposal_received("", &notice).is_err());

        let msg = proposal_received("buyer@initech.test", &notice).unwrap();
        assert_eq!(msg.subject, "New Proposal Received from Acme");
        assert!(msg.html.contains("42,000 USD"));
        assert!(msg.html.contains("Jane (jane@acme.test)"));
    }

    #[test]
    fn test_proposal_received_falls_back_to_vendor_name() {
        let notice = ProposalNotice {
            rfp_title: "Laptops",
            vendor_name: "Jane",
            vendor_company: "",
            vendor_email: "",
            total_cost: 1.0,
            currency: "",
            submitted_at: Utc::now(),
        };
        let msg = proposal_received("b@x.test", &notice).unwrap();
        assert_eq!(msg.subject, "New Proposal Received from Jane");
        assert!(msg.html.contains("Not provided"));
        assert!(msg.html.contains("1 USD"));
    }
}
