//! Normalizes inbound-email webhook payloads from the supported providers.

use axum::http::HeaderMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    SendGrid,
    Mailgun,
    AwsSes,
    Generic,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::SendGrid => "sendgrid",
            Provider::Mailgun => "mailgun",
            Provider::AwsSes => "aws-ses",
            Provider::Generic => "generic",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundAttachment {
    pub filename: String,
    pub content_type: Option<String>,
    pub size: Option<u64>,
    /// Base64-encoded body, when the provider inlines it.
    pub content: Option<String>,
}

/// Provider-independent view of a received email.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InboundEmail {
    pub from: Option<String>,
    pub to: Option<String>,
    pub subject: String,
    pub text: Option<String>,
    pub html: Option<String>,
    pub attachments: Vec<InboundAttachment>,
}

pub fn detect_provider(body: &Value, headers: &HeaderMap) -> Provider {
    let from_sendgrid = body
        .get("from")
        .and_then(Value::as_str)
        .is_some_and(|from| from.contains("sendgrid"));
    if headers.contains_key("x-sendgrid-event-id") || from_sendgrid {
        return Provider::SendGrid;
    }
    if headers.contains_key("x-mailgun-signature") || body.get("sender").is_some() {
        return Provider::Mailgun;
    }
    if body.pointer("/mail/source").is_some() || headers.contains_key("x-amz-sns-message-type") {
        return Provider::AwsSes;
    }
    Provider::Generic
}

/// First non-blank string among `keys`.
fn field(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| body.pointer(key).or_else(|| body.get(*key)))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn attachment_from(value: &Value, fallback_name: &str) -> Option<InboundAttachment> {
    if !value.is_object() {
        return None;
    }
    let filename = field(value, &["filename", "name"]).unwrap_or_else(|| fallback_name.to_string());
    Some(InboundAttachment {
        filename,
        content_type: field(value, &["contentType", "content_type", "type"]),
        size: value.get("size").and_then(Value::as_u64),
        content: field(value, &["content"]),
    })
}

fn attachment_list(body: &Value) -> Vec<InboundAttachment> {
    body.get("attachments")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| attachment_from(item, &format!("attachment-{}", i + 1)))
                .collect()
        })
        .unwrap_or_default()
}

fn mailgun_attachments(body: &Value) -> Vec<InboundAttachment> {
    let count = match body.get("attachment-count") {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };
    (1..=count)
        .filter_map(|i| {
            let name = format!("attachment-{i}");
            body.get(&name).and_then(|v| attachment_from(v, &name))
        })
        .collect()
}

/// Maps a raw webhook body to an [`InboundEmail`].
pub fn normalize(body: &Value, headers: &HeaderMap) -> (Provider, InboundEmail) {
    let provider = detect_provider(body, headers);
    let email = match provider {
        Provider::SendGrid => InboundEmail {
            from: field(body, &["from"]),
            to: field(body, &["to"]),
            subject: field(body, &["subject"]).unwrap_or_default(),
            text: field(body, &["text"]),
            html: field(body, &["html"]),
            attachments: attachment_list(body),
        },
        Provider::Mailgun => InboundEmail {
            from: field(body, &["sender", "from"]),
            to: field(body, &["recipient"]),
            subject: field(body, &["subject", "Subject"]).unwrap_or_default(),
            text: field(body, &["body-plain", "stripped-text"]),
            html: field(body, &["body-html", "stripped-html"]),
            attachments: mailgun_attachments(body),
        },
        Provider::AwsSes => {
            let content = field(body, &["content"]);
            InboundEmail {
                from: field(body, &["/mail/source"]),
                to: field(body, &["/mail/destination/0"]),
                subject: field(body, &["/mail/commonHeaders/subject"]).unwrap_or_default(),
                text: content.clone(),
                html: content,
                attachments: Vec::new(),
            }
        }
        Provider::Generic => InboundEmail {
            from: field(body, &["from", "sender", "email"]),
            to: field(body, &["to", "recipient"]),
            subject: field(body, &["subject"]).unwrap_or_default(),
            text: field(body, &["text", "body", "content"]),
            html: field(body, &["html", "body_html"]),
            attachments: attachment_list(body),
        },
    };
    (provider, email)
}
