//! Object storage for proposal attachments received by email.

use aws_sdk_s3::primitives::ByteStream;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::email::inbound::InboundAttachment;
use crate::errors::AppError;
use crate::models::rfp::Attachment;

/// Placeholder scheme for attachments whose bytes never reached storage.
const UNSTORED_SCHEME: &str = "email-attachment://";

/// Final path segment with anything outside `[A-Za-z0-9._-]` replaced by `_`.
pub fn safe_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "attachment".to_string()
    } else {
        cleaned
    }
}

/// `proposals/<id>/<position>-<name>`; the position keeps same-named files apart.
pub fn attachment_key(proposal_id: Uuid, position: usize, filename: &str) -> String {
    format!("proposals/{proposal_id}/{position}-{}", safe_filename(filename))
}

/// Uploads one base64 attachment body and returns its `s3://` location.
pub async fn upload_attachment(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    proposal_id: Uuid,
    position: usize,
    attachment: &InboundAttachment,
    content_b64: &str,
) -> Result<String, AppError> {
    let bytes = STANDARD
        .decode(content_b64.trim())
        .map_err(|e| AppError::Validation(format!("Attachment '{}' is not valid base64: {e}", attachment.filename)))?;

    let key = attachment_key(proposal_id, position, &attachment.filename);
    let content_type = attachment
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");

    s3.put_object()
        .bucket(bucket)
        .key(&key)
        .body(ByteStream::from(bytes))
        .content_type(content_type)
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;

    info!("Uploaded attachment to s3://{}/{}", bucket, key);
    Ok(format!("s3://{bucket}/{key}"))
}

/// Stores every attachment that carries content. Failures are logged and the
/// attachment is kept under a placeholder URL so the proposal is not lost.
pub async fn store_attachments(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    proposal_id: Uuid,
    attachments: &[InboundAttachment],
) -> Vec<Attachment> {
    let mut stored = Vec::with_capacity(attachments.len());
    for (position, attachment) in attachments.iter().enumerate() {
        let url = match attachment.content.as_deref().filter(|c| !c.trim().is_empty()) {
            Some(content) => {
                match upload_attachment(s3, bucket, proposal_id, position, attachment, content).await {
                    Ok(url) => url,
                    Err(e) => {
                        warn!(%proposal_id, filename = %attachment.filename, "Attachment not stored: {e}");
                        placeholder_url(&attachment.filename)
                    }
                }
            }
            None => placeholder_url(&attachment.filename),
        };
        stored.push(Attachment {
            filename: attachment.filename.clone(),
            url,
            uploaded_at: Some(Utc::now()),
        });
    }
    stored
}

pub fn placeholder_url(filename: &str) -> String {
    format!("{UNSTORED_SCHEME}{filename}")
}
