// Email in both directions:
// - outbound: RFP invitations to vendors and new-proposal notices to buyers (Brevo)
// - inbound: provider webhooks carrying vendor replies, parsed into proposals

pub mod handlers;
pub mod inbound;
pub mod mailer;
pub mod parser;
pub mod templates;
