//! Email message

use crate::domain::communication::email_addresses::EmailAddress;

/// A single plain-text email, built fresh for each delivery attempt
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundMessage {
    /// The sender of the email
    pub from: EmailAddress,

    /// The recipient of the email
    pub to: EmailAddress,

    /// The subject of the email
    pub subject: String,

    /// The plain text body of the email
    pub body: String,
}
