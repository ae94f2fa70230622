//! Diagnostic test email

use chrono::{DateTime, Local};
use tracing::debug;

use crate::domain::communication::{
    email_addresses::EmailAddress,
    mailer::{Mailer, MailerError, OutboundMessage},
};

/// Subject prefix of every test email
pub const SUBJECT_PREFIX: &str = "Test Email from Python";

/// Format of the timestamp appended to the subject
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Everything needed to describe the connection in a test email.
///
/// Holds no credential secret; the body is rendered from these fields only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestEmail {
    /// The sender
    pub from: EmailAddress,

    /// The recipient
    pub to: EmailAddress,

    /// The SMTP host the message goes through
    pub host: String,

    /// The SMTP port the message goes through
    pub port: u16,

    /// The user the session authenticates as
    pub username: String,
}

impl TestEmail {
    /// Builds the message for a delivery attempt made at `at`
    pub fn compose(&self, at: DateTime<Local>) -> OutboundMessage {
        OutboundMessage {
            from: self.from.clone(),
            to: self.to.clone(),
            subject: format!("{SUBJECT_PREFIX} - {}", at.format(TIMESTAMP_FORMAT)),
            body: self.render_body(),
        }
    }

    fn render_body(&self) -> String {
        format!(
            "This is a test email sent over SMTP with STARTTLS.\n\
             If you receive this, your SMTP configuration is working correctly.\n\
             \n\
             Configuration used:\n\
             SMTP Host: {host}\n\
             SMTP Port: {port}\n\
             From: {from}\n\
             Auth User: {user}\n",
            host = self.host,
            port = self.port,
            from = self.from,
            user = self.username,
        )
    }
}

/// Composes a test email stamped with the current local time and delivers it.
///
/// One call is one delivery attempt; nothing is retried.
pub fn send_test_email<M: Mailer>(mailer: &M, email: &TestEmail) -> Result<(), MailerError> {
    let message = email.compose(Local::now());

    debug!(subject = %message.subject, "composed test email");

    mailer.send_email(&message)
}
