//! Mailer module

mod errors;
mod message;

#[cfg(test)]
use mockall::mock;

pub use errors::MailerError;
pub use message::OutboundMessage;

/// Delivers a composed message
pub trait Mailer {
    /// Send an email
    ///
    /// # Arguments
    /// * `message` - The [`OutboundMessage`] to deliver.
    ///
    /// # Returns
    /// [`Ok`] once the server accepted the message, otherwise the [`MailerError`]
    /// of the stage that failed.
    fn send_email(&self, message: &OutboundMessage) -> Result<(), MailerError>;
}

#[cfg(test)]
mock! {
    pub Mailer {}

    impl Mailer for Mailer {
        fn send_email(&self, message: &OutboundMessage) -> Result<(), MailerError>;
    }
}
