//! Mailer errors

use thiserror::Error;
use tracing::debug;

use crate::domain::communication::email_addresses::EmailAddressError;

/// Mailer errors
#[derive(Debug, Error)]
pub enum MailerError {
    /// Credentials were not configured
    #[error("SMTP_USER and SMTP_PASSWORD not found in environment")]
    ConfigMissing,

    /// A server setting was not configured
    #[error("{0} not found in environment")]
    SettingMissing(&'static str),

    /// Invalid email address
    #[error("invalid email address: {0}")]
    InvalidEmail(String),

    /// The server could not be reached or the session could not be opened
    #[error(transparent)]
    ConnectionError(anyhow::Error),

    /// STARTTLS negotiation failed
    #[error(transparent)]
    TlsError(anyhow::Error),

    /// The server rejected the credentials
    #[error(transparent)]
    AuthError(anyhow::Error),

    /// The server rejected the envelope or the message
    #[error(transparent)]
    SendError(anyhow::Error),

    /// Unknown error
    #[error(transparent)]
    UnknownError(anyhow::Error),
}

impl From<anyhow::Error> for MailerError {
    fn from(err: anyhow::Error) -> Self {
        MailerError::UnknownError(err)
    }
}

impl From<EmailAddressError> for MailerError {
    fn from(err: EmailAddressError) -> Self {
        debug!("EmailAddressError -> MailerError");

        MailerError::InvalidEmail(err.to_string())
    }
}

impl From<lettre::address::AddressError> for MailerError {
    fn from(err: lettre::address::AddressError) -> Self {
        debug!("AddressError -> MailerError");

        MailerError::InvalidEmail(err.to_string())
    }
}

impl From<lettre::error::Error> for MailerError {
    fn from(err: lettre::error::Error) -> Self {
        debug!("lettre::error::Error -> MailerError");

        MailerError::UnknownError(err.into())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn test_config_missing_names_both_variables() {
        let message = MailerError::ConfigMissing.to_string();

        assert!(message.contains("SMTP_USER"));
        assert!(message.contains("SMTP_PASSWORD"));
    }

    #[test]
    fn test_setting_missing_names_the_variable() {
        assert_eq!(
            MailerError::SettingMissing("SMTP_HOST").to_string(),
            "SMTP_HOST not found in environment"
        );
    }

    #[test]
    fn test_stage_errors_display_the_underlying_cause() {
        let err = MailerError::AuthError(anyhow!("535 5.7.8 authentication failed"));

        assert_eq!(err.to_string(), "535 5.7.8 authentication failed");
    }

    #[test]
    fn test_email_address_error_becomes_invalid_email() {
        let err: MailerError = EmailAddressError::EmptyEmailAddress.into();

        assert!(matches!(err, MailerError::InvalidEmail(_)));
    }
}
