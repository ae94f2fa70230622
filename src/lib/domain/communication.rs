//! Outgoing email

pub mod email_addresses;
pub mod mailer;
pub mod test_email;
