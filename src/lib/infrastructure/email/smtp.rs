//! SMTP email service implementation

mod connection;
#[cfg(test)]
mod test_server;

use std::{fmt, time::Duration};

use clap::{ArgAction, Parser};
use lettre::{
    message::{MultiPart, SinglePart},
    transport::smtp::{authentication::Credentials, client::TlsParameters},
    Message,
};
use tracing::info;

pub use connection::{Connection, Connector, LettreConnector, LettreSession, SmtpSession};

use crate::domain::communication::{
    mailer::{Mailer, MailerError, OutboundMessage},
    test_email::TestEmail,
};

/// Sender used when `SMTP_FROM` is not set
pub const DEFAULT_FROM: &str = "admin@youroldmangaming.com";

/// Recipient used when `SMTP_TO` is not set
pub const DEFAULT_TO: &str = "wilsomrm2@yahoo.com";

/// SMTP configuration
#[derive(Clone, Default, Parser)]
pub struct SMTPConfig {
    /// The SMTP host
    #[clap(long, env = "SMTP_HOST")]
    pub host: Option<String>,

    /// The SMTP port
    #[clap(long, env = "SMTP_PORT")]
    pub port: Option<u16>,

    /// The SMTP username
    #[clap(long, env = "SMTP_USER")]
    pub username: Option<String>,

    /// The SMTP password
    #[clap(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// The sender email address
    #[clap(long, env = "SMTP_FROM", default_value = DEFAULT_FROM)]
    pub from: String,

    /// The recipient email address
    #[clap(long, env = "SMTP_TO", default_value = DEFAULT_TO)]
    pub to: String,

    /// Verify the TLS certificate
    #[clap(long, env = "SMTP_VERIFY_TLS", default_value_t = true, action = ArgAction::Set)]
    pub verify_tls: bool,

    /// Connect and command timeout in seconds, 0 to wait forever.
    ///
    /// The default of 60 seconds is the one lettre's own SMTP transport uses.
    #[clap(long, env = "SMTP_TIMEOUT", default_value_t = 60)]
    pub timeout: u64,
}

impl SMTPConfig {
    /// Returns the login credentials.
    ///
    /// # Errors
    /// [`MailerError::ConfigMissing`] unless both the username and the password
    /// are set and non-empty.
    pub fn credentials(&self) -> Result<Credentials, MailerError> {
        match (present(&self.username), present(&self.password)) {
            (Some(username), Some(password)) => {
                Ok(Credentials::new(username.to_string(), password.to_string()))
            }
            _ => Err(MailerError::ConfigMissing),
        }
    }

    /// Returns the server host and port.
    ///
    /// # Errors
    /// [`MailerError::SettingMissing`] naming the first absent setting.
    pub fn endpoint(&self) -> Result<(String, u16), MailerError> {
        let host = present(&self.host).ok_or(MailerError::SettingMissing("SMTP_HOST"))?;
        let port = self.port.ok_or(MailerError::SettingMissing("SMTP_PORT"))?;

        Ok((host.to_string(), port))
    }

    /// Describes this configuration as a [`TestEmail`]
    pub fn test_email(&self) -> Result<TestEmail, MailerError> {
        let (host, port) = self.endpoint()?;

        Ok(TestEmail {
            from: self.from.parse()?,
            to: self.to.parse()?,
            host,
            port,
            username: self.username.clone().unwrap_or_default(),
        })
    }

    /// The I/O timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }
}

impl fmt::Debug for SMTPConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SMTPConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .field("from", &self.from)
            .field("to", &self.to)
            .field("verify_tls", &self.verify_tls)
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// SMTP mailer
pub struct SMTPMailer<C: Connector = LettreConnector> {
    host: String,
    port: u16,
    username: String,
    credentials: Credentials,
    connector: C,
}

impl<C: Connector> fmt::Debug for SMTPMailer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SMTPMailer")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl SMTPMailer {
    /// Create a new SMTP mailer.
    ///
    /// No connection is made here. Credentials are checked before anything
    /// else, then the host and port.
    pub fn new(config: SMTPConfig) -> Result<Self, MailerError> {
        let credentials = config.credentials()?;
        let (host, port) = config.endpoint()?;

        let tls = TlsParameters::builder(host.clone())
            .dangerous_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| MailerError::TlsError(e.into()))?;

        let connector = LettreConnector::new(tls, config.timeout());

        Ok(Self::from_parts(config, credentials, (host, port), connector))
    }
}

impl<C: Connector> SMTPMailer<C> {
    /// Create a new SMTP mailer that opens sessions through `connector`
    pub fn with_connector(config: SMTPConfig, connector: C) -> Result<Self, MailerError> {
        let credentials = config.credentials()?;
        let endpoint = config.endpoint()?;

        Ok(Self::from_parts(config, credentials, endpoint, connector))
    }

    fn from_parts(
        config: SMTPConfig,
        credentials: Credentials,
        (host, port): (String, u16),
        connector: C,
    ) -> Self {
        Self {
            host,
            port,
            username: config.username.unwrap_or_default(),
            credentials,
            connector,
        }
    }
}

impl<C: Connector> Mailer for SMTPMailer<C> {
    fn send_email(&self, message: &OutboundMessage) -> Result<(), MailerError> {
        let email = Message::builder()
            .from(message.from.as_str().parse()?)
            .to(message.to.as_str().parse()?)
            .subject(message.subject.clone())
            .multipart(MultiPart::mixed().singlepart(SinglePart::plain(message.body.clone())))?;

        info!("Connecting to {}:{}...", self.host, self.port);
        let mut connection = Connection::new(self.connector.connect(&self.host, self.port)?);

        connection.starttls()?;

        info!("Attempting to login with user: {}", self.username);
        connection.login(&self.credentials)?;

        info!("Sending email from {} to {}...", message.from, message.to);
        connection.transmit(email.envelope(), &email.formatted())?;

        info!("Email sent successfully!");

        Ok(())
    }
}
