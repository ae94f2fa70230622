//! SMTP sessions

use std::{
    fmt,
    ops::{Deref, DerefMut},
    time::Duration,
};

use lettre::{
    address::Envelope,
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{SmtpConnection, TlsParameters},
        extension::ClientId,
    },
};
use tracing::debug;

#[cfg(test)]
use mockall::mock;

use crate::domain::communication::mailer::MailerError;

/// Opens SMTP sessions
pub trait Connector {
    /// The session handed out by [`Connector::connect`]
    type Session: SmtpSession;

    /// Opens a plaintext session to `host:port` and greets the server.
    ///
    /// # Errors
    /// [`MailerError::ConnectionError`] if the server cannot be reached or
    /// does not answer the greeting.
    fn connect(&self, host: &str, port: u16) -> Result<Self::Session, MailerError>;
}

/// An open SMTP session, driven one stage at a time
pub trait SmtpSession {
    /// Upgrades the session with STARTTLS
    fn starttls(&mut self) -> Result<(), MailerError>;

    /// Authenticates the session
    fn login(&mut self, credentials: &Credentials) -> Result<(), MailerError>;

    /// Sends a serialized message
    fn transmit(&mut self, envelope: &Envelope, email: &[u8]) -> Result<(), MailerError>;

    /// Ends the session. Must not fail.
    fn close(&mut self);
}

#[cfg(test)]
mock! {
    pub Connector {}

    impl Connector for Connector {
        type Session = MockSmtpSession;

        fn connect(&self, host: &str, port: u16) -> Result<MockSmtpSession, MailerError>;
    }
}

#[cfg(test)]
mock! {
    pub SmtpSession {}

    impl SmtpSession for SmtpSession {
        fn starttls(&mut self) -> Result<(), MailerError>;
        fn login(&mut self, credentials: &Credentials) -> Result<(), MailerError>;
        fn transmit(&mut self, envelope: &Envelope, email: &[u8]) -> Result<(), MailerError>;
        fn close(&mut self);
    }
}

/// An open session that is closed when dropped
pub struct Connection<S: SmtpSession> {
    session: S,
}

impl<S: SmtpSession> Connection<S> {
    /// Takes ownership of an open session
    pub fn new(session: S) -> Self {
        Self { session }
    }
}

impl<S: SmtpSession> Deref for Connection<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.session
    }
}

impl<S: SmtpSession> DerefMut for Connection<S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut self.session
    }
}

impl<S: SmtpSession> Drop for Connection<S> {
    fn drop(&mut self) {
        debug!("closing SMTP connection");

        self.session.close();
    }
}

impl<S: SmtpSession> fmt::Debug for Connection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// Opens blocking sessions with lettre
#[derive(Clone)]
pub struct LettreConnector {
    tls: TlsParameters,
    hello_name: ClientId,
    timeout: Option<Duration>,
}

impl LettreConnector {
    /// Create a new connector
    ///
    /// # Arguments
    /// * `tls` - Parameters for the STARTTLS upgrade.
    /// * `timeout` - Applied to the connect and every command; [`None`] blocks indefinitely.
    pub fn new(tls: TlsParameters, timeout: Option<Duration>) -> Self {
        Self {
            tls,
            hello_name: ClientId::default(),
            timeout,
        }
    }
}

impl fmt::Debug for LettreConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LettreConnector")
            .field("hello_name", &self.hello_name)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Connector for LettreConnector {
    type Session = LettreSession;

    fn connect(&self, host: &str, port: u16) -> Result<LettreSession, MailerError> {
        let connection =
            SmtpConnection::connect((host, port), self.timeout, &self.hello_name, None, None)
                .map_err(|e| MailerError::ConnectionError(e.into()))?;

        debug!(server = ?connection.server_info(), "connected");

        Ok(LettreSession {
            connection,
            tls: self.tls.clone(),
            hello_name: self.hello_name.clone(),
        })
    }
}

/// A lettre SMTP session
pub struct LettreSession {
    connection: SmtpConnection,
    tls: TlsParameters,
    hello_name: ClientId,
}

impl fmt::Debug for LettreSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LettreSession")
            .field("server", self.connection.server_info())
            .finish_non_exhaustive()
    }
}

impl SmtpSession for LettreSession {
    fn starttls(&mut self) -> Result<(), MailerError> {
        self.connection
            .starttls(&self.tls, &self.hello_name)
            .map_err(|e| MailerError::TlsError(e.into()))?;

        debug!("connection encrypted");

        Ok(())
    }

    fn login(&mut self, credentials: &Credentials) -> Result<(), MailerError> {
        let response = self
            .connection
            .auth(&[Mechanism::Plain, Mechanism::Login], credentials)
            .map_err(|e| MailerError::AuthError(e.into()))?;

        debug!(code = %response.code(), "authenticated");

        Ok(())
    }

    fn transmit(&mut self, envelope: &Envelope, email: &[u8]) -> Result<(), MailerError> {
        let response = self
            .connection
            .send(envelope, email)
            .map_err(|e| MailerError::SendError(e.into()))?;

        debug!(code = %response.code(), "message accepted");

        Ok(())
    }

    fn close(&mut self) {
        if let Err(e) = self.connection.quit() {
            debug!("QUIT failed, dropping the socket: {}", e);

            self.connection.abort();
        }
    }
}
