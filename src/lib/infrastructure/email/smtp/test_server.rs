//! In-process SMTP server that upgrades with STARTTLS

use std::{
    io::{BufRead, BufReader, Write},
    net::{SocketAddr, TcpListener},
    thread::{self, JoinHandle},
};

use native_tls::{Identity, TlsAcceptor};
use testresult::TestResult;

const CERTIFICATE: &[u8] = include_bytes!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/localhost.crt"
));

const PRIVATE_KEY: &[u8] = include_bytes!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/localhost.key"
));

/// Everything the server received during one session
#[derive(Debug, Default)]
pub struct Transcript {
    /// Commands received before the upgrade
    pub plaintext: Vec<String>,

    /// Commands received over TLS
    pub encrypted: Vec<String>,

    /// Message contents received after DATA
    pub messages: Vec<String>,
}

/// Serves a single SMTP session on a background thread
#[derive(Debug)]
pub struct StartTlsServer {
    address: SocketAddr,
    handle: JoinHandle<Transcript>,
}

impl StartTlsServer {
    /// Starts listening on an ephemeral local port
    pub fn start(accept_login: bool) -> TestResult<Self> {
        let identity = Identity::from_pkcs8(CERTIFICATE, PRIVATE_KEY)?;
        let acceptor = TlsAcceptor::new(identity)?;

        let listener = TcpListener::bind("127.0.0.1:0")?;
        let address = listener.local_addr()?;

        let handle = thread::spawn(move || serve(listener, acceptor, accept_login));

        Ok(Self { address, handle })
    }

    /// The address the server listens on
    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Waits for the session to end
    pub fn finish(self) -> Transcript {
        self.handle.join().expect("SMTP test server panicked")
    }
}

fn read_command<R: BufRead>(reader: &mut R) -> Option<String> {
    let mut line = String::new();

    match reader.read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line.trim_end().to_string()),
    }
}

fn serve(listener: TcpListener, acceptor: TlsAcceptor, accept_login: bool) -> Transcript {
    let mut transcript = Transcript::default();

    let Ok((stream, _)) = listener.accept() else {
        return transcript;
    };
    let Ok(clone) = stream.try_clone() else {
        return transcript;
    };
    let mut reader = BufReader::new(clone);
    let mut writer = &stream;

    let _ = writer.write_all(b"220 mock.local ESMTP ready\r\n");

    loop {
        let Some(command) = read_command(&mut reader) else {
            return transcript;
        };
        transcript.plaintext.push(command.clone());

        if command.starts_with("EHLO") {
            let _ = writer.write_all(b"250-mock.local\r\n250 STARTTLS\r\n");
        } else if command == "STARTTLS" {
            let _ = writer.write_all(b"220 2.0.0 Ready to start TLS\r\n");
            break;
        } else {
            let _ = writer.write_all(b"530 5.7.0 Must issue a STARTTLS command first\r\n");
        }
    }

    drop(reader);

    let Ok(tls) = acceptor.accept(stream) else {
        return transcript;
    };
    let mut session = BufReader::new(tls);

    while let Some(command) = read_command(&mut session) {
        transcript.encrypted.push(command.clone());

        let verb = command
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();

        let reply: &[u8] = match verb.as_str() {
            "EHLO" => b"250-mock.local\r\n250 AUTH PLAIN\r\n",
            "AUTH" if accept_login => b"235 2.7.0 Authentication successful\r\n",
            "AUTH" => b"535 5.7.8 Authentication credentials invalid\r\n",
            "MAIL" | "RCPT" => b"250 2.1.0 OK\r\n",
            "DATA" => {
                let _ = session.get_mut().write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n");

                let mut message = String::new();

                while let Some(line) = read_command(&mut session) {
                    if line == "." {
                        break;
                    }

                    message.push_str(&line);
                    message.push('\n');
                }

                transcript.messages.push(message);

                b"250 2.0.0 Queued\r\n"
            }
            "QUIT" => {
                let _ = session.get_mut().write_all(b"221 2.0.0 Bye\r\n");
                break;
            }
            _ => b"500 5.5.2 Unrecognized command\r\n",
        };

        let _ = session.get_mut().write_all(reply);
    }

    transcript
}
