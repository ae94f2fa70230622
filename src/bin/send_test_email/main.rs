#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! Sends one test email through the configured SMTP server

use std::process::ExitCode;

use clap::Parser;
use smtp_test_email::{
    domain::communication::{mailer::MailerError, test_email::send_test_email},
    infrastructure::email::smtp::{SMTPConfig, SMTPMailer},
};

/// Command-line arguments / environment variables
#[derive(Debug, Parser)]
pub struct Args {
    /// The SMTP configuration
    #[clap(flatten)]
    pub smtp: SMTPConfig,
}

fn run(config: SMTPConfig) -> Result<(), MailerError> {
    let mailer = SMTPMailer::new(config.clone())?;

    send_test_email(&mailer, &config.test_email()?)
}

#[mutants::skip]
fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .without_time()
        .with_target(false)
        .with_level(false)
        .init();

    let args = Args::parse();

    match run(args.smtp) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);

            ExitCode::FAILURE
        }
    }
}
