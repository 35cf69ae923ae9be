//! Mail transports.
//!
//! The default transport just logs the rendered message, which is what
//! development and test environments want; the file transport drops one
//! message per file into an outbox directory for inspection or pickup by
//! an external relay.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use log::info;
use thiserror::Error;
use uuid::Uuid;

use crate::config::{Config, MailBackend};

#[derive(Debug, Error)]
pub enum MailError {
    #[error("failed to write outbox file: {0}")]
    Io(#[from] std::io::Error),
}

/// A rendered message ready for delivery.
#[derive(Clone, Debug)]
pub struct OutgoingEmail {
    pub subject: String,
    pub from: String,
    pub to: Vec<String>,
    pub body_text: String,
    pub body_html: Option<String>,
}

pub trait Mailer: Send + Sync {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

/// Builds the transport selected by configuration.
pub fn from_config(config: &Config) -> Box<dyn Mailer> {
    match config.mail_backend {
        MailBackend::Log => Box::new(LogMailer),
        MailBackend::File => Box::new(FileMailer {
            outbox_dir: config.mail_outbox_dir.clone(),
        }),
    }
}

pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        info!(
            "Email to {}: {} | {}",
            email.to.join(", "),
            email.subject,
            email.body_text.replace('\n', " ")
        );
        Ok(())
    }
}

pub struct FileMailer {
    pub outbox_dir: PathBuf,
}

impl Mailer for FileMailer {
    fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        fs::create_dir_all(&self.outbox_dir)?;
        let path = self
            .outbox_dir
            .join(format!("{}.eml", Uuid::new_v4().simple()));
        let mut file = fs::File::create(&path)?;
        writeln!(file, "From: {}", email.from)?;
        writeln!(file, "To: {}", email.to.join(", "))?;
        writeln!(file, "Subject: {}", email.subject)?;
        writeln!(file)?;
        writeln!(file, "{}", email.body_text)?;
        if let Some(html) = &email.body_html {
            writeln!(file)?;
            writeln!(file, "--- text/html ---")?;
            writeln!(file, "{html}")?;
        }
        info!("Email to {} written to {}", email.to.join(", "), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_mailer_writes_one_file_per_message() {
        let dir = tempfile::tempdir().unwrap();
        let mailer = FileMailer {
            outbox_dir: dir.path().to_path_buf(),
        };
        let email = OutgoingEmail {
            subject: "Hello".into(),
            from: "no-reply@test".into(),
            to: vec!["a@b.c".into()],
            body_text: "Body".into(),
            body_html: Some("<p>Body</p>".into()),
        };

        mailer.send(&email).unwrap();
        mailer.send(&email).unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(files.len(), 2);
    }
}
