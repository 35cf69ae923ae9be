//! Templated email notifications.
//!
//! Templates live in the database so editors can adjust copy without a
//! deploy; rendering is a simple `{{ variable }}` substitution. Delivery
//! goes through the [`Mailer`] trait; callers treat every failure as
//! log-and-continue, because no mutation is allowed to fail on a mail
//! problem.

pub mod mailer;
pub mod templates;

use std::collections::HashMap;

use rusqlite::Connection;
use thiserror::Error;

use crate::config::Config;
use mailer::{Mailer, OutgoingEmail};
use templates::load_template;

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("no active email template for key '{0}'")]
    TemplateNotFound(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("mail transport error: {0}")]
    Transport(String),
}

/// Renders the template stored under `key` and hands the message to the
/// transport. The plain-text body is preferred, falling back to the HTML
/// body when no text version is maintained.
pub fn send_templated_email(
    conn: &Connection,
    mailer: &dyn Mailer,
    config: &Config,
    key: &str,
    recipients: &[String],
    context: &HashMap<String, String>,
) -> Result<(), NotificationError> {
    let template = load_template(conn, key)?.ok_or_else(|| {
        NotificationError::TemplateNotFound(key.to_string())
    })?;

    let subject = template.render_subject(context);
    let body_text = template.render_text(context);
    let body_html = template.render_html(context);

    let email = OutgoingEmail {
        subject: if subject.is_empty() {
            key.to_string()
        } else {
            subject
        },
        from: config.default_from_email.clone(),
        to: recipients.to_vec(),
        body_text: if body_text.is_empty() {
            body_html.clone()
        } else {
            body_text
        },
        body_html: Some(body_html).filter(|html| !html.is_empty()),
    };

    mailer
        .send(&email)
        .map_err(|e| NotificationError::Transport(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::memory_db;
    use super::mailer::LogMailer;

    pub fn test_config() -> Config {
        // Config::load reads the environment; tests build the struct directly.
        Config {
            bind_host: "127.0.0.1".into(),
            bind_port: 0,
            database_path: ":memory:".into(),
            media_root: "media".into(),
            media_base_url: "http://localhost/media".into(),
            frontend_url: "http://localhost:5173".into(),
            password_reset_path: "/auth/reset-password/{uid}/{token}".into(),
            password_reset_timeout_minutes: 60,
            default_from_email: "no-reply@test".into(),
            comment_notification_recipients: vec![],
            mail_backend: crate::config::MailBackend::Log,
            mail_outbox_dir: "outbox".into(),
            search_enabled: false,
            search_rest_url: String::new(),
            search_rest_token: String::new(),
            search_index: "recipes".into(),
        }
    }

    #[test]
    fn seeded_template_sends() {
        let conn = memory_db();
        let mut context = HashMap::new();
        context.insert("user_name".to_string(), "Greta".to_string());

        send_templated_email(
            &conn,
            &LogMailer,
            &test_config(),
            "welcome",
            &["greta@example.com".to_string()],
            &context,
        )
        .expect("send");
    }

    #[test]
    fn unknown_key_is_reported() {
        let conn = memory_db();
        let err = send_templated_email(
            &conn,
            &LogMailer,
            &test_config(),
            "no-such-template",
            &["a@b.c".to_string()],
            &HashMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, NotificationError::TemplateNotFound(_)));
    }

    #[test]
    fn inactive_templates_are_invisible() {
        let conn = memory_db();
        conn.execute(
            "UPDATE email_templates SET is_active = 0 WHERE key = 'welcome'",
            [],
        )
        .unwrap();

        let err = send_templated_email(
            &conn,
            &LogMailer,
            &test_config(),
            "welcome",
            &["a@b.c".to_string()],
            &HashMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, NotificationError::TemplateNotFound(_)));
    }
}

#[cfg(test)]
pub use tests::test_config;
