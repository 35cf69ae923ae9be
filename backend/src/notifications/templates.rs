//! Database-stored email templates and their rendering.

use std::collections::HashMap;

use regex::{Captures, Regex};
use rusqlite::{Connection, OptionalExtension};

/// An editable template row. Subject and bodies may contain
/// `{{ variable }}` placeholders resolved from a context map at send
/// time; unknown variables render as empty strings.
#[derive(Clone, Debug)]
pub struct EmailTemplate {
    pub key: String,
    pub name: String,
    pub subject: String,
    pub body_text: String,
    pub body_html: String,
}

impl EmailTemplate {
    pub fn render_subject(&self, context: &HashMap<String, String>) -> String {
        render(&self.subject, context)
    }

    pub fn render_text(&self, context: &HashMap<String, String>) -> String {
        render(&self.body_text, context)
    }

    pub fn render_html(&self, context: &HashMap<String, String>) -> String {
        render(&self.body_html, context)
    }
}

/// Fetches the active template stored under `key`, if any.
pub fn load_template(
    conn: &Connection,
    key: &str,
) -> Result<Option<EmailTemplate>, rusqlite::Error> {
    conn.query_row(
        "SELECT key, name, subject, body_text, body_html
         FROM email_templates WHERE key = ?1 AND is_active = 1",
        [key],
        |row| {
            Ok(EmailTemplate {
                key: row.get(0)?,
                name: row.get(1)?,
                subject: row.get(2)?,
                body_text: row.get(3)?,
                body_html: row.get(4)?,
            })
        },
    )
    .optional()
}

fn render(template: &str, context: &HashMap<String, String>) -> String {
    if template.is_empty() {
        return String::new();
    }
    let re = Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*\}\}").expect("static regex");
    re.replace_all(template, |caps: &Captures| {
        context.get(&caps[1]).cloned().unwrap_or_default()
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn placeholders_are_substituted() {
        let template = EmailTemplate {
            key: "t".into(),
            name: "t".into(),
            subject: "Hi {{ user_name }}".into(),
            body_text: "Link: {{reset_url}} ({{ valid_minutes }} min)".into(),
            body_html: String::new(),
        };
        let ctx = context(&[
            ("user_name", "Jo"),
            ("reset_url", "https://x/r"),
            ("valid_minutes", "60"),
        ]);
        assert_eq!(template.render_subject(&ctx), "Hi Jo");
        assert_eq!(template.render_text(&ctx), "Link: https://x/r (60 min)");
        assert_eq!(template.render_html(&ctx), "");
    }

    #[test]
    fn unknown_variables_render_empty() {
        let template = EmailTemplate {
            key: "t".into(),
            name: "t".into(),
            subject: "{{ missing }}!".into(),
            body_text: String::new(),
            body_html: String::new(),
        };
        assert_eq!(template.render_subject(&HashMap::new()), "!");
    }
}
