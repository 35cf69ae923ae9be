//! Environment-driven application configuration.
//!
//! Every knob has a logged default so a bare `cargo run` comes up as a
//! self-contained development instance: SQLite file next to the binary,
//! media on disk, emails to the log, search index disabled until
//! credentials are provided.

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use log::{info, warn};

/// Where rendered emails go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MailBackend {
    /// Write the rendered message to the application log.
    Log,
    /// Write one file per message into `mail_outbox_dir`.
    File,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_host: String,
    pub bind_port: u16,
    pub database_path: String,
    pub media_root: PathBuf,
    pub media_base_url: String,
    pub frontend_url: String,
    pub password_reset_path: String,
    pub password_reset_timeout_minutes: i64,
    pub default_from_email: String,
    pub comment_notification_recipients: Vec<String>,
    pub mail_backend: MailBackend,
    pub mail_outbox_dir: PathBuf,
    pub search_enabled: bool,
    pub search_rest_url: String,
    pub search_rest_token: String,
    pub search_index: String,
}

impl Config {
    pub fn load() -> Self {
        let mail_backend = match try_load::<String>("MAIL_BACKEND", "log").as_str() {
            "file" => MailBackend::File,
            "log" => MailBackend::Log,
            other => {
                warn!("Unknown MAIL_BACKEND '{other}', falling back to log");
                MailBackend::Log
            }
        };

        Self {
            bind_host: try_load("BIND_HOST", "127.0.0.1"),
            bind_port: try_load("BIND_PORT", "8080"),
            database_path: try_load("DATABASE_PATH", "recipes.sqlite"),
            media_root: PathBuf::from(try_load::<String>("MEDIA_ROOT", "media")),
            media_base_url: trim_trailing_slash(try_load(
                "MEDIA_BASE_URL",
                "http://localhost:8080/media",
            )),
            frontend_url: trim_trailing_slash(try_load("FRONTEND_URL", "http://localhost:5173")),
            password_reset_path: try_load(
                "PASSWORD_RESET_PATH",
                "/auth/reset-password/{uid}/{token}",
            ),
            password_reset_timeout_minutes: try_load("PASSWORD_RESET_TIMEOUT_MINUTES", "60"),
            default_from_email: try_load("DEFAULT_FROM_EMAIL", "no-reply@localhost"),
            comment_notification_recipients: load_list("COMMENT_NOTIFICATION_RECIPIENTS"),
            mail_backend,
            mail_outbox_dir: PathBuf::from(try_load::<String>("MAIL_OUTBOX_DIR", "outbox")),
            search_enabled: try_load("SEARCH_ENABLED", "true"),
            search_rest_url: var("SEARCH_REST_URL").unwrap_or_default(),
            search_rest_token: var("SEARCH_REST_TOKEN").unwrap_or_default(),
            search_index: try_load("SEARCH_INDEX", "recipes"),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| warn!("Invalid {key} value: {e}"))
        .expect("Environment misconfigured!")
}

fn load_list(key: &str) -> Vec<String> {
    var(key)
        .map(|raw| {
            raw.split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn trim_trailing_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
