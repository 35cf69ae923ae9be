//! Shared application state injected into every handler.

use rusqlite::Connection;

use crate::config::Config;
use crate::db;
use crate::error::ApiError;
use crate::notifications::mailer::{self, Mailer};
use crate::search_index::SearchIndex;

/// Everything a request handler needs: configuration, the search index
/// client and the mail transport. Database connections are opened per
/// request via [`AppState::db`].
pub struct AppState {
    pub config: Config,
    pub search: SearchIndex,
    pub mailer: Box<dyn Mailer>,
}

impl AppState {
    /// Loads configuration from the environment and bootstraps the
    /// database schema.
    pub fn new() -> Result<Self, ApiError> {
        Self::with_config(Config::load())
    }

    pub fn with_config(config: Config) -> Result<Self, ApiError> {
        let conn = db::open(&config.database_path)?;
        db::init_schema(&conn)?;

        let search = SearchIndex::from_config(&config);
        let mailer = mailer::from_config(&config);
        Ok(Self {
            config,
            search,
            mailer,
        })
    }

    /// Fresh connection to the application database.
    pub fn db(&self) -> Result<Connection, ApiError> {
        db::open(&self.config.database_path)
    }
}
