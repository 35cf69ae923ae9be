//! Recipe platform backend.
//!
//! A content-management backend for a recipe website: session-based
//! authentication, recipe listings and detail with taxonomy filters,
//! bookmarks, ratings, moderated comments, editor-managed site content
//! and templated email notifications. Published recipes are mirrored
//! into an external search index; the listing endpoint consults the
//! index for ranked full-text results and falls back to relational
//! substring filtering whenever the index is unavailable.
//!
//! Binaries:
//! - `backend`: the HTTP server.
//! - `manage`: schema bootstrap, user creation and index backfill.

pub mod accounts;
pub mod config;
pub mod db;
pub mod error;
pub mod images;
pub mod notifications;
pub mod search_index;
pub mod services;
pub mod slug;
pub mod state;
pub mod sync;
