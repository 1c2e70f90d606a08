//! Local database layer for SiteSafe

mod connection;
mod draft_repository;
mod migrations;
mod outbox_repository;

pub use connection::Database;
pub use draft_repository::{DraftRepository, SqliteDraftRepository};
pub use outbox_repository::{OutboxRepository, SqliteOutboxRepository};
