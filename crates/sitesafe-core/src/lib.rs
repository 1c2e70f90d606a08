//! sitesafe-core - Core library for SiteSafe
//!
//! Models, form schemas, the device-local database, the offline outbox and
//! the backend client shared by SiteSafe front ends.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod outbox;
pub mod remote;
pub mod schema;
pub mod services;
pub mod state;
mod util;

pub use config::BackendConfig;
pub use error::{Error, Result};
pub use outbox::{Outbox, OutboxStore, RetryPolicy, SyncAttemptResult, SyncReport};
pub use remote::SupabaseBackend;
pub use services::{DatabaseService, SafetyApp};
pub use state::{AppContext, Connectivity, StatusSnapshot};
