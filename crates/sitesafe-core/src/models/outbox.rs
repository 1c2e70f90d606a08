//! Offline outbox entry model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::form::{FileBlob, FormType, SubmissionPayload};

/// Locally assigned outbox identifier. Monotonically increasing and never
/// reused, so ordering by id is insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutboxId(i64);

impl OutboxId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for OutboxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for OutboxId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// The single file an offline submission may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedFile {
    /// Form field the uploaded URL belongs in, when the caller knows it
    pub field: Option<String>,
    pub blob: FileBlob,
}

impl QueuedFile {
    pub const fn new(field: Option<String>, blob: FileBlob) -> Self {
        Self { field, blob }
    }
}

/// A form submission waiting in the outbox.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedSubmission {
    pub id: OutboxId,
    pub payload: SubmissionPayload,
    pub file: Option<QueuedFile>,
    /// Enqueue timestamp (Unix ms)
    pub created_at: i64,
    /// Failed sync attempts so far
    pub attempts: u32,
    /// Message from the most recent failed attempt
    pub last_error: Option<String>,
}

/// Lightweight view of a queued item, without data or file bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingSubmission {
    pub id: OutboxId,
    pub form_type: FormType,
    pub project_id: String,
    pub submitted_by_id: String,
    pub file_name: Option<String>,
    pub created_at: i64,
    pub attempts: u32,
    pub last_error: Option<String>,
}

/// An item parked after exhausting the retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadLetter {
    pub id: OutboxId,
    pub form_type: FormType,
    pub project_id: String,
    pub attempts: u32,
    pub last_error: Option<String>,
    /// When the item was parked (Unix ms)
    pub dead_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outbox_id_parses_and_orders() {
        let first: OutboxId = " 7 ".parse().unwrap();
        let second = OutboxId::new(8);
        assert!(first < second);
        assert_eq!(first.to_string(), "7");
        assert!("seven".parse::<OutboxId>().is_err());
    }
}
