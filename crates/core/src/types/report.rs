//! Run-report tallies for ingestion, seeding, and digest delivery.

use serde::Serialize;

use super::email::Email;

/// Inserted/existing counts for one upserted entity kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpsertTally {
    pub inserted: u32,
    pub existing: u32,
}

/// Inserted/skipped counts for deals, where a skip is a duplicate
/// composite key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DealTally {
    pub inserted: u32,
    pub skipped: u32,
}

/// Structured tally returned by deal ingestion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub retailers: UpsertTally,
    pub products: UpsertTally,
    pub deals: DealTally,
}

/// Tally returned by user seeding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub inserted: u32,
    pub existing: u32,
}

/// Per-user outcome of one digest delivery attempt.
///
/// A user with no matching deals is recorded as a non-success with
/// `error = "No matching deals"` rather than silently skipped, so the run
/// summary accounts for every subscriber.
#[derive(Debug, Clone, Serialize)]
pub struct SendOutcome {
    pub success: bool,
    pub email: Email,
    pub user_name: String,
    pub deals_count: usize,
    pub error: Option<String>,
}

impl SendOutcome {
    /// Record a successful delivery.
    #[must_use]
    pub const fn sent(email: Email, user_name: String, deals_count: usize) -> Self {
        Self {
            success: true,
            email,
            user_name,
            deals_count,
            error: None,
        }
    }

    /// Record a failure with a reason visible in the run summary.
    #[must_use]
    pub const fn failed(
        email: Email,
        user_name: String,
        deals_count: usize,
        reason: String,
    ) -> Self {
        Self {
            success: false,
            email,
            user_name,
            deals_count,
            error: Some(reason),
        }
    }
}
