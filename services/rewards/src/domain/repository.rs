#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};

use crate::domain::types::{Code, CodeCounts, LedgerEntry, MarkUsed, TxMode, User};
use crate::error::RewardsServiceError;

/// The universe of issuable codes and their redemption status.
pub trait CodeRegistry: Send + Sync {
    async fn lookup(&self, code: &str) -> Result<Option<Code>, RewardsServiceError>;

    /// Conditionally flip `code` from unused to used in one indivisible step.
    /// Of any number of concurrent callers on the same code, exactly one
    /// observes `Marked`.
    async fn try_mark_used(
        &self,
        code: &str,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<MarkUsed, RewardsServiceError>;

    async fn count_by_status(&self) -> Result<CodeCounts, RewardsServiceError>;

    /// Insert codes as unused, skipping ones that already exist.
    /// Returns how many were inserted.
    async fn insert_unused(&self, batch: &[String]) -> Result<u64, RewardsServiceError>;

    /// Revert every code to unused, clearing redeemer and timestamp.
    async fn release_all(&self) -> Result<(), RewardsServiceError>;
}

/// Per-user point balances.
pub trait UserBalanceStore: Send + Sync {
    async fn get(&self, user_id: i64) -> Result<Option<User>, RewardsServiceError>;

    /// Return the user, creating it with `default_name` and zero points if absent.
    async fn get_or_create(
        &self,
        user_id: i64,
        default_name: &str,
    ) -> Result<User, RewardsServiceError>;

    /// Atomically add `delta` to the stored total. Returns the new total.
    async fn add_points(&self, user_id: i64, delta: i64) -> Result<i64, RewardsServiceError>;

    async fn reset_all(&self) -> Result<(), RewardsServiceError>;
}

/// Append-only history of redemptions.
pub trait LedgerEntryStore: Send + Sync {
    /// Returns the id of the new entry. Ids increase and are never reused.
    async fn append(
        &self,
        user_id: i64,
        code: &str,
        points_awarded: i32,
        timestamp: DateTime<Utc>,
    ) -> Result<i64, RewardsServiceError>;

    /// Entries of one user, most recent first.
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<LedgerEntry>, RewardsServiceError>;

    async fn count(&self) -> Result<u64, RewardsServiceError>;

    /// Total points across all entries, 0 when empty.
    async fn sum_points(&self) -> Result<i64, RewardsServiceError>;

    async fn clear_all(&self) -> Result<(), RewardsServiceError>;
}

/// One unit of work over all three stores. Dropping it without `commit`
/// discards every change made through it.
pub trait LedgerTransaction: CodeRegistry + UserBalanceStore + LedgerEntryStore {
    async fn commit(self) -> Result<(), RewardsServiceError>;
}

/// Entry point to the storage backend.
pub trait LedgerStore: Send + Sync {
    type Tx: LedgerTransaction;

    async fn begin(&self, mode: TxMode) -> Result<Self::Tx, RewardsServiceError>;
}
