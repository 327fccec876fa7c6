use crate::domain::repository::{CodeRegistry, LedgerEntryStore, LedgerStore};
use crate::domain::types::{LedgerStats, TxMode};
use crate::error::RewardsServiceError;

/// Aggregates ledger and registry totals. Read-only.
pub struct GetLedgerStatsUseCase<S: LedgerStore> {
    pub store: S,
}

impl<S: LedgerStore> GetLedgerStatsUseCase<S> {
    pub async fn execute(&self) -> Result<LedgerStats, RewardsServiceError> {
        let tx = self.store.begin(TxMode::ReadOnly).await?;
        let total_disposals = tx.count().await?;
        let total_points_issued = tx.sum_points().await?;
        let codes = tx.count_by_status().await?;
        Ok(LedgerStats {
            total_disposals,
            total_points_issued,
            used_codes: codes.used,
            unused_codes: codes.unused,
        })
    }
}
