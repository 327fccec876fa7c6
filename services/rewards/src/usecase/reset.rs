use tracing::warn;

use crate::domain::repository::{
    CodeRegistry, LedgerEntryStore, LedgerStore, LedgerTransaction, UserBalanceStore,
};
use crate::domain::types::TxMode;
use crate::error::RewardsServiceError;

/// Returns the ledger to its provisioned state: every balance zero, every code
/// unused, no history. Runs as one exclusive transaction, so concurrent
/// redemptions land entirely before or entirely after it.
pub struct ResetLedgerUseCase<S: LedgerStore> {
    pub store: S,
}

impl<S: LedgerStore> ResetLedgerUseCase<S> {
    pub async fn execute(&self) -> Result<(), RewardsServiceError> {
        let tx = self.store.begin(TxMode::Exclusive).await?;
        let cleared = tx.count().await?;
        tx.reset_all().await?;
        tx.release_all().await?;
        tx.clear_all().await?;
        tx.commit().await?;
        warn!(cleared_entries = cleared, "ledger reset");
        Ok(())
    }
}
