use chrono::Utc;
use tracing::{debug, info};

use crate::domain::repository::{
    CodeRegistry, LedgerEntryStore, LedgerStore, LedgerTransaction, UserBalanceStore,
};
use crate::domain::types::{MarkUsed, Redeemed, TxMode, default_user_name, normalize_code};
use crate::error::RewardsServiceError;

pub struct RedeemCodeInput {
    pub user_id: i64,
    pub code: String,
}

/// Exchanges an unused code for points.
///
/// Everything happens in one read-write transaction: provisioning the user,
/// the registry's conditional unused -> used transition, the balance increment
/// and the ledger append. A rejected attempt rolls the transaction back, so it
/// leaves no trace (not even a freshly provisioned user).
pub struct RedeemCodeUseCase<S: LedgerStore> {
    pub store: S,
    pub reward_points: i32,
}

impl<S: LedgerStore> RedeemCodeUseCase<S> {
    pub async fn execute(&self, input: RedeemCodeInput) -> Result<Redeemed, RewardsServiceError> {
        let code = normalize_code(&input.code).ok_or(RewardsServiceError::InvalidCode)?;
        let user_id = input.user_id;

        let tx = self.store.begin(TxMode::ReadWrite).await?;
        tx.get_or_create(user_id, &default_user_name(user_id))
            .await?;

        let now = Utc::now();
        match tx.try_mark_used(&code, user_id, now).await? {
            MarkUsed::Marked { .. } => {}
            MarkUsed::NotFound => {
                debug!(user_id, code = %code, "unknown code presented");
                return Err(RewardsServiceError::InvalidCode);
            }
            MarkUsed::AlreadyUsed => {
                debug!(user_id, code = %code, "spent code presented");
                return Err(RewardsServiceError::CodeAlreadyRedeemed);
            }
        }

        let new_total = tx
            .add_points(user_id, i64::from(self.reward_points))
            .await?;
        let entry_id = tx.append(user_id, &code, self.reward_points, now).await?;
        tx.commit().await?;

        info!(
            user_id,
            code = %code,
            entry_id,
            points_awarded = self.reward_points,
            new_total,
            "code redeemed"
        );
        Ok(Redeemed {
            entry_id,
            points_awarded: self.reward_points,
            new_total,
        })
    }
}
