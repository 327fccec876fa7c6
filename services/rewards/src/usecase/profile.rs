use crate::domain::repository::{LedgerEntryStore, LedgerStore, UserBalanceStore};
use crate::domain::types::{LedgerEntry, TxMode, User};
use crate::error::RewardsServiceError;

pub struct UserProfile {
    pub user: User,
    /// Most recent first.
    pub history: Vec<LedgerEntry>,
}

/// Reads a user's balance and redemption history from one snapshot.
/// Unlike redemption, this never provisions unknown users.
pub struct GetUserProfileUseCase<S: LedgerStore> {
    pub store: S,
}

impl<S: LedgerStore> GetUserProfileUseCase<S> {
    pub async fn execute(&self, user_id: i64) -> Result<UserProfile, RewardsServiceError> {
        let tx = self.store.begin(TxMode::ReadOnly).await?;
        let user = tx
            .get(user_id)
            .await?
            .ok_or(RewardsServiceError::UserNotFound)?;
        let history = tx.list_by_user(user_id).await?;
        Ok(UserProfile { user, history })
    }
}
