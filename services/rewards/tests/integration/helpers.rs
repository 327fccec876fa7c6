use trashback_rewards::domain::repository::{
    CodeRegistry, LedgerStore, LedgerTransaction, UserBalanceStore,
};
use trashback_rewards::domain::types::{DEFAULT_REWARD_POINTS, LedgerStats, TxMode, User};
use trashback_rewards::error::RewardsServiceError;
use trashback_rewards::infra::memory::MemoryLedgerStore;
use trashback_rewards::usecase::profile::GetUserProfileUseCase;
use trashback_rewards::usecase::redeem::{RedeemCodeInput, RedeemCodeUseCase};
use trashback_rewards::usecase::reset::ResetLedgerUseCase;
use trashback_rewards::usecase::stats::GetLedgerStatsUseCase;

// ── Store fixtures ───────────────────────────────────────────────────────────

/// A fresh store whose registry holds `codes`, all unused.
pub async fn seeded_store(codes: &[&str]) -> MemoryLedgerStore {
    let store = MemoryLedgerStore::new();
    let tx = store.begin(TxMode::Exclusive).await.unwrap();
    let batch: Vec<String> = codes.iter().map(|c| (*c).to_owned()).collect();
    tx.insert_unused(&batch).await.unwrap();
    tx.commit().await.unwrap();
    store
}

/// `count` distinct codes: `CODE000`, `CODE001`, ...
pub fn numbered_codes(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("CODE{i:03}")).collect()
}

pub async fn seeded_store_with(codes: &[String]) -> MemoryLedgerStore {
    let refs: Vec<&str> = codes.iter().map(String::as_str).collect();
    seeded_store(&refs).await
}

// ── Use case shorthands ──────────────────────────────────────────────────────

pub async fn redeem(
    store: &MemoryLedgerStore,
    user_id: i64,
    code: &str,
) -> Result<trashback_rewards::domain::types::Redeemed, RewardsServiceError> {
    RedeemCodeUseCase {
        store: store.clone(),
        reward_points: DEFAULT_REWARD_POINTS,
    }
    .execute(RedeemCodeInput {
        user_id,
        code: code.to_owned(),
    })
    .await
}

pub async fn stats(store: &MemoryLedgerStore) -> LedgerStats {
    GetLedgerStatsUseCase {
        store: store.clone(),
    }
    .execute()
    .await
    .unwrap()
}

pub async fn reset(store: &MemoryLedgerStore) {
    ResetLedgerUseCase {
        store: store.clone(),
    }
    .execute()
    .await
    .unwrap();
}

pub async fn user(store: &MemoryLedgerStore, user_id: i64) -> Option<User> {
    let tx = store.begin(TxMode::ReadOnly).await.unwrap();
    tx.get(user_id).await.unwrap()
}

/// Every user's balance must equal the sum of their ledger entries.
pub async fn assert_balances_match_ledger(store: &MemoryLedgerStore, user_ids: &[i64]) {
    for &id in user_ids {
        let Ok(profile) = (GetUserProfileUseCase {
            store: store.clone(),
        })
        .execute(id)
        .await
        else {
            continue;
        };
        let from_ledger: i64 = profile
            .history
            .iter()
            .map(|e| i64::from(e.points_awarded))
            .sum();
        assert_eq!(
            profile.user.points, from_ledger,
            "user {id} balance diverged from ledger"
        );
    }
}
