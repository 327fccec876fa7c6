use trashback_rewards::domain::repository::{CodeRegistry, LedgerStore};
use trashback_rewards::domain::types::TxMode;

use crate::helpers::{redeem, reset, seeded_store, stats, user};

#[tokio::test]
async fn should_restore_provisioned_state() {
    let store = seeded_store(&["AAA111", "BBB222", "CCC333"]).await;
    redeem(&store, 1, "AAA111").await.unwrap();
    redeem(&store, 2, "BBB222").await.unwrap();

    reset(&store).await;

    let stats = stats(&store).await;
    assert_eq!(stats.total_disposals, 0);
    assert_eq!(stats.total_points_issued, 0);
    assert_eq!(stats.used_codes, 0);
    assert_eq!(stats.unused_codes, 3);

    let tx = store.begin(TxMode::ReadOnly).await.unwrap();
    let code = tx.lookup("AAA111").await.unwrap().unwrap();
    assert!(code.redemption.is_none());
}

#[tokio::test]
async fn should_keep_users_with_zero_balance() {
    let store = seeded_store(&["AAA111"]).await;
    redeem(&store, 9, "AAA111").await.unwrap();

    reset(&store).await;

    let kept = user(&store, 9).await.unwrap();
    assert_eq!(kept.name, "User 9");
    assert_eq!(kept.points, 0);
}

#[tokio::test]
async fn should_allow_redeeming_again_after_reset() {
    let store = seeded_store(&["AAA111"]).await;
    redeem(&store, 1, "AAA111").await.unwrap();
    reset(&store).await;

    let redeemed = redeem(&store, 2, "AAA111").await.unwrap();
    assert_eq!(redeemed.new_total, 10);
    assert_eq!(user(&store, 1).await.unwrap().points, 0);
}

#[tokio::test]
async fn should_be_idempotent() {
    let store = seeded_store(&["AAA111"]).await;
    reset(&store).await;
    reset(&store).await;

    let stats = stats(&store).await;
    assert_eq!(stats.unused_codes, 1);
    assert_eq!(stats.total_disposals, 0);
}
