use trashback_rewards::domain::repository::{CodeRegistry, LedgerStore};
use trashback_rewards::domain::types::TxMode;
use trashback_rewards::error::RewardsServiceError;

use crate::helpers::{assert_balances_match_ledger, redeem, seeded_store, stats, user};

#[tokio::test]
async fn should_award_points_and_record_entry() {
    let store = seeded_store(&["ABC123", "DEF456"]).await;

    let redeemed = redeem(&store, 1, "ABC123").await.unwrap();
    assert_eq!(redeemed.points_awarded, 10);
    assert_eq!(redeemed.new_total, 10);

    let tx = store.begin(TxMode::ReadOnly).await.unwrap();
    let code = tx.lookup("ABC123").await.unwrap().unwrap();
    let redemption = code.redemption.unwrap();
    assert_eq!(redemption.user_id, 1);

    let stats = stats(&store).await;
    assert_eq!(stats.total_disposals, 1);
    assert_eq!(stats.total_points_issued, 10);
    assert_eq!(stats.used_codes, 1);
    assert_eq!(stats.unused_codes, 1);
}

#[tokio::test]
async fn should_reject_second_redemption_of_same_code() {
    let store = seeded_store(&["ABC123"]).await;
    redeem(&store, 1, "ABC123").await.unwrap();

    let result = redeem(&store, 2, "ABC123").await;
    assert!(
        matches!(result, Err(RewardsServiceError::CodeAlreadyRedeemed)),
        "expected CodeAlreadyRedeemed, got {result:?}"
    );

    let stats = stats(&store).await;
    assert_eq!(stats.total_disposals, 1);
    assert_eq!(user(&store, 1).await.unwrap().points, 10);
}

#[tokio::test]
async fn should_reject_same_user_redeeming_twice() {
    let store = seeded_store(&["ABC123"]).await;
    redeem(&store, 1, "ABC123").await.unwrap();

    let result = redeem(&store, 1, "abc123").await;
    assert!(matches!(result, Err(RewardsServiceError::CodeAlreadyRedeemed)));
    assert_eq!(user(&store, 1).await.unwrap().points, 10);
}

#[tokio::test]
async fn should_reject_unknown_code() {
    let store = seeded_store(&["ABC123"]).await;

    let result = redeem(&store, 1, "ZZZZZZ").await;
    assert!(
        matches!(result, Err(RewardsServiceError::InvalidCode)),
        "expected InvalidCode, got {result:?}"
    );
    assert_eq!(stats(&store).await.total_disposals, 0);
}

#[tokio::test]
async fn should_provision_unknown_user_on_first_redemption() {
    let store = seeded_store(&["ABC123"]).await;
    assert!(user(&store, 42).await.is_none());

    redeem(&store, 42, "ABC123").await.unwrap();

    let provisioned = user(&store, 42).await.unwrap();
    assert_eq!(provisioned.name, "User 42");
    assert_eq!(provisioned.points, 10);
}

#[tokio::test]
async fn should_not_provision_user_when_redemption_fails() {
    let store = seeded_store(&["ABC123"]).await;

    let result = redeem(&store, 77, "NOPE00").await;
    assert!(matches!(result, Err(RewardsServiceError::InvalidCode)));
    assert!(user(&store, 77).await.is_none());
}

#[tokio::test]
async fn should_accumulate_points_across_codes() {
    let store = seeded_store(&["AAA111", "BBB222", "CCC333"]).await;

    redeem(&store, 1, "AAA111").await.unwrap();
    redeem(&store, 1, "BBB222").await.unwrap();
    let last = redeem(&store, 1, "CCC333").await.unwrap();

    assert_eq!(last.new_total, 30);
    assert_balances_match_ledger(&store, &[1]).await;
}

#[tokio::test]
async fn should_keep_existing_user_name() {
    let store = seeded_store(&["AAA111", "BBB222"]).await;
    redeem(&store, 5, "AAA111").await.unwrap();
    redeem(&store, 5, "BBB222").await.unwrap();

    assert_eq!(user(&store, 5).await.unwrap().name, "User 5");
}
