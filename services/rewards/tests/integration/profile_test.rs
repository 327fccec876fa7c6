use trashback_rewards::error::RewardsServiceError;
use trashback_rewards::usecase::profile::GetUserProfileUseCase;

use crate::helpers::{redeem, seeded_store, user};

#[tokio::test]
async fn should_list_history_newest_first() {
    let store = seeded_store(&["AAA111", "BBB222", "CCC333"]).await;
    redeem(&store, 1, "AAA111").await.unwrap();
    redeem(&store, 1, "BBB222").await.unwrap();
    redeem(&store, 2, "CCC333").await.unwrap();

    let profile = GetUserProfileUseCase {
        store: store.clone(),
    }
    .execute(1)
    .await
    .unwrap();

    assert_eq!(profile.user.points, 20);
    let codes: Vec<&str> = profile.history.iter().map(|e| e.code.as_str()).collect();
    assert_eq!(codes, ["BBB222", "AAA111"]);
    assert!(profile.history.iter().all(|e| e.points_awarded == 10));
}

#[tokio::test]
async fn should_return_user_not_found_without_provisioning() {
    let store = seeded_store(&["AAA111"]).await;

    let result = GetUserProfileUseCase {
        store: store.clone(),
    }
    .execute(404)
    .await;

    assert!(
        matches!(result, Err(RewardsServiceError::UserNotFound)),
        "expected UserNotFound"
    );
    assert!(user(&store, 404).await.is_none());
}
