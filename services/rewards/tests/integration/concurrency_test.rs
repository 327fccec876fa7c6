use std::collections::HashSet;

use trashback_rewards::error::RewardsServiceError;
use trashback_rewards::usecase::profile::GetUserProfileUseCase;

use crate::helpers::{
    assert_balances_match_ledger, numbered_codes, redeem, reset, seeded_store, seeded_store_with,
    stats, user,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn should_redeem_contended_code_exactly_once() {
    let store = seeded_store(&["ABC123"]).await;

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { redeem(&store, 1, "ABC123").await })
        })
        .collect();

    let mut successes = 0;
    let mut already_redeemed = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(RewardsServiceError::CodeAlreadyRedeemed) => already_redeemed += 1,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(already_redeemed, 99);
    assert_eq!(user(&store, 1).await.unwrap().points, 10);
    assert_eq!(stats(&store).await.total_disposals, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn should_award_contended_code_to_a_single_user() {
    let store = seeded_store(&["ABC123"]).await;

    let handles: Vec<_> = (1..=50)
        .map(|user_id| {
            let store = store.clone();
            tokio::spawn(async move { (user_id, redeem(&store, user_id, "ABC123").await) })
        })
        .collect();

    let mut winners = Vec::new();
    for handle in handles {
        let (user_id, result) = handle.await.unwrap();
        if result.is_ok() {
            winners.push(user_id);
        }
    }

    assert_eq!(winners.len(), 1);
    let stats = stats(&store).await;
    assert_eq!(stats.total_points_issued, 10);
    // Losers leave no trace, not even a provisioned account.
    for user_id in 1..=50 {
        assert_eq!(user(&store, user_id).await.is_some(), winners.contains(&user_id));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn should_compose_concurrent_redemptions_for_one_user() {
    let codes = numbered_codes(40);
    let store = seeded_store_with(&codes).await;

    let handles: Vec<_> = codes
        .iter()
        .cloned()
        .map(|code| {
            let store = store.clone();
            tokio::spawn(async move { redeem(&store, 7, &code).await })
        })
        .collect();

    let mut totals = HashSet::new();
    for handle in handles {
        let redeemed = handle.await.unwrap().unwrap();
        assert!(totals.insert(redeemed.new_total), "duplicate new_total");
    }

    assert_eq!(user(&store, 7).await.unwrap().points, 400);
    assert_eq!(totals.len(), 40);
    assert_balances_match_ledger(&store, &[7]).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn should_keep_code_partition_consistent_under_load() {
    let codes = numbered_codes(60);
    let store = seeded_store_with(&codes).await;

    let writers: Vec<_> = codes
        .iter()
        .cloned()
        .enumerate()
        .map(|(i, code)| {
            let store = store.clone();
            tokio::spawn(async move { redeem(&store, (i % 5) as i64 + 1, &code).await })
        })
        .collect();

    for _ in 0..20 {
        let snapshot = stats(&store).await;
        assert_eq!(snapshot.used_codes + snapshot.unused_codes, 60);
        assert_eq!(snapshot.total_disposals, snapshot.used_codes);
        assert_eq!(
            snapshot.total_points_issued,
            snapshot.total_disposals as i64 * 10
        );
        tokio::task::yield_now().await;
    }

    for writer in writers {
        writer.await.unwrap().unwrap();
    }
    let final_stats = stats(&store).await;
    assert_eq!(final_stats.used_codes, 60);
    assert_eq!(final_stats.total_disposals, 60);
    assert_balances_match_ledger(&store, &[1, 2, 3, 4, 5]).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn should_order_reset_against_concurrent_redemptions() {
    let codes = numbered_codes(30);
    let store = seeded_store_with(&codes).await;

    let writers: Vec<_> = codes
        .iter()
        .cloned()
        .map(|code| {
            let store = store.clone();
            tokio::spawn(async move { redeem(&store, 3, &code).await })
        })
        .collect();
    let resetter = {
        let store = store.clone();
        tokio::spawn(async move { reset(&store).await })
    };

    for writer in writers {
        writer.await.unwrap().unwrap();
    }
    resetter.await.unwrap();

    // Whatever survived the reset is internally consistent.
    let snapshot = stats(&store).await;
    assert_eq!(snapshot.total_disposals, snapshot.used_codes);
    assert_eq!(snapshot.used_codes + snapshot.unused_codes, 30);
    assert_balances_match_ledger(&store, &[3]).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn should_show_readers_whole_redemptions_only() {
    let codes = numbered_codes(1000);
    let store = seeded_store_with(&codes).await;
    // Provision the user up front so every profile read finds it.
    redeem(&store, 1, &codes[0]).await.unwrap();

    let writers: Vec<_> = codes[1..]
        .iter()
        .cloned()
        .map(|code| {
            let store = store.clone();
            tokio::spawn(async move { redeem(&store, 1, &code).await })
        })
        .collect();

    let readers: Vec<_> = (0..6)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                for _ in 0..200 {
                    let snapshot = stats(&store).await;
                    assert_eq!(snapshot.total_disposals, snapshot.used_codes);
                    assert_eq!(
                        snapshot.total_points_issued,
                        snapshot.total_disposals as i64 * 10
                    );

                    let profile = GetUserProfileUseCase {
                        store: store.clone(),
                    }
                    .execute(1)
                    .await
                    .unwrap();
                    let from_history: i64 = profile
                        .history
                        .iter()
                        .map(|e| i64::from(e.points_awarded))
                        .sum();
                    assert_eq!(profile.user.points, from_history);
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for writer in writers {
        writer.await.unwrap().unwrap();
    }
    for reader in readers {
        reader.await.unwrap();
    }
    assert_eq!(user(&store, 1).await.unwrap().points, 10_000);
}
