use std::collections::HashSet;

use rand::RngExt;
use tracing::info;

use crate::domain::repository::{CodeRegistry, LedgerStore, LedgerTransaction, UserBalanceStore};
use crate::domain::types::{CODE_CHARSET, TxMode};
use crate::error::RewardsServiceError;

const SAMPLE_SIZE: usize = 5;

fn generate_code(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CODE_CHARSET[rng.random_range(0..CODE_CHARSET.len())] as char)
        .collect()
}

/// `count` distinct codes of `len` characters.
fn generate_unique_codes(count: usize, len: usize) -> Vec<String> {
    let mut seen = HashSet::with_capacity(count);
    let mut codes = Vec::with_capacity(count);
    while codes.len() < count {
        let code = generate_code(len);
        if seen.insert(code.clone()) {
            codes.push(code);
        }
    }
    codes
}

/// Whether `count` distinct codes of `len` characters can exist.
fn fits_code_space(count: usize, len: usize) -> bool {
    let Ok(exp) = u32::try_from(len) else {
        return true;
    };
    match (CODE_CHARSET.len() as u128).checked_pow(exp) {
        Some(space) => count as u128 <= space,
        None => true,
    }
}

pub struct SeedRegistryInput {
    pub code_count: usize,
    pub code_len: usize,
    pub demo_user_id: i64,
    pub demo_user_name: String,
}

#[derive(Debug)]
pub struct SeedReport {
    /// Codes added by this run; 0 when the registry was already populated.
    pub inserted_codes: u64,
    /// Up to five of the inserted codes, for manual testing.
    pub sample: Vec<String>,
    pub demo_user_created: bool,
}

/// Populates an empty registry with fresh codes and makes sure the demo user
/// exists. Safe to run repeatedly.
pub struct SeedRegistryUseCase<S: LedgerStore> {
    pub store: S,
}

impl<S: LedgerStore> SeedRegistryUseCase<S> {
    pub async fn execute(&self, input: SeedRegistryInput) -> Result<SeedReport, RewardsServiceError> {
        if input.code_len == 0 || !fits_code_space(input.code_count, input.code_len) {
            return Err(RewardsServiceError::InvalidRequest);
        }

        let tx = self.store.begin(TxMode::Exclusive).await?;

        let existing = tx.count_by_status().await?.total();
        let (inserted_codes, sample) = if existing == 0 {
            let codes = generate_unique_codes(input.code_count, input.code_len);
            let inserted = tx.insert_unused(&codes).await?;
            let sample = codes.into_iter().take(SAMPLE_SIZE).collect();
            (inserted, sample)
        } else {
            info!(existing, "registry already populated, skipping code generation");
            (0, Vec::new())
        };

        let demo_user_created = tx.get(input.demo_user_id).await?.is_none();
        tx.get_or_create(input.demo_user_id, &input.demo_user_name)
            .await?;

        tx.commit().await?;
        info!(inserted_codes, demo_user_created, "registry seeded");
        Ok(SeedReport {
            inserted_codes,
            sample,
            demo_user_created,
        })
    }
}
