use serde::{Deserialize, Deserializer, de::Error as _};

use trashback_core::config::Config;

use crate::domain::types::DEFAULT_REWARD_POINTS;

/// Rewards service configuration loaded from environment variables.
#[derive(Debug, Deserialize)]
pub struct RewardsConfig {
    /// PostgreSQL connection URL. Env var: `DATABASE_URL`.
    pub database_url: String,
    /// TCP port for the HTTP server (default 8000). Env var: `REWARDS_PORT`.
    #[serde(default = "default_port")]
    pub rewards_port: u16,
    /// Points credited per redemption (default 10). Env var: `REWARD_POINTS`.
    /// Must be positive.
    #[serde(
        default = "default_reward_points",
        deserialize_with = "positive_points"
    )]
    pub reward_points: i32,
}

fn default_port() -> u16 {
    8000
}

fn default_reward_points() -> i32 {
    DEFAULT_REWARD_POINTS
}

fn positive_points<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let points = i32::deserialize(deserializer)?;
    if points <= 0 {
        return Err(D::Error::custom(format!(
            "reward points must be positive, got {points}"
        )));
    }
    Ok(points)
}

impl Config for RewardsConfig {}
