//! Populates the code registry and the demo user.
//!
//! Usage: `seed [--count 50] [--length 6] [--demo-user-id 1] [--demo-user-name "Demo User"]`
//!
//! Reads `DATABASE_URL` from the environment. Run it after the migrations.
//! Generation is skipped when the registry already holds codes.

use anyhow::Context as _;
use clap::Parser;
use sea_orm::Database;

use trashback_core::config::Config;
use trashback_core::tracing::init_tracing;

use trashback_rewards::config::RewardsConfig;
use trashback_rewards::domain::types::{
    DEFAULT_CODE_LEN, DEFAULT_SEED_CODES, DEMO_USER_ID, DEMO_USER_NAME,
};
use trashback_rewards::infra::db::DbLedgerStore;
use trashback_rewards::usecase::seed::{SeedRegistryInput, SeedRegistryUseCase};

#[derive(Parser)]
#[command(name = "seed", about = "Seed the TrashBack code registry")]
struct Cli {
    /// Number of codes to generate when the registry is empty
    #[arg(long, default_value_t = DEFAULT_SEED_CODES)]
    count: usize,

    /// Characters per generated code
    #[arg(long, default_value_t = DEFAULT_CODE_LEN)]
    length: usize,

    /// Id of the demo account
    #[arg(long, default_value_t = DEMO_USER_ID)]
    demo_user_id: i64,

    /// Display name of the demo account
    #[arg(long, default_value = DEMO_USER_NAME)]
    demo_user_name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("info");
    let cli = Cli::parse();

    let config = RewardsConfig::try_from_env().context("load config from environment")?;

    let db = Database::connect(&config.database_url)
        .await
        .context("connect to database")?;

    let usecase = SeedRegistryUseCase {
        store: DbLedgerStore { db },
    };
    let report = usecase
        .execute(SeedRegistryInput {
            code_count: cli.count,
            code_len: cli.length,
            demo_user_id: cli.demo_user_id,
            demo_user_name: cli.demo_user_name,
        })
        .await?;

    if report.inserted_codes == 0 {
        println!("Registry already populated, no codes generated.");
    } else {
        println!("Seeded {} codes.", report.inserted_codes);
        println!("Sample codes for testing: {}", report.sample.join(", "));
    }
    if report.demo_user_created {
        println!("Created demo user {}.", cli.demo_user_id);
    }
    Ok(())
}
