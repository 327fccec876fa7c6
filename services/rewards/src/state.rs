use sea_orm::DatabaseConnection;

use crate::infra::db::DbLedgerStore;

/// Shared application state passed to every handler via axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub reward_points: i32,
}

impl AppState {
    pub fn ledger_store(&self) -> DbLedgerStore {
        DbLedgerStore {
            db: self.db.clone(),
        }
    }
}
