use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    AccessMode, ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, ColumnTrait,
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, EntityTrait,
    IsolationLevel, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
    sea_query::{Expr, Func, OnConflict, SimpleExpr},
};

use trashback_rewards_schema::{codes, ledger_entries, users};

use crate::domain::repository::{
    CodeRegistry, LedgerEntryStore, LedgerStore, LedgerTransaction, UserBalanceStore,
};
use crate::domain::types::{Code, CodeCounts, LedgerEntry, MarkUsed, Redemption, TxMode, User};
use crate::error::RewardsServiceError;

// Same table order as a redemption touches them, so a waiting reset never
// deadlocks against an in-flight redemption.
const LOCK_FOR_RESET: &str = "LOCK TABLE users, codes, ledger_entries IN EXCLUSIVE MODE";

// PostgreSQL caps one statement at 65535 bind parameters; each code row binds 4.
const MAX_BIND_PARAMS: usize = 65_535;
const CODE_INSERT_PARAMS: usize = 4;
const CODE_INSERT_CHUNK: usize = 1_000;
const _: () = assert!(CODE_INSERT_CHUNK * CODE_INSERT_PARAMS <= MAX_BIND_PARAMS);

// ── Store ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbLedgerStore {
    pub db: DatabaseConnection,
}

impl LedgerStore for DbLedgerStore {
    type Tx = DbLedgerTx;

    async fn begin(&self, mode: TxMode) -> Result<DbLedgerTx, RewardsServiceError> {
        let txn = match mode {
            TxMode::ReadWrite => self.db.begin().await.context("begin read-write transaction")?,
            TxMode::ReadOnly => self
                .db
                .begin_with_config(
                    Some(IsolationLevel::RepeatableRead),
                    Some(AccessMode::ReadOnly),
                )
                .await
                .context("begin read-only transaction")?,
            TxMode::Exclusive => {
                let txn = self.db.begin().await.context("begin exclusive transaction")?;
                if txn.get_database_backend() == DbBackend::Postgres {
                    txn.execute_unprepared(LOCK_FOR_RESET)
                        .await
                        .context("lock ledger tables")?;
                }
                txn
            }
        };
        Ok(DbLedgerTx { txn })
    }
}

// ── Transaction ──────────────────────────────────────────────────────────────

pub struct DbLedgerTx {
    txn: DatabaseTransaction,
}

impl LedgerTransaction for DbLedgerTx {
    async fn commit(self) -> Result<(), RewardsServiceError> {
        self.txn.commit().await.context("commit transaction")?;
        Ok(())
    }
}

impl CodeRegistry for DbLedgerTx {
    async fn lookup(&self, code: &str) -> Result<Option<Code>, RewardsServiceError> {
        let model = codes::Entity::find_by_id(code.to_owned())
            .one(&self.txn)
            .await
            .context("find code")?;
        Ok(model.map(code_from_model))
    }

    async fn try_mark_used(
        &self,
        code: &str,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<MarkUsed, RewardsServiceError> {
        // Single conditional statement: the row lock taken by UPDATE makes
        // concurrent callers on the same code queue up and re-check `used`.
        let result = codes::Entity::update_many()
            .col_expr(codes::Column::Used, Expr::value(true))
            .col_expr(codes::Column::RedeemedBy, Expr::value(user_id))
            .col_expr(codes::Column::RedeemedAt, Expr::value(at))
            .filter(codes::Column::Code.eq(code))
            .filter(codes::Column::Used.eq(false))
            .exec(&self.txn)
            .await
            .context("mark code used")?;
        if result.rows_affected == 1 {
            return Ok(MarkUsed::Marked {
                previous: Code::unused(code),
            });
        }

        let exists = codes::Entity::find_by_id(code.to_owned())
            .one(&self.txn)
            .await
            .context("find code after conditional update")?
            .is_some();
        Ok(if exists {
            MarkUsed::AlreadyUsed
        } else {
            MarkUsed::NotFound
        })
    }

    async fn count_by_status(&self) -> Result<CodeCounts, RewardsServiceError> {
        let used = codes::Entity::find()
            .filter(codes::Column::Used.eq(true))
            .count(&self.txn)
            .await
            .context("count used codes")?;
        let unused = codes::Entity::find()
            .filter(codes::Column::Used.eq(false))
            .count(&self.txn)
            .await
            .context("count unused codes")?;
        Ok(CodeCounts { used, unused })
    }

    async fn insert_unused(&self, batch: &[String]) -> Result<u64, RewardsServiceError> {
        let mut inserted = 0;
        for chunk in batch.chunks(CODE_INSERT_CHUNK) {
            let models = chunk.iter().map(|code| codes::ActiveModel {
                code: Set(code.clone()),
                used: Set(false),
                redeemed_by: Set(None),
                redeemed_at: Set(None),
            });
            inserted += codes::Entity::insert_many(models)
                .on_conflict(
                    OnConflict::column(codes::Column::Code)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(&self.txn)
                .await
                .context("insert codes")?;
        }
        Ok(inserted)
    }

    async fn release_all(&self) -> Result<(), RewardsServiceError> {
        codes::Entity::update_many()
            .col_expr(codes::Column::Used, Expr::value(false))
            .col_expr(codes::Column::RedeemedBy, Expr::value(Option::<i64>::None))
            .col_expr(
                codes::Column::RedeemedAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .exec(&self.txn)
            .await
            .context("release all codes")?;
        Ok(())
    }
}

impl UserBalanceStore for DbLedgerTx {
    async fn get(&self, user_id: i64) -> Result<Option<User>, RewardsServiceError> {
        let model = users::Entity::find_by_id(user_id)
            .one(&self.txn)
            .await
            .context("find user by id")?;
        Ok(model.map(user_from_model))
    }

    async fn get_or_create(
        &self,
        user_id: i64,
        default_name: &str,
    ) -> Result<User, RewardsServiceError> {
        users::Entity::insert(users::ActiveModel {
            id: Set(user_id),
            name: Set(default_name.to_owned()),
            points: Set(0),
        })
        .on_conflict(OnConflict::column(users::Column::Id).do_nothing().to_owned())
        .exec_without_returning(&self.txn)
        .await
        .context("provision user")?;

        let model = users::Entity::find_by_id(user_id)
            .one(&self.txn)
            .await
            .context("find provisioned user")?
            .ok_or_else(|| anyhow::anyhow!("user {user_id} missing after provisioning"))?;
        Ok(user_from_model(model))
    }

    async fn add_points(&self, user_id: i64, delta: i64) -> Result<i64, RewardsServiceError> {
        let updated = users::Entity::update_many()
            .col_expr(
                users::Column::Points,
                Expr::col(users::Column::Points).add(delta),
            )
            .filter(users::Column::Id.eq(user_id))
            .exec_with_returning(&self.txn)
            .await
            .context("add points")?;
        updated
            .into_iter()
            .next()
            .map(|model| model.points)
            .ok_or(RewardsServiceError::UserNotFound)
    }

    async fn reset_all(&self) -> Result<(), RewardsServiceError> {
        users::Entity::update_many()
            .col_expr(users::Column::Points, Expr::value(0i64))
            .exec(&self.txn)
            .await
            .context("reset all balances")?;
        Ok(())
    }
}

impl LedgerEntryStore for DbLedgerTx {
    async fn append(
        &self,
        user_id: i64,
        code: &str,
        points_awarded: i32,
        timestamp: DateTime<Utc>,
    ) -> Result<i64, RewardsServiceError> {
        let model = ledger_entries::ActiveModel {
            id: NotSet,
            user_id: Set(user_id),
            code: Set(code.to_owned()),
            points_awarded: Set(points_awarded),
            timestamp: Set(timestamp),
        }
        .insert(&self.txn)
        .await
        .context("append ledger entry")?;
        Ok(model.id)
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<LedgerEntry>, RewardsServiceError> {
        let models = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::UserId.eq(user_id))
            .order_by_desc(ledger_entries::Column::Timestamp)
            .order_by_desc(ledger_entries::Column::Id)
            .all(&self.txn)
            .await
            .context("list ledger entries by user")?;
        Ok(models.into_iter().map(entry_from_model).collect())
    }

    async fn count(&self) -> Result<u64, RewardsServiceError> {
        let count = ledger_entries::Entity::find()
            .count(&self.txn)
            .await
            .context("count ledger entries")?;
        Ok(count)
    }

    async fn sum_points(&self) -> Result<i64, RewardsServiceError> {
        // SUM(integer) is bigint in PostgreSQL and NULL over zero rows.
        let total: Option<Option<i64>> = ledger_entries::Entity::find()
            .select_only()
            .column_as(
                SimpleExpr::FunctionCall(Func::sum(Expr::col(
                    ledger_entries::Column::PointsAwarded,
                ))),
                "total",
            )
            .into_tuple()
            .one(&self.txn)
            .await
            .context("sum awarded points")?;
        Ok(total.flatten().unwrap_or(0))
    }

    async fn clear_all(&self) -> Result<(), RewardsServiceError> {
        ledger_entries::Entity::delete_many()
            .exec(&self.txn)
            .await
            .context("clear ledger")?;
        Ok(())
    }
}

fn code_from_model(model: codes::Model) -> Code {
    let redemption = match (model.redeemed_by, model.redeemed_at) {
        (Some(user_id), Some(at)) if model.used => Some(Redemption { user_id, at }),
        _ => None,
    };
    Code {
        code: model.code,
        redemption,
    }
}

fn user_from_model(model: users::Model) -> User {
    User {
        id: model.id,
        name: model.name,
        points: model.points,
    }
}

fn entry_from_model(model: ledger_entries::Model) -> LedgerEntry {
    LedgerEntry {
        id: model.id,
        user_id: model.user_id,
        code: model.code,
        points_awarded: model.points_awarded,
        timestamp: model.timestamp,
    }
}
