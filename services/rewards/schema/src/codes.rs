use sea_orm::entity::prelude::*;

/// Single-use disposal code. `redeemed_by` and `redeemed_at` are both set
/// exactly when `used` is true (enforced by a CHECK constraint).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "codes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub used: bool,
    pub redeemed_by: Option<i64>,
    pub redeemed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
