use chrono::{DateTime, Utc};

/// Points credited for one successful redemption unless configured otherwise.
pub const DEFAULT_REWARD_POINTS: i32 = 10;

/// Alphabet for generated codes (uppercase alphanumeric).
pub const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
pub const DEFAULT_CODE_LEN: usize = 6;
pub const DEFAULT_SEED_CODES: usize = 50;

pub const DEMO_USER_ID: i64 = 1;
pub const DEMO_USER_NAME: &str = "Demo User";

/// Who redeemed a code and when. Both halves exist together or not at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redemption {
    pub user_id: i64,
    pub at: DateTime<Utc>,
}

/// A single-use disposal code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Code {
    pub code: String,
    pub redemption: Option<Redemption>,
}

impl Code {
    pub fn unused(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            redemption: None,
        }
    }

    pub fn is_used(&self) -> bool {
        self.redemption.is_some()
    }
}

/// Result of the registry's conditional unused -> used transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkUsed {
    /// This caller won the transition; `previous` is the code as it was before.
    Marked { previous: Code },
    AlreadyUsed,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub points: i64,
}

impl User {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            points: 0,
        }
    }
}

/// Display name given to users provisioned implicitly by a redemption.
pub fn default_user_name(user_id: i64) -> String {
    format!("User {user_id}")
}

/// Immutable record of one completed redemption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: i64,
    pub code: String,
    pub points_awarded: i32,
    pub timestamp: DateTime<Utc>,
}

/// Partition of the registry by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodeCounts {
    pub used: u64,
    pub unused: u64,
}

impl CodeCounts {
    pub fn total(&self) -> u64 {
        self.used + self.unused
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerStats {
    pub total_disposals: u64,
    pub total_points_issued: i64,
    pub used_codes: u64,
    pub unused_codes: u64,
}

/// Outcome of a successful redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redeemed {
    pub entry_id: i64,
    pub points_awarded: i32,
    pub new_total: i64,
}

/// Canonical form of a presented code: surrounding whitespace removed,
/// upper-cased. `None` when nothing is left.
pub fn normalize_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_ascii_uppercase())
}

/// How a storage transaction interacts with concurrent work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    /// Redemptions. Row-level isolation only; different codes never contend.
    ReadWrite,
    /// Aggregation and profile reads over one consistent snapshot.
    ReadOnly,
    /// Bulk reset. Waits for in-flight writers and blocks new ones until commit.
    Exclusive,
}
