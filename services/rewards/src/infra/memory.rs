//! In-process ledger store.
//!
//! Every record lives in a [`Row`]: the committed value behind a short-lived
//! sync lock, plus an async writer lock that a transaction holds from its first
//! write to that record until commit or drop. This mirrors PostgreSQL row locks:
//! writers on the same code or user queue up, readers never wait, and distinct
//! records never contend. A store-wide gate is held shared by ordinary
//! transactions and exclusively by bulk operations.
//!
//! Commits publish under a store-wide write lock. Read-only transactions copy
//! the committed state under the matching read lock when they begin, so they
//! never observe half of a commit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex as SyncMutex, MutexGuard, PoisonError, RwLock as SyncRwLock};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock};

use crate::domain::repository::{
    CodeRegistry, LedgerEntryStore, LedgerStore, LedgerTransaction, UserBalanceStore,
};
use crate::domain::types::{Code, CodeCounts, LedgerEntry, MarkUsed, Redemption, TxMode, User};
use crate::error::RewardsServiceError;

fn locked<T>(mutex: &SyncMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Row<T> {
    writer: Arc<Mutex<()>>,
    committed: SyncMutex<T>,
}

impl<T: Clone> Row<T> {
    fn new(value: T) -> Arc<Self> {
        Arc::new(Self {
            writer: Arc::new(Mutex::new(())),
            committed: SyncMutex::new(value),
        })
    }

    fn read(&self) -> T {
        locked(&self.committed).clone()
    }

    fn write(&self, value: T) {
        *locked(&self.committed) = value;
    }

    async fn lock_writer(&self) -> OwnedMutexGuard<()> {
        Arc::clone(&self.writer).lock_owned().await
    }
}

type CodeRow = Arc<Row<Option<Redemption>>>;
// `None` marks a slot reserved for a user whose creation has not committed.
type UserRow = Arc<Row<Option<User>>>;

#[derive(Default)]
struct MemoryState {
    gate: Arc<RwLock<()>>,
    publish: SyncRwLock<()>,
    codes: SyncRwLock<HashMap<String, CodeRow>>,
    users: SyncMutex<HashMap<i64, UserRow>>,
    entries: SyncMutex<Vec<LedgerEntry>>,
    last_entry_id: AtomicI64,
}

impl MemoryState {
    fn code_row(&self, code: &str) -> Option<CodeRow> {
        self.codes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(code)
            .cloned()
    }

    fn code_rows(&self) -> Vec<(String, CodeRow)> {
        self.codes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(code, row)| (code.clone(), Arc::clone(row)))
            .collect()
    }

    fn user_row(&self, user_id: i64) -> Option<UserRow> {
        locked(&self.users).get(&user_id).cloned()
    }

    fn user_row_or_reserve(&self, user_id: i64) -> UserRow {
        Arc::clone(
            locked(&self.users)
                .entry(user_id)
                .or_insert_with(|| Row::new(None)),
        )
    }

    fn user_rows(&self) -> Vec<UserRow> {
        locked(&self.users).values().cloned().collect()
    }

    fn next_entry_id(&self) -> i64 {
        self.last_entry_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn snapshot(&self) -> Snapshot {
        let _published = self.publish.read().unwrap_or_else(PoisonError::into_inner);
        let codes = self
            .code_rows()
            .into_iter()
            .map(|(code, row)| (code, row.read()))
            .collect();
        let users = self
            .user_rows()
            .into_iter()
            .filter_map(|row| row.read())
            .map(|user| (user.id, user))
            .collect();
        let entries = locked(&self.entries).clone();
        Snapshot {
            codes,
            users,
            entries,
        }
    }

    /// Drop a reservation nobody committed and nobody else is waiting on.
    fn release_reservation(&self, user_id: i64, row: UserRow) {
        let mut users = locked(&self.users);
        let unshared = users
            .get(&user_id)
            .is_some_and(|held| Arc::ptr_eq(held, &row))
            && Arc::strong_count(&row) == 2;
        if unshared && row.read().is_none() {
            users.remove(&user_id);
        }
    }
}

/// Committed state as of one instant.
struct Snapshot {
    codes: HashMap<String, Option<Redemption>>,
    users: HashMap<i64, User>,
    entries: Vec<LedgerEntry>,
}

fn newest_first(entries: &mut [LedgerEntry]) {
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
}

/// Shared handle to an in-memory ledger. Clones see the same data.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<MemoryState>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// Held only so the guard is released when the transaction ends.
#[allow(dead_code)]
enum Gate {
    Shared(OwnedRwLockReadGuard<()>),
    Exclusive(OwnedRwLockWriteGuard<()>),
}

struct CodeSlot {
    row: CodeRow,
    _writer: OwnedMutexGuard<()>,
    staged: Option<Redemption>,
}

struct UserSlot {
    row: UserRow,
    _writer: OwnedMutexGuard<()>,
    staged: User,
}

#[derive(Default)]
struct Pending {
    codes: HashMap<String, CodeSlot>,
    new_codes: HashMap<String, CodeRow>,
    users: HashMap<i64, UserSlot>,
    entries: Vec<LedgerEntry>,
    release_codes: bool,
    zero_balances: bool,
    clear_entries: bool,
}

impl Pending {
    fn committed_code(&self, row: &CodeRow) -> Option<Redemption> {
        if self.release_codes { None } else { row.read() }
    }

    fn committed_user(&self, row: &UserRow) -> Option<User> {
        row.read().map(|mut user| {
            if self.zero_balances {
                user.points = 0;
            }
            user
        })
    }
}

pub struct MemoryLedgerTx {
    state: Arc<MemoryState>,
    _gate: Gate,
    mode: TxMode,
    // Set for read-only transactions only.
    snapshot: Option<Snapshot>,
    pending: Mutex<Pending>,
}

impl Drop for MemoryLedgerTx {
    fn drop(&mut self) {
        // Empty after a commit. Otherwise this is a rollback.
        let pending = std::mem::take(self.pending.get_mut());
        for (user_id, slot) in pending.users {
            let UserSlot { row, _writer, .. } = slot;
            drop(_writer);
            self.state.release_reservation(user_id, row);
        }
    }
}

impl MemoryLedgerTx {
    fn require_write(&self, op: &str) -> Result<(), RewardsServiceError> {
        if self.mode == TxMode::ReadOnly {
            return Err(anyhow::anyhow!("{op} attempted in a read-only transaction").into());
        }
        Ok(())
    }

    fn require_exclusive(&self, op: &str) -> Result<(), RewardsServiceError> {
        if self.mode != TxMode::Exclusive {
            return Err(anyhow::anyhow!("{op} requires an exclusive transaction").into());
        }
        Ok(())
    }
}

impl LedgerStore for MemoryLedgerStore {
    type Tx = MemoryLedgerTx;

    async fn begin(&self, mode: TxMode) -> Result<MemoryLedgerTx, RewardsServiceError> {
        let gate = Arc::clone(&self.state.gate);
        let gate = match mode {
            TxMode::Exclusive => Gate::Exclusive(gate.write_owned().await),
            TxMode::ReadWrite | TxMode::ReadOnly => Gate::Shared(gate.read_owned().await),
        };
        let snapshot = (mode == TxMode::ReadOnly).then(|| self.state.snapshot());
        Ok(MemoryLedgerTx {
            state: Arc::clone(&self.state),
            _gate: gate,
            mode,
            snapshot,
            pending: Mutex::new(Pending::default()),
        })
    }
}

impl LedgerTransaction for MemoryLedgerTx {
    async fn commit(mut self) -> Result<(), RewardsServiceError> {
        let mut pending = std::mem::take(self.pending.get_mut());
        let state = Arc::clone(&self.state);
        let _published = state.publish.write().unwrap_or_else(PoisonError::into_inner);

        // Bulk flags are only ever set under the exclusive gate, so no other
        // transaction holds a writer lock here.
        if pending.release_codes {
            for (_, row) in state.code_rows() {
                row.write(None);
            }
        }
        if pending.zero_balances {
            for row in state.user_rows() {
                if let Some(mut user) = row.read() {
                    user.points = 0;
                    row.write(Some(user));
                }
            }
        }
        if pending.clear_entries {
            locked(&state.entries).clear();
        }

        {
            let mut codes = state.codes.write().unwrap_or_else(PoisonError::into_inner);
            for (code, row) in pending.new_codes.drain() {
                codes.entry(code).or_insert(row);
            }
        }
        // Publish before the slot (and its writer lock) is dropped.
        for (_, slot) in pending.codes.drain() {
            slot.row.write(slot.staged);
        }
        for (_, slot) in pending.users.drain() {
            slot.row.write(Some(slot.staged));
        }
        locked(&state.entries).append(&mut pending.entries);
        Ok(())
    }
}

impl CodeRegistry for MemoryLedgerTx {
    async fn lookup(&self, code: &str) -> Result<Option<Code>, RewardsServiceError> {
        if let Some(snapshot) = &self.snapshot {
            return Ok(snapshot.codes.get(code).map(|redemption| Code {
                code: code.to_owned(),
                redemption: *redemption,
            }));
        }
        let pending = self.pending.lock().await;
        if let Some(slot) = pending.codes.get(code) {
            return Ok(Some(Code {
                code: code.to_owned(),
                redemption: slot.staged,
            }));
        }
        if pending.new_codes.contains_key(code) {
            return Ok(Some(Code::unused(code)));
        }
        Ok(self.state.code_row(code).map(|row| Code {
            code: code.to_owned(),
            redemption: pending.committed_code(&row),
        }))
    }

    async fn try_mark_used(
        &self,
        code: &str,
        user_id: i64,
        at: DateTime<Utc>,
    ) -> Result<MarkUsed, RewardsServiceError> {
        self.require_write("try_mark_used")?;
        let mut pending = self.pending.lock().await;
        let redemption = Some(Redemption { user_id, at });

        if let Some(slot) = pending.codes.get_mut(code) {
            if slot.staged.is_some() {
                return Ok(MarkUsed::AlreadyUsed);
            }
            slot.staged = redemption;
            return Ok(MarkUsed::Marked {
                previous: Code::unused(code),
            });
        }

        let row = match pending.new_codes.get(code) {
            Some(row) => Arc::clone(row),
            None => match self.state.code_row(code) {
                Some(row) => row,
                None => return Ok(MarkUsed::NotFound),
            },
        };
        let writer = row.lock_writer().await;
        // Re-read after acquiring the writer: whoever held it before us has
        // either committed a redemption or rolled back.
        if pending.committed_code(&row).is_some() {
            return Ok(MarkUsed::AlreadyUsed);
        }
        pending.codes.insert(
            code.to_owned(),
            CodeSlot {
                row,
                _writer: writer,
                staged: redemption,
            },
        );
        Ok(MarkUsed::Marked {
            previous: Code::unused(code),
        })
    }

    async fn count_by_status(&self) -> Result<CodeCounts, RewardsServiceError> {
        let mut counts = CodeCounts::default();
        if let Some(snapshot) = &self.snapshot {
            for redemption in snapshot.codes.values() {
                if redemption.is_some() {
                    counts.used += 1;
                } else {
                    counts.unused += 1;
                }
            }
            return Ok(counts);
        }
        let pending = self.pending.lock().await;
        let rows = self
            .state
            .code_rows()
            .into_iter()
            .chain(pending.new_codes.iter().map(|(c, r)| (c.clone(), Arc::clone(r))));
        for (code, row) in rows {
            let used = match pending.codes.get(&code) {
                Some(slot) => slot.staged.is_some(),
                None => pending.committed_code(&row).is_some(),
            };
            if used {
                counts.used += 1;
            } else {
                counts.unused += 1;
            }
        }
        Ok(counts)
    }

    async fn insert_unused(&self, batch: &[String]) -> Result<u64, RewardsServiceError> {
        self.require_exclusive("insert_unused")?;
        let mut pending = self.pending.lock().await;
        let mut inserted = 0;
        for code in batch {
            if pending.new_codes.contains_key(code) || self.state.code_row(code).is_some() {
                continue;
            }
            pending.new_codes.insert(code.clone(), Row::new(None));
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn release_all(&self) -> Result<(), RewardsServiceError> {
        self.require_exclusive("release_all")?;
        let mut pending = self.pending.lock().await;
        pending.release_codes = true;
        for slot in pending.codes.values_mut() {
            slot.staged = None;
        }
        Ok(())
    }
}

impl UserBalanceStore for MemoryLedgerTx {
    async fn get(&self, user_id: i64) -> Result<Option<User>, RewardsServiceError> {
        if let Some(snapshot) = &self.snapshot {
            return Ok(snapshot.users.get(&user_id).cloned());
        }
        let pending = self.pending.lock().await;
        if let Some(slot) = pending.users.get(&user_id) {
            return Ok(Some(slot.staged.clone()));
        }
        Ok(self
            .state
            .user_row(user_id)
            .and_then(|row| pending.committed_user(&row)))
    }

    async fn get_or_create(
        &self,
        user_id: i64,
        default_name: &str,
    ) -> Result<User, RewardsServiceError> {
        self.require_write("get_or_create")?;
        let mut pending = self.pending.lock().await;
        if let Some(slot) = pending.users.get(&user_id) {
            return Ok(slot.staged.clone());
        }
        let row = self.state.user_row_or_reserve(user_id);
        let writer = row.lock_writer().await;
        let user = pending
            .committed_user(&row)
            .unwrap_or_else(|| User::new(user_id, default_name));
        pending.users.insert(
            user_id,
            UserSlot {
                row,
                _writer: writer,
                staged: user.clone(),
            },
        );
        Ok(user)
    }

    async fn add_points(&self, user_id: i64, delta: i64) -> Result<i64, RewardsServiceError> {
        self.require_write("add_points")?;
        let mut pending = self.pending.lock().await;
        if !pending.users.contains_key(&user_id) {
            let row = self
                .state
                .user_row(user_id)
                .ok_or(RewardsServiceError::UserNotFound)?;
            let writer = row.lock_writer().await;
            let user = pending
                .committed_user(&row)
                .ok_or(RewardsServiceError::UserNotFound)?;
            pending.users.insert(
                user_id,
                UserSlot {
                    row,
                    _writer: writer,
                    staged: user,
                },
            );
        }
        let slot = pending
            .users
            .get_mut(&user_id)
            .ok_or(RewardsServiceError::UserNotFound)?;
        let total = slot
            .staged
            .points
            .checked_add(delta)
            .filter(|total| *total >= 0)
            .ok_or_else(|| anyhow::anyhow!("balance of user {user_id} out of range"))?;
        slot.staged.points = total;
        Ok(total)
    }

    async fn reset_all(&self) -> Result<(), RewardsServiceError> {
        self.require_exclusive("reset_all")?;
        let mut pending = self.pending.lock().await;
        pending.zero_balances = true;
        for slot in pending.users.values_mut() {
            slot.staged.points = 0;
        }
        Ok(())
    }
}

impl LedgerEntryStore for MemoryLedgerTx {
    async fn append(
        &self,
        user_id: i64,
        code: &str,
        points_awarded: i32,
        timestamp: DateTime<Utc>,
    ) -> Result<i64, RewardsServiceError> {
        self.require_write("append")?;
        let id = self.state.next_entry_id();
        self.pending.lock().await.entries.push(LedgerEntry {
            id,
            user_id,
            code: code.to_owned(),
            points_awarded,
            timestamp,
        });
        Ok(id)
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<LedgerEntry>, RewardsServiceError> {
        if let Some(snapshot) = &self.snapshot {
            let mut entries: Vec<LedgerEntry> = snapshot
                .entries
                .iter()
                .filter(|e| e.user_id == user_id)
                .cloned()
                .collect();
            newest_first(&mut entries);
            return Ok(entries);
        }
        let pending = self.pending.lock().await;
        let mut entries: Vec<LedgerEntry> = if pending.clear_entries {
            Vec::new()
        } else {
            locked(&self.state.entries)
                .iter()
                .filter(|e| e.user_id == user_id)
                .cloned()
                .collect()
        };
        entries.extend(
            pending
                .entries
                .iter()
                .filter(|e| e.user_id == user_id)
                .cloned(),
        );
        newest_first(&mut entries);
        Ok(entries)
    }

    async fn count(&self) -> Result<u64, RewardsServiceError> {
        if let Some(snapshot) = &self.snapshot {
            return Ok(snapshot.entries.len() as u64);
        }
        let pending = self.pending.lock().await;
        let committed = if pending.clear_entries {
            0
        } else {
            locked(&self.state.entries).len()
        };
        Ok((committed + pending.entries.len()) as u64)
    }

    async fn sum_points(&self) -> Result<i64, RewardsServiceError> {
        if let Some(snapshot) = &self.snapshot {
            return Ok(snapshot
                .entries
                .iter()
                .map(|e| i64::from(e.points_awarded))
                .sum());
        }
        let pending = self.pending.lock().await;
        let committed: i64 = if pending.clear_entries {
            0
        } else {
            locked(&self.state.entries)
                .iter()
                .map(|e| i64::from(e.points_awarded))
                .sum()
        };
        let staged: i64 = pending
            .entries
            .iter()
            .map(|e| i64::from(e.points_awarded))
            .sum();
        Ok(committed + staged)
    }

    async fn clear_all(&self) -> Result<(), RewardsServiceError> {
        self.require_exclusive("clear_all")?;
        let mut pending = self.pending.lock().await;
        pending.clear_entries = true;
        pending.entries.clear();
        Ok(())
    }
}
