//! sea-orm entities for the rewards service tables.

pub mod codes;
pub mod ledger_entries;
pub mod users;
