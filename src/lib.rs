//! Double-entry accounting ledger over a document store: journals and their
//! transactions are committed atomically, balances are served from a
//! refreshing snapshot cache, and a void protocol reverses prior entries
//! without deleting them.

pub mod balance;
pub mod book;
pub mod coerce;
pub mod config;
pub mod db;
pub mod entry;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod model;
pub mod path;
pub mod query;
pub mod void;

pub use balance::{Balance, BalanceEngine};
pub use book::{Book, BookOptions, QueryOptions};
pub use config::Config;
pub use entry::{CommitOptions, Entry};
pub use error::{
    BookConstructorError, EntryError, InvalidAccountPathError, LedgerError, LockError, QueryError,
    VoidError,
};
pub use ledger::{LedgerLister, LedgerPage};
pub use model::{
    AccountLock, BalanceSnapshot, Journal, Meta, MetaValue, Transaction, TransactionField,
};
pub use query::{AccountFilter, Query, QueryDate};
