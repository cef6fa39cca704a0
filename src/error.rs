//! Crate-wide error types.
//!
//! Each public operation returns a narrow, caller-dispatchable error enum
//! rather than a single catch-all. Store errors are wrapped, never
//! swallowed, so a caller's retry loop sees the driver's own classification.

use bson::oid::ObjectId;
use thiserror::Error;

/// Raised by [`crate::book::Book::new`] when a constructor argument is invalid.
#[derive(Debug, Error)]
pub enum BookConstructorError {
    #[error("book name must be a non-empty string")]
    EmptyName,
    #[error("precision must fit in a u32")]
    InvalidPrecision,
    #[error("maxAccountPath must be at least 1")]
    InvalidMaxAccountPath,
}

/// Raised while building or committing an [`crate::entry::Entry`].
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("invalid account path: {0}")]
    InvalidAccountPath(#[from] InvalidAccountPathError),
    #[error("amount must be a non-negative finite number, got {0}")]
    InvalidAmount(f64),
    #[error(
        "entry is not balanced: total debit {debit} != total credit {credit} (precision 10^-{precision})"
    )]
    Unbalanced {
        debit: f64,
        credit: f64,
        precision: u32,
    },
    #[error("entry has no pending postings to commit")]
    Empty,
    #[error("entry was already committed")]
    AlreadyCommitted,
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("store error: {0}")]
    Store(#[from] mongodb::error::Error),
}

/// Raised by path parsing, shared by the query compiler and the entry builder.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvalidAccountPathError {
    #[error("account path must not be empty")]
    Empty,
    #[error("account path segment must not be empty")]
    EmptySegment,
    #[error("account path has {found} segments, book allows at most {max}")]
    TooManySegments { found: usize, max: usize },
}

/// Raised while compiling a user query into a store filter.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    InvalidAccountPath(#[from] InvalidAccountPathError),
    #[error("account filter must be a string or a sequence of strings")]
    InvalidAccountShape,
    #[error("could not parse date: {0}")]
    InvalidDate(String),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// Raised by the balance engine and the ledger lister.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("store error: {0}")]
    Store(#[from] mongodb::error::Error),
}

/// Raised by [`crate::void::void_journal`].
#[derive(Debug, Error)]
pub enum VoidError {
    #[error("journal {0} not found in this book")]
    JournalNotFound(ObjectId),
    #[error("journal {0} is already voided")]
    JournalAlreadyVoided(ObjectId),
    #[error(transparent)]
    Entry(#[from] EntryError),
    #[error("store error: {0}")]
    Store(#[from] mongodb::error::Error),
}

/// Raised by the account write-lock.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("store error: {0}")]
    Store(#[from] mongodb::error::Error),
}

/// True when a store error is the driver's transient-transaction-conflict
/// classification and the caller is expected to retry the whole operation.
pub fn is_transient(err: &mongodb::error::Error) -> bool {
    err.contains_label(mongodb::error::TRANSIENT_TRANSACTION_ERROR)
}
