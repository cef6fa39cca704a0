//! `Book`: the named-ledger namespace and public facade tying the query
//! compiler, entry builder, balance engine, ledger lister, and void
//! protocol together.

use bson::doc;
use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use mongodb::{ClientSession, Database};

use crate::balance::{Balance, BalanceEngine};
use crate::entry::Entry;
use crate::error::{BookConstructorError, LedgerError, LockError, VoidError};
use crate::ledger::{LedgerPage, LedgerLister};
use crate::lock;
use crate::model::{TransactionField, TRANSACTIONS_COLLECTION};
use crate::query::Query;
use crate::void;

/// Per-call execution context. A caller that wants several operations bound
/// into one store transaction passes the same session to each of them.
#[derive(Default)]
pub struct QueryOptions<'a> {
    pub session: Option<&'a mut ClientSession>,
}

/// Constructor arguments for [`Book::new`]; all optional fields fall back to
/// sensible production defaults.
#[derive(Debug, Clone)]
pub struct BookOptions {
    pub precision: u32,
    pub max_account_path: u32,
    pub balance_snapshot_sec: u64,
}

impl Default for BookOptions {
    fn default() -> Self {
        BookOptions {
            precision: 8,
            max_account_path: 3,
            balance_snapshot_sec: 86_400,
        }
    }
}

/// A named ledger namespace: the entry point for every operation in this crate.
#[derive(Clone)]
pub struct Book {
    pub(crate) db: Database,
    pub(crate) name: String,
    pub(crate) precision: u32,
    pub(crate) max_account_path: u32,
    pub(crate) balance_snapshot_sec: u64,
}

impl Book {
    /// Open (or implicitly create, on first write) a book.
    pub fn new(db: Database, name: impl Into<String>, options: BookOptions) -> Result<Book, BookConstructorError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BookConstructorError::EmptyName);
        }
        if options.max_account_path == 0 {
            return Err(BookConstructorError::InvalidMaxAccountPath);
        }
        Ok(Book {
            db,
            name,
            precision: options.precision,
            max_account_path: options.max_account_path,
            balance_snapshot_sec: options.balance_snapshot_sec,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn max_account_path(&self) -> u32 {
        self.max_account_path
    }

    /// Begin building a new journal entry.
    pub fn entry(
        &self,
        memo: impl Into<String>,
        datetime: Option<DateTime<Utc>>,
        original_journal: Option<ObjectId>,
    ) -> Entry {
        Entry::new(self.clone(), memo.into(), datetime, original_journal)
    }

    /// Aggregate `credit - debit` over a filter, using the freshest
    /// applicable snapshot.
    pub async fn balance(&self, query: Query, options: QueryOptions<'_>) -> Result<Balance, LedgerError> {
        BalanceEngine::new(self).balance(query, options.session).await
    }

    /// Paginated, sorted enumeration of transactions matching a filter.
    pub async fn ledger(
        &self,
        query: Query,
        populate: &[TransactionField],
        options: QueryOptions<'_>,
    ) -> Result<LedgerPage, LedgerError> {
        LedgerLister::new(self).list(query, populate, options.session).await
    }

    /// Reverse a prior journal, preserving auditability.
    pub async fn void(
        &self,
        journal_id: ObjectId,
        reason: Option<String>,
        options: QueryOptions<'_>,
    ) -> Result<crate::model::Journal, VoidError> {
        void::void_journal(self, journal_id, reason, options.session).await
    }

    /// Enumerate every distinct account path and every prefix ever posted.
    pub async fn list_accounts(&self, options: QueryOptions<'_>) -> Result<Vec<String>, LedgerError> {
        let collection = self.db.collection::<bson::Document>(TRANSACTIONS_COLLECTION);
        let filter = doc! { "book": &self.name };
        let values = match options.session {
            Some(session) => {
                collection
                    .distinct_with_session("accounts", filter, None, session)
                    .await?
            }
            None => collection.distinct("accounts", filter, None).await?,
        };
        Ok(bson_distinct_to_strings(values))
    }

    /// Serialize concurrent writers against the same account set.
    pub async fn writelock_accounts(
        &self,
        accounts: &[String],
        session: &mut ClientSession,
    ) -> Result<(), LockError> {
        lock::writelock_accounts(self, accounts, session).await
    }

}

fn bson_distinct_to_strings(values: Vec<bson::Bson>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_owned))
        .collect()
}
