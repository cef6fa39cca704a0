//! Entry builder / commit protocol: accumulate debits and credits, validate
//! balance, and commit a journal and its transactions atomically.
//!
//! Accumulate, validate, then a single store transaction that inserts the
//! journal header followed by its lines.

use bson::oid::ObjectId;
use chrono::{DateTime, Utc};
use mongodb::options::TransactionOptions;
use mongodb::ClientSession;

use crate::book::Book;
use crate::error::{EntryError, InvalidAccountPathError};
use crate::lock;
use crate::model::{Journal, Meta, Transaction, JOURNALS_COLLECTION, TRANSACTIONS_COLLECTION};
use crate::path;

struct PendingPosting {
    account_path: String,
    debit: f64,
    credit: f64,
    meta: Meta,
}

/// Execution context for [`Entry::commit`].
#[derive(Default)]
pub struct CommitOptions<'a> {
    pub session: Option<&'a mut ClientSession>,
}

/// Accumulates postings for one journal entry before it is committed.
pub struct Entry {
    book: Book,
    memo: String,
    datetime: Option<DateTime<Utc>>,
    original_journal: Option<ObjectId>,
    postings: Vec<PendingPosting>,
    committed: bool,
}

impl Entry {
    pub(crate) fn new(book: Book, memo: String, datetime: Option<DateTime<Utc>>, original_journal: Option<ObjectId>) -> Self {
        Entry {
            book,
            memo,
            datetime,
            original_journal,
            postings: Vec::new(),
            committed: false,
        }
    }

    /// Append a debit posting.
    pub fn debit(&mut self, account_path: &str, amount: f64, meta: Option<Meta>) -> Result<&mut Self, EntryError> {
        self.push(account_path, amount, true, meta)
    }

    /// Append a credit posting.
    pub fn credit(&mut self, account_path: &str, amount: f64, meta: Option<Meta>) -> Result<&mut Self, EntryError> {
        self.push(account_path, amount, false, meta)
    }

    fn push(&mut self, account_path: &str, amount: f64, is_debit: bool, meta: Option<Meta>) -> Result<&mut Self, EntryError> {
        path::split(account_path, self.book.max_account_path() as usize)?;
        if !amount.is_finite() || amount < 0.0 {
            return Err(EntryError::InvalidAmount(amount));
        }
        self.postings.push(PendingPosting {
            account_path: account_path.to_string(),
            debit: if is_debit { amount } else { 0.0 },
            credit: if is_debit { 0.0 } else { amount },
            meta: meta.unwrap_or_default(),
        });
        Ok(self)
    }

    /// Verify balance, acquire write locks, and commit the journal and its
    /// transactions within one store transaction.
    pub async fn commit(&mut self, options: CommitOptions<'_>) -> Result<Journal, EntryError> {
        if self.committed {
            return Err(EntryError::AlreadyCommitted);
        }
        if self.postings.is_empty() {
            return Err(EntryError::Empty);
        }

        let total_debit: f64 = self.postings.iter().map(|p| p.debit).sum();
        let total_credit: f64 = self.postings.iter().map(|p| p.credit).sum();
        let precision = self.book.precision();
        let tolerance = 10f64.powi(-(precision as i32));
        if (total_debit - total_credit).abs() > tolerance {
            return Err(EntryError::Unbalanced {
                debit: total_debit,
                credit: total_credit,
                precision,
            });
        }

        let mut accounts: Vec<String> = self
            .postings
            .iter()
            .map(|p| p.account_path.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        accounts.sort();

        let now = Utc::now();
        let datetime = self.datetime.unwrap_or(now);
        let journal_id = ObjectId::new();

        let journal = match options.session {
            Some(session) => self.commit_in_session(session, journal_id, &accounts, datetime, now).await?,
            None => {
                let client = self.book.db.client().clone();
                let mut owned_session = client.start_session(None).await?;
                owned_session
                    .start_transaction(Some(TransactionOptions::builder().build()))
                    .await?;
                let journal = match self
                    .commit_in_session(&mut owned_session, journal_id, &accounts, datetime, now)
                    .await
                {
                    Ok(journal) => journal,
                    Err(e) => {
                        let _ = owned_session.abort_transaction().await;
                        return Err(e);
                    }
                };
                owned_session.commit_transaction().await?;
                journal
            }
        };

        self.committed = true;
        tracing::info!(
            book = %self.book.name(),
            journal_id = %journal_id,
            postings = self.postings.len(),
            "journal entry committed"
        );
        Ok(journal)
    }

    async fn commit_in_session(
        &self,
        session: &mut ClientSession,
        journal_id: ObjectId,
        accounts: &[String],
        datetime: DateTime<Utc>,
        commit_time: DateTime<Utc>,
    ) -> Result<Journal, EntryError> {
        lock::writelock_accounts(&self.book, accounts, session).await?;

        let mut transaction_ids = Vec::with_capacity(self.postings.len());
        let mut transactions = Vec::with_capacity(self.postings.len());

        for posting in &self.postings {
            let id = ObjectId::new();
            transaction_ids.push(id);
            let accounts = path::prefixes(&posting.account_path, self.book.max_account_path() as usize)?;
            transactions.push(Transaction {
                id: Some(id),
                book: self.book.name().to_string(),
                journal: journal_id,
                datetime: bson::DateTime::from_chrono(datetime),
                timestamp: bson::DateTime::from_chrono(commit_time),
                account_path: posting.account_path.clone(),
                accounts,
                debit: posting.debit,
                credit: posting.credit,
                meta: posting.meta.clone(),
                voided: false,
                void_reason: None,
                original_journal: self.original_journal,
            });
        }

        let transactions_collection = self.book.db.collection::<Transaction>(TRANSACTIONS_COLLECTION);
        transactions_collection
            .insert_many_with_session(&transactions, None, session)
            .await?;

        let journal = Journal {
            id: Some(journal_id),
            book: self.book.name().to_string(),
            datetime: bson::DateTime::from_chrono(datetime),
            memo: self.memo.clone(),
            voided: false,
            void_reason: None,
            voided_by: None,
            transactions: transaction_ids,
        };

        let journals_collection = self.book.db.collection::<Journal>(JOURNALS_COLLECTION);
        journals_collection
            .insert_one_with_session(&journal, None, session)
            .await?;

        Ok(journal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::BookOptions;

    async fn test_book() -> Book {
        let db = mongodb::Client::with_uri_str("mongodb://localhost:27017")
            .await
            .unwrap()
            .database("ledger_test");
        Book::new(db, "main", BookOptions::default()).unwrap()
    }

    #[tokio::test]
    async fn rejects_invalid_account_path_eagerly() {
        let book = test_book().await;
        let mut entry = book.entry("test", None, None);
        let err = entry.debit("", 100.0, None).unwrap_err();
        assert!(matches!(
            err,
            EntryError::InvalidAccountPath(InvalidAccountPathError::Empty)
        ));
    }

    #[tokio::test]
    async fn rejects_negative_amount() {
        let book = test_book().await;
        let mut entry = book.entry("test", None, None);
        let err = entry.debit("Assets:Cash", -1.0, None).unwrap_err();
        assert!(matches!(err, EntryError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn too_many_segments_rejected_at_call_time() {
        let book = test_book().await;
        let mut entry = book.entry("test", None, None);
        let err = entry.credit("A:B:C:D", 1.0, None).unwrap_err();
        assert!(matches!(
            err,
            EntryError::InvalidAccountPath(InvalidAccountPathError::TooManySegments { .. })
        ));
    }
}
