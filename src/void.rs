//! Void protocol: reverse a prior journal while preserving auditability.
//!
//! Fetch the original, build its inverse, commit within one store
//! transaction, then mark the original voided.

use bson::doc;
use bson::oid::ObjectId;
use chrono::Utc;
use mongodb::options::TransactionOptions;
use mongodb::ClientSession;

use crate::book::Book;
use crate::entry::{CommitOptions, Entry};
use crate::error::VoidError;
use crate::model::{Journal, Transaction, JOURNALS_COLLECTION, TRANSACTIONS_COLLECTION};

/// Reverse `journal_id`: fail if it does not exist in this book or is
/// already voided; otherwise commit a reversing journal and mark the
/// original voided, atomically.
pub async fn void_journal(
    book: &Book,
    journal_id: ObjectId,
    reason: Option<String>,
    session: Option<&mut ClientSession>,
) -> Result<Journal, VoidError> {
    match session {
        Some(session) => void_in_session(book, journal_id, reason, session).await,
        None => {
            let client = book.db.client().clone();
            let mut owned_session = client.start_session(None).await?;
            owned_session
                .start_transaction(Some(TransactionOptions::builder().build()))
                .await?;
            match void_in_session(book, journal_id, reason, &mut owned_session).await {
                Ok(journal) => {
                    owned_session.commit_transaction().await?;
                    Ok(journal)
                }
                Err(e) => {
                    let _ = owned_session.abort_transaction().await;
                    Err(e)
                }
            }
        }
    }
}

async fn void_in_session(
    book: &Book,
    journal_id: ObjectId,
    reason: Option<String>,
    session: &mut ClientSession,
) -> Result<Journal, VoidError> {
    let journals = book.db.collection::<Journal>(JOURNALS_COLLECTION);
    let journal_filter = doc! { "book": book.name(), "_id": journal_id };

    let original = journals
        .find_one_with_session(journal_filter.clone(), None, session)
        .await?
        .ok_or(VoidError::JournalNotFound(journal_id))?;

    if original.voided {
        return Err(VoidError::JournalAlreadyVoided(journal_id));
    }

    let transactions = book.db.collection::<Transaction>(TRANSACTIONS_COLLECTION);
    let txn_filter = doc! { "book": book.name(), "_journal": journal_id };
    let mut cursor = transactions.find_with_session(txn_filter.clone(), None, session).await?;
    let mut originals = Vec::new();
    while let Some(t) = cursor.next(session).await.transpose()? {
        originals.push(t);
    }

    let memo = match &reason {
        Some(reason) => format!("VOID: {} ({reason})", original.memo),
        None => format!("VOID: {}", original.memo),
    };

    let mut reversal = Entry::new(book.clone(), memo, Some(Utc::now()), Some(journal_id));
    for t in &originals {
        if t.credit > 0.0 {
            reversal.debit(&t.account_path, t.credit, Some(t.meta.clone()))?;
        } else {
            reversal.credit(&t.account_path, t.debit, Some(t.meta.clone()))?;
        }
    }
    let reversal_journal = reversal
        .commit(CommitOptions { session: Some(session) })
        .await?;

    journals
        .update_one_with_session(
            journal_filter,
            doc! { "$set": {
                "voided": true,
                "void_reason": reason.clone(),
                "voided_by": reversal_journal.id,
            }},
            None,
            session,
        )
        .await?;

    transactions
        .update_many_with_session(
            txn_filter,
            doc! { "$set": { "voided": true, "void_reason": reason } },
            None,
            session,
        )
        .await?;

    if let Some(reversal_journal_id) = reversal_journal.id {
        tracing::info!(
            book = %book.name(),
            original_journal = %journal_id,
            reversal_journal = %reversal_journal_id,
            "journal voided"
        );
    }

    Ok(reversal_journal)
}
