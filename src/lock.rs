//! Account write-lock: an upsert-only mutex-by-contention used solely to
//! provoke the store's write-write conflict detection on contended
//! accounts.
//!
//! Grounded on a transaction-threading pattern generalized from "insert
//! rows inside this transaction" to "upsert lock documents inside this
//! transaction."

use bson::doc;
use chrono::Utc;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::ClientSession;

use crate::book::Book;
use crate::error::LockError;
use crate::model::{AccountLock, ACCOUNT_LOCKS_COLLECTION};

/// Upsert a `(book, account)` lock document for every distinct account in
/// `accounts`, inside `session`'s transaction.
///
/// Accounts are deduplicated and sorted lexicographically before locking,
/// giving a single global lock order across every commit in the process,
/// chosen to eliminate lock-order inversion between concurrent writers
/// touching overlapping account sets.
pub async fn writelock_accounts(book: &Book, accounts: &[String], session: &mut ClientSession) -> Result<(), LockError> {
    let mut ordered: Vec<&String> = accounts.iter().collect();
    ordered.sort();
    ordered.dedup();

    let collection = book.db.collection::<AccountLock>(ACCOUNT_LOCKS_COLLECTION);
    for account in ordered {
        collection
            .find_one_and_update_with_session(
                doc! { "book": book.name(), "account": account },
                doc! {
                    "$set": { "updatedAt": bson::DateTime::from_chrono(Utc::now()) },
                    "$inc": { "revision": 1_i64 },
                },
                FindOneAndUpdateOptions::builder()
                    .upsert(true)
                    .return_document(ReturnDocument::After)
                    .build(),
                session,
            )
            .await?;
    }
    Ok(())
}
