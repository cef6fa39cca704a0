//! Store bootstrap: client construction and required index setup.
//!
//! A single entry point that turns a connection string into a
//! ready-to-use handle, with the handful of operational knobs pulled from
//! the environment so tests can keep the client small.

use mongodb::bson::doc;
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Database, IndexModel};
use std::time::Duration;

use crate::model::{ACCOUNT_LOCKS_COLLECTION, BALANCES_COLLECTION, JOURNALS_COLLECTION, TRANSACTIONS_COLLECTION};

/// Connect to the store and return the named database handle.
///
/// # Connection limits
/// `LEDGER_MAX_POOL_SIZE` defaults to 10, matching production; tests should
/// set it to 1-2 to avoid exhausting a shared test deployment.
pub async fn connect(mongodb_url: &str, database_name: &str) -> Result<Database, mongodb::error::Error> {
    let mut options = ClientOptions::parse(mongodb_url).await?;

    let max_pool_size = std::env::var("LEDGER_MAX_POOL_SIZE")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(10);
    options.max_pool_size = Some(max_pool_size);

    let connect_timeout_secs = std::env::var("LEDGER_CONNECT_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(3);
    options.connect_timeout = Some(Duration::from_secs(connect_timeout_secs));

    let client = Client::with_options(options)?;
    Ok(client.database(database_name))
}

/// Create the indexes the query compiler and balance engine rely on.
///
/// Idempotent: safe to call on every process start.
pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let transactions = db.collection::<mongodb::bson::Document>(TRANSACTIONS_COLLECTION);
    transactions
        .create_indexes([
            IndexModel::builder().keys(doc! { "book": 1, "account_path": 1 }).build(),
            IndexModel::builder().keys(doc! { "book": 1, "accounts": 1 }).build(),
            IndexModel::builder().keys(doc! { "book": 1, "datetime": 1 }).build(),
            IndexModel::builder().keys(doc! { "book": 1, "_journal": 1 }).build(),
            IndexModel::builder().keys(doc! { "book": 1, "_id": 1 }).build(),
        ], None)
        .await?;

    let journals = db.collection::<mongodb::bson::Document>(JOURNALS_COLLECTION);
    journals
        .create_index(IndexModel::builder().keys(doc! { "book": 1, "_id": 1 }).build(), None)
        .await?;

    let locks = db.collection::<mongodb::bson::Document>(ACCOUNT_LOCKS_COLLECTION);
    locks
        .create_index(
            IndexModel::builder()
                .keys(doc! { "book": 1, "account": 1 })
                .options(IndexOptions::builder().unique(true).build())
                .build(),
            None,
        )
        .await?;

    let balances = db.collection::<mongodb::bson::Document>(BALANCES_COLLECTION);
    balances
        .create_indexes([
            IndexModel::builder()
                .keys(doc! { "book": 1, "account": 1, "meta": 1, "transaction": -1 })
                .build(),
            IndexModel::builder()
                .keys(doc! { "expireAt": 1 })
                .options(IndexOptions::builder().expire_after(Duration::from_secs(0)).build())
                .build(),
        ], None)
        .await?;

    Ok(())
}
