//! Common test utilities for ledger integration tests.
//!
//! ## Singleton client pattern
//! All tests in a binary share one store connection, mirroring the
//! teacher's `get_test_pool`: without it, every test dials its own client
//! and the small connection pool on a local deployment gets exhausted
//! under `--test-threads`.
//!
//! Every test that touches the store is `#[serial]` and skips itself
//! (rather than failing) when `MONGODB_URL` is unset, so this suite is
//! inert on a machine with no local deployment.

use ledger_rs::{Book, BookOptions};
use mongodb::Database;
use tokio::sync::OnceCell;

static TEST_DB: OnceCell<Database> = OnceCell::const_new();

/// Get or initialize the shared test database handle, or `None` if
/// `MONGODB_URL` is not set.
pub async fn get_test_db() -> Option<Database> {
    if std::env::var("MONGODB_URL").is_err() {
        return None;
    }
    let db = TEST_DB
        .get_or_init(|| async {
            let url = std::env::var("MONGODB_URL").expect("checked above");
            let db_name = std::env::var("LEDGER_TEST_DATABASE").unwrap_or_else(|_| "ledger_test".to_string());
            ledger_rs::db::connect(&url, &db_name)
                .await
                .expect("failed to connect to test deployment")
        })
        .await
        .clone();
    Some(db)
}

/// Open a fresh book namespaced by `test_name`, so concurrent test binaries
/// never see each other's postings.
pub async fn test_book(db: Database, test_name: &str, balance_snapshot_sec: u64) -> Book {
    Book::new(
        db,
        format!("test_{test_name}"),
        BookOptions {
            balance_snapshot_sec,
            ..BookOptions::default()
        },
    )
    .expect("valid book options")
}

/// Drop every document this test wrote, across all four collections.
pub async fn cleanup_book(db: &Database, book_name: &str) {
    use mongodb::bson::doc;
    for collection in ["journals", "transactions", "balances", "locks"] {
        db.collection::<mongodb::bson::Document>(collection)
            .delete_many(doc! { "book": book_name }, None)
            .await
            .ok();
    }
}
