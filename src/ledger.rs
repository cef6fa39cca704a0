//! Ledger lister: paginated, sorted enumeration of transactions matching a
//! filter.
//!
//! Paginated, filtered listing, with a separate total count issued only
//! when a page is requested.

use bson::doc;
use futures::TryStreamExt;
use mongodb::options::FindOptions;
use mongodb::ClientSession;

use crate::book::Book;
use crate::error::LedgerError;
use crate::model::{Transaction, TransactionField, TRANSACTIONS_COLLECTION};
use crate::query::{compile, Query};

/// Result of [`LedgerLister::list`].
#[derive(Debug, Clone)]
pub struct LedgerPage {
    pub results: Vec<Transaction>,
    pub total: i64,
}

pub struct LedgerLister<'a> {
    book: &'a Book,
}

impl<'a> LedgerLister<'a> {
    pub fn new(book: &'a Book) -> Self {
        LedgerLister { book }
    }

    /// `populate` is accepted for API-shape parity with the source library;
    /// recognized transaction columns are a closed enum so there is no
    /// runtime "unknown field" case to guard against. Hydration of
    /// referenced documents (e.g. the parent journal) is left to a higher
    /// layer, this always returns plain transaction records.
    pub async fn list(
        &self,
        query: Query,
        _populate: &[TransactionField],
        mut session: Option<&mut ClientSession>,
    ) -> Result<LedgerPage, LedgerError> {
        let filter = compile(&query, self.book)?;
        let collection = self.book.db.collection::<Transaction>(TRANSACTIONS_COLLECTION);
        let sort = doc! { "datetime": -1, "timestamp": -1 };

        match (query.page, query.per_page) {
            (page, Some(per_page)) => {
                let page = page.unwrap_or(1);
                let skip = page.saturating_sub(1).saturating_mul(per_page);
                let find_options = FindOptions::builder().sort(sort).skip(skip).limit(per_page as i64).build();

                let results = self.find(&filter, find_options, session.as_deref_mut()).await?;
                let total = self.count(&filter, session).await?;
                Ok(LedgerPage { results, total })
            }
            _ => {
                let find_options = FindOptions::builder().sort(sort).build();
                let results = self.find(&filter, find_options, session).await?;
                let total = results.len() as i64;
                Ok(LedgerPage { results, total })
            }
        }
    }

    async fn find(
        &self,
        filter: &bson::Document,
        options: FindOptions,
        session: Option<&mut ClientSession>,
    ) -> Result<Vec<Transaction>, mongodb::error::Error> {
        let collection = self.book.db.collection::<Transaction>(TRANSACTIONS_COLLECTION);
        match session {
            Some(session) => {
                let mut cursor = collection.find_with_session(filter.clone(), options, session).await?;
                let mut results = Vec::new();
                while let Some(doc) = cursor.next(session).await.transpose()? {
                    results.push(doc);
                }
                Ok(results)
            }
            None => {
                let cursor = collection.find(filter.clone(), options).await?;
                cursor.try_collect().await
            }
        }
    }

    async fn count(&self, filter: &bson::Document, session: Option<&mut ClientSession>) -> Result<i64, mongodb::error::Error> {
        let collection = self.book.db.collection::<Transaction>(TRANSACTIONS_COLLECTION);
        let count = match session {
            Some(session) => collection.count_documents_with_session(filter.clone(), None, session).await?,
            None => collection.count_documents(filter.clone(), None).await?,
        };
        Ok(count as i64)
    }
}
