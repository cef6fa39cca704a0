//! Balance engine with snapshot cache: aggregate `credit - debit` over a
//! filter in bounded time, using the freshest applicable snapshot and
//! opportunistically refreshing it.
//!
//! Grounded on an upsert-rollup pattern for the snapshot write and an
//! aggregation built up from a request struct for the delta query.

use bson::doc;
use bson::oid::ObjectId;
use chrono::{Duration as ChronoDuration, Utc};
use futures::TryStreamExt;
use mongodb::ClientSession;
use serde::Deserialize;

use crate::book::Book;
use crate::error::LedgerError;
use crate::model::{BalanceSnapshot, Meta, BALANCES_COLLECTION, TRANSACTIONS_COLLECTION};
use crate::query::{compile, Query};

/// Result of [`BalanceEngine::balance`].
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    pub balance: f64,
    /// Count of transactions past the applicable snapshot, not the full
    /// history count.
    pub notes: i64,
}

#[derive(Debug, Deserialize)]
struct AggregatedDelta {
    balance: f64,
    count: i64,
    #[serde(rename = "lastTransactionId")]
    last_transaction_id: Option<ObjectId>,
    #[serde(rename = "lastTimestamp")]
    last_timestamp: Option<bson::DateTime>,
}

pub struct BalanceEngine<'a> {
    book: &'a Book,
}

impl<'a> BalanceEngine<'a> {
    pub fn new(book: &'a Book) -> Self {
        BalanceEngine { book }
    }

    pub async fn balance(&self, query: Query, mut session: Option<&mut ClientSession>) -> Result<Balance, LedgerError> {
        let snapshots_enabled = self.book.balance_snapshot_sec > 0;
        let mut filter = compile(&query, self.book)?;

        let snapshot = if snapshots_enabled {
            self.find_best_snapshot(&query, session.as_deref_mut()).await?
        } else {
            None
        };

        let mut needs_refresh = snapshots_enabled;
        if let Some(snapshot) = &snapshot {
            filter.insert("_id", doc! { "$gt": snapshot.transaction });
            let age = Utc::now().signed_duration_since(snapshot.timestamp.to_chrono());
            needs_refresh = age > ChronoDuration::seconds(self.book.balance_snapshot_sec as i64);
        }

        let aggregated = self.aggregate_delta(&filter, session.as_deref_mut()).await?;
        let rounded_delta = round_precision(aggregated.balance, self.book.precision());
        let base = snapshot.as_ref().map(|s| s.balance).unwrap_or(0.0);
        let result_balance = round_precision(base + rounded_delta, self.book.precision());

        if snapshots_enabled && needs_refresh && aggregated.count > 0 {
            if let (Some(last_id), Some(last_ts)) = (aggregated.last_transaction_id, aggregated.last_timestamp) {
                self.write_snapshot(&query, result_balance, last_id, last_ts, session).await?;
                tracing::info!(
                    book = %self.book.name(),
                    account = ?query.account.as_ref().map(crate::query::canonical_account_key),
                    balance = result_balance,
                    "balance snapshot refreshed"
                );
            }
        }

        Ok(Balance {
            balance: result_balance,
            notes: aggregated.count,
        })
    }

    async fn find_best_snapshot(
        &self,
        query: &Query,
        session: Option<&mut ClientSession>,
    ) -> Result<Option<BalanceSnapshot>, LedgerError> {
        let key_filter = self.snapshot_key_filter(query);
        let collection = self.book.db.collection::<BalanceSnapshot>(BALANCES_COLLECTION);
        let options = mongodb::options::FindOneOptions::builder()
            .sort(doc! { "transaction": -1 })
            .build();
        let snapshot = match session {
            Some(session) => {
                collection
                    .find_one_with_session(key_filter, options, session)
                    .await?
            }
            None => collection.find_one(key_filter, options).await?,
        };
        Ok(snapshot)
    }

    async fn aggregate_delta(
        &self,
        filter: &bson::Document,
        session: Option<&mut ClientSession>,
    ) -> Result<AggregatedDelta, LedgerError> {
        let pipeline = vec![
            doc! { "$match": filter.clone() },
            doc! { "$sort": { "_id": 1 } },
            doc! { "$group": {
                "_id": bson::Bson::Null,
                "balance": { "$sum": { "$subtract": ["$credit", "$debit"] } },
                "count": { "$sum": 1 },
                "lastTransactionId": { "$last": "$_id" },
                "lastTimestamp": { "$last": "$timestamp" },
            }},
        ];
        let collection = self.book.db.collection::<bson::Document>(TRANSACTIONS_COLLECTION);
        let doc = match session {
            Some(session) => {
                let mut cursor = collection.aggregate_with_session(pipeline, None, session).await?;
                cursor.next(session).await.transpose()?
            }
            None => {
                let mut cursor = collection.aggregate(pipeline, None).await?;
                cursor.try_next().await?
            }
        };
        Ok(match doc {
            Some(d) => bson::from_document(d).unwrap_or_else(|_| empty_delta()),
            None => empty_delta(),
        })
    }

    async fn write_snapshot(
        &self,
        query: &Query,
        balance: f64,
        transaction: ObjectId,
        timestamp: bson::DateTime,
        session: Option<&mut ClientSession>,
    ) -> Result<(), LedgerError> {
        let now = bson::DateTime::from_chrono(Utc::now());
        let expire_at = bson::DateTime::from_millis(
            now.timestamp_millis() + (2 * self.book.balance_snapshot_sec as i64 * 1000),
        );
        let snapshot = BalanceSnapshot {
            id: None,
            book: self.book.name().to_string(),
            account: query.account.as_ref().map(crate::query::canonical_account_key),
            meta: query_meta(query),
            balance,
            transaction,
            timestamp,
            created_at: now,
            expire_at,
        };
        let collection = self.book.db.collection::<BalanceSnapshot>(BALANCES_COLLECTION);
        let key_filter = self.snapshot_key_filter(query);
        let update = doc! { "$set": bson::to_document(&snapshot).unwrap_or_default() };
        let options = mongodb::options::UpdateOptions::builder().upsert(true).build();
        match session {
            Some(session) => {
                collection
                    .update_one_with_session(key_filter, update, options, session)
                    .await?;
            }
            None => {
                collection.update_one(key_filter, update, options).await?;
            }
        }
        Ok(())
    }

    fn snapshot_key_filter(&self, query: &Query) -> bson::Document {
        let mut filter = doc! { "book": self.book.name() };
        match &query.account {
            Some(account) => {
                filter.insert("account", crate::query::canonical_account_key(account));
            }
            None => {
                filter.insert("account", bson::Bson::Null);
            }
        }
        let meta = query_meta(query);
        if meta.is_empty() {
            filter.insert("meta", bson::Bson::Null);
        } else {
            filter.insert("meta", bson::to_bson(&meta).unwrap_or(bson::Bson::Null));
        }
        filter
    }
}

/// The meta portion of the snapshot key: the subset of `query.extra` that
/// the query compiler would nest under `meta.*` (recognized columns are
/// not part of the meta key).
fn query_meta(query: &Query) -> Meta {
    query
        .extra
        .iter()
        .filter(|(k, _)| crate::model::TransactionField::from_str(k).is_none() && !crate::model::is_denylisted(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// Round to `precision` fractional digits via a decimal-string round-trip,
/// rather than a binary-float rounding mode, reproducing `toFixed`-style
/// truncation.
pub fn round_precision(value: f64, precision: u32) -> f64 {
    let formatted = format!("{:.*}", precision as usize, value);
    formatted.parse::<f64>().unwrap_or(value)
}

fn empty_delta() -> AggregatedDelta {
    AggregatedDelta {
        balance: 0.0,
        count: 0,
        last_transaction_id: None,
        last_timestamp: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_truncates_not_rounds_banker_style() {
        assert_eq!(round_precision(1.005, 2), 1.0); // binary repr of 1.005 is just under
        assert_eq!(round_precision(100.0, 2), 100.0);
        assert_eq!(round_precision(-0.001, 2), 0.0);
    }

    #[test]
    fn rounding_is_idempotent() {
        let once = round_precision(33.333333333, 8);
        let twice = round_precision(once, 8);
        assert_eq!(once, twice);
    }
}
