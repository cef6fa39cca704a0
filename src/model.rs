//! Journal, transaction, balance-snapshot, and account-lock document
//! shapes, plus the recognized transaction columns the query compiler and
//! ledger lister are allowed to reason about directly.

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const JOURNALS_COLLECTION: &str = "journals";
pub const TRANSACTIONS_COLLECTION: &str = "transactions";
pub const BALANCES_COLLECTION: &str = "balances";
pub const ACCOUNT_LOCKS_COLLECTION: &str = "locks";

/// A scalar value in a transaction's free-form `meta` map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Free-form metadata attached to a posting or carried through a query.
pub type Meta = BTreeMap<String, MetaValue>;

/// Keys that would shadow an intrinsic member of the base filter/meta object
/// if allowed through un-namespaced. Rejected silently, as data rather than
/// as an attack to explain.
const DENYLIST: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// True if `key` must be dropped by the query compiler's meta-nesting rule.
pub fn is_denylisted(key: &str) -> bool {
    DENYLIST.contains(&key)
}

/// The closed set of transaction columns the query compiler and ledger
/// lister may address directly: an enumerated predicate, not runtime
/// reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionField {
    Account,
    AccountPath,
    Accounts,
    Journal,
    Datetime,
    Timestamp,
    Debit,
    Credit,
    Voided,
    VoidReason,
    OriginalJournal,
}

impl TransactionField {
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionField::Account => "account",
            TransactionField::AccountPath => "account_path",
            TransactionField::Accounts => "accounts",
            TransactionField::Journal => "_journal",
            TransactionField::Datetime => "datetime",
            TransactionField::Timestamp => "timestamp",
            TransactionField::Debit => "debit",
            TransactionField::Credit => "credit",
            TransactionField::Voided => "voided",
            TransactionField::VoidReason => "void_reason",
            TransactionField::OriginalJournal => "_original_journal",
        }
    }

    /// Recognize a column name from user input, or `None` if it should be
    /// routed into `meta` instead.
    pub fn from_str(key: &str) -> Option<Self> {
        match key {
            "account" => Some(Self::Account),
            "account_path" => Some(Self::AccountPath),
            "accounts" => Some(Self::Accounts),
            "_journal" => Some(Self::Journal),
            "datetime" => Some(Self::Datetime),
            "timestamp" => Some(Self::Timestamp),
            "debit" => Some(Self::Debit),
            "credit" => Some(Self::Credit),
            "voided" => Some(Self::Voided),
            "void_reason" => Some(Self::VoidReason),
            "_original_journal" => Some(Self::OriginalJournal),
            _ => None,
        }
    }

    /// True when this column's semantic type is a document-store
    /// identifier, i.e. values for it must be coerced via
    /// [`crate::coerce::coerce_object_id`] when supplied as a string.
    pub fn is_identifier(self) -> bool {
        matches!(self, TransactionField::Journal | TransactionField::OriginalJournal)
    }
}

/// The atomic unit of commit: a balanced group of transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Journal {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub book: String,
    pub datetime: bson::DateTime,
    pub memo: String,
    pub voided: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub void_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voided_by: Option<ObjectId>,
    /// The transactions belonging to this journal, by id. Populated at
    /// commit time from the entry's pending postings.
    pub transactions: Vec<ObjectId>,
}

/// One posting of a journal: exactly one of `debit`/`credit` is non-zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub book: String,
    #[serde(rename = "_journal")]
    pub journal: ObjectId,
    pub datetime: bson::DateTime,
    pub timestamp: bson::DateTime,
    pub account_path: String,
    pub accounts: Vec<String>,
    pub debit: f64,
    pub credit: f64,
    #[serde(default)]
    pub meta: Meta,
    pub voided: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub void_reason: Option<String>,
    #[serde(rename = "_original_journal", skip_serializing_if = "Option::is_none")]
    pub original_journal: Option<ObjectId>,
}

/// A cached partial sum over a `(book, account?, meta?)` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub book: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,
    pub balance: f64,
    pub transaction: ObjectId,
    pub timestamp: bson::DateTime,
    #[serde(rename = "createdAt")]
    pub created_at: bson::DateTime,
    #[serde(rename = "expireAt")]
    pub expire_at: bson::DateTime,
}

/// Per-`(book, account)` upsert-only mutex-by-contention document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountLock {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub book: String,
    pub account: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: bson::DateTime,
    pub revision: i64,
}
