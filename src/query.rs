//! Turn a user-facing filter into a safe, indexable document-store
//! predicate, with a prototype-pollution guard and closed-column routing
//! for free-form extras.

use std::collections::BTreeMap;

use bson::{doc, Document};

use crate::book::Book;
use crate::coerce::{coerce_date, coerce_object_id, DateInput};
use crate::error::QueryError;
use crate::model::{is_denylisted, MetaValue, TransactionField};
use crate::path;

/// One or more account strings; a sequence becomes a disjunction.
#[derive(Debug, Clone)]
pub enum AccountFilter {
    One(String),
    Many(Vec<String>),
}

impl AccountFilter {
    fn as_slice(&self) -> Vec<&str> {
        match self {
            AccountFilter::One(s) => vec![s.as_str()],
            AccountFilter::Many(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

/// A user-facing query, before compilation into a store filter.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub account: Option<AccountFilter>,
    pub start_date: Option<QueryDate>,
    pub end_date: Option<QueryDate>,
    pub journal: Option<String>,
    pub extra: BTreeMap<String, MetaValue>,
    pub per_page: Option<u64>,
    pub page: Option<u64>,
}

/// The accepted shapes for `start_date`/`end_date`.
#[derive(Debug, Clone)]
pub enum QueryDate {
    Text(String),
    EpochMillis(i64),
}

impl Query {
    pub fn new() -> Self {
        Query::default()
    }

    pub fn account(mut self, filter: AccountFilter) -> Self {
        self.account = Some(filter);
        self
    }

    pub fn date_range(mut self, start: Option<QueryDate>, end: Option<QueryDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    pub fn journal(mut self, id: impl Into<String>) -> Self {
        self.journal = Some(id.into());
        self
    }

    /// Attach an ad-hoc key/value pair. Silently dropped at compile time if
    /// `key` is on the prototype-pollution denylist.
    pub fn extra(mut self, key: impl Into<String>, value: MetaValue) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn paginate(mut self, page: u64, per_page: u64) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }
}

/// Compile a [`Query`] into a store filter document, scoped to `book`.
pub fn compile(query: &Query, book: &Book) -> Result<Document, QueryError> {
    let mut filter = doc! { "book": book.name().to_string() };

    if let Some(account) = &query.account {
        compile_account(account, book.max_account_path() as usize, &mut filter)?;
    }

    if query.start_date.is_some() || query.end_date.is_some() {
        let mut range = Document::new();
        if let Some(start) = &query.start_date {
            range.insert("$gte", coerce_date(to_date_input(start))?);
        }
        if let Some(end) = &query.end_date {
            range.insert("$lte", coerce_date(to_date_input(end))?);
        }
        filter.insert("datetime", range);
    }

    if let Some(journal) = &query.journal {
        filter.insert(TransactionField::Journal.as_str(), coerce_object_id(journal)?);
    }

    for (key, value) in &query.extra {
        if is_denylisted(key) {
            continue;
        }
        match TransactionField::from_str(key) {
            Some(field) => {
                let bson_value = coerce_extra_value(field, value)?;
                filter.insert(field.as_str(), bson_value);
            }
            None => {
                filter.insert(format!("meta.{key}"), meta_value_to_bson(value));
            }
        }
    }

    Ok(filter)
}

fn compile_account(account: &AccountFilter, max_segments: usize, filter: &mut Document) -> Result<(), QueryError> {
    let accounts = account.as_slice();
    if accounts.is_empty() {
        return Err(QueryError::InvalidAccountShape);
    }

    let mut all_full_depth = true;
    for a in &accounts {
        if !path::is_full_depth(a, max_segments)? {
            all_full_depth = false;
            break;
        }
    }

    let field = if all_full_depth {
        TransactionField::AccountPath.as_str()
    } else {
        TransactionField::Accounts.as_str()
    };

    if accounts.len() == 1 {
        filter.insert(field, accounts[0]);
    } else {
        filter.insert(field, doc! { "$in": accounts });
    }
    Ok(())
}

fn to_date_input(d: &QueryDate) -> DateInput {
    match d {
        QueryDate::Text(s) => DateInput::Text(s.clone()),
        QueryDate::EpochMillis(ms) => DateInput::EpochMillis(*ms),
    }
}

fn coerce_extra_value(field: TransactionField, value: &MetaValue) -> Result<bson::Bson, QueryError> {
    if field.is_identifier() {
        if let MetaValue::String(s) = value {
            return Ok(bson::Bson::ObjectId(coerce_object_id(s)?));
        }
    }
    Ok(meta_value_to_bson(value))
}

fn meta_value_to_bson(value: &MetaValue) -> bson::Bson {
    match value {
        MetaValue::String(s) => bson::Bson::String(s.clone()),
        MetaValue::Int(i) => bson::Bson::Int64(*i),
        MetaValue::Float(f) => bson::Bson::Double(*f),
        MetaValue::Bool(b) => bson::Bson::Boolean(*b),
    }
}

/// The canonical, comma-joined form of an account filter, used as half of
/// the balance engine's snapshot key.
pub fn canonical_account_key(account: &AccountFilter) -> String {
    account.as_slice().join(",")
}
