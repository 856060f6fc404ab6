// used for persistence
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value as JsonValue;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use tracing::{debug, trace};

use crate::construct::OtherHasher;
use crate::datatype::{Key, Record};
use crate::error::{OrmError, Result};

/// The storage collaborator. Collections are identified by the lower-cased
/// model name; keys are assigned by the store on insert.
pub trait Store: Send {
    fn insert(&mut self, collection: &str, record: &Record) -> Result<Key>;
    fn update_or_insert(&mut self, collection: &str, record: &Record, key: Key) -> Result<()>;
    fn get_by_key(&mut self, collection: &str, key: Key) -> Result<Option<Record>>;
    /// Every record whose `field` equals `value` exactly, in key order.
    fn get_all_by_field(
        &mut self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Vec<(Key, Record)>>;
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn insert(&mut self, collection: &str, record: &Record) -> Result<Key> {
        (**self).insert(collection, record)
    }
    fn update_or_insert(&mut self, collection: &str, record: &Record, key: Key) -> Result<()> {
        (**self).update_or_insert(collection, record, key)
    }
    fn get_by_key(&mut self, collection: &str, key: Key) -> Result<Option<Record>> {
        (**self).get_by_key(collection, key)
    }
    fn get_all_by_field(
        &mut self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Vec<(Key, Record)>> {
        (**self).get_all_by_field(collection, field, value)
    }
}

// ------------- In memory -------------
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: HashMap<String, BTreeMap<Key, Record>, OtherHasher>,
}
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn len(&self, collection: &str) -> usize {
        self.collections.get(collection).map_or(0, BTreeMap::len)
    }
}
impl Store for MemoryStore {
    fn insert(&mut self, collection: &str, record: &Record) -> Result<Key> {
        let documents = self.collections.entry(collection.to_string()).or_default();
        // one past the largest key, like the document table it stands in for
        let key = documents.keys().next_back().map_or(1, |last| last + 1);
        documents.insert(key, record.clone());
        trace!(collection, key, "inserted");
        Ok(key)
    }
    fn update_or_insert(&mut self, collection: &str, record: &Record, key: Key) -> Result<()> {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(key, record.clone());
        Ok(())
    }
    fn get_by_key(&mut self, collection: &str, key: Key) -> Result<Option<Record>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|documents| documents.get(&key))
            .cloned())
    }
    fn get_all_by_field(
        &mut self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Vec<(Key, Record)>> {
        let Some(documents) = self.collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(documents
            .iter()
            .filter(|(_, record)| record.get(field).unwrap_or(&JsonValue::Null) == value)
            .map(|(key, record)| (*key, record.clone()))
            .collect())
    }
}

// ------------- SQLite -------------
/// Keeps every collection as a table of JSON documents in SQLite.
pub struct SqliteStore {
    pub db: Connection,
    pub seen_collections: HashSet<String, OtherHasher>,
}
impl SqliteStore {
    pub fn new(connection: Connection) -> Self {
        Self {
            db: connection,
            seen_collections: HashSet::default(),
        }
    }
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Connection::open(path)?))
    }
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }
    // collections come into existence on first use
    fn ensure_collection(&mut self, collection: &str) -> Result<()> {
        if self.seen_collections.contains(collection) {
            return Ok(());
        }
        // The "STRICT" keyword introduced in 3.37.0 breaks JDBC connections, which makes
        // debugging using an external tool like DBeaver impossible
        self.db.execute_batch(&format!(
            "
            create table if not exists \"{collection}\" (
                Document_Identity integer,
                Document text not null,
                constraint referenceable_{collection}_Document_Identity primary key (
                    Document_Identity
                )
            );-- STRICT;
            "
        ))?;
        debug!(collection, "collection ready");
        self.seen_collections.insert(collection.to_string());
        Ok(())
    }
}

fn decode(collection: &str, text: &str) -> Result<Record> {
    match serde_json::from_str::<JsonValue>(text)? {
        JsonValue::Object(record) => Ok(record),
        other => Err(OrmError::DataCorruption {
            message: format!("{} holds a non-object document: {}", collection, other),
        }),
    }
}

// json_extract hands back SQL scalars, so compare against the same
fn to_sql(value: &JsonValue) -> SqlValue {
    match value {
        JsonValue::Null => SqlValue::Null,
        JsonValue::Bool(b) => SqlValue::Integer(i64::from(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

impl Store for SqliteStore {
    fn insert(&mut self, collection: &str, record: &Record) -> Result<Key> {
        self.ensure_collection(collection)?;
        let document = serde_json::to_string(record)?;
        self.db
            .prepare_cached(&format!(
                "
                insert into \"{collection}\" (
                    Document
                ) values (?)
            "
            ))?
            .execute(params![document])?;
        let key = self.db.last_insert_rowid();
        trace!(collection, key, "inserted");
        Ok(key)
    }
    fn update_or_insert(&mut self, collection: &str, record: &Record, key: Key) -> Result<()> {
        self.ensure_collection(collection)?;
        let document = serde_json::to_string(record)?;
        self.db
            .prepare_cached(&format!(
                "
                insert into \"{collection}\" (
                    Document_Identity,
                    Document
                ) values (?, ?)
                on conflict (Document_Identity) do update
                    set Document = excluded.Document
            "
            ))?
            .execute(params![key, document])?;
        Ok(())
    }
    fn get_by_key(&mut self, collection: &str, key: Key) -> Result<Option<Record>> {
        self.ensure_collection(collection)?;
        let document: Option<String> = self
            .db
            .prepare_cached(&format!(
                "
                select Document
                    from \"{collection}\"
                    where Document_Identity = ?
            "
            ))?
            .query_row(params![key], |r| r.get(0))
            .optional()?;
        document.map(|text| decode(collection, &text)).transpose()
    }
    fn get_all_by_field(
        &mut self,
        collection: &str,
        field: &str,
        value: &JsonValue,
    ) -> Result<Vec<(Key, Record)>> {
        self.ensure_collection(collection)?;
        let path = format!("$.\"{}\"", field);
        let mut statement = self.db.prepare_cached(&format!(
            "
            select Document_Identity, Document
                from \"{collection}\"
                where json_extract(Document, ?) is ?
                order by Document_Identity
        "
        ))?;
        let rows = statement.query_map(params![path, to_sql(value)], |row| {
            Ok((row.get::<_, Key>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut found = Vec::new();
        for row in rows {
            let (key, text) = row?;
            found.push((key, decode(collection, &text)?));
        }
        Ok(found)
    }
}
