//! Document storage
//!
//! The access-control core only needs three things from a store: load a
//! document, save it when dirty, and run an [`AccessQuery`]. `LmdbStore`
//! keeps one JSON record per document in a single LMDB database.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use heed::types::{SerdeJson, Str};
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use serde_json::Value;
use tracing::{debug, trace};

use crate::document::{Document, Schema};
use crate::error::{err, Result};
use crate::object::Entity;
use crate::query::AccessQuery;

/// Storage collaborator
pub trait DocumentStore: Send + Sync {
    fn get(&self, id: &str) -> impl Future<Output = Result<Option<Document>>> + Send;

    /// Persist `doc` if dirty; returns whether anything was written
    fn save(&self, doc: &mut Document) -> impl Future<Output = Result<bool>> + Send;

    /// Every document matching `query`, exactly one result per call
    fn find(&self, query: &AccessQuery) -> impl Future<Output = Result<Vec<Document>>> + Send;
}

type Docs = Database<Str, SerdeJson<Value>>;

/// LMDB-backed store
#[derive(Clone)]
pub struct LmdbStore {
    env: Env,
    docs: Docs,
    schema: Arc<Schema>,
}

impl LmdbStore {
    /// Open (or create) the store at `path`
    pub fn open(path: impl AsRef<Path>, schema: Arc<Schema>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(err)?;
        // SAFETY: LMDB requires no other processes access this path concurrently during open.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(1 << 30)
                .max_dbs(1)
                .open(path)
                .map_err(err)?
        };
        let mut tx = env.write_txn().map_err(err)?;
        let docs = env.create_database(&mut tx, Some("docs")).map_err(err)?;
        tx.commit().map_err(err)?;
        debug!(path = %path.display(), "opened document store");
        Ok(LmdbStore { env, docs, schema })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn read<T, F: FnOnce(&Docs, &RoTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        f(&self.docs, &self.env.read_txn().map_err(err)?)
    }

    fn write<T, F: FnOnce(&Docs, &mut RwTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        let mut tx = self.env.write_txn().map_err(err)?;
        let r = f(&self.docs, &mut tx)?;
        tx.commit().map_err(err)?;
        Ok(r)
    }

    pub fn load(&self, id: &str) -> Result<Option<Document>> {
        let record = self.read(|d, tx| d.get(tx, id).map_err(err))?;
        record.map(|r| Document::from_record(r, self.schema.clone())).transpose()
    }

    /// Write `doc` unconditionally and clear its dirty set
    pub fn put(&self, doc: &mut Document) -> Result<()> {
        let record = doc.to_record()?;
        self.put_record(doc.id(), &record)?;
        doc.clear_dirty();
        Ok(())
    }

    fn put_record(&self, id: &str, record: &Value) -> Result<()> {
        self.write(|d, tx| d.put(tx, id, record).map_err(err))
    }

    pub fn remove(&self, id: &str) -> Result<bool> {
        self.write(|d, tx| d.delete(tx, id).map_err(err))
    }

    /// Scan all records and keep those matching `query`
    pub fn scan(&self, query: &AccessQuery) -> Result<Vec<Document>> {
        let out = self.read(|d, tx| {
            let mut r = Vec::new();
            for item in d.iter(tx).map_err(err)? {
                let (_, record) = item.map_err(err)?;
                let doc = Document::from_record(record, self.schema.clone())?;
                if query.matches(crate::object::Object::access_list(&doc)) {
                    r.push(doc);
                }
            }
            Ok(r)
        })?;
        trace!(clauses = query.len(), matched = out.len(), "access query");
        Ok(out)
    }

    pub fn len(&self) -> Result<u64> {
        self.read(|d, tx| d.len(tx).map_err(err))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Remove every document (for testing)
    pub fn clear(&self) -> Result<()> {
        self.write(|d, tx| d.clear(tx).map_err(err))
    }

    /// Run `f` on tokio's blocking pool with a handle to this store
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(LmdbStore) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || f(store)).await.map_err(err)?
    }
}

/// LMDB transactions block, so the async surface runs them on tokio's
/// blocking pool. Requires a tokio runtime.
impl DocumentStore for LmdbStore {
    async fn get(&self, id: &str) -> Result<Option<Document>> {
        let id = id.to_string();
        self.blocking(move |store| store.load(&id)).await
    }

    async fn save(&self, doc: &mut Document) -> Result<bool> {
        if !doc.is_dirty() {
            return Ok(false);
        }
        let record = doc.to_record()?;
        let id = doc.id().to_string();
        self.blocking(move |store| store.put_record(&id, &record)).await?;
        doc.clear_dirty();
        Ok(true)
    }

    async fn find(&self, query: &AccessQuery) -> Result<Vec<Document>> {
        let query = query.clone();
        self.blocking(move |store| store.scan(&query)).await
    }
}
