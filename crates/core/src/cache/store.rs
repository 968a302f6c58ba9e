//! SQLite implementation of [`CacheBackend`].
//!
//! Stores live in the `stores` table, entries in `entries`. Deleting a store
//! cascades to its entries. Entry order is the autoincrement `seq`, which a
//! put always advances, so a replaced key counts as newly added.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

use super::backend::CacheBackend;
use super::connection::CacheDb;
use super::entry::{CacheEntry, Headers, RequestKey};
use crate::Error;
use crate::error::StoreErrorKind;

fn decode_headers(json: &str) -> Result<Headers, Error> {
    serde_json::from_str(json).map_err(|e| Error::Store {
        kind: StoreErrorKind::ReadFailed,
        message: format!("corrupt headers: {e}"),
    })
}

fn decode_stored_at(millis: i64) -> Result<DateTime<Utc>, Error> {
    DateTime::from_timestamp_millis(millis).ok_or_else(|| Error::Store {
        kind: StoreErrorKind::ReadFailed,
        message: format!("stored_at out of range: {millis}"),
    })
}

#[async_trait::async_trait]
impl CacheBackend for CacheDb {
    async fn create_store(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let created_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO stores (name, created_at) VALUES (?1, ?2)",
                    params![name, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(|e| Error::from(e).into_store(StoreErrorKind::WriteFailed))
    }

    async fn get(&self, store: &str, key: &RequestKey) -> Result<Option<CacheEntry>, Error> {
        let store = store.to_string();
        let key_hash = key.hash();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<(String, String, u16, String, Vec<u8>, i64)>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT method, url, status, headers_json, body, stored_at_ms
                     FROM entries WHERE store = ?1 AND key_hash = ?2",
                )?;

                let row = stmt
                    .query_row(params![store, key_hash], |row| {
                        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?, row.get(5)?))
                    })
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(|e| Error::from(e).into_store(StoreErrorKind::ReadFailed))?;

        let Some((method, url, status, headers_json, body, stored_at_ms)) = row else {
            return Ok(None);
        };

        Ok(Some(CacheEntry {
            key: RequestKey { method, url },
            status,
            headers: decode_headers(&headers_json)?,
            body: Bytes::from(body),
            stored_at: decode_stored_at(stored_at_ms)?,
        }))
    }

    async fn put(&self, store: &str, entry: &CacheEntry) -> Result<(), Error> {
        let store = store.to_string();
        let key_hash = entry.key.hash();
        let method = entry.key.method.clone();
        let url = entry.key.url.clone();
        let status = entry.status;
        let headers_json = serde_json::to_string(&entry.headers).map_err(|e| Error::Store {
            kind: StoreErrorKind::WriteFailed,
            message: format!("failed to encode headers: {e}"),
        })?;
        let body = entry.body.to_vec();
        let stored_at_ms = entry.stored_at.timestamp_millis();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM entries WHERE store = ?1 AND key_hash = ?2",
                    params![store, key_hash],
                )?;
                tx.execute(
                    "INSERT INTO entries (store, key_hash, method, url, status, headers_json, body, stored_at_ms)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![store, key_hash, method, url, status, headers_json, body, stored_at_ms],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(|e| Error::from(e).into_store(StoreErrorKind::WriteFailed))
    }

    async fn delete(&self, store: &str, key: &RequestKey) -> Result<bool, Error> {
        let store = store.to_string();
        let key_hash = key.hash();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM entries WHERE store = ?1 AND key_hash = ?2",
                    params![store, key_hash],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(|e| Error::from(e).into_store(StoreErrorKind::WriteFailed))
    }

    async fn list_keys(&self, store: &str) -> Result<Vec<RequestKey>, Error> {
        let store = store.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<RequestKey>, Error> {
                let mut stmt = conn.prepare("SELECT method, url FROM entries WHERE store = ?1 ORDER BY seq ASC")?;
                let keys = stmt
                    .query_map(params![store], |row| Ok(RequestKey { method: row.get(0)?, url: row.get(1)? }))?
                    .collect::<Result<Vec<_>, rusqlite::Error>>()?;
                Ok(keys)
            })
            .await
            .map_err(|e| Error::from(e).into_store(StoreErrorKind::ReadFailed))
    }

    async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM stores WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(|e| Error::from(e).into_store(StoreErrorKind::WriteFailed))
    }

    async fn list_store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY name ASC")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, rusqlite::Error>>()?;
                Ok(names)
            })
            .await
            .map_err(|e| Error::from(e).into_store(StoreErrorKind::ReadFailed))
    }
}
