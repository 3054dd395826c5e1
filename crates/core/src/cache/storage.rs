//! Cache generation and entry operations.
//!
//! Mirrors the browser Cache Storage surface the offline worker needs:
//! `open`, `keys`, `delete`, `put` and `match`, with one SQLite row per
//! stored request/response pair.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use crate::worker::{Request, Response, ResponseKind};

/// A stored request/response pair in one cache generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cache_name: String,
    pub request_key: String,
    pub url: String,
    pub method: String,
    pub response: Response,
    pub stored_at: String,
}

/// Raw column values, decoded outside the rusqlite row callback.
struct EntryRow {
    cache_name: String,
    request_key: String,
    url: String,
    method: String,
    status: u16,
    status_text: String,
    headers_json: String,
    response_kind: String,
    body: Vec<u8>,
    stored_at: String,
}

const ENTRY_COLUMNS: &str = "cache_name, request_key, url, method, status, status_text,
     headers_json, response_kind, body, stored_at";

impl EntryRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            cache_name: row.get(0)?,
            request_key: row.get(1)?,
            url: row.get(2)?,
            method: row.get(3)?,
            status: row.get(4)?,
            status_text: row.get(5)?,
            headers_json: row.get(6)?,
            response_kind: row.get(7)?,
            body: row.get(8)?,
            stored_at: row.get(9)?,
        })
    }

    fn into_entry(self) -> Result<CacheEntry, Error> {
        let headers: Vec<(String, String)> = serde_json::from_str(&self.headers_json)?;
        let kind: ResponseKind = self.response_kind.parse()?;
        Ok(CacheEntry {
            cache_name: self.cache_name,
            request_key: self.request_key,
            url: self.url.clone(),
            method: self.method,
            response: Response {
                status: self.status,
                status_text: self.status_text,
                headers,
                body: Bytes::from(self.body),
                kind,
                url: Some(self.url),
            },
            stored_at: self.stored_at,
        })
    }
}

impl CacheDb {
    /// Create the named cache generation if it does not exist yet.
    pub async fn open_cache(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO cache_names (name, created_at) VALUES (?1, ?2)",
                    params![name, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    pub async fn has_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_names WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// Names of every cache generation, in creation order.
    pub async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM cache_names ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a cache generation and all of its entries.
    ///
    /// Returns false if no generation had that name.
    pub async fn delete_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM cache_names WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Store `response` under `request` in the named generation.
    ///
    /// The generation is created on demand. An existing entry for the same
    /// request is replaced (last write wins).
    pub async fn put(&self, cache_name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let cache_name = cache_name.to_string();
        let key = compute_request_key(&request.method, &request.url);
        let url = request.url.as_str().to_string();
        let method = request.method.to_ascii_uppercase();
        let status = response.status;
        let status_text = response.status_text.clone();
        let headers_json = serde_json::to_string(&response.headers)?;
        let kind = response.kind.as_str();
        let body = response.body.to_vec();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO cache_names (name, created_at) VALUES (?1, ?2)",
                    params![cache_name, now],
                )?;
                tx.execute(
                    "INSERT INTO cache_entries (
                        cache_name, request_key, url, method, status, status_text,
                        headers_json, response_kind, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(cache_name, request_key) DO UPDATE SET
                        url = excluded.url,
                        method = excluded.method,
                        status = excluded.status,
                        status_text = excluded.status_text,
                        headers_json = excluded.headers_json,
                        response_kind = excluded.response_kind,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![cache_name, key, url, method, status, status_text, headers_json, kind, body, now],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up `request` in one generation.
    pub async fn match_in(&self, cache_name: &str, request: &Request) -> Result<Option<Response>, Error> {
        let cache_name = cache_name.to_string();
        let key = compute_request_key(&request.method, &request.url);
        let row = self
            .conn
            .call(move |conn| -> Result<Option<EntryRow>, Error> {
                let row = conn
                    .query_row(
                        &format!("SELECT {ENTRY_COLUMNS} FROM cache_entries WHERE cache_name = ?1 AND request_key = ?2"),
                        params![cache_name, key],
                        EntryRow::from_row,
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        row.map(|r| r.into_entry().map(|e| e.response)).transpose()
    }

    /// Look up `request` in each generation of `cache_names`, in order.
    ///
    /// Returns the first hit together with the generation it came from.
    pub async fn match_first(
        &self, cache_names: &[&str], request: &Request,
    ) -> Result<Option<(String, Response)>, Error> {
        for name in cache_names {
            if let Some(response) = self.match_in(name, request).await? {
                return Ok(Some((name.to_string(), response)));
            }
        }
        Ok(None)
    }

    /// Every entry of a generation, oldest first.
    pub async fn entries(&self, cache_name: &str) -> Result<Vec<CacheEntry>, Error> {
        let cache_name = cache_name.to_string();
        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<EntryRow>, Error> {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM cache_entries WHERE cache_name = ?1 ORDER BY stored_at ASC, url ASC"
                ))?;
                let rows = stmt
                    .query_map(params![cache_name], EntryRow::from_row)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)?;

        rows.into_iter().map(EntryRow::into_entry).collect()
    }

    pub async fn entry_count(&self, cache_name: &str) -> Result<u64, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE cache_name = ?1",
                    params![cache_name],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
