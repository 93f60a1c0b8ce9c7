//! Named store operations on the SQLite cache.

use async_trait::async_trait;
use http::StatusCode;
use tokio_rusqlite::{params, rusqlite};

use super::connection::CacheDb;
use super::{CacheStorage, StoreSummary};
use crate::Error;
use crate::model::{Request, Response, headers_from_json, headers_to_json};

/// An entry ready to be written, detached from the request/response types so
/// it can move onto the connection thread.
struct EntryRow {
    key: String,
    method: String,
    url: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
}

impl EntryRow {
    fn new(request: &Request, response: &Response) -> Result<Self, Error> {
        Ok(Self {
            key: request.cache_key(),
            method: request.method.to_string(),
            url: request.url.to_string(),
            status: response.status.as_u16(),
            status_text: response.status_text.clone(),
            headers_json: headers_to_json(&response.headers)?,
            body: response.body.to_vec(),
        })
    }
}

/// A stored entry as read back from the database.
struct StoredRow {
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
}

impl StoredRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self { status: row.get(0)?, status_text: row.get(1)?, headers_json: row.get(2)?, body: row.get(3)? })
    }

    fn into_response(self) -> Result<Response, Error> {
        let status = StatusCode::from_u16(self.status).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let headers = headers_from_json(&self.headers_json)?;
        Ok(Response { status, status_text: self.status_text, headers, body: self.body.into() })
    }
}

fn ensure_cache(conn: &rusqlite::Connection, name: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn upsert_entry(conn: &rusqlite::Connection, name: &str, row: &EntryRow, stored_at: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT INTO entries (
            cache_name, key, method, url, status, status_text, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(cache_name, key) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            status_text = excluded.status_text,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            name,
            &row.key,
            &row.method,
            &row.url,
            row.status,
            &row.status_text,
            &row.headers_json,
            &row.body,
            stored_at,
        ],
    )?;
    Ok(())
}

fn optional(result: rusqlite::Result<StoredRow>) -> Result<Option<StoredRow>, Error> {
    match result {
        Ok(row) => Ok(Some(row)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl CacheStorage for CacheDb {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> { ensure_cache(conn, &name) })
            .await
            .map_err(Error::from)
    }

    async fn has(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY rowid ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM entries WHERE cache_name = ?1", params![&name])?;
                let deleted = tx.execute("DELETE FROM caches WHERE name = ?1", params![&name])?;
                tx.commit()?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    async fn put(&self, name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let name = name.to_string();
        let row = EntryRow::new(request, response)?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let stored_at = chrono::Utc::now().to_rfc3339();
                let tx = conn.transaction()?;
                ensure_cache(&tx, &name)?;
                upsert_entry(&tx, &name, &row, &stored_at)?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn put_all(&self, name: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        let name = name.to_string();
        let rows = entries
            .iter()
            .map(|(request, response)| EntryRow::new(request, response))
            .collect::<Result<Vec<_>, _>>()?;
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let stored_at = chrono::Utc::now().to_rfc3339();
                let tx = conn.transaction()?;
                ensure_cache(&tx, &name)?;
                for row in &rows {
                    upsert_entry(&tx, &name, row, &stored_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    async fn match_in(&self, name: &str, request: &Request) -> Result<Option<Response>, Error> {
        let name = name.to_string();
        let key = request.cache_key();
        let stored = self
            .conn
            .call(move |conn| -> Result<Option<StoredRow>, Error> {
                optional(conn.query_row(
                    "SELECT status, status_text, headers_json, body
                     FROM entries WHERE cache_name = ?1 AND key = ?2",
                    params![name, key],
                    StoredRow::from_row,
                ))
            })
            .await
            .map_err(Error::from)?;

        stored.map(StoredRow::into_response).transpose()
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key = request.cache_key();
        let stored = self
            .conn
            .call(move |conn| -> Result<Option<StoredRow>, Error> {
                optional(conn.query_row(
                    "SELECT e.status, e.status_text, e.headers_json, e.body
                     FROM entries e JOIN caches c ON c.name = e.cache_name
                     WHERE e.key = ?1
                     ORDER BY c.rowid ASC LIMIT 1",
                    params![key],
                    StoredRow::from_row,
                ))
            })
            .await
            .map_err(Error::from)?;

        stored.map(StoredRow::into_response).transpose()
    }

    async fn entry_count(&self, name: &str) -> Result<u64, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE cache_name = ?1", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    async fn total_size(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let size: i64 =
                    conn.query_row("SELECT COALESCE(SUM(LENGTH(body)), 0) FROM entries", [], |row| row.get(0))?;
                Ok(size as u64)
            })
            .await
            .map_err(Error::from)
    }

    async fn summaries(&self) -> Result<Vec<StoreSummary>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<StoreSummary>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT c.name, COUNT(e.key), COALESCE(SUM(LENGTH(e.body)), 0)
                     FROM caches c LEFT JOIN entries e ON e.cache_name = c.name
                     GROUP BY c.name
                     ORDER BY MIN(c.rowid) ASC",
                )?;
                let summaries = stmt
                    .query_map([], |row| {
                        Ok(StoreSummary {
                            name: row.get(0)?,
                            entries: row.get::<_, i64>(1)? as u64,
                            bytes: row.get::<_, i64>(2)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(summaries)
            })
            .await
            .map_err(Error::from)
    }
}
