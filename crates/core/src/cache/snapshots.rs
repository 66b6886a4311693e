//! Snapshot storage.
//!
//! A snapshot is an immutable capture of a live response, keyed by request
//! fingerprint inside one generation. Writes are UPSERTs, so the last writer
//! for a fingerprint wins.

use super::connection::CacheDb;
use super::hash::Fingerprint;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

/// A stored response snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct StoredSnapshot {
    pub fingerprint: Fingerprint,
    pub generation: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl StoredSnapshot {
    /// Value of the first header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn insert(conn: &rusqlite::Connection, snapshot: &StoredSnapshot) -> Result<(), Error> {
    let headers_json = serde_json::to_string(&snapshot.headers)?;
    conn.execute(
        "INSERT INTO snapshots (
            generation, fingerprint, method, url, status, headers_json, body, stored_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        ON CONFLICT(generation, fingerprint) DO UPDATE SET
            method = excluded.method,
            url = excluded.url,
            status = excluded.status,
            headers_json = excluded.headers_json,
            body = excluded.body,
            stored_at = excluded.stored_at",
        params![
            &snapshot.generation,
            snapshot.fingerprint.as_str(),
            &snapshot.method,
            &snapshot.url,
            snapshot.status,
            headers_json,
            &snapshot.body,
            &snapshot.stored_at,
        ],
    )?;
    Ok(())
}

impl CacheDb {
    /// Insert or replace a snapshot in its generation.
    ///
    /// Fails if the generation does not exist (it may have been evicted).
    pub async fn upsert_snapshot(&self, snapshot: &StoredSnapshot) -> Result<(), Error> {
        let snapshot = snapshot.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> { insert(conn, &snapshot) })
            .await
            .map_err(Error::from)
    }

    /// Write a batch of snapshots in one transaction.
    ///
    /// Either every snapshot is stored or none is.
    pub async fn upsert_snapshots(&self, snapshots: &[StoredSnapshot]) -> Result<(), Error> {
        let snapshots = snapshots.to_vec();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                for snapshot in &snapshots {
                    insert(&tx, snapshot)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Get a snapshot by generation and fingerprint.
    ///
    /// Returns None if no snapshot is stored.
    pub async fn get_snapshot(&self, generation: &str, fingerprint: &Fingerprint) -> Result<Option<StoredSnapshot>, Error> {
        let generation = generation.to_string();
        let fingerprint = fingerprint.clone();
        self.conn
            .call(move |conn| -> Result<Option<StoredSnapshot>, Error> {
                let row = conn
                    .query_row(
                        "SELECT method, url, status, headers_json, body, stored_at
                         FROM snapshots WHERE generation = ?1 AND fingerprint = ?2",
                        params![generation, fingerprint.as_str()],
                        |row| {
                            Ok((
                                row.get::<_, String>(0)?,
                                row.get::<_, String>(1)?,
                                row.get::<_, u16>(2)?,
                                row.get::<_, String>(3)?,
                                row.get::<_, Vec<u8>>(4)?,
                                row.get::<_, String>(5)?,
                            ))
                        },
                    )
                    .optional()?;

                let Some((method, url, status, headers_json, body, stored_at)) = row else {
                    return Ok(None);
                };

                Ok(Some(StoredSnapshot {
                    fingerprint,
                    generation,
                    method,
                    url,
                    status,
                    headers: serde_json::from_str(&headers_json)?,
                    body,
                    stored_at,
                }))
            })
            .await
            .map_err(Error::from)
    }

    /// Number of snapshots held by a generation.
    pub async fn count_snapshots(&self, generation: &str) -> Result<u64, Error> {
        let generation = generation.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM snapshots WHERE generation = ?1", params![generation], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn make_test_snapshot(generation: &str, url: &str, body: &str) -> StoredSnapshot {
        StoredSnapshot {
            fingerprint: Fingerprint::compute("GET", url, &[]),
            generation: generation.to_string(),
            method: "GET".to_string(),
            url: url.to_string(),
            status: 200,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: body.as_bytes().to_vec(),
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    async fn db_with_generation(label: &str) -> CacheDb {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.create_generation(label).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = db_with_generation("v1").await;
        let snapshot = make_test_snapshot("v1", "https://example.com/", "<h1>hi</h1>");

        db.upsert_snapshot(&snapshot).await.unwrap();

        let retrieved = db.get_snapshot("v1", &snapshot.fingerprint).await.unwrap().unwrap();
        assert_eq!(retrieved, snapshot);
        assert_eq!(retrieved.header("Content-Type"), Some("text/html"));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let db = db_with_generation("v1").await;
        let fp = Fingerprint::compute("GET", "https://example.com/missing", &[]);
        assert!(db.get_snapshot("v1", &fp).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let db = db_with_generation("v1").await;
        let first = make_test_snapshot("v1", "https://example.com/app.js", "one");
        let second = make_test_snapshot("v1", "https://example.com/app.js", "two");

        db.upsert_snapshot(&first).await.unwrap();
        db.upsert_snapshot(&second).await.unwrap();

        let stored = db.get_snapshot("v1", &first.fingerprint).await.unwrap().unwrap();
        assert_eq!(stored.body, b"two");
        assert_eq!(db.count_snapshots("v1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_generations_are_isolated() {
        let db = db_with_generation("v1").await;
        db.create_generation("v2").await.unwrap();
        let snapshot = make_test_snapshot("v1", "https://example.com/", "v1 body");
        db.upsert_snapshot(&snapshot).await.unwrap();

        assert!(db.get_snapshot("v2", &snapshot.fingerprint).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_into_unknown_generation_fails() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let snapshot = make_test_snapshot("gone", "https://example.com/", "body");
        assert!(db.upsert_snapshot(&snapshot).await.is_err());
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let db = db_with_generation("v1").await;
        let batch = vec![
            make_test_snapshot("v1", "https://example.com/a.css", "a"),
            make_test_snapshot("missing", "https://example.com/b.css", "b"),
        ];

        assert!(db.upsert_snapshots(&batch).await.is_err());
        assert_eq!(db.count_snapshots("v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_generation_cascades() {
        let db = db_with_generation("v1").await;
        let snapshot = make_test_snapshot("v1", "https://example.com/", "body");
        db.upsert_snapshots(std::slice::from_ref(&snapshot)).await.unwrap();

        db.delete_generation("v1").await.unwrap();

        assert_eq!(db.count_snapshots("v1").await.unwrap(), 0);
        assert!(db.get_snapshot("v1", &snapshot.fingerprint).await.unwrap().is_none());
    }
}
