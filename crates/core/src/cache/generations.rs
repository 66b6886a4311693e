//! Store generation bookkeeping.
//!
//! A generation is one versioned population of the store. Rows move through
//! `installing -> waiting -> active`; a superseded generation is deleted
//! outright and its snapshots go with it.

use super::connection::CacheDb;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};

/// Persisted state of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GenerationState {
    /// Created, assets not yet stored.
    Installing,
    /// Fully populated, not yet current.
    Waiting,
    /// The current generation.
    Active,
}

impl GenerationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Installing => "installing",
            Self::Waiting => "waiting",
            Self::Active => "active",
        }
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "installing" => Ok(Self::Installing),
            "waiting" => Ok(Self::Waiting),
            "active" => Ok(Self::Active),
            other => Err(Error::InvalidInput(format!("unknown generation state: {other}"))),
        }
    }
}

/// A generation row.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct GenerationInfo {
    pub label: String,
    pub state: GenerationState,
    pub created_at: String,
    pub activated_at: Option<String>,
    pub snapshot_count: u64,
}

fn read_state(raw: String) -> rusqlite::Result<GenerationState> {
    raw.parse().map_err(|e: Error| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, e.to_string().into())
    })
}

impl CacheDb {
    /// Create a generation in the `installing` state.
    ///
    /// Fails if the label already exists.
    pub async fn create_generation(&self, label: &str) -> Result<(), Error> {
        let label = label.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO generations (label, state, created_at) VALUES (?1, 'installing', ?2)",
                    params![label, now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Move an `installing` generation to `waiting`.
    pub async fn mark_generation_waiting(&self, label: &str) -> Result<(), Error> {
        let label = label.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let updated = conn.execute(
                    "UPDATE generations SET state = 'waiting' WHERE label = ?1 AND state = 'installing'",
                    params![label],
                )?;
                if updated == 0 {
                    return Err(Error::InvalidTransition(format!("generation {label} is not installing")));
                }
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Make `label` the single active generation.
    ///
    /// Any previously active generation is demoted to `waiting` in the same
    /// transaction; evicting it is the caller's job.
    pub async fn activate_generation(&self, label: &str) -> Result<(), Error> {
        let label = label.to_string();
        let now = chrono::Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                let state: Option<String> = tx
                    .query_row("SELECT state FROM generations WHERE label = ?1", params![label], |row| row.get(0))
                    .optional()?;
                match state.as_deref() {
                    None => return Err(Error::StoreMiss(format!("generation {label}"))),
                    Some("installing") => {
                        return Err(Error::InvalidTransition(format!("generation {label} is still installing")));
                    }
                    Some(_) => {}
                }
                tx.execute(
                    "UPDATE generations SET state = 'waiting' WHERE state = 'active' AND label != ?1",
                    params![label],
                )?;
                tx.execute(
                    "UPDATE generations SET state = 'active', activated_at = COALESCE(activated_at, ?2)
                     WHERE label = ?1",
                    params![label, now],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Label of the active generation, if any.
    pub async fn current_generation(&self) -> Result<Option<String>, Error> {
        self.conn
            .call(|conn| -> Result<Option<String>, Error> {
                let label = conn
                    .query_row("SELECT label FROM generations WHERE state = 'active'", [], |row| row.get(0))
                    .optional()?;
                Ok(label)
            })
            .await
            .map_err(Error::from)
    }

    /// State of a generation, or None if the label is unknown.
    pub async fn generation_state(&self, label: &str) -> Result<Option<GenerationState>, Error> {
        let label = label.to_string();
        self.conn
            .call(move |conn| -> Result<Option<GenerationState>, Error> {
                let state = conn
                    .query_row("SELECT state FROM generations WHERE label = ?1", params![label], |row| {
                        read_state(row.get(0)?)
                    })
                    .optional()?;
                Ok(state)
            })
            .await
            .map_err(Error::from)
    }

    /// All generation labels, oldest first.
    pub async fn list_generations(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT label FROM generations ORDER BY created_at, label")?;
                let labels = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(labels)
            })
            .await
            .map_err(Error::from)
    }

    /// All generations with their state and snapshot counts, oldest first.
    pub async fn describe_generations(&self) -> Result<Vec<GenerationInfo>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<GenerationInfo>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT g.label, g.state, g.created_at, g.activated_at,
                        (SELECT COUNT(*) FROM snapshots s WHERE s.generation = g.label)
                     FROM generations g ORDER BY g.created_at, g.label",
                )?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok(GenerationInfo {
                            label: row.get(0)?,
                            state: read_state(row.get(1)?)?,
                            created_at: row.get(2)?,
                            activated_at: row.get(3)?,
                            snapshot_count: row.get::<_, i64>(4)? as u64,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and every snapshot it owns.
    ///
    /// Returns false if the label did not exist.
    pub async fn delete_generation(&self, label: &str) -> Result<bool, Error> {
        let label = label.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM generations WHERE label = ?1", params![label])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn waiting(db: &CacheDb, label: &str) {
        db.create_generation(label).await.unwrap();
        db.mark_generation_waiting(label).await.unwrap();
    }

    #[test]
    fn test_state_round_trip() {
        for state in [GenerationState::Installing, GenerationState::Waiting, GenerationState::Active] {
            assert_eq!(state.as_str().parse::<GenerationState>().unwrap(), state);
        }
        assert!("superseded".parse::<GenerationState>().is_err());
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.create_generation("v1").await.unwrap();

        assert_eq!(db.list_generations().await.unwrap(), vec!["v1".to_string()]);
        assert_eq!(db.generation_state("v1").await.unwrap(), Some(GenerationState::Installing));
        assert_eq!(db.generation_state("v2").await.unwrap(), None);
        assert!(db.current_generation().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_duplicate_fails() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.create_generation("v1").await.unwrap();
        assert!(db.create_generation("v1").await.is_err());
    }

    #[tokio::test]
    async fn test_activate_requires_populated_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.create_generation("v1").await.unwrap();

        let err = db.activate_generation("v1").await.unwrap_err();
        assert!(matches!(err, Error::InvalidTransition(_)));

        let err = db.activate_generation("missing").await.unwrap_err();
        assert!(matches!(err, Error::StoreMiss(_)));
    }

    #[tokio::test]
    async fn test_activate_demotes_previous() {
        let db = CacheDb::open_in_memory().await.unwrap();
        waiting(&db, "v1").await;
        db.activate_generation("v1").await.unwrap();
        waiting(&db, "v2").await;
        db.activate_generation("v2").await.unwrap();

        assert_eq!(db.current_generation().await.unwrap(), Some("v2".to_string()));
        assert_eq!(db.generation_state("v1").await.unwrap(), Some(GenerationState::Waiting));
    }

    #[tokio::test]
    async fn test_activate_twice_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        waiting(&db, "v1").await;
        db.activate_generation("v1").await.unwrap();
        db.activate_generation("v1").await.unwrap();
        assert_eq!(db.current_generation().await.unwrap(), Some("v1".to_string()));
    }

    #[tokio::test]
    async fn test_delete_generation() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.create_generation("v1").await.unwrap();

        assert!(db.delete_generation("v1").await.unwrap());
        assert!(!db.delete_generation("v1").await.unwrap());
        assert!(db.list_generations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_describe_generations() {
        let db = CacheDb::open_in_memory().await.unwrap();
        waiting(&db, "v1").await;
        db.activate_generation("v1").await.unwrap();

        let info = db.describe_generations().await.unwrap();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].label, "v1");
        assert_eq!(info[0].state, GenerationState::Active);
        assert!(info[0].activated_at.is_some());
        assert_eq!(info[0].snapshot_count, 0);
    }
}
