//! SQLite-backed user store.
//!
//! Two tables: platform tokens and the synced library weights. Sync
//! replaces a user's library rows inside one transaction so readers never
//! observe a half-written library.

use super::{PlatformToken, UserStore};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;
use tracing::info;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS platform_tokens (
    user_id TEXT PRIMARY KEY,
    access_token TEXT NOT NULL,
    refresh_token TEXT,
    expires_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS user_tracks (
    user_id TEXT NOT NULL,
    track_uri TEXT NOT NULL,
    weight REAL NOT NULL,
    PRIMARY KEY (user_id, track_uri)
);
CREATE INDEX IF NOT EXISTS idx_user_tracks_weight
    ON user_tracks (user_id, weight DESC);
";

pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<SqliteUserStore> {
        let conn = Connection::open(db_path.as_ref())
            .with_context(|| format!("Failed to open user database {:?}", db_path.as_ref()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize user database schema")?;
        info!("Opened user database at {:?}", db_path.as_ref());
        Ok(SqliteUserStore {
            conn: Mutex::new(conn),
        })
    }
}

impl UserStore for SqliteUserStore {
    fn get_platform_token(&self, user_id: &str) -> Result<Option<PlatformToken>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT user_id, access_token, refresh_token, expires_at
             FROM platform_tokens WHERE user_id = ?1",
        )?;
        let token = stmt
            .query_row(params![user_id], |row| {
                Ok(PlatformToken {
                    user_id: row.get(0)?,
                    access_token: row.get(1)?,
                    refresh_token: row.get(2)?,
                    expires_at: row.get(3)?,
                })
            })
            .map(Some)
            .or_else(|error| match error {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(other),
            })?;
        Ok(token)
    }

    fn upsert_platform_token(&self, token: &PlatformToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO platform_tokens (user_id, access_token, refresh_token, expires_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id) DO UPDATE SET
                 access_token = excluded.access_token,
                 refresh_token = excluded.refresh_token,
                 expires_at = excluded.expires_at",
            params![
                token.user_id,
                token.access_token,
                token.refresh_token,
                token.expires_at
            ],
        )?;
        Ok(())
    }

    fn replace_user_tracks(&self, user_id: &str, weights: &[(String, f64)]) -> Result<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM user_tracks WHERE user_id = ?1", params![user_id])?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO user_tracks (user_id, track_uri, weight) VALUES (?1, ?2, ?3)
                 ON CONFLICT (user_id, track_uri) DO UPDATE SET weight = excluded.weight",
            )?;
            for (uri, weight) in weights {
                stmt.execute(params![user_id, uri, weight])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn user_tracks(&self, user_id: &str, limit: usize) -> Result<Vec<(String, f64)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT track_uri, weight FROM user_tracks
             WHERE user_id = ?1 ORDER BY weight DESC, track_uri ASC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![user_id, limit as i64], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, SqliteUserStore) {
        let dir = TempDir::new().unwrap();
        let store = SqliteUserStore::new(dir.path().join("user.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_token_roundtrip_and_upsert() {
        let (_dir, store) = store();
        assert!(store.get_platform_token("u1").unwrap().is_none());

        let token = PlatformToken {
            user_id: "u1".to_string(),
            access_token: "access-1".to_string(),
            refresh_token: Some("refresh-1".to_string()),
            expires_at: 1_700_000_000,
        };
        store.upsert_platform_token(&token).unwrap();
        let loaded = store.get_platform_token("u1").unwrap().unwrap();
        assert_eq!(loaded.access_token, "access-1");

        let refreshed = PlatformToken {
            access_token: "access-2".to_string(),
            ..token
        };
        store.upsert_platform_token(&refreshed).unwrap();
        let loaded = store.get_platform_token("u1").unwrap().unwrap();
        assert_eq!(loaded.access_token, "access-2");
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh-1"));
    }

    #[test]
    fn test_replace_user_tracks_is_wholesale() {
        let (_dir, store) = store();
        store
            .replace_user_tracks(
                "u1",
                &[("uri:1".to_string(), 0.9), ("uri:2".to_string(), 0.5)],
            )
            .unwrap();
        store
            .replace_user_tracks("u1", &[("uri:3".to_string(), 0.7)])
            .unwrap();

        let tracks = store.user_tracks("u1", 10).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].0, "uri:3");
    }

    #[test]
    fn test_user_tracks_ordered_by_weight() {
        let (_dir, store) = store();
        store
            .replace_user_tracks(
                "u1",
                &[
                    ("uri:low".to_string(), 0.1),
                    ("uri:high".to_string(), 0.9),
                    ("uri:mid".to_string(), 0.5),
                ],
            )
            .unwrap();

        let tracks = store.user_tracks("u1", 2).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].0, "uri:high");
        assert_eq!(tracks[1].0, "uri:mid");
    }

    #[test]
    fn test_libraries_are_per_user() {
        let (_dir, store) = store();
        store
            .replace_user_tracks("u1", &[("uri:1".to_string(), 0.9)])
            .unwrap();
        store
            .replace_user_tracks("u2", &[("uri:2".to_string(), 0.9)])
            .unwrap();

        assert_eq!(store.user_tracks("u1", 10).unwrap().len(), 1);
        assert_eq!(store.user_tracks("u2", 10).unwrap()[0].0, "uri:2");
    }
}
