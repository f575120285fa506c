//! SQLite-backed catalog store.
//!
//! Holds records, their statistics, users and the category taxonomy, plus an
//! FTS5 projection of display names kept in sync by triggers.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::SearchError;
use crate::record::{Record, RecordSource, Statistics, TorrentFlags, UserId};
use crate::taxonomy::{MainCategory, SubCategory, Taxonomy, TaxonomySource};
use crate::viewer::{UserDirectory, UserIdentity, UserLevel};

/// Columns selected for a [`Record`], in the order [`SqliteStore::row_to_record`] reads them.
pub(crate) const RECORD_COLUMNS: &str = "t.id, t.info_hash, t.display_name, t.uploader_id, \
     t.filesize, t.created_time, t.main_category_id, t.sub_category_id, t.flags, \
     COALESCE(s.seed_count, 0), COALESCE(s.leech_count, 0), COALESCE(s.download_count, 0)";

/// SQLite-backed catalog store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database file and its tables.
    pub fn new(path: &Path) -> Result<Self, SearchError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, SearchError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), SearchError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                level INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS main_categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sub_categories (
                main_category_id INTEGER NOT NULL REFERENCES main_categories(id),
                id INTEGER NOT NULL,
                name TEXT NOT NULL,
                PRIMARY KEY (main_category_id, id)
            );

            CREATE TABLE IF NOT EXISTS torrents (
                id INTEGER PRIMARY KEY,
                info_hash TEXT NOT NULL,
                display_name TEXT NOT NULL,
                uploader_id INTEGER REFERENCES users(id),
                filesize INTEGER NOT NULL DEFAULT 0,
                created_time TEXT NOT NULL,
                main_category_id INTEGER NOT NULL,
                sub_category_id INTEGER NOT NULL,
                flags INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_torrents_uploader ON torrents(uploader_id);
            CREATE INDEX IF NOT EXISTS idx_torrents_category ON torrents(main_category_id, sub_category_id);
            CREATE INDEX IF NOT EXISTS idx_torrents_filesize ON torrents(filesize);

            CREATE TABLE IF NOT EXISTS statistics (
                torrent_id INTEGER PRIMARY KEY REFERENCES torrents(id) ON DELETE CASCADE,
                seed_count INTEGER NOT NULL DEFAULT 0,
                leech_count INTEGER NOT NULL DEFAULT 0,
                download_count INTEGER NOT NULL DEFAULT 0
            );

            -- Full-text projection of display names
            CREATE VIRTUAL TABLE IF NOT EXISTS torrents_fts USING fts5(
                display_name,
                content='torrents',
                content_rowid='id'
            );

            CREATE TRIGGER IF NOT EXISTS torrents_fts_insert AFTER INSERT ON torrents BEGIN
                INSERT INTO torrents_fts(rowid, display_name) VALUES (new.id, new.display_name);
            END;

            CREATE TRIGGER IF NOT EXISTS torrents_fts_delete AFTER DELETE ON torrents BEGIN
                INSERT INTO torrents_fts(torrents_fts, rowid, display_name)
                    VALUES ('delete', old.id, old.display_name);
            END;

            CREATE TRIGGER IF NOT EXISTS torrents_fts_update AFTER UPDATE OF display_name ON torrents BEGIN
                INSERT INTO torrents_fts(torrents_fts, rowid, display_name)
                    VALUES ('delete', old.id, old.display_name);
                INSERT INTO torrents_fts(rowid, display_name) VALUES (new.id, new.display_name);
            END;
            "#,
        )?;

        Ok(())
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>, SearchError> {
        self.conn
            .lock()
            .map_err(|_| SearchError::Internal("store lock poisoned".to_string()))
    }

    pub(crate) fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<Record> {
        let created_at: String = row.get(5)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
            })?;
        let filesize: i64 = row.get(4)?;
        let flags: u32 = row.get(8)?;

        Ok(Record {
            id: row.get(0)?,
            info_hash: row.get(1)?,
            display_name: row.get(2)?,
            uploader: row.get(3)?,
            filesize: filesize.max(0) as u64,
            created_at,
            main_category_id: row.get(6)?,
            sub_category_id: row.get(7)?,
            flags: TorrentFlags::from_bits_truncate(flags),
            stats: Statistics {
                seed_count: row.get(9)?,
                leech_count: row.get(10)?,
                download_count: row.get(11)?,
            },
        })
    }

    /// Look up a single record regardless of its flags.
    pub fn record(&self, id: i64) -> Result<Option<Record>, SearchError> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM torrents t LEFT JOIN statistics s ON s.torrent_id = t.id WHERE t.id = ?",
            RECORD_COLUMNS
        );
        let record = conn
            .query_row(&sql, params![id], Self::row_to_record)
            .optional()?;
        Ok(record)
    }

    pub fn insert_user(&self, user: &UserIdentity) -> Result<(), SearchError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO users (id, username, level) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET username = excluded.username, level = excluded.level",
            params![user.id, user.username, user.level.to_stored()],
        )?;
        Ok(())
    }

    /// Insert a main category with its sub-categories, replacing any existing one.
    pub fn insert_category(&self, main: &MainCategory) -> Result<(), SearchError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO main_categories (id, name) VALUES (?, ?)",
            params![main.id, main.name],
        )?;
        tx.execute(
            "DELETE FROM sub_categories WHERE main_category_id = ?",
            params![main.id],
        )?;
        for sub in &main.sub_categories {
            tx.execute(
                "INSERT INTO sub_categories (main_category_id, id, name) VALUES (?, ?, ?)",
                params![main.id, sub.id, sub.name],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Insert or replace a record together with its statistics row.
    pub fn insert_record(&self, record: &Record) -> Result<(), SearchError> {
        let filesize = i64::try_from(record.filesize)
            .map_err(|_| SearchError::InvalidParameter(format!("filesize {}", record.filesize)))?;

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM torrents WHERE id = ?", params![record.id])?;
        tx.execute(
            "INSERT INTO torrents (id, info_hash, display_name, uploader_id, filesize,
                                   created_time, main_category_id, sub_category_id, flags)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.id,
                record.info_hash,
                record.display_name,
                record.uploader,
                filesize,
                record.created_at.to_rfc3339(),
                record.main_category_id,
                record.sub_category_id,
                record.flags.bits(),
            ],
        )?;
        tx.execute(
            "INSERT OR REPLACE INTO statistics (torrent_id, seed_count, leech_count, download_count)
             VALUES (?, ?, ?, ?)",
            params![
                record.id,
                record.stats.seed_count,
                record.stats.leech_count,
                record.stats.download_count,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    /// Replace the statistics aggregate of an existing record.
    pub fn update_statistics(&self, id: i64, stats: Statistics) -> Result<(), SearchError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO statistics (torrent_id, seed_count, leech_count, download_count)
             VALUES (?, ?, ?, ?)",
            params![id, stats.seed_count, stats.leech_count, stats.download_count],
        )?;
        Ok(())
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<UserIdentity> {
        let level: i64 = row.get(2)?;
        Ok(UserIdentity {
            id: row.get(0)?,
            username: row.get(1)?,
            level: UserLevel::from_stored(level),
        })
    }
}

impl RecordSource for SqliteStore {
    fn record_by_id(&self, id: i64) -> Result<Option<Record>, SearchError> {
        self.record(id)
    }
}

impl UserDirectory for SqliteStore {
    fn by_username(&self, username: &str) -> Result<Option<UserIdentity>, SearchError> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, username, level FROM users WHERE username = ?",
                params![username],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    fn by_id(&self, id: UserId) -> Result<Option<UserIdentity>, SearchError> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT id, username, level FROM users WHERE id = ?",
                params![id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }
}

impl TaxonomySource for SqliteStore {
    fn load_taxonomy(&self) -> Result<Taxonomy, SearchError> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare("SELECT id, name FROM main_categories ORDER BY id")?;
        let mut mains = stmt
            .query_map([], |row| {
                Ok(MainCategory {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    sub_categories: Vec::new(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT main_category_id, id, name FROM sub_categories ORDER BY main_category_id, id",
        )?;
        let subs = stmt.query_map([], |row| {
            Ok((
                row.get::<_, u32>(0)?,
                SubCategory {
                    id: row.get(1)?,
                    name: row.get(2)?,
                },
            ))
        })?;
        for sub in subs {
            let (main_id, sub) = sub?;
            if let Some(main) = mains.iter_mut().find(|m| m.id == main_id) {
                main.sub_categories.push(sub);
            }
        }

        Ok(Taxonomy::new(mains))
    }
}
