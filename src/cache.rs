// 🗄️ Response Cache - SQLite-backed HTTP response cache
//
// Key   = sha256 of the full outbound request (URL + sorted query params)
// Value = status + body
// TTL   = 1 hour by default; only HTTP 200 replies are stored
//
// The cache is an explicit value owned by the transport, never global state.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Default time-to-live for cached responses
pub fn default_ttl() -> Duration {
    Duration::hours(1)
}

/// Only replies with this status are ever cached
pub const CACHEABLE_STATUS: u16 = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub url: String,
    pub status: u16,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

pub struct ResponseCache {
    conn: Connection,
    ttl: Duration,
}

impl ResponseCache {
    /// Open (or create) a cache file on disk
    pub fn open(path: &Path, ttl: Duration) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open response cache {}", path.display()))?;

        // WAL so an aborted run never leaves the cache unreadable
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;

        Self::from_connection(conn, ttl)
    }

    /// Cache that lives only as long as this value (tests, --no-cache dry runs)
    pub fn in_memory(ttl: Duration) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, ttl)
    }

    fn from_connection(conn: Connection, ttl: Duration) -> Result<Self> {
        setup_cache(&conn)?;
        Ok(ResponseCache { conn, ttl })
    }

    /// Cache key for a request: order of `params` does not matter.
    /// Every part is length-prefixed so no value can spill into the next pair.
    pub fn key(url: &str, params: &[(String, String)]) -> String {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort();

        let mut hasher = Sha256::new();
        hasher.update(framed("GET"));
        hasher.update(framed(url));
        for (k, v) in sorted {
            hasher.update(framed(k));
            hasher.update(framed(v));
        }
        format!("{:x}", hasher.finalize())
    }

    /// Fresh entry for `key`, if any
    pub fn get(&self, key: &str) -> Result<Option<CachedResponse>> {
        self.get_at(key, Utc::now())
    }

    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Result<Option<CachedResponse>> {
        let row = self
            .conn
            .query_row(
                "SELECT url, status, body, created_at FROM responses WHERE cache_key = ?1",
                params![key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u16>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((url, status, body, created_at)) = row else {
            return Ok(None);
        };

        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .context("Corrupt created_at in response cache")?
            .with_timezone(&Utc);

        if now - created_at >= self.ttl {
            return Ok(None);
        }

        Ok(Some(CachedResponse {
            url,
            status,
            body,
            created_at,
        }))
    }

    /// Store a reply. Returns false (and stores nothing) for non-200 replies.
    pub fn put(&self, key: &str, url: &str, status: u16, body: &str) -> Result<bool> {
        self.put_at(key, url, status, body, Utc::now())
    }

    pub fn put_at(
        &self,
        key: &str,
        url: &str,
        status: u16,
        body: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if status != CACHEABLE_STATUS {
            return Ok(false);
        }

        self.conn.execute(
            "INSERT OR REPLACE INTO responses (cache_key, url, status, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![key, url, status, body, timestamp(now)],
        )?;

        Ok(true)
    }

    /// Drop every entry older than the TTL, returns how many were removed
    pub fn purge_expired(&self) -> Result<usize> {
        let cutoff = Utc::now() - self.ttl;
        let removed = self.conn.execute(
            "DELETE FROM responses WHERE created_at <= ?1",
            params![timestamp(cutoff)],
        )?;
        Ok(removed)
    }

    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn framed(part: &str) -> String {
    format!("{}:{}", part.len(), part)
}

// Fixed-width so timestamps compare correctly as text in SQL
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn setup_cache(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS responses (
            cache_key TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            status INTEGER NOT NULL,
            body TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_responses_created_at ON responses(created_at)",
        [],
    )?;

    Ok(())
}
