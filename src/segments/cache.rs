//! # Segment Cache
//!
//! SQLite-backed store of segment records fetched from the segment service.
//!
//! ## Tiers
//!
//! 1. **LRU cached**: recently used segments with decoded geometry
//! 2. **SQLite**: raw JSON, MessagePack-encoded geometry and fetch time
//!
//! Records are keyed by segment id and replaced on every store.

use std::num::NonZeroUsize;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, warn};
use lru::LruCache;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::segments::Segment;
use crate::GpsPoint;

/// Default number of segments kept decoded in memory.
pub const DEFAULT_MEMORY_CAPACITY: usize = 256;

/// A cached segment with its decoded geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedSegment {
    pub segment: Segment,
    /// Decoded geometry; empty when the stored polyline could not be decoded
    pub points: Vec<GpsPoint>,
    /// Unix seconds of the last fetch
    pub fetched_at: i64,
}

/// Segment cache with an in-memory LRU in front of SQLite.
pub struct SegmentCache {
    db: Connection,
    memory: LruCache<u64, CachedSegment>,
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

impl SegmentCache {
    /// Open (or create) a cache database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Connection::open(path.as_ref())?;
        Self::with_connection(db, DEFAULT_MEMORY_CAPACITY)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, DEFAULT_MEMORY_CAPACITY)
    }

    /// Wrap an open connection with an LRU tier of `capacity` entries (min 1).
    pub fn with_connection(db: Connection, capacity: usize) -> Result<Self> {
        Self::init_schema(&db)?;
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            db,
            memory: LruCache::new(capacity),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS segments (
                id INTEGER PRIMARY KEY,
                json TEXT NOT NULL,
                points BLOB,
                last_fetch INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    /// Look up a segment by id, memory tier first.
    pub fn lookup(&mut self, id: u64) -> Result<Option<CachedSegment>> {
        if let Some(hit) = self.memory.get(&id) {
            return Ok(Some(hit.clone()));
        }

        let row: Option<(String, Option<Vec<u8>>, i64)> = self
            .db
            .query_row(
                "SELECT json, points, last_fetch FROM segments WHERE id = ?",
                params![id as i64],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((json, blob, fetched_at)) = row else {
            debug!("[SegmentCache] Miss for segment {}", id);
            return Ok(None);
        };

        let segment: Segment = serde_json::from_str(&json)?;
        let points = match blob {
            Some(bytes) => rmp_serde::from_slice(&bytes)?,
            None => Vec::new(),
        };
        let cached = CachedSegment {
            segment,
            points,
            fetched_at,
        };
        self.memory.put(id, cached.clone());
        Ok(Some(cached))
    }

    /// Insert or replace a segment, stamped with the current time.
    pub fn store(&mut self, segment: &Segment) -> Result<CachedSegment> {
        self.store_at(segment, unix_now())
    }

    /// Insert or replace a segment with an explicit fetch time.
    pub fn store_at(&mut self, segment: &Segment, fetched_at: i64) -> Result<CachedSegment> {
        let points = match segment.geometry() {
            Ok(points) => Some(points),
            Err(e) => {
                warn!("[SegmentCache] Segment {} geometry not cached: {}", segment.id, e);
                None
            }
        };
        let blob = points.as_ref().map(rmp_serde::to_vec).transpose()?;
        let json = serde_json::to_string(segment)?;

        self.db.execute(
            "INSERT OR REPLACE INTO segments (id, json, points, last_fetch) VALUES (?, ?, ?, ?)",
            params![segment.id as i64, json, blob, fetched_at],
        )?;

        let cached = CachedSegment {
            segment: segment.clone(),
            points: points.unwrap_or_default(),
            fetched_at,
        };
        self.memory.put(segment.id, cached.clone());
        Ok(cached)
    }

    /// Remove a segment. Returns whether a row existed.
    pub fn remove(&mut self, id: u64) -> Result<bool> {
        self.memory.pop(&id);
        let deleted = self
            .db
            .execute("DELETE FROM segments WHERE id = ?", params![id as i64])?;
        Ok(deleted > 0)
    }

    /// Drop every cached segment.
    pub fn clear(&mut self) -> Result<()> {
        self.memory.clear();
        self.db.execute_batch("DELETE FROM segments;")?;
        Ok(())
    }

    /// Number of segments stored in SQLite.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM segments", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Unix time of the last fetch for a segment.
    pub fn fetched_at(&self, id: u64) -> Result<Option<i64>> {
        let value = self
            .db
            .query_row(
                "SELECT last_fetch FROM segments WHERE id = ?",
                params![id as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}
