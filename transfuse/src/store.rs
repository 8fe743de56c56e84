//! Persistent style store
//!
//! Inline markup stripped out of the interim text is catalogued here as
//! `(kind, open, close)` triples under short content-addressed ids, so
//! injection can recover the exact original fragments. The store lives in
//! the project directory as `state.sqlite3`; one extract or inject call
//! wraps all of its writes in a single transaction.

use crate::error::TransfuseError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use xxhash_rust::xxh32::xxh32;

/// Short url-safe digest of a catalogued value.
pub fn short_hash(value: &str) -> String {
    URL_SAFE_NO_PAD.encode(xxh32(value.as_bytes(), 0).to_be_bytes())
}

/// Durable mapping between style ids and markup pairs.
pub struct StyleStore {
    conn: Connection,
}

impl StyleStore {
    /// Opens (creating if needed) the store at `path`.
    pub fn open(path: &Path) -> Result<StyleStore, TransfuseError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// An in-memory store, for tests and dry runs.
    pub fn open_in_memory() -> Result<StyleStore, TransfuseError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<StyleStore, TransfuseError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS styles (
                kind TEXT NOT NULL,
                id   TEXT NOT NULL,
                otag TEXT NOT NULL,
                ctag TEXT NOT NULL,
                PRIMARY KEY (kind, id)
            );
            CREATE TABLE IF NOT EXISTS meta (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(StyleStore { conn })
    }

    /// Starts the per-call transaction.
    pub fn begin(&mut self) -> Result<(), TransfuseError> {
        self.conn.execute_batch("BEGIN")?;
        Ok(())
    }

    /// Commits the per-call transaction.
    pub fn commit(&mut self) -> Result<(), TransfuseError> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    /// Catalogues a markup pair and returns its id.
    ///
    /// Content-addressed: putting an identical `(kind, open, close)`
    /// triple again returns the id minted the first time. The id is the
    /// 1-based insertion index joined with a base64url XXH32 digest of
    /// the triple, which keeps ids stable across runs over the same
    /// document.
    pub fn style_put(
        &mut self,
        kind: &str,
        otag: &str,
        ctag: &str,
    ) -> Result<String, TransfuseError> {
        let existing: Option<String> = self
            .conn
            .query_row(
                "SELECT id FROM styles WHERE kind = ?1 AND otag = ?2 AND ctag = ?3",
                (kind, otag, ctag),
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }

        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM styles", (), |row| row.get(0))?;
        let id = format!(
            "{}-{}",
            count + 1,
            short_hash(&format!("{kind}|{otag}|{ctag}"))
        );
        self.conn.execute(
            "INSERT INTO styles (kind, id, otag, ctag) VALUES (?1, ?2, ?3, ?4)",
            (kind, &id, otag, ctag),
        )?;
        Ok(id)
    }

    /// Looks up a markup pair. Absent entries yield two empty strings;
    /// the caller decides whether that is worth a warning.
    pub fn style_get(&self, kind: &str, id: &str) -> Result<(String, String), TransfuseError> {
        let pair: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT otag, ctag FROM styles WHERE kind = ?1 AND id = ?2",
                (kind, id),
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        Ok(pair.unwrap_or_default())
    }

    /// Records the source document's format name at extraction time.
    pub fn set_format(&mut self, format: &str) -> Result<(), TransfuseError> {
        self.conn.execute(
            "INSERT INTO meta (key, value) VALUES ('format', ?1)
             ON CONFLICT(key) DO UPDATE SET value = ?1",
            (format,),
        )?;
        Ok(())
    }

    /// The format name recorded at extraction time, if any.
    pub fn format(&self) -> Result<String, TransfuseError> {
        let value: Option<String> = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = 'format'", (), |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_is_content_addressed() {
        let mut store = StyleStore::open_in_memory().unwrap();
        let a = store.style_put("b", "<b>", "</b>").unwrap();
        let b = store.style_put("b", "<b>", "</b>").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_triples_get_distinct_ids() {
        let mut store = StyleStore::open_in_memory().unwrap();
        let a = store.style_put("b", "<b>", "</b>").unwrap();
        let b = store.style_put("i", "<i>", "</i>").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn ids_are_short_and_url_safe() {
        let mut store = StyleStore::open_in_memory().unwrap();
        let id = store.style_put("span", "<span class=\"x\">", "</span>").unwrap();
        assert!(id.len() <= 16);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert!(!id.contains(':'));
    }

    #[test]
    fn get_round_trips_and_missing_is_empty() {
        let mut store = StyleStore::open_in_memory().unwrap();
        let id = store.style_put("b", "<b>", "</b>").unwrap();
        assert_eq!(
            store.style_get("b", &id).unwrap(),
            ("<b>".to_string(), "</b>".to_string())
        );
        assert_eq!(
            store.style_get("b", "0-zzzzzz").unwrap(),
            (String::new(), String::new())
        );
    }

    #[test]
    fn format_is_recorded() {
        let mut store = StyleStore::open_in_memory().unwrap();
        assert_eq!(store.format().unwrap(), "");
        store.set_format("html").unwrap();
        assert_eq!(store.format().unwrap(), "html");
    }

    #[test]
    fn transaction_wraps_writes() {
        let mut store = StyleStore::open_in_memory().unwrap();
        store.begin().unwrap();
        let id = store.style_put("b", "<b>", "</b>").unwrap();
        store.commit().unwrap();
        assert_eq!(store.style_get("b", &id).unwrap().0, "<b>");
    }
}
