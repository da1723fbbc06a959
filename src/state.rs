use crate::config::{STATE_FILE_NAME, get_app_data_prefix};
use crate::models::LibraryItem;
use crate::position::KeyValueStore;
use chrono::Utc;
use eyre::Result;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

/// The durable tier: a small sqlite database holding key/value records and
/// the reading history.
pub struct State {
    conn: Connection,
}

impl State {
    pub fn new() -> Result<Self> {
        let prefix = get_app_data_prefix()?;
        Self::open(&prefix.join(STATE_FILE_NAME))
    }

    pub fn open(filepath: &Path) -> Result<Self> {
        if let Some(parent) = filepath.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(filepath)?;
        // Tables are created only if missing, so this also runs on existing databases.
        Self::init_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_db(&conn)?;
        Ok(Self { conn })
    }

    fn init_db(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at DATETIME DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS library (
                last_read DATETIME DEFAULT (datetime('now')),
                context TEXT PRIMARY KEY,
                title TEXT,
                offset INTEGER DEFAULT 0
            );
            ",
        )?;
        Ok(())
    }

    pub fn get_from_history(&self) -> Result<Vec<LibraryItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT last_read, context, title, offset FROM library ORDER BY last_read DESC",
        )?;

        let library_items_iter = stmt.query_map([], |row| {
            Ok(LibraryItem {
                last_read: row.get(0)?,
                context: row.get(1)?,
                title: row.get(2)?,
                offset: row.get(3)?,
            })
        })?;

        let mut library_items = Vec::new();
        for item_result in library_items_iter {
            library_items.push(item_result?);
        }
        Ok(library_items)
    }

    pub fn update_library(&self, context: &str, title: Option<&str>, offset: u32) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO library (last_read, context, title, offset) VALUES (?, ?, ?, ?)",
            params![Utc::now(), context, title, offset],
        )?;
        Ok(())
    }
}

impl KeyValueStore for State {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key=?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?, ?, datetime('now'))",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv_store WHERE key=?", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_state() -> (State, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let state = State::open(&temp_dir.path().join("test_states.db")).unwrap();
        (state, temp_dir)
    }

    #[test]
    fn test_state_database_initialization() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("test_init.db");
        assert!(!db_path.exists());
        let state = State::open(&db_path).unwrap();
        assert!(db_path.exists());

        let mut stmt = state.conn.prepare("PRAGMA table_info(library)").unwrap();
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get(1))
            .unwrap()
            .map(|r| r.unwrap())
            .collect();
        assert!(columns.contains(&"offset".to_string()));
    }

    #[test]
    fn test_key_value_records() {
        let (mut state, _temp_dir) = setup_test_state();
        assert_eq!(state.get("nr_pos_novel").unwrap(), None);

        state.set("nr_pos_novel", "450").unwrap();
        assert_eq!(state.get("nr_pos_novel").unwrap().as_deref(), Some("450"));

        state.set("nr_pos_novel", "900").unwrap();
        assert_eq!(state.get("nr_pos_novel").unwrap().as_deref(), Some("900"));

        state.remove("nr_pos_novel").unwrap();
        assert_eq!(state.get("nr_pos_novel").unwrap(), None);
    }

    #[test]
    fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("states.db");
        {
            let mut state = State::open(&db_path).unwrap();
            state.set("nr_theme", "dark").unwrap();
            state.update_library("novel", Some("九州"), 300).unwrap();
        }
        let state = State::open(&db_path).unwrap();
        assert_eq!(state.get("nr_theme").unwrap().as_deref(), Some("dark"));
        let history = state.get_from_history().unwrap();
        assert_eq!(history[0].context, "novel");
        assert_eq!(history[0].offset, 300);
    }

    #[test]
    fn test_get_from_history_empty() {
        let (state, _temp_dir) = setup_test_state();
        assert!(state.get_from_history().unwrap().is_empty());
    }

    #[test]
    fn test_library_management() {
        let (state, _temp_dir) = setup_test_state();

        state.update_library("novel", Some("九州"), 120).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));
        state.update_library("novel2", None, 0).unwrap();

        let history = state.get_from_history().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].context, "novel2");
        assert_eq!(history[0].title, None);
        assert_eq!(history[1].context, "novel");
        assert_eq!(history[1].title.as_deref(), Some("九州"));
        assert_eq!(history[1].offset, 120);
    }

    #[test]
    fn test_update_library_replace() {
        let (state, _temp_dir) = setup_test_state();
        state.update_library("novel", Some("九州"), 10).unwrap();
        state.update_library("novel", Some("九州"), 640).unwrap();

        let history = state.get_from_history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].offset, 640);
    }

    #[test]
    fn test_in_memory_state() {
        let mut state = State::in_memory().unwrap();
        state.set("nr_font", "20").unwrap();
        assert_eq!(state.get("nr_font").unwrap().as_deref(), Some("20"));
    }
}
