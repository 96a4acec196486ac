pub mod group_chat;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod read_status;
pub mod rooms;

pub use messages::PagedMessages;

use std::path::Path;
use std::sync::Mutex;

use agora_types::ChatError;
use rusqlite::Connection;
use tracing::info;

/// SQLite-backed chat store. The connection lives behind a mutex, so every
/// read-modify-write (sequence assignment, pointer advancement, read-marker
/// insertion) runs serialized per process; unique constraints backstop
/// multi-process races.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, ChatError> {
        let conn = Connection::open(path)?;
        Self::init(conn, &path.display().to_string())
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> Result<Self, ChatError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, ":memory:")
    }

    fn init(conn: Connection, label: &str) -> Result<Self, ChatError> {
        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        info!("Chat store opened at {}", label);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ChatError>
    where
        F: FnOnce(&Connection) -> Result<T, ChatError>,
    {
        let conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        f(&conn)
    }

    /// Mutable access, for operations that need an explicit transaction.
    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T, ChatError>
    where
        F: FnOnce(&mut Connection) -> Result<T, ChatError>,
    {
        let mut conn = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut conn)
    }
}
