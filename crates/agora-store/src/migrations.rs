use agora_types::ChatError;
use rusqlite::Connection;
use tracing::info;

/// All timestamps are written by the creating operation as RFC 3339 text;
/// there are no SQL-side defaults, so timestamp semantics stay a contract
/// of the store API rather than of the schema.
pub fn run(conn: &Connection) -> Result<(), ChatError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS direct_chat_rooms (
            id            INTEGER PRIMARY KEY,
            user1_id      INTEGER NOT NULL,
            user2_id      INTEGER NOT NULL,
            created_time  TEXT NOT NULL,
            updated_time  TEXT NOT NULL,
            CHECK (user1_id < user2_id),
            UNIQUE (user1_id, user2_id)
        );

        CREATE TABLE IF NOT EXISTS direct_chat_messages (
            id            INTEGER PRIMARY KEY,
            room_id       INTEGER NOT NULL REFERENCES direct_chat_rooms(id),
            sender_id     INTEGER NOT NULL,
            seq           INTEGER NOT NULL,
            message_type  TEXT NOT NULL,
            body          TEXT,
            file_url      TEXT,
            file_name     TEXT,
            file_size     INTEGER,
            created_time  TEXT NOT NULL,
            UNIQUE (room_id, seq)
        );

        CREATE INDEX IF NOT EXISTS idx_direct_messages_room
            ON direct_chat_messages(room_id, seq);

        CREATE TABLE IF NOT EXISTS direct_chat_read_status (
            room_id         INTEGER NOT NULL REFERENCES direct_chat_rooms(id),
            user_id         INTEGER NOT NULL,
            last_read_seq   INTEGER,
            last_read_time  TEXT NOT NULL,
            PRIMARY KEY (room_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS group_chat_rooms (
            id          INTEGER PRIMARY KEY,
            group_id    INTEGER NOT NULL,
            name        TEXT NOT NULL,
            admin_only  INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_group_rooms_group
            ON group_chat_rooms(group_id);

        CREATE TABLE IF NOT EXISTS group_chat_messages (
            id            INTEGER PRIMARY KEY,
            room_id       INTEGER NOT NULL REFERENCES group_chat_rooms(id),
            sender_id     INTEGER NOT NULL,
            body          TEXT NOT NULL,
            reply_to      INTEGER REFERENCES group_chat_messages(id),
            read_count    INTEGER NOT NULL DEFAULT 0,
            created_time  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_group_messages_room
            ON group_chat_messages(room_id);

        CREATE TABLE IF NOT EXISTS group_message_reads (
            message_id    INTEGER NOT NULL REFERENCES group_chat_messages(id),
            user_id       INTEGER NOT NULL,
            created_time  TEXT NOT NULL,
            PRIMARY KEY (message_id, user_id)
        );
        ",
    )?;

    info!("Chat store migrations complete");
    Ok(())
}
