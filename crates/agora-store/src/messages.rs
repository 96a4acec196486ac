//! Append-only, strictly ordered message log per direct room.

use agora_types::models::MessagePayload;
use agora_types::{ChatError, MessageId, RoomId, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::models::MessageRow;
use crate::Database;

#[derive(Debug)]
pub struct PagedMessages {
    pub rows: Vec<MessageRow>,
    pub total_elements: u64,
    pub total_pages: u64,
}

const MESSAGE_COLUMNS: &str =
    "id, room_id, sender_id, seq, message_type, body, file_url, file_name, file_size, created_time";

impl Database {
    /// Validate the payload, assign the next per-room sequence value, and
    /// persist. The sequence is computed and inserted under the connection
    /// lock; `UNIQUE (room_id, seq)` backstops duplicate assignment.
    pub fn append_message(
        &self,
        room: RoomId,
        sender: UserId,
        payload: &MessagePayload,
        now: DateTime<Utc>,
    ) -> Result<MessageRow, ChatError> {
        payload.validate()?;

        self.with_conn(|conn| {
            let seq: i64 = conn.query_row(
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM direct_chat_messages WHERE room_id = ?1",
                params![room.0],
                |r| r.get(0),
            )?;

            let (body, file_url, file_name, file_size) = payload_columns(payload);
            conn.execute(
                "INSERT INTO direct_chat_messages
                 (room_id, sender_id, seq, message_type, body, file_url, file_name, file_size, created_time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    room.0,
                    sender.0,
                    seq,
                    payload.kind(),
                    body,
                    file_url,
                    file_name,
                    file_size,
                    now,
                ],
            )?;

            Ok(MessageRow {
                id: MessageId(conn.last_insert_rowid()),
                room_id: room,
                sender_id: sender,
                seq,
                payload: payload.clone(),
                created_time: now,
            })
        })
    }

    /// Most recent message in the room by sequence, if any.
    pub fn latest_message(&self, room: RoomId) -> Result<Option<MessageRow>, ChatError> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!(
                        "SELECT {MESSAGE_COLUMNS} FROM direct_chat_messages
                         WHERE room_id = ?1 ORDER BY seq DESC LIMIT 1"
                    ),
                    params![room.0],
                    map_message,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// One page of messages ordered newest first, plus totals. `page` is
    /// zero-based; `size` must be positive.
    pub fn message_page(
        &self,
        room: RoomId,
        page: u32,
        size: u32,
    ) -> Result<PagedMessages, ChatError> {
        if size == 0 {
            return Err(ChatError::invalid_argument("page size must be positive"));
        }

        self.with_conn(|conn| {
            let total_elements: u64 = conn.query_row(
                "SELECT COUNT(*) FROM direct_chat_messages WHERE room_id = ?1",
                params![room.0],
                |r| r.get::<_, i64>(0).map(|n| n as u64),
            )?;
            let total_pages = total_elements.div_ceil(size as u64);

            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM direct_chat_messages
                 WHERE room_id = ?1 ORDER BY seq DESC LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt
                .query_map(
                    params![room.0, size as i64, page as i64 * size as i64],
                    map_message,
                )?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(PagedMessages {
                rows,
                total_elements,
                total_pages,
            })
        })
    }

    /// Messages `user` has not read: sent by someone else, with a sequence
    /// above `last_read_seq`. A `None` pointer means nothing read yet.
    pub fn count_unread(
        &self,
        room: RoomId,
        user: UserId,
        last_read_seq: Option<i64>,
    ) -> Result<u32, ChatError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM direct_chat_messages
                 WHERE room_id = ?1 AND sender_id != ?2 AND seq > COALESCE(?3, 0)",
                params![room.0, user.0, last_read_seq],
                |r| r.get(0),
            )?;
            Ok(count as u32)
        })
    }
}

fn payload_columns(
    payload: &MessagePayload,
) -> (Option<&str>, Option<&str>, Option<&str>, Option<i64>) {
    match payload {
        MessagePayload::Text { message } => (Some(message), None, None, None),
        MessagePayload::Image { file_url } => (None, Some(file_url), None, None),
        MessagePayload::File {
            file_url,
            file_name,
            file_size,
        } => (None, Some(file_url), Some(file_name), Some(*file_size)),
    }
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    let kind: String = row.get(4)?;
    let payload = match kind.as_str() {
        "IMAGE" => MessagePayload::Image {
            file_url: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        },
        "FILE" => MessagePayload::File {
            file_url: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            file_name: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            file_size: row.get::<_, Option<i64>>(8)?.unwrap_or_default(),
        },
        _ => MessagePayload::Text {
            message: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        },
    };
    Ok(MessageRow {
        id: MessageId(row.get(0)?),
        room_id: RoomId(row.get(1)?),
        sender_id: UserId(row.get(2)?),
        seq: row.get(3)?,
        payload,
        created_time: row.get(9)?,
    })
}
